//! PostgreSQL repositories
//!
//! Each repository implements one store contract for [`PgTx`]. Enumerated
//! columns are foreign keys into seeded lookup tables; inserts resolve names
//! with a sub-select and reads join the name back, see [`lookup`].

pub mod administrator;
pub mod file;
pub mod group;
pub mod lookup;
pub mod resource;
pub mod transaction;

pub use administrator::AdministratorRepository;
pub use file::FileRepository;
pub use group::GroupRepository;
pub use lookup::seed_lookup_tables;
pub use resource::ResourceRepository;
pub use transaction::{PgDatabase, PgTx};

use crate::store::{LockMode, Stores};
use std::sync::Arc;

/// `FOR UPDATE` clause restricted to the given table alias.
pub(crate) fn lock_clause(lock: LockMode, alias: &str) -> String {
    match lock {
        LockMode::None => String::new(),
        LockMode::Record => format!(" FOR UPDATE OF {}", alias),
    }
}

impl PgDatabase {
    /// Store bundle backed by this database's repositories.
    pub fn stores(&self) -> Stores<PgTx> {
        Stores {
            files: Arc::new(FileRepository::new()),
            resources: Arc::new(ResourceRepository::new()),
            groups: Arc::new(GroupRepository::new()),
            administrators: Arc::new(AdministratorRepository::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_clause() {
        assert_eq!(lock_clause(LockMode::None, "g"), "");
        assert_eq!(lock_clause(LockMode::Record, "g"), " FOR UPDATE OF g");
    }
}
