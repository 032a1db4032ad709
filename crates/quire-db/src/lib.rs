//! Quire persistence layer
//!
//! `store` holds the contracts the orchestrators program against (the
//! transaction seam plus one trait per store). `db` holds their PostgreSQL
//! implementations on top of sqlx.

pub mod db;
pub mod store;

pub use db::{
    seed_lookup_tables, AdministratorRepository, FileRepository, GroupRepository, PgDatabase,
    PgTx, ResourceRepository,
};
pub use store::{
    finish, AdministratorStore, Database, FileRecord, FileStore, GroupQuery, GroupRecord,
    GroupStore, LockMode, ResourceQuery, ResourceRecord, ResourceStore, Stores,
};
