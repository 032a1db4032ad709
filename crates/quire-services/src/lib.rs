//! Quire Services Layer
//!
//! This crate is the **business service layer**: the group, resource and file
//! orchestrators plus the user directory they resolve identities through.
//! Every orchestrator runs its reads and writes inside one transaction opened
//! through [`quire_db::Database`], so the API crate only has to pick a
//! database and hand a session to each operation. Keep business rules here;
//! keep thin HTTP handling in quire-api.

pub mod directory;
pub mod file;
pub mod group;
pub mod resource;
pub mod roster;

/// In-memory collaborators for tests of this and dependent crates
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use directory::{CachedUserDirectory, DirectoryError, IdentityServiceClient, UserDirectory};
pub use file::{sniff_file_type, FileDownload, FileService};
pub use group::{GroupService, MembershipDiff};
pub use resource::ResourceService;
pub use roster::{Roster, UserResolver};
