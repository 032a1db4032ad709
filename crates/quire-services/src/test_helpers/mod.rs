//! Test helpers for orchestrator tests
//!
//! In-memory implementations of the database, the user directory and byte
//! storage, plus fixtures wiring them into the services. No PostgreSQL or
//! identity service is needed.

pub mod fixtures;
pub mod memory_db;
pub mod mock_directory;
pub mod mock_storage;

pub use fixtures::*;
pub use memory_db::{MemoryDatabase, MemoryState, MemoryTx, MembershipWrite};
pub use mock_directory::StaticDirectory;
pub use mock_storage::MockStorage;
