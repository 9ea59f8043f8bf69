pub mod credentials;
pub mod snapshot_store;

pub use credentials::{CredentialStore, SessionCredentials};
pub use snapshot_store::{
    CatalogSnapshot, JsonFileSnapshotStore, MemorySnapshotStore, SnapshotStore, SnapshotWriter,
};
