//! Store ports - interfaces to the shared real-time store

mod stores;

pub use stores::{GroupStore, PresenceStore, StoreResult};
