//! Session credentials: storage, endpoint classification, and the refresh gate.

pub mod endpoints;
pub mod error;
pub mod gate;
pub mod store;
pub mod token;

pub use endpoints::{is_public_endpoint, is_refresh_endpoint, PUBLIC_ENDPOINTS, REFRESH_ENDPOINT};
pub use error::StoreError;
pub use gate::{RefreshGate, RefreshLease, RefreshOutcome, Ticket, Waiter};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore, TokenStoreConfig};
pub use token::{StorageKey, TokenPair};
