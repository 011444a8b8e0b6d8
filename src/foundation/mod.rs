pub mod error;
pub mod types;

pub use error::{ErrorCode, Result, SyncError};
pub use types::{Address, ChainId, TxId};
