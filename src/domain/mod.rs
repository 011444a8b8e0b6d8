pub mod calldata;
pub mod confirmations;
pub mod model;

pub use confirmations::ConfirmationSet;
pub use model::{OwnerSnapshot, Transaction, TxOrigin, TxRecord, TxSnapshot, TxStatus};
