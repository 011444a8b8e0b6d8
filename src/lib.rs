// Public crate surface is organized by layer: `foundation`, `domain`, `infrastructure`, `application`.
pub mod application;
pub mod domain;
pub mod foundation;
pub mod infrastructure;

pub use foundation::{Result, SyncError};
