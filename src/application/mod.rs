pub mod executor;
pub mod observer;
pub mod reconciler;
pub mod session;

pub use executor::IntentExecutor;
pub use observer::{CompositeObserver, NoopObserver, SessionObserver, SyncState};
pub use reconciler::ReconciliationEngine;
pub use session::SyncSession;
