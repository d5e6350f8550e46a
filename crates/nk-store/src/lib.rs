//! SQLite persistence for notekeep items, plus the two operations that
//! walk the stored reference graph: cascade deletion and the retention
//! sweep.

pub mod cascade;
pub mod error;
pub mod pruner;
pub mod schema;
pub mod store;

pub use cascade::cascade_dependents;
pub use error::{Result, StoreError};
pub use pruner::{SweepReport, sweep};
pub use store::Store;
