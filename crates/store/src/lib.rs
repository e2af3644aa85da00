//! Persistence layer for the storefront.
//!
//! [`Store`] covers catalog, coupon, settings and order reads and writes;
//! [`StoreTx`] is the unit of work used by order placement and status
//! changes. Two implementations are provided: [`MySqlStore`] for
//! production and [`InMemoryStore`] for tests and local runs.

pub mod error;
pub mod memory;
pub mod mysql;
pub mod query;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use mysql::MySqlStore;
pub use query::{OrderQuery, ProductQuery};
pub use store::{OrderStats, Store, StoreTx};
