//! Query modules for the order dashboard.
//!
//! Each query struct borrows from a [`Connection`](crate::connection::Connection)
//! and registers the dataset lazily on first use.

pub mod orders;

pub use orders::OrderQuery;
