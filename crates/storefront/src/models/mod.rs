//! Domain models for the storefront.
//!
//! Rows arrive from the data store as JSON objects; these types are their
//! decoded form and double as API response bodies.

pub mod order;
pub mod product;
pub mod subscriber;

pub use order::Order;
pub use product::Product;
pub use subscriber::Subscriber;
