//! JSON API handlers.

pub mod admin;
