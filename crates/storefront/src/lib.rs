//! Seamline storefront library.
//!
//! Public catalogue API, newsletter and contact endpoints, and the admin
//! section behind the admin gate. Exposed as a library so the router can
//! be exercised with in-memory collaborators.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod gate;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
