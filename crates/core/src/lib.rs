//! Seamline Core - Shared types library.
//!
//! This crate provides common types used across all Seamline components:
//! - `storefront` - Public API and the gated admin section
//! - `cli` - Command-line tools for migrations and admin provisioning
//!
//! # Architecture
//!
//! The core crate contains only types and pure decision logic - no I/O, no
//! database access, no HTTP clients. This keeps it lightweight and allows it
//! to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and statuses
//! - [`access`] - Sessions, admin memberships, and the admin gate decision

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod access;
pub mod types;

pub use access::{
    ADMIN_API_PREFIX, ADMIN_PREFIX, AdminMembership, DenyReason, GateDecision, LOGIN_PATH,
    RESET_PASSWORD_PATH, Session, decide, is_gate_exempt, is_protected_path,
};
pub use types::*;
