//! Clients for the hosted collaborators.
//!
//! # Services
//!
//! - `identity` - Session lookup, sign-in, sign-out and password reset (GoTrue)
//! - `email` - Transactional email over SMTP
//! - `storage` - Product image uploads (object storage)
//!
//! Each collaborator sits behind a trait so the router can be built with
//! in-process fakes.

pub mod email;
pub mod identity;
pub mod storage;

pub use email::{MailError, Mailer, SmtpMailer};
pub use identity::{
    AccessToken, Identity, IdentityError, IdentityProvider, SignedIn, SupabaseAuth,
};
pub use storage::{ObjectStorage, StorageError, SupabaseStorage};
