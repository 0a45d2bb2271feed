//! Authentication module for sessions and stored credentials.
//!
//! - `Session`: the persisted identity (token and business record)
//! - `CredentialStore`: OS-level password storage via keyring
//!
//! Sessions are persisted to disk and expire 24 hours after sign-in.

pub mod credentials;
pub mod session;

pub use credentials::CredentialStore;
pub use session::{BusinessRecord, Session, SessionData};
