use anyhow::{Context, Result};
use keyring::Entry;
use tracing::debug;

const SERVICE_NAME: &str = "menucache";

/// Dashboard passwords kept in the OS keychain, one entry per account email.
///
/// The CLI stores the password at login so an expired session can be renewed
/// without prompting.
pub struct CredentialStore;

impl CredentialStore {
    pub fn store(email: &str, password: &str) -> Result<()> {
        Self::entry(email)?
            .set_password(password)
            .context("Failed to store password in keychain")
    }

    pub fn get_password(email: &str) -> Result<String> {
        Self::entry(email)?
            .get_password()
            .context("Failed to retrieve password from keychain")
    }

    /// Remove the stored password. Succeeds when there was none.
    pub fn delete(email: &str) -> Result<()> {
        match Self::entry(email)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete credential from keychain"),
        }
    }

    pub fn has_credentials(email: &str) -> bool {
        Self::entry(email)
            .ok()
            .is_some_and(|entry| entry.get_password().is_ok())
    }

    /// Email and stored password for renewing a session, if both exist.
    pub fn renewal_login(last_email: Option<&str>) -> Option<(String, String)> {
        let email = last_email?;
        match Self::get_password(email) {
            Ok(password) => Some((email.to_string(), password)),
            Err(e) => {
                debug!(email = %email, error = %e, "No stored password for renewal");
                None
            }
        }
    }

    fn entry(email: &str) -> Result<Entry> {
        Entry::new(SERVICE_NAME, &account_name(email)).context("Failed to create keyring entry")
    }
}

/// Emails are case-insensitive, so `Owner@Example.com` and `owner@example.com`
/// share one keychain entry.
fn account_name(email: &str) -> String {
    email.trim().to_lowercase()
}
