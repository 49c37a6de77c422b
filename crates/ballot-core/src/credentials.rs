//! Administrator login credentials.

use std::fmt;

/// Email and password for the `login` mutation.
///
/// `Debug` omits the password.
///
/// # Example
///
/// ```
/// use ballot_core::Credentials;
///
/// let creds = Credentials::new("admin@example.com", "hunter2");
/// assert_eq!(creds.email(), "admin@example.com");
/// ```
#[derive(Clone)]
pub struct Credentials {
    email: String,
    password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// The password, for building the login request only.
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}
