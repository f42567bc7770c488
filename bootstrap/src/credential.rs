//! Hugging Face access token resolution.
//!
//! The token is looked up once at process start and passed down to every
//! fetch as an explicit [`Credential`]. An absent token is a normal state:
//! public repositories still download, private ones fail at the fetcher.

use std::fmt;
use std::io::Write;

use crate::output::write_stderr_line;

/// Environment variable holding the Hugging Face access token.
pub const TOKEN_ENV_VAR: &str = "HUGGINGFACE_TOKEN";

/// An optional, opaque access token.
///
/// The `Debug` implementation never prints the token value.
///
/// # Examples
///
/// ```
/// use trellis_bootstrap::credential::Credential;
///
/// let credential = Credential::new("hf_secret");
/// assert!(credential.is_present());
/// assert!(!format!("{credential:?}").contains("hf_secret"));
///
/// assert!(!Credential::absent().is_present());
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential(Option<String>);

impl Credential {
    /// Create a credential holding `token`.
    ///
    /// A blank token yields an absent credential.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        let trimmed = token.trim();
        if trimmed.is_empty() {
            Self(None)
        } else {
            Self(Some(trimmed.to_owned()))
        }
    }

    /// Create an absent credential.
    #[must_use]
    pub const fn absent() -> Self {
        Self(None)
    }

    /// Return true when a token is available.
    #[must_use]
    pub const fn is_present(&self) -> bool {
        self.0.is_some()
    }

    /// Return the raw token, if any.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Return the `Authorization` header value for this credential.
    #[must_use]
    pub fn bearer_header(&self) -> Option<String> {
        self.token().map(|token| format!("Bearer {token}"))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => f.write_str("Credential(<redacted>)"),
            None => f.write_str("Credential(<absent>)"),
        }
    }
}

/// Resolve the credential from the process environment.
///
/// Writes one notice line when a token is found, or a notice and a hint when
/// it is not.
pub fn resolve_credential(stderr: &mut dyn Write) -> Credential {
    resolve_credential_with(|name| std::env::var(name).ok(), stderr)
}

/// Resolve the credential using an injected variable lookup.
pub fn resolve_credential_with<F>(lookup: F, stderr: &mut dyn Write) -> Credential
where
    F: FnOnce(&str) -> Option<String>,
{
    let credential = lookup(TOKEN_ENV_VAR).map_or_else(Credential::absent, Credential::new);

    if credential.is_present() {
        write_stderr_line(stderr, "Using Hugging Face token from environment");
    } else {
        write_stderr_line(
            stderr,
            "No Hugging Face token found. Some models may not be accessible.",
        );
        write_stderr_line(
            stderr,
            format!("Please create a .env file with your token: {TOKEN_ENV_VAR}=your_token_here"),
        );
    }

    credential
}
