use anyhow::{Context, Result};
use std::env;

/// Session credential for authenticated backend calls.
///
/// Loaded once at startup and injected into the broker and listing clients,
/// which never read ambient state themselves.
#[derive(Debug, Clone)]
pub struct Session {
    token: String,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Load the session token from the environment (`MARKET_SESSION_TOKEN`)
    pub fn from_env() -> Result<Self> {
        let token = env::var("MARKET_SESSION_TOKEN").context(
            "MARKET_SESSION_TOKEN not found in environment. Log in and set it in .env file",
        )?;
        if token.trim().is_empty() {
            anyhow::bail!("MARKET_SESSION_TOKEN cannot be empty");
        }
        Ok(Self::new(token))
    }

    /// Value for the `Authorization` header
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_header_value() {
        let session = Session::new("abc123");
        assert_eq!(session.bearer(), "Bearer abc123");
    }
}
