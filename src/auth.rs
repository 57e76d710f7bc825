//! Credential lookup for the login endpoint

use serde::{Deserialize, Serialize};

/// Identity returned to the client after a successful login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
}

/// One configured credential
#[derive(Debug, Clone, Deserialize)]
pub struct Credential {
    pub pin: String,
    #[serde(default)]
    pub email: Option<String>,
    pub id: String,
    pub name: String,
}

/// Credential to identity mapping, resolved once at startup
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    credentials: Vec<Credential>,
}

impl UserDirectory {
    #[must_use]
    pub fn new(credentials: Vec<Credential>) -> Self {
        let credentials = credentials
            .into_iter()
            .filter(|c| !c.pin.is_empty())
            .collect();
        Self { credentials }
    }

    /// Parse a JSON array of `{pin, email?, id, name}` entries.
    ///
    /// # Errors
    ///
    /// Returns the parse error for malformed JSON or missing fields.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let credentials: Vec<Credential> = serde_json::from_str(json)?;
        Ok(Self::new(credentials))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Find the user for a PIN, optionally scoped by email.
    ///
    /// Entries that carry an email only match requests with the same email
    /// (ASCII case-insensitive); entries without one only match PIN-only
    /// requests.
    #[must_use]
    pub fn authenticate(&self, email: Option<&str>, pin: &str) -> Option<User> {
        let email = email.map(str::trim).filter(|e| !e.is_empty());
        self.credentials
            .iter()
            .find(|c| {
                c.pin == pin
                    && match (email, c.email.as_deref()) {
                        (None, None) => true,
                        (Some(given), Some(known)) => given.eq_ignore_ascii_case(known),
                        _ => false,
                    }
            })
            .map(|c| User {
                id: c.id.clone(),
                name: c.name.clone(),
            })
    }
}
