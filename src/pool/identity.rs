use std::fmt;

/// A credential carried by an [`Identity`].
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Kerberos ticket for `principal` (usually `user@REALM`).
    Kerberos {
        /// Fully qualified Kerberos principal.
        principal: String,
    },
    /// OAuth bearer token issued to `subject`.
    OAuth {
        /// Subject claim of the token.
        subject: String,
        /// Bearer token; attached per connection, never baked into a pool.
        access_token: String,
    },
    /// Key-pair authentication.
    PrivateKey {
        /// Database user the key belongs to.
        user: String,
        /// Reference to the key material in a secret store.
        key_id: String,
    },
    /// No credential beyond the caller's name.
    Anonymous,
}

impl Credential {
    /// Short label used in logs and diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Credential::Kerberos { .. } => "kerberos",
            Credential::OAuth { .. } => "oauth",
            Credential::PrivateKey { .. } => "private_key",
            Credential::Anonymous => "anonymous",
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Kerberos { principal } => f
                .debug_struct("Kerberos")
                .field("principal", principal)
                .finish(),
            Credential::OAuth { subject, .. } => f
                .debug_struct("OAuth")
                .field("subject", subject)
                .field("access_token", &"<redacted>")
                .finish(),
            Credential::PrivateKey { user, key_id } => f
                .debug_struct("PrivateKey")
                .field("user", user)
                .field("key_id", key_id)
                .finish(),
            Credential::Anonymous => f.write_str("Anonymous"),
        }
    }
}

/// The caller a connection is requested for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    name: String,
    credentials: Vec<Credential>,
}

impl Identity {
    /// Identity with a display name and no credentials.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            credentials: Vec::new(),
        }
    }

    /// Adds a credential.
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credentials.push(credential);
        self
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All credentials, in the order they were attached.
    pub fn credentials(&self) -> &[Credential] {
        &self.credentials
    }

    /// First credential, which strategies usually key on.
    pub fn first_credential(&self) -> Option<&Credential> {
        self.credentials.first()
    }

    /// Kerberos principal with the realm suffix removed, if a ticket is present.
    pub fn kerberos_user(&self) -> Option<&str> {
        self.credentials.iter().find_map(|credential| match credential {
            Credential::Kerberos { principal } => {
                Some(principal.split_once('@').map_or(principal.as_str(), |(user, _)| user))
            }
            _ => None,
        })
    }

    /// Subject of the first OAuth token, if any.
    pub fn oauth_subject(&self) -> Option<&str> {
        self.credentials.iter().find_map(|credential| match credential {
            Credential::OAuth { subject, .. } => Some(subject.as_str()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kerberos_realm_is_stripped() {
        let identity = Identity::new("alice").with_credential(Credential::Kerberos {
            principal: "alice@CORP.EXAMPLE".into(),
        });
        assert_eq!(identity.kerberos_user(), Some("alice"));
        assert_eq!(identity.oauth_subject(), None);
        assert_eq!(identity.first_credential().map(Credential::kind), Some("kerberos"));
    }

    #[test]
    fn oauth_token_is_not_printed() {
        let credential = Credential::OAuth {
            subject: "svc-reporting".into(),
            access_token: "secret-token".into(),
        };
        let rendered = format!("{credential:?}");
        assert!(rendered.contains("svc-reporting"));
        assert!(!rendered.contains("secret-token"));
    }

    #[test]
    fn bare_identity_has_no_credentials() {
        let identity = Identity::new("batch-job");
        assert!(identity.credentials().is_empty());
        assert_eq!(identity.kerberos_user(), None);
        assert_eq!(identity.name(), "batch-job");
    }
}
