//! Configuration module
//!
//! Settings shared by every command.

use anyhow::{Result, bail};
use sluice_engine::{CredentialKey, CredentialStore, EngineConfig};

/// CLI configuration
#[derive(Clone)]
pub struct Config {
    /// Secret the connection encryption key is derived from
    pub secret: Option<String>,

    pub engine: EngineConfig,
}

impl Config {
    /// Credential store for commands that need a stable key
    pub fn credential_store(&self) -> Result<CredentialStore> {
        match self.secret.as_deref().filter(|s| !s.is_empty()) {
            Some(secret) => Ok(CredentialStore::new(CredentialKey::derive(secret))),
            None => bail!("No secret configured; pass --secret or set SLUICE_SECRET"),
        }
    }

    /// Credential store for in-process use only
    ///
    /// Connections loaded from a plaintext file are sealed and opened within
    /// one process, so any key works when no secret is configured.
    pub fn session_credential_store(&self) -> CredentialStore {
        self.credential_store().unwrap_or_else(|_| {
            CredentialStore::new(CredentialKey::derive(&uuid::Uuid::new_v4().to_string()))
        })
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("secret", &self.secret.as_ref().map(|_| "[HIDDEN]"))
            .field("engine", &self.engine)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_store_requires_secret() {
        let config = Config {
            secret: None,
            engine: EngineConfig::default(),
        };
        assert!(config.credential_store().is_err());

        // Still usable for a single run
        let store = config.session_credential_store();
        assert_eq!(store.decrypt(&store.encrypt("x")).unwrap(), "x");
    }

    #[test]
    fn test_same_secret_same_key() {
        let config = Config {
            secret: Some("team-secret".to_string()),
            engine: EngineConfig::default(),
        };
        let ciphertext = config.credential_store().unwrap().encrypt("payload");
        let reopened = config.credential_store().unwrap().decrypt(&ciphertext).unwrap();
        assert_eq!(reopened, "payload");
        assert!(!format!("{config:?}").contains("team-secret"));
    }
}
