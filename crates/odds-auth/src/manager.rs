use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::profile::{Credential, CredentialStore};

const CREDENTIAL_STORE_FILE: &str = "credentials.json";

/// What the credential store holds for the active profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialStatus {
    SignedOut,
    Active(Credential),
    /// Still on disk, but no longer sent to the backend.
    Expired(Credential),
}

/// Persists admin credentials between CLI invocations.
#[derive(Debug, Clone)]
pub struct CredentialManager {
    store_path: PathBuf,
}

impl CredentialManager {
    pub fn from_config_dir(config_dir: impl Into<PathBuf>) -> Self {
        let config_dir = config_dir.into();
        Self {
            store_path: config_dir.join(CREDENTIAL_STORE_FILE),
        }
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    fn read_store(&self) -> Result<CredentialStore> {
        if !self.store_path.exists() {
            return Ok(CredentialStore::default());
        }

        let content = fs::read_to_string(&self.store_path)
            .with_context(|| format!("failed to read {}", self.store_path.display()))?;

        match serde_json::from_str::<CredentialStore>(&content) {
            Ok(store) => Ok(store),
            Err(e) => {
                tracing::warn!(path = %self.store_path.display(), "ignoring unreadable credential store: {e}");
                Ok(CredentialStore::default())
            }
        }
    }

    fn write_store(&self, store: &CredentialStore) -> Result<()> {
        if let Some(parent) = self.store_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let payload = serde_json::to_string_pretty(store).context("serialize credential store")?;
        fs::write(&self.store_path, payload)
            .with_context(|| format!("failed to write {}", self.store_path.display()))?;

        Ok(())
    }

    pub fn status(&self) -> Result<CredentialStatus> {
        let store = self.read_store()?;
        let stored = store
            .active_profile
            .and_then(|name| store.credentials.get(&name).cloned());
        Ok(match stored {
            None => CredentialStatus::SignedOut,
            Some(credential) if credential.is_usable() => CredentialStatus::Active(credential),
            Some(credential) => CredentialStatus::Expired(credential),
        })
    }

    /// The active credential, if it can still be used as a bearer token.
    pub fn active_credential(&self) -> Result<Option<Credential>> {
        match self.status()? {
            CredentialStatus::Active(credential) => Ok(Some(credential)),
            CredentialStatus::Expired(_) => {
                tracing::debug!("stored credential has expired");
                Ok(None)
            }
            CredentialStatus::SignedOut => Ok(None),
        }
    }

    /// Stores `credential` under `profile_name` and makes it active. Blank or
    /// expired tokens are refused.
    pub fn save_credential(
        &self,
        profile_name: impl Into<String>,
        credential: Credential,
    ) -> Result<()> {
        if !credential.is_usable() {
            bail!("token is empty or already expired");
        }
        let profile_name = profile_name.into();
        let mut store = self.read_store()?;
        store.credentials.insert(profile_name.clone(), credential);
        store.active_profile = Some(profile_name);
        self.write_store(&store)
    }

    /// Drops the active credential. Returns whether one was removed.
    pub fn remove_active(&self) -> Result<bool> {
        let mut store = self.read_store()?;
        let Some(name) = store.active_profile.take() else {
            return Ok(false);
        };
        let removed = store.credentials.remove(&name).is_some();
        self.write_store(&store)?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use crate::profile::{Credential, CredentialStore};

    use super::{CredentialManager, CredentialStatus};

    #[test]
    fn save_credential_creates_directory_and_file() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let manager = CredentialManager::from_config_dir(temp.path().join("nested").join("odds"));

        manager
            .save_credential("admin", Credential::new("id-token"))
            .expect("save credential");

        assert!(manager.store_path().exists());
        let active = manager.active_credential().expect("load").expect("active");
        assert_eq!(active.id_token, "id-token");
    }

    #[test]
    fn invalid_json_reads_as_signed_out() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let manager = CredentialManager::from_config_dir(temp.path());

        std::fs::write(manager.store_path(), "{ this is invalid json ")
            .expect("write invalid json");

        assert_eq!(manager.status().expect("status"), CredentialStatus::SignedOut);
    }

    #[test]
    fn unusable_tokens_are_not_saved() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let manager = CredentialManager::from_config_dir(temp.path());

        assert!(manager.save_credential("admin", Credential::new("  ")).is_err());
        assert!(manager
            .save_credential("admin", Credential::new("t").with_expiry(1))
            .is_err());
        assert!(!manager.store_path().exists());
    }

    #[test]
    fn expired_credential_is_reported_but_not_active() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let manager = CredentialManager::from_config_dir(temp.path());

        let expired = Credential::new("old-token").with_expiry(1);
        let store = CredentialStore {
            active_profile: Some("admin".into()),
            credentials: [("admin".to_string(), expired.clone())].into_iter().collect(),
        };
        std::fs::write(manager.store_path(), serde_json::to_string(&store).unwrap()).unwrap();

        assert_eq!(manager.status().unwrap(), CredentialStatus::Expired(expired));
        assert!(manager.active_credential().unwrap().is_none());
    }

    #[test]
    fn remove_active_clears_profile() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let manager = CredentialManager::from_config_dir(temp.path());

        assert!(!manager.remove_active().unwrap());

        manager
            .save_credential("admin", Credential::new("id-token"))
            .unwrap();
        assert!(manager.remove_active().unwrap());
        assert!(manager.active_credential().unwrap().is_none());
    }
}
