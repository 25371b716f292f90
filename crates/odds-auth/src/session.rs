//! Session context carrying the bearer credential.
//!
//! The session is created at login and torn down at logout; it is passed
//! explicitly to the API client and the state store instead of living in a
//! global. Only the authentication flow writes to it, everything else reads
//! or subscribes.

use std::sync::Arc;

use tokio::sync::watch;

use crate::profile::Credential;

#[derive(Debug, Clone)]
pub struct AuthSession {
    credential: Arc<watch::Sender<Option<Credential>>>,
}

impl Default for AuthSession {
    fn default() -> Self {
        Self::anonymous()
    }
}

impl AuthSession {
    pub fn anonymous() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            credential: Arc::new(tx),
        }
    }

    pub fn with_credential(credential: Credential) -> Self {
        let session = Self::anonymous();
        session.sign_in(credential);
        session
    }

    pub fn sign_in(&self, credential: Credential) {
        tracing::info!(email = credential.email.as_deref().unwrap_or("-"), "signed in");
        self.credential.send_replace(Some(credential));
    }

    pub fn sign_out(&self) {
        if self.credential.send_replace(None).is_some() {
            tracing::info!("signed out");
        }
    }

    pub fn credential(&self) -> Option<Credential> {
        self.credential.borrow().clone()
    }

    /// Token for the `Authorization` header, `None` when absent, blank or expired.
    pub fn bearer_token(&self) -> Option<String> {
        self.credential
            .borrow()
            .as_ref()
            .filter(|credential| credential.is_usable())
            .map(|credential| credential.id_token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.bearer_token().is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Credential>> {
        self.credential.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_session_has_no_bearer() {
        let session = AuthSession::anonymous();
        assert!(session.bearer_token().is_none());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn blank_token_is_treated_as_absent() {
        let session = AuthSession::with_credential(Credential::new(""));
        assert!(session.credential().is_some());
        assert!(session.bearer_token().is_none());
    }

    #[test]
    fn clones_share_the_same_credential() {
        let session = AuthSession::anonymous();
        let reader = session.clone();
        session.sign_in(Credential::new("tok"));
        assert_eq!(reader.bearer_token().as_deref(), Some("tok"));
        session.sign_out();
        assert!(reader.bearer_token().is_none());
    }

    #[tokio::test]
    async fn subscribers_see_sign_out() {
        let session = AuthSession::with_credential(Credential::new("tok"));
        let mut rx = session.subscribe();
        assert!(rx.borrow_and_update().is_some());

        session.sign_out();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_none());
    }
}
