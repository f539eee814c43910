//! Identity and connectivity gates.
//!
//! Every pull and flush first asks two collaborators whether it may talk to
//! the remote at all: is someone signed in, and is the device online. Both
//! also publish changes through `tokio::sync::watch`, which the collection
//! worker uses as triggers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::Deferred;

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stamped as `user_id` on records this session creates.
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl Identity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: None,
        }
    }
}

/// Source of the current session.
pub trait IdentityProvider: Send + Sync {
    fn current(&self) -> Option<Identity>;

    /// Change notifications; the initial value is the current session.
    fn subscribe(&self) -> watch::Receiver<Option<Identity>>;
}

/// Source of the online/offline signal.
pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;

    /// Change notifications; the initial value is the current state.
    fn subscribe(&self) -> watch::Receiver<bool>;
}

/// Session holder driven by the authentication layer.
pub struct SessionIdentity {
    tx: watch::Sender<Option<Identity>>,
}

impl SessionIdentity {
    /// Start signed out.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            tx: watch::channel(None).0,
        })
    }

    /// Start with a session already restored.
    pub fn signed_in(identity: Identity) -> Arc<Self> {
        Arc::new(Self {
            tx: watch::channel(Some(identity)).0,
        })
    }

    pub fn sign_in(&self, identity: Identity) {
        self.tx.send_replace(Some(identity));
    }

    pub fn sign_out(&self) {
        self.tx.send_replace(None);
    }
}

impl IdentityProvider for SessionIdentity {
    fn current(&self) -> Option<Identity> {
        self.tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.tx.subscribe()
    }
}

/// Online flag driven by the platform's network reachability events.
pub struct ConnectivitySignal {
    tx: watch::Sender<bool>,
}

impl ConnectivitySignal {
    pub fn new(online: bool) -> Arc<Self> {
        Arc::new(Self {
            tx: watch::channel(online).0,
        })
    }

    pub fn set_online(&self, online: bool) {
        self.tx.send_if_modified(|current| {
            let changed = *current != online;
            *current = online;
            changed
        });
    }
}

impl Connectivity for ConnectivitySignal {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Both gates together.
#[derive(Clone)]
pub struct Gates {
    pub identity: Arc<dyn IdentityProvider>,
    pub connectivity: Arc<dyn Connectivity>,
}

impl Gates {
    pub fn new(identity: Arc<dyn IdentityProvider>, connectivity: Arc<dyn Connectivity>) -> Self {
        Self {
            identity,
            connectivity,
        }
    }

    /// The identity to act as, or why remote work must wait.
    pub fn check(&self) -> Result<Identity, Deferred> {
        let identity = self.identity.current().ok_or(Deferred::IdentityMissing)?;
        if !self.connectivity.is_online() {
            return Err(Deferred::ConnectivityUnavailable);
        }
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gates_check_order() {
        let session = SessionIdentity::new();
        let network = ConnectivitySignal::new(false);
        let gates = Gates::new(session.clone(), network.clone());

        assert_eq!(gates.check(), Err(Deferred::IdentityMissing));

        session.sign_in(Identity::new("u1"));
        assert_eq!(gates.check(), Err(Deferred::ConnectivityUnavailable));

        network.set_online(true);
        assert_eq!(gates.check(), Ok(Identity::new("u1")));

        session.sign_out();
        assert_eq!(gates.check(), Err(Deferred::IdentityMissing));
    }

    #[tokio::test]
    async fn test_connectivity_notifies_only_on_change() {
        let network = ConnectivitySignal::new(false);
        let mut rx = network.subscribe();

        network.set_online(false);
        assert!(!rx.has_changed().unwrap());

        network.set_online(true);
        assert!(rx.has_changed().unwrap());
        rx.changed().await.unwrap();
        assert!(*rx.borrow_and_update());
    }

    #[tokio::test]
    async fn test_identity_notifies() {
        let session = SessionIdentity::new();
        let mut rx = session.subscribe();
        session.sign_in(Identity::new("u2"));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().as_ref().map(|i| i.user_id.as_str()), Some("u2"));
    }
}
