//! Network connectivity flag.
//!
//! Submission checks a single flag at call time to decide between
//! dispatching and queuing. The check is best effort: connectivity can change
//! between the check and the call that follows it. Transitions are also
//! broadcast so the queue replayer can react to coming back online.
//!
//! Components that only read the flag hold an [`OnlineFlag`]. It does not
//! keep the broadcast channel open, so listeners stop once every
//! [`Connectivity`] handle is gone.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

/// Read-only view of the online/offline state.
#[derive(Debug, Clone)]
pub struct OnlineFlag {
    online: Arc<AtomicBool>,
}

impl OnlineFlag {
    /// Whether the network is currently believed to be reachable.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

/// A cloneable handle to the shared online/offline state.
#[derive(Debug, Clone)]
pub struct Connectivity {
    online: Arc<AtomicBool>,
    tx: Arc<watch::Sender<bool>>,
}

impl Connectivity {
    /// Create a handle with the given initial state.
    #[must_use]
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self {
            online: Arc::new(AtomicBool::new(online)),
            tx: Arc::new(tx),
        }
    }

    /// Create a handle that starts online.
    #[must_use]
    pub fn online() -> Self {
        Self::new(true)
    }

    /// Create a handle that starts offline.
    #[must_use]
    pub fn offline() -> Self {
        Self::new(false)
    }

    /// Whether the network is currently believed to be reachable.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// A read-only view that follows this handle.
    #[must_use]
    pub fn flag(&self) -> OnlineFlag {
        OnlineFlag {
            online: Arc::clone(&self.online),
        }
    }

    /// Record a connectivity change.
    ///
    /// Returns `true` if this call moved from offline to online.
    pub fn set_online(&self, online: bool) -> bool {
        let was_online = self.online.swap(online, Ordering::SeqCst);
        if was_online != online {
            info!(
                "Connectivity changed: {}",
                if online { "online" } else { "offline" }
            );
            self.tx.send_replace(online);
        }
        !was_online && online
    }

    /// Subscribe to connectivity changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::online()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        assert!(Connectivity::online().is_online());
        assert!(!Connectivity::offline().is_online());
        assert!(Connectivity::default().is_online());
    }

    #[test]
    fn test_set_online_reports_reconnect() {
        let conn = Connectivity::offline();
        assert!(conn.set_online(true));
        assert!(conn.is_online());
        assert!(!conn.set_online(true));
        assert!(!conn.set_online(false));
        assert!(!conn.is_online());
    }

    #[test]
    fn test_clones_share_state() {
        let a = Connectivity::online();
        let b = a.clone();
        a.set_online(false);
        assert!(!b.is_online());
    }

    #[test]
    fn test_flag_follows_handle() {
        let conn = Connectivity::offline();
        let flag = conn.flag();
        assert!(!flag.is_online());
        conn.set_online(true);
        assert!(flag.is_online());
    }

    #[tokio::test]
    async fn test_flag_does_not_keep_channel_open() {
        let conn = Connectivity::online();
        let flag = conn.flag();
        let mut rx = conn.subscribe();

        drop(conn);
        assert!(rx.changed().await.is_err());
        assert!(flag.is_online());
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions() {
        let conn = Connectivity::offline();
        let mut rx = conn.subscribe();
        assert!(!*rx.borrow_and_update());

        conn.set_online(true);
        rx.changed().await.unwrap();
        assert!(*rx.borrow_and_update());
    }

    #[tokio::test]
    async fn test_repeated_state_does_not_notify() {
        let conn = Connectivity::online();
        let mut rx = conn.subscribe();
        rx.borrow_and_update();

        conn.set_online(true);
        assert!(!rx.has_changed().unwrap());
    }
}
