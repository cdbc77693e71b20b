//! Notification delivery behind the platform permission model. The web
//! origin of this product sat on the browser Notification API; here the
//! "native" channel is the WebSocket broadcast, gated on the same
//! granted / denied / default permission states. The in-app acknowledgment
//! prompt never goes through this adapter and so keeps working when
//! permission is denied.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Granted,
    Denied,
    /// Not asked yet.
    Default,
}

pub trait Notifier: Send + Sync {
    fn query_permission(&self) -> Permission;

    /// Prompt for permission if supported. Returns whether permission is now
    /// granted; `false` immediately (no prompt) when unsupported.
    fn request_permission(&self) -> bool;

    /// Attempt to show a native notification for one user. Returns whether a
    /// display was attempted. Never queues or retries; a denied or
    /// unsupported state silently results in no notification.
    fn display(&self, user_id: Uuid, title: &str, body: &str) -> bool;
}

/// Production notifier: pushes notification payloads over the shared
/// broadcast channel, from which the WebSocket handler fans out per user.
pub struct ChannelNotifier {
    tx: broadcast::Sender<String>,
    permission: Arc<RwLock<Permission>>,
}

impl ChannelNotifier {
    pub fn new(tx: broadcast::Sender<String>) -> Self {
        Self {
            tx,
            permission: Arc::new(RwLock::new(Permission::Default)),
        }
    }

    /// Record a permission state reported by the client (the actual browser
    /// prompt happens on their side).
    pub fn set_permission(&self, permission: Permission) {
        *self.permission.write().expect("permission lock poisoned") = permission;
    }
}

impl Notifier for ChannelNotifier {
    fn query_permission(&self) -> Permission {
        *self.permission.read().expect("permission lock poisoned")
    }

    fn request_permission(&self) -> bool {
        let mut permission = self.permission.write().expect("permission lock poisoned");
        match *permission {
            // Once denied, re-requesting does not prompt again
            Permission::Denied => false,
            _ => {
                *permission = Permission::Granted;
                true
            }
        }
    }

    fn display(&self, user_id: Uuid, title: &str, body: &str) -> bool {
        if self.query_permission() != Permission::Granted {
            tracing::debug!(user_id = %user_id, "Notification permission not granted, skipping display");
            return false;
        }

        let msg = serde_json::json!({
            "type": "notification",
            "user_id": user_id,
            "title": title,
            "body": body,
        });
        // No receivers connected is fine; the display was still attempted
        let _ = self.tx.send(msg.to_string());
        true
    }
}

/// Notifier for hosts without any notification surface. Requests never
/// prompt and displays never happen.
#[allow(dead_code)]
pub struct UnsupportedNotifier;

impl Notifier for UnsupportedNotifier {
    fn query_permission(&self) -> Permission {
        Permission::Denied
    }

    fn request_permission(&self) -> bool {
        false
    }

    fn display(&self, _user_id: Uuid, _title: &str, _body: &str) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel_notifier() -> (ChannelNotifier, broadcast::Receiver<String>) {
        let (tx, rx) = broadcast::channel(16);
        (ChannelNotifier::new(tx), rx)
    }

    #[test]
    fn test_default_then_request_grants() {
        let (notifier, _rx) = channel_notifier();
        assert_eq!(notifier.query_permission(), Permission::Default);
        assert!(notifier.request_permission());
        assert_eq!(notifier.query_permission(), Permission::Granted);
    }

    #[test]
    fn test_denied_never_reprompts() {
        let (notifier, _rx) = channel_notifier();
        notifier.set_permission(Permission::Denied);
        assert!(!notifier.request_permission());
        assert_eq!(notifier.query_permission(), Permission::Denied);
    }

    #[test]
    fn test_display_requires_granted() {
        let (notifier, mut rx) = channel_notifier();
        let user_id = Uuid::new_v4();

        notifier.set_permission(Permission::Denied);
        assert!(!notifier.display(user_id, "Title", "Body"));
        assert!(rx.try_recv().is_err());

        notifier.set_permission(Permission::Granted);
        assert!(notifier.display(user_id, "Title", "Body"));
        let msg: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(msg["type"], "notification");
        assert_eq!(msg["user_id"], user_id.to_string());
    }

    #[test]
    fn test_unsupported_host() {
        let notifier = UnsupportedNotifier;
        assert!(!notifier.request_permission());
        assert!(!notifier.display(Uuid::new_v4(), "Title", "Body"));
    }
}
