//! Outbound client signalling.
//!
//! The connected editor is only ever talked to through [`ClientNotifier`]:
//! fire-and-forget notifications, optionally with a JSON payload. Whether a
//! category of notification is wanted at all is answered by a
//! [`CapabilityProvider`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

/// Generated document contents for a tracked host document.
pub const UPDATE_GENERATED_DOCUMENT: &str = "docsync/updateGeneratedDocument";

/// Ask the client to re-request semantic tokens.
pub const SEMANTIC_TOKENS_REFRESH: &str = "workspace/semanticTokens/refresh";

/// Ask the client to re-pull diagnostics.
pub const DIAGNOSTICS_REFRESH: &str = "workspace/diagnostic/refresh";

/// Fire-and-forget outbound signal to the connected editor.
pub trait ClientNotifier: Send + Sync {
    /// Send a notification without parameters.
    fn send_notification(&self, method: &str);

    /// Send a notification with a JSON payload.
    fn send_notification_with(&self, method: &str, params: Value);
}

/// A notification as it leaves the process.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingNotification {
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// Notifier that queues notifications on an unbounded channel.
///
/// Sending never blocks; if the receiving side is gone the notification is
/// dropped.
#[derive(Debug, Clone)]
pub struct ChannelClientNotifier {
    sender: mpsc::UnboundedSender<OutgoingNotification>,
}

impl ChannelClientNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutgoingNotification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn push(&self, notification: OutgoingNotification) {
        if self.sender.send(notification).is_err() {
            crate::debug_event!("client", "dropped", "no receiver");
        }
    }
}

impl ClientNotifier for ChannelClientNotifier {
    fn send_notification(&self, method: &str) {
        self.push(OutgoingNotification {
            method: method.to_string(),
            params: None,
        });
    }

    fn send_notification_with(&self, method: &str, params: Value) {
        self.push(OutgoingNotification {
            method: method.to_string(),
            params: Some(params),
        });
    }
}

/// Categories of client notifications gated by client support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientCapability {
    SemanticTokensRefresh,
    DiagnosticsRefresh,
    GeneratedDocuments,
}

/// Answers whether the connected client supports a notification category.
pub trait CapabilityProvider: Send + Sync {
    fn supports(&self, capability: ClientCapability) -> bool;
}

/// Static capability set, typically captured from the client's handshake.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientCapabilities {
    pub semantic_tokens_refresh: bool,
    pub diagnostics_refresh: bool,
    pub generated_documents: bool,
}

impl ClientCapabilities {
    /// Every capability enabled.
    pub fn all() -> Self {
        Self {
            semantic_tokens_refresh: true,
            diagnostics_refresh: true,
            generated_documents: true,
        }
    }
}

impl CapabilityProvider for ClientCapabilities {
    fn supports(&self, capability: ClientCapability) -> bool {
        match capability {
            ClientCapability::SemanticTokensRefresh => self.semantic_tokens_refresh,
            ClientCapability::DiagnosticsRefresh => self.diagnostics_refresh,
            ClientCapability::GeneratedDocuments => self.generated_documents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_notifier_forwards_in_order() {
        let (notifier, mut rx) = ChannelClientNotifier::new();

        notifier.send_notification(SEMANTIC_TOKENS_REFRESH);
        notifier.send_notification_with(UPDATE_GENERATED_DOCUMENT, serde_json::json!({"a": 1}));

        let first = rx.try_recv().unwrap();
        assert_eq!(first.method, SEMANTIC_TOKENS_REFRESH);
        assert!(first.params.is_none());

        let second = rx.try_recv().unwrap();
        assert_eq!(second.method, UPDATE_GENERATED_DOCUMENT);
        assert_eq!(second.params, Some(serde_json::json!({"a": 1})));
    }

    #[test]
    fn test_channel_notifier_survives_closed_receiver() {
        let (notifier, rx) = ChannelClientNotifier::new();
        drop(rx);
        notifier.send_notification(DIAGNOSTICS_REFRESH);
    }

    #[test]
    fn test_notification_serialization_skips_empty_params() {
        let notification = OutgoingNotification {
            method: SEMANTIC_TOKENS_REFRESH.to_string(),
            params: None,
        };
        let json = serde_json::to_string(&notification).unwrap();
        assert_eq!(json, r#"{"method":"workspace/semanticTokens/refresh"}"#);
    }

    #[test]
    fn test_capabilities_deserialize_with_defaults() {
        let caps: ClientCapabilities =
            serde_json::from_str(r#"{"semanticTokensRefresh": true}"#).unwrap();
        assert!(caps.supports(ClientCapability::SemanticTokensRefresh));
        assert!(!caps.supports(ClientCapability::DiagnosticsRefresh));
        assert!(!caps.supports(ClientCapability::GeneratedDocuments));
        assert!(ClientCapabilities::all().supports(ClientCapability::GeneratedDocuments));
    }
}
