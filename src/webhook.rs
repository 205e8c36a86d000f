//! Webhook event model and routing

use axum::body::Bytes;
use axum::http::HeaderMap;
use serde::Deserialize;

use crate::error::{HookError, Result};
use crate::signature::SIGNATURE_HEADER;

pub const EVENT_HEADER: &str = "X-GitHub-Event";

/// Kind of GitHub event, taken from the `X-GitHub-Event` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Ping,
    Push,
    Other(String),
}

impl EventKind {
    /// A delivery without an event header is treated as a ping.
    pub fn from_header(value: Option<&str>) -> Self {
        match value.unwrap_or("ping") {
            "ping" => EventKind::Ping,
            "push" => EventKind::Push,
            other => EventKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Ping => "ping",
            EventKind::Push => "push",
            EventKind::Other(name) => name,
        }
    }
}

/// A single inbound delivery. Lives for one request.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub kind: EventKind,
    pub body: Bytes,
    pub signature: Option<String>,
}

impl WebhookEvent {
    pub fn from_request(headers: &HeaderMap, body: Bytes) -> Self {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
        Self {
            kind: EventKind::from_header(header(EVENT_HEADER)),
            signature: header(SIGNATURE_HEADER).map(str::to_owned),
            body,
        }
    }
}

/// The fields of a push payload we care about
#[derive(Debug, Default, Deserialize)]
pub struct PushPayload {
    #[serde(rename = "ref", default)]
    pub git_ref: String,
    pub after: Option<String>,
    pub pusher: Option<Pusher>,
    pub repository: Option<Repository>,
}

#[derive(Debug, Deserialize)]
pub struct Pusher {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Repository {
    pub full_name: Option<String>,
}

impl PushPayload {
    pub fn pusher_name(&self) -> Option<&str> {
        self.pusher.as_ref().and_then(|p| p.name.as_deref())
    }

    pub fn repository_name(&self) -> Option<&str> {
        self.repository.as_ref().and_then(|r| r.full_name.as_deref())
    }
}

/// What to do with a verified delivery
#[derive(Debug, PartialEq, Eq)]
pub enum Route {
    Pong,
    Deploy { target_ref: String },
    IgnoreBranch { target_ref: String },
    Unhandled { event: String },
}

/// Decides what a verified event should trigger. Holds no state between calls.
pub fn route(kind: &EventKind, body: &[u8], main_ref: &str) -> Result<Route> {
    match kind {
        EventKind::Ping => Ok(Route::Pong),
        EventKind::Push => {
            let payload: PushPayload = serde_json::from_slice(body)
                .map_err(|e| HookError::InvalidPayload(e.to_string()))?;
            tracing::info!(
                "Push to '{}' (repository: {:?}, after: {:?}, pusher: {:?})",
                payload.git_ref,
                payload.repository_name(),
                payload.after,
                payload.pusher_name()
            );
            if payload.git_ref == main_ref {
                Ok(Route::Deploy {
                    target_ref: payload.git_ref,
                })
            } else {
                Ok(Route::IgnoreBranch {
                    target_ref: payload.git_ref,
                })
            }
        }
        EventKind::Other(name) => Ok(Route::Unhandled {
            event: name.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAIN: &str = "refs/heads/main";

    #[test]
    fn parses_event_header() {
        assert_eq!(EventKind::from_header(Some("ping")), EventKind::Ping);
        assert_eq!(EventKind::from_header(Some("push")), EventKind::Push);
        assert_eq!(EventKind::from_header(None), EventKind::Ping);
        assert_eq!(
            EventKind::from_header(Some("issues")),
            EventKind::Other("issues".into())
        );
    }

    #[test]
    fn ping_is_pong() {
        assert_eq!(route(&EventKind::Ping, b"", MAIN).unwrap(), Route::Pong);
    }

    #[test]
    fn push_to_main_deploys() {
        let body = br#"{"ref":"refs/heads/main","after":"abc123","pusher":{"name":"octocat"}}"#;
        assert_eq!(
            route(&EventKind::Push, body, MAIN).unwrap(),
            Route::Deploy {
                target_ref: MAIN.into()
            }
        );
    }

    #[test]
    fn push_elsewhere_is_ignored() {
        for git_ref in ["refs/heads/dev", "refs/heads/main2", "refs/tags/main", "main"] {
            let body = serde_json::to_vec(&serde_json::json!({ "ref": git_ref })).unwrap();
            assert_eq!(
                route(&EventKind::Push, &body, MAIN).unwrap(),
                Route::IgnoreBranch {
                    target_ref: git_ref.into()
                }
            );
        }
    }

    #[test]
    fn push_without_ref_is_ignored() {
        assert_eq!(
            route(&EventKind::Push, b"{}", MAIN).unwrap(),
            Route::IgnoreBranch {
                target_ref: String::new()
            }
        );
    }

    #[test]
    fn push_with_broken_json_is_invalid() {
        let err = route(&EventKind::Push, b"not json", MAIN).unwrap_err();
        assert!(matches!(err, HookError::InvalidPayload(_)));
    }

    #[test]
    fn other_events_are_unhandled() {
        assert_eq!(
            route(&EventKind::Other("issues".into()), b"{}", MAIN).unwrap(),
            Route::Unhandled {
                event: "issues".into()
            }
        );
    }

    #[test]
    fn reads_event_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-github-event", "push".parse().unwrap());
        headers.insert("x-hub-signature-256", "sha256=00".parse().unwrap());
        let event = WebhookEvent::from_request(&headers, Bytes::from_static(b"{}"));
        assert_eq!(event.kind, EventKind::Push);
        assert_eq!(event.signature.as_deref(), Some("sha256=00"));
    }
}
