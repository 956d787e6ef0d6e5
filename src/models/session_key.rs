// ABOUTME: Session identity - which pod/container stream or merged log stream a terminal targets
// Selection events from the UI layer are normalized into keys here

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of an open session.
///
/// A singleton session targets one container of one pod, either as a log
/// stream or as an interactive shell. A merged session multiplexes the logs
/// of several image selectors server-side.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionKey {
    Singleton {
        pod: String,
        container: String,
        interactive: bool,
    },
    Merged {
        selectors: Vec<String>,
    },
}

impl SessionKey {
    pub fn singleton(pod: impl Into<String>, container: impl Into<String>, interactive: bool) -> Self {
        SessionKey::Singleton {
            pod: pod.into(),
            container: container.into(),
            interactive,
        }
    }

    pub fn merged<I, S>(selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SessionKey::Merged {
            selectors: selectors.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_merged(&self) -> bool {
        matches!(self, SessionKey::Merged { .. })
    }

    /// Interactive sessions carry keystrokes back to the remote side
    pub fn is_interactive(&self) -> bool {
        matches!(self, SessionKey::Singleton { interactive: true, .. })
    }

    /// Pod and container names for singleton sessions
    pub fn target(&self) -> Option<(&str, &str)> {
        match self {
            SessionKey::Singleton { pod, container, .. } => Some((pod, container)),
            SessionKey::Merged { .. } => None,
        }
    }

    /// Stable label used as the render key and in log lines
    pub fn label(&self) -> String {
        match self {
            SessionKey::Singleton {
                pod,
                container,
                interactive,
            } => format!(
                "{}:{}:{}",
                pod,
                container,
                if *interactive { "interactive" } else { "non-interactive" }
            ),
            SessionKey::Merged { .. } => "multi-logs".to_string(),
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionKey::Merged { selectors } => write!(f, "multi-logs[{}]", selectors.join(",")),
            SessionKey::Singleton { .. } => f.write_str(&self.label()),
        }
    }
}

/// Raw selection event as delivered by the UI layer.
///
/// Fields are loosely typed on the wire; `into_key` decides which session
/// (if any) the event denotes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionEvent {
    pub pod: Option<String>,
    pub container: Option<String>,
    pub interactive: Option<bool>,
    pub multiple: Option<Vec<String>>,
}

impl SelectionEvent {
    pub fn into_key(self) -> Option<SessionKey> {
        if let Some(selectors) = self.multiple.filter(|s| !s.is_empty()) {
            return Some(SessionKey::Merged { selectors });
        }

        match (self.pod, self.container) {
            (Some(pod), Some(container)) => Some(SessionKey::Singleton {
                pod,
                container,
                interactive: self.interactive.unwrap_or(false),
            }),
            _ => None,
        }
    }
}

impl From<SessionKey> for SelectionEvent {
    fn from(key: SessionKey) -> Self {
        match key {
            SessionKey::Singleton {
                pod,
                container,
                interactive,
            } => SelectionEvent {
                pod: Some(pod),
                container: Some(container),
                interactive: Some(interactive),
                multiple: None,
            },
            SessionKey::Merged { selectors } => SelectionEvent {
                multiple: Some(selectors),
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merged_equality_is_order_sensitive() {
        assert_eq!(SessionKey::merged(["a", "b"]), SessionKey::merged(["a", "b"]));
        assert_ne!(SessionKey::merged(["a", "b"]), SessionKey::merged(["b", "a"]));
    }

    #[test]
    fn test_interactive_flag_distinguishes_singletons() {
        assert_ne!(
            SessionKey::singleton("pod", "c1", true),
            SessionKey::singleton("pod", "c1", false)
        );
    }

    #[test]
    fn test_selection_event_prefers_multiple() {
        let event = SelectionEvent {
            pod: Some("pod".to_string()),
            container: Some("c1".to_string()),
            interactive: None,
            multiple: Some(vec!["img".to_string()]),
        };
        assert_eq!(event.into_key(), Some(SessionKey::merged(["img"])));
    }

    #[test]
    fn test_selection_event_without_container_is_no_selection() {
        let event = SelectionEvent {
            pod: Some("pod".to_string()),
            ..Default::default()
        };
        assert_eq!(event.into_key(), None);

        let empty = SelectionEvent {
            multiple: Some(Vec::new()),
            ..Default::default()
        };
        assert_eq!(empty.into_key(), None);
    }

    #[test]
    fn test_selection_event_from_json() {
        let event: SelectionEvent =
            serde_json::from_str(r#"{"pod":"api-0","container":"app"}"#).unwrap();
        assert_eq!(event.into_key(), Some(SessionKey::singleton("api-0", "app", false)));
    }

    #[test]
    fn test_label() {
        assert_eq!(SessionKey::singleton("p", "c", true).label(), "p:c:interactive");
        assert_eq!(SessionKey::merged(["x"]).label(), "multi-logs");
    }
}
