// ABOUTME: Session descriptor - per-session connection parameters owned by the registry
// Attachments only ever see a read-only snapshot of these fields

use crate::models::SessionKey;
use reqwest::Url;

/// Why a session left the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CloseReason {
    #[default]
    None,
    /// The stream dropped and the auto-close policy fired
    Lost,
    /// The user killed the terminal
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescriptor {
    pub key: SessionKey,
    pub stream_url: Url,
    pub visible: bool,
    pub close_reason: CloseReason,
    /// Annotation rendered above the terminal surface
    pub first_line: Option<String>,
}

impl SessionDescriptor {
    pub fn new(key: SessionKey, stream_url: Url, namespace: &str) -> Self {
        let first_line = Self::annotation(&key, namespace);
        Self {
            key,
            stream_url,
            visible: true,
            close_reason: CloseReason::None,
            first_line,
        }
    }

    fn annotation(key: &SessionKey, namespace: &str) -> Option<String> {
        match key {
            SessionKey::Singleton {
                pod,
                container,
                interactive,
            } => Some(format!(
                "devspace {} -n {} --pod {} -c {}",
                if *interactive { "enter" } else { "logs" },
                namespace,
                pod,
                container
            )),
            SessionKey::Merged { .. } => None,
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.key.is_interactive()
    }
}
