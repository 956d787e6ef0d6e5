// ABOUTME: Wire-level protocol for session streams and the resize side channel
// Builds stream/resize URLs against the API host and defines inbound stream events

use crate::models::SessionKey;
use crate::terminal::error::{EndpointError, ResizeError};
use crate::terminal::resize::Grid;
use reqwest::Url;

pub const LOGS_PATH: &str = "/api/logs";
pub const ENTER_PATH: &str = "/api/enter";
pub const LOGS_MULTIPLE_PATH: &str = "/api/logs-multiple";
pub const RESIZE_PATH: &str = "/api/resize";

/// Query parameter carrying the per-attachment resize identifier
pub const RESIZE_ID_PARAM: &str = "resize_id";

// ============================================
// Stream events
// ============================================

/// Event delivered by a stream transport, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Raw output bytes from the remote side
    Data(Vec<u8>),
    /// Transport-level error; rendered inline, never thrown
    Error(String),
    /// The stream is gone. No further events follow.
    Closed { had_error: bool },
}

// ============================================
// Endpoint
// ============================================

/// API host the streams and the resize side channel are served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoint {
    base: Url,
    kube_context: Option<String>,
}

impl ApiEndpoint {
    /// `scheme` is the stream scheme (`ws` or `wss`); `host` may carry a port
    pub fn new(scheme: &str, host: &str) -> Result<Self, EndpointError> {
        if scheme != "ws" && scheme != "wss" {
            return Err(EndpointError::UnsupportedScheme(scheme.to_string()));
        }
        if host.trim().is_empty() {
            return Err(EndpointError::InvalidHost {
                host: host.to_string(),
                reason: "empty host".to_string(),
            });
        }

        let base = Url::parse(&format!("{}://{}/", scheme, host)).map_err(|e| {
            EndpointError::InvalidHost {
                host: host.to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            base,
            kube_context: None,
        })
    }

    pub fn with_context(mut self, kube_context: Option<String>) -> Self {
        self.set_context(kube_context);
        self
    }

    pub fn set_context(&mut self, kube_context: Option<String>) {
        self.kube_context = kube_context.filter(|c| !c.is_empty());
    }

    pub fn kube_context(&self) -> Option<&str> {
        self.kube_context.as_deref()
    }

    /// Root URL of the API host, in the stream scheme
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn host(&self) -> &str {
        self.base.host_str().unwrap_or_default()
    }

    /// URL of the primary stream for `key` within `namespace`
    pub fn stream_url(&self, key: &SessionKey, namespace: &str) -> Url {
        let mut url = self.base.clone();
        match key {
            SessionKey::Singleton {
                pod,
                container,
                interactive,
            } => {
                url.set_path(if *interactive { ENTER_PATH } else { LOGS_PATH });
                let mut query = url.query_pairs_mut();
                if let Some(context) = &self.kube_context {
                    query.append_pair("context", context);
                }
                query
                    .append_pair("namespace", namespace)
                    .append_pair("name", pod)
                    .append_pair("container", container);
            }
            SessionKey::Merged { selectors } => {
                url.set_path(LOGS_MULTIPLE_PATH);
                let mut query = url.query_pairs_mut();
                if let Some(context) = &self.kube_context {
                    query.append_pair("context", context);
                }
                query.append_pair("namespace", namespace);
                for selector in selectors {
                    query.append_pair("imageSelector", selector);
                }
            }
        }
        url
    }

    /// URL of the resize side channel, over plain HTTP(S)
    pub fn resize_url(&self, resize_id: &str, grid: Grid) -> Result<Url, ResizeError> {
        resize_url(&self.base, resize_id, grid)
    }
}

/// Derive the resize side-channel URL from any URL on the API host
pub fn resize_url(on_host: &Url, resize_id: &str, grid: Grid) -> Result<Url, ResizeError> {
    let mut url = on_host.clone();
    let scheme = match url.scheme() {
        "wss" | "https" => "https",
        _ => "http",
    };
    url.set_scheme(scheme)
        .map_err(|()| ResizeError::InvalidEndpoint(on_host.to_string()))?;
    url.set_path(RESIZE_PATH);
    url.set_query(None);
    url.query_pairs_mut()
        .append_pair(RESIZE_ID_PARAM, resize_id)
        .append_pair("width", &grid.cols.to_string())
        .append_pair("height", &grid.rows.to_string());
    Ok(url)
}

/// Append the resize identifier so the server can route resizes to this stream's PTY
pub fn with_resize_id(url: &Url, resize_id: &str) -> Url {
    let mut url = url.clone();
    url.query_pairs_mut().append_pair(RESIZE_ID_PARAM, resize_id);
    url
}
