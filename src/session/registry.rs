// ABOUTME: Session registry - the authoritative table of open sessions for the active namespace
// Mediates creation, foreground selection, pruning on inventory change, and deletion

use crate::models::{CloseReason, Inventory, SessionDescriptor, SessionKey};
use crate::terminal::ApiEndpoint;
use tracing::{debug, info};

/// Invoked with the deleted key so the owning view can clear stale highlight state
pub type DeleteCallback = Box<dyn FnMut(&SessionKey) + Send>;

pub struct SessionRegistry {
    endpoint: ApiEndpoint,
    namespace: String,
    entries: Vec<SessionDescriptor>,
    merged: Option<SessionDescriptor>,
    on_delete: DeleteCallback,
    closed: bool,
}

impl SessionRegistry {
    pub fn new(endpoint: ApiEndpoint, namespace: impl Into<String>, on_delete: DeleteCallback) -> Self {
        Self {
            endpoint,
            namespace: namespace.into(),
            entries: Vec::new(),
            merged: None,
            on_delete,
            closed: false,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn kube_context(&self) -> Option<&str> {
        self.endpoint.kube_context()
    }

    /// Singleton entries in display order
    pub fn entries(&self) -> &[SessionDescriptor] {
        &self.entries
    }

    pub fn merged_entry(&self) -> Option<&SessionDescriptor> {
        self.merged.as_ref()
    }

    pub fn get(&self, key: &SessionKey) -> Option<&SessionDescriptor> {
        match key {
            SessionKey::Merged { .. } => self.merged.as_ref().filter(|m| &m.key == key),
            SessionKey::Singleton { .. } => self.entries.iter().find(|e| &e.key == key),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len() + usize::from(self.merged.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Adopt a new namespace, flushing every session if it changed.
    ///
    /// Returns `true` when all attachments must be torn down.
    pub fn update_namespace(&mut self, namespace: &str) -> bool {
        if self.namespace == namespace {
            return false;
        }

        info!("Namespace changed from {} to {}, flushing sessions", self.namespace, namespace);
        self.namespace = namespace.to_string();
        self.flush();
        true
    }

    /// Like `update_namespace`, but a kube context switch also flushes
    pub fn update_scope(&mut self, kube_context: Option<&str>, namespace: &str) -> bool {
        let kube_context = kube_context.filter(|c| !c.is_empty());
        if self.endpoint.kube_context() == kube_context {
            return self.update_namespace(namespace);
        }

        info!(
            "Kube context changed from {:?} to {:?}, flushing sessions",
            self.endpoint.kube_context(),
            kube_context
        );
        self.endpoint.set_context(kube_context.map(str::to_string));
        self.namespace = namespace.to_string();
        self.flush();
        true
    }

    fn flush(&mut self) {
        self.entries.clear();
        self.merged = None;
    }

    /// Drop sessions whose pod or container vanished from the inventory.
    ///
    /// Removal is stable: surviving entries keep their display order.
    pub fn reconcile(&mut self, inventory: &Inventory) -> Vec<SessionKey> {
        let mut removed = Vec::new();
        self.entries.retain(|entry| {
            let keep = entry
                .key
                .target()
                .map_or(true, |(pod, container)| inventory.contains(pod, container));
            if !keep {
                removed.push(entry.key.clone());
            }
            keep
        });

        for key in &removed {
            debug!(session = %key, "Pruned session whose container vanished");
        }
        removed
    }

    /// Foreground `selected`, opening it on first selection.
    ///
    /// Every other session is hidden but stays open. `None` hides everything.
    pub fn select(&mut self, selected: Option<&SessionKey>) {
        let mut found = false;
        for entry in &mut self.entries {
            entry.visible = selected == Some(&entry.key);
            found |= entry.visible;
        }

        if let Some(merged) = self.merged.as_mut() {
            merged.visible = false;
        }

        match selected {
            Some(key @ SessionKey::Merged { .. }) => {
                if let Some(merged) = self.merged.as_mut().filter(|m| &m.key == key) {
                    merged.visible = true;
                } else {
                    debug!(session = %key, "Opening merged log session");
                    self.merged = Some(self.descriptor_for(key));
                }
            }
            Some(key @ SessionKey::Singleton { .. }) if !found => {
                debug!(session = %key, "Opening session");
                let descriptor = self.descriptor_for(key);
                self.entries.push(descriptor);
            }
            _ => {}
        }
    }

    fn descriptor_for(&self, key: &SessionKey) -> SessionDescriptor {
        let stream_url = self.endpoint.stream_url(key, &self.namespace);
        SessionDescriptor::new(key.clone(), stream_url, &self.namespace)
    }

    /// Remove the session for `key`. Unknown keys are a no-op.
    pub fn delete(&mut self, key: &SessionKey) -> Option<SessionDescriptor> {
        self.delete_with_reason(key, CloseReason::None)
    }

    /// Remove the session for `key`, stamping why it closed on the returned descriptor
    pub fn delete_with_reason(&mut self, key: &SessionKey, reason: CloseReason) -> Option<SessionDescriptor> {
        let mut removed = match key {
            SessionKey::Merged { .. } => {
                if self.merged.as_ref().is_some_and(|m| &m.key == key) {
                    self.merged.take()
                } else {
                    None
                }
            }
            SessionKey::Singleton { .. } => self
                .entries
                .iter()
                .position(|e| &e.key == key)
                .map(|idx| self.entries.remove(idx)),
        }?;

        removed.close_reason = reason;
        info!(session = %key, reason = ?reason, "Session removed");

        if !self.closed {
            (self.on_delete)(key);
        }
        Some(removed)
    }

    /// Mark the registry torn down; later deletions no longer call back
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Merged session first, then singletons in display order
    pub fn renderable_entries(&self) -> Vec<&SessionDescriptor> {
        self.merged.iter().chain(self.entries.iter()).collect()
    }
}
