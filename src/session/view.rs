// ABOUTME: Session view - owns the registry, the highlighted selection, and one attachment per open session
// Data flows one way: registry -> descriptor -> attachment -> close event -> registry

use crate::models::{CloseReason, Inventory, SelectionEvent, SessionDescriptor, SessionKey};
use crate::session::SessionRegistry;
use crate::terminal::{
    ApiEndpoint, AttachmentOptions, ResizeSink, StreamConnector, StreamError, TerminalAttachment,
    TerminalSurface,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Creates the host surface for a descriptor; `None` if it does not exist yet
pub type SurfaceFactory<S> = Box<dyn FnMut(&SessionDescriptor) -> Option<S>>;

pub struct SessionView<S: TerminalSurface> {
    registry: SessionRegistry,
    attachments: HashMap<SessionKey, TerminalAttachment<S>>,
    highlighted: Option<SessionKey>,

    options: AttachmentOptions,
    connector: Arc<dyn StreamConnector>,
    resize_sink: Arc<dyn ResizeSink>,
    surfaces: SurfaceFactory<S>,

    close_tx: mpsc::UnboundedSender<(SessionKey, CloseReason)>,
    close_rx: mpsc::UnboundedReceiver<(SessionKey, CloseReason)>,
    deleted_rx: mpsc::UnboundedReceiver<SessionKey>,
}

impl<S: TerminalSurface> SessionView<S> {
    pub fn new(
        endpoint: ApiEndpoint,
        namespace: impl Into<String>,
        options: AttachmentOptions,
        connector: Arc<dyn StreamConnector>,
        resize_sink: Arc<dyn ResizeSink>,
        surfaces: SurfaceFactory<S>,
    ) -> Self {
        let (close_tx, close_rx) = mpsc::unbounded_channel();
        let (deleted_tx, deleted_rx) = mpsc::unbounded_channel();

        let registry = SessionRegistry::new(
            endpoint,
            namespace,
            Box::new(move |key: &SessionKey| {
                let _ = deleted_tx.send(key.clone());
            }),
        );

        Self {
            registry,
            attachments: HashMap::new(),
            highlighted: None,
            options,
            connector,
            resize_sink,
            surfaces,
            close_tx,
            close_rx,
            deleted_rx,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn highlighted(&self) -> Option<&SessionKey> {
        self.highlighted.as_ref()
    }

    pub fn renderable_entries(&self) -> Vec<&SessionDescriptor> {
        self.registry.renderable_entries()
    }

    pub fn attachment(&self, key: &SessionKey) -> Option<&TerminalAttachment<S>> {
        self.attachments.get(key)
    }

    pub fn attachment_mut(&mut self, key: &SessionKey) -> Option<&mut TerminalAttachment<S>> {
        self.attachments.get_mut(key)
    }

    pub fn mounted_count(&self) -> usize {
        self.attachments.len()
    }

    /// The attachment currently in the foreground
    pub fn foreground_mut(&mut self) -> Option<&mut TerminalAttachment<S>> {
        self.attachments.values_mut().find(|a| a.is_visible())
    }

    /// Handle a selection event. Re-selecting the highlighted session deselects it.
    pub fn select(&mut self, event: SelectionEvent) {
        let mut key = event.into_key();
        if key.is_some() && key == self.highlighted {
            key = None;
        }

        self.registry.select(key.as_ref());
        self.highlighted = key;
        self.sync();
    }

    pub fn refresh_inventory(&mut self, inventory: &Inventory) {
        let removed = self.registry.reconcile(inventory);
        if !removed.is_empty() {
            self.sync();
        }
    }

    pub fn update_namespace(&mut self, namespace: &str) -> bool {
        let flushed = self.registry.update_namespace(namespace);
        self.after_flush(flushed);
        flushed
    }

    pub fn update_scope(&mut self, kube_context: Option<&str>, namespace: &str) -> bool {
        let flushed = self.registry.update_scope(kube_context, namespace);
        self.after_flush(flushed);
        flushed
    }

    fn after_flush(&mut self, flushed: bool) {
        if flushed {
            self.highlighted = None;
            self.sync();
        }
    }

    /// Layout of the whole view changed (window resize)
    pub fn on_layout_change(&mut self) {
        for attachment in self.attachments.values_mut() {
            attachment.on_layout_change();
        }
    }

    /// Keystrokes for the foreground session
    pub fn send_input(&mut self, bytes: Vec<u8>) -> Result<(), StreamError> {
        match self.foreground_mut() {
            Some(attachment) => attachment.send_input(bytes),
            None => Err(StreamError::Closed),
        }
    }

    /// One turn of the event loop: deliver stream output, apply close
    /// requests, and re-sync mounted attachments.
    ///
    /// Returns true when something changed that needs a redraw.
    pub fn pump(&mut self) -> bool {
        let mut changed = false;
        for attachment in self.attachments.values_mut() {
            changed |= attachment.pump() > 0;
        }

        let mut closed_any = false;
        while let Ok((key, reason)) = self.close_rx.try_recv() {
            closed_any |= self.registry.delete_with_reason(&key, reason).is_some();
        }

        while let Ok(deleted) = self.deleted_rx.try_recv() {
            if self
                .highlighted
                .as_ref()
                .is_some_and(|highlighted| points_at(highlighted, &deleted))
            {
                debug!(session = %deleted, "Clearing highlight for deleted session");
                self.highlighted = None;
            }
        }

        if closed_any {
            self.sync();
        }
        changed || closed_any
    }

    /// Mount attachments for new descriptors, push visibility to existing ones,
    /// and tear down the ones whose descriptors are gone.
    fn sync(&mut self) {
        let descriptors: Vec<SessionDescriptor> =
            self.registry.renderable_entries().into_iter().cloned().collect();

        self.attachments.retain(|key, attachment| {
            let keep = descriptors.iter().any(|d| &d.key == key);
            if !keep {
                attachment.close();
            }
            keep
        });

        for descriptor in &descriptors {
            if let Some(attachment) = self.attachments.get_mut(&descriptor.key) {
                if attachment.state() == crate::terminal::AttachmentState::Unattached {
                    attachment.attach((self.surfaces)(descriptor));
                }
                attachment.set_visible(descriptor.visible);
                continue;
            }

            info!(session = %descriptor.key, "Mounting attachment");
            let close_tx = self.close_tx.clone();
            let key = descriptor.key.clone();
            let mut attachment = TerminalAttachment::new(
                descriptor,
                self.options.clone(),
                self.connector.clone(),
                self.resize_sink.clone(),
            )
            .with_on_close(Arc::new(move |reason| {
                let _ = close_tx.send((key.clone(), reason));
            }));

            attachment.attach((self.surfaces)(descriptor));
            self.attachments.insert(descriptor.key.clone(), attachment);
        }
    }

    /// Unmount: no further deletion callbacks, every attachment torn down
    pub fn close(&mut self) {
        self.registry.close();
        for (_, mut attachment) in self.attachments.drain() {
            attachment.close();
        }
    }
}

impl<S: TerminalSurface> Drop for SessionView<S> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Whether a deleted session is the one the highlight points at
fn points_at(highlighted: &SessionKey, deleted: &SessionKey) -> bool {
    match (highlighted, deleted) {
        (SessionKey::Merged { .. }, SessionKey::Merged { .. }) => true,
        (SessionKey::Singleton { .. }, SessionKey::Singleton { .. }) => {
            highlighted.target() == deleted.target()
        }
        _ => false,
    }
}
