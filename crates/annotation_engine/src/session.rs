//! Container session - one tracked container, its descriptors and its
//! pending selection
//!
//! Persistence is best effort: gateway failures are logged and the
//! in-memory state stays authoritative for the rest of the session.

use crate::offset_map::{block_range, flatten, text_between, total_len};
use crate::{
    capture, markers_of, restore_all, snap_to_word, AnnotationMeta, ContainerKey, Descriptor,
    EngineConfig, GlossaryCapture, PersistenceGateway, Rejection, RestoreReport, SelectionState,
};
use content_tree::{AnnotationId, AnnotationStyle, ContentTree, NodeId};
use std::sync::Arc;

/// A container whose annotations are being tracked
pub struct ContainerSession<T: ContentTree> {
    key: ContainerKey,
    tree: T,
    root: NodeId,
    gateway: Arc<dyn PersistenceGateway>,
    config: EngineConfig,
    descriptors: Vec<Descriptor>,
    state: SelectionState,
    active: bool,
}

impl<T: ContentTree> ContainerSession<T> {
    /// Track the container rooted at `root`. Nothing is loaded until
    /// [`ContainerSession::activate`] is called.
    pub fn new(
        key: ContainerKey,
        tree: T,
        root: NodeId,
        gateway: Arc<dyn PersistenceGateway>,
        config: EngineConfig,
    ) -> Self {
        Self {
            key,
            tree,
            root,
            gateway,
            config,
            descriptors: Vec::new(),
            state: SelectionState::Idle,
            active: false,
        }
    }

    /// Load saved descriptors and restore each onto the tree.
    ///
    /// Runs once; later calls return an empty report. Descriptors that
    /// cannot be restored stay in the list. Every operation that changes the
    /// saved list activates the session first if the host has not.
    pub fn activate(&mut self) -> RestoreReport {
        if self.active {
            return RestoreReport::default();
        }
        self.active = true;

        self.descriptors = match self.gateway.load(&self.key) {
            Ok(descriptors) => descriptors,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "failed to load annotations");
                Vec::new()
            }
        };

        let report = restore_all(&mut self.tree, self.root, &self.descriptors, &self.config.apply_options());
        tracing::debug!(
            key = %self.key,
            restored = report.applied.len(),
            skipped = report.skipped.len(),
            "container activated"
        );
        report
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn key(&self) -> &ContainerKey {
        &self.key
    }

    pub fn tree(&self) -> &T {
        &self.tree
    }

    /// Mutable access for the host's own edits. Descriptors are not
    /// updated to follow them.
    pub fn tree_mut(&mut self) -> &mut T {
        &mut self.tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    pub fn descriptor(&self, id: AnnotationId) -> Option<&Descriptor> {
        self.descriptors.iter().find(|d| d.id == id)
    }

    /// Whether an annotation currently has markers in the tree
    pub fn is_applied(&self, id: AnnotationId) -> bool {
        !markers_of(&self.tree, self.root, id).is_empty()
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub(crate) fn set_state(&mut self, state: SelectionState) {
        self.state = state;
    }

    /// Take the current state, leaving the session idle
    pub(crate) fn take_state(&mut self) -> SelectionState {
        std::mem::take(&mut self.state)
    }

    /// Flattened text of the container
    pub fn text(&self) -> String {
        flatten(&self.tree, self.root)
    }

    /// Annotate `start..end` with `style`, record it and save.
    pub fn annotate(&mut self, start: usize, end: usize, style: AnnotationStyle) -> Result<Descriptor, Rejection> {
        self.annotate_with(start, end, AnnotationMeta::new(style))
    }

    fn annotate_with(&mut self, start: usize, end: usize, meta: AnnotationMeta) -> Result<Descriptor, Rejection> {
        self.ensure_active();
        let Some(descriptor) = capture(&self.tree, self.root, start, end, meta, &self.key) else {
            let rejection = if end <= start {
                Rejection::EmptyRange { start, end }
            } else {
                Rejection::OutOfBounds {
                    end,
                    len: total_len(&self.tree, self.root),
                }
            };
            tracing::debug!(%start, %end, %rejection, "selection not annotated");
            return Err(rejection);
        };

        crate::apply(&mut self.tree, self.root, start, end, meta, &self.config.apply_options())?;

        self.descriptors.push(descriptor.clone());
        self.persist();
        Ok(descriptor)
    }

    /// Capture the word(s) under `start..end` into the glossary
    ///
    /// Snapping stays inside the block holding `start`, so a word is never
    /// joined to the first word of the next paragraph.
    pub fn capture_word(&mut self, start: usize, end: usize) -> Result<GlossaryCapture, Rejection> {
        let (start, end) = if self.config.snap_glossary_to_words {
            self.snap_within_block(start, end)?
        } else {
            (start, end)
        };

        let descriptor = self.annotate_with(start, end, AnnotationMeta::new(AnnotationStyle::Glossary))?;
        Ok(GlossaryCapture {
            annotation_id: descriptor.id,
            container_key: self.key.clone(),
            word: descriptor.verification_text,
            start,
            end,
        })
    }

    /// Remove an annotation from the tree and from the saved list.
    ///
    /// Returns false if the annotation was neither applied nor recorded.
    pub fn unannotate(&mut self, id: AnnotationId) -> bool {
        self.ensure_active();
        let removed = match crate::remove(&mut self.tree, self.root, id) {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(%id, error = %e, "failed to unwrap annotation markers");
                0
            }
        };
        let before = self.descriptors.len();
        self.descriptors.retain(|d| d.id != id);
        let forgotten = before != self.descriptors.len();

        if forgotten {
            self.persist();
        }
        removed > 0 || forgotten
    }

    /// Change the style of an annotation. Returns false if it is unknown.
    pub fn restyle(&mut self, id: AnnotationId, style: AnnotationStyle) -> bool {
        self.ensure_active();
        let updated = match crate::restyle(&mut self.tree, self.root, id, style) {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(%id, error = %e, "failed to restyle annotation markers");
                0
            }
        };
        let mut recorded = false;
        for descriptor in self.descriptors.iter_mut().filter(|d| d.id == id) {
            descriptor.style = style;
            recorded = true;
        }

        if recorded {
            self.persist();
        }
        updated > 0 || recorded
    }

    /// Drop every saved descriptor for this container. Markers already in
    /// the tree are left alone.
    pub fn reset(&mut self) {
        self.descriptors.clear();
        if let Err(e) = self.gateway.discard(&self.key) {
            tracing::warn!(key = %self.key, error = %e, "failed to discard annotations");
        }
    }

    /// Take the tree back, ending the session
    pub fn into_tree(self) -> T {
        self.tree
    }

    fn ensure_active(&mut self) {
        if !self.active {
            tracing::debug!(key = %self.key, "activating container before first change");
            self.activate();
        }
    }

    fn snap_within_block(&self, start: usize, end: usize) -> Result<(usize, usize), Rejection> {
        let Some((block_start, block_end)) = block_range(&self.tree, self.root, start) else {
            let len = total_len(&self.tree, self.root);
            return Err(if len == 0 {
                Rejection::NoText
            } else {
                Rejection::OutOfBounds { end, len }
            });
        };
        let text = text_between(&self.tree, self.root, block_start, block_end).ok_or(Rejection::NoText)?;
        let from = start.max(block_start) - block_start;
        let to = end.min(block_end).max(start) - block_start;
        let (from, to) = snap_to_word(&text, from, to).ok_or(Rejection::NoText)?;
        Ok((block_start + from, block_start + to))
    }

    fn persist(&self) {
        if let Err(e) = self.gateway.save(&self.key, &self.descriptors) {
            tracing::warn!(key = %self.key, error = %e, "failed to save annotations");
        }
    }
}
