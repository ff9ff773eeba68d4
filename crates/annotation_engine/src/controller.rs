//! Interaction Controller - turns pointer input into annotation intents
//!
//! The pending selection lives in each [`ContainerSession`], so one
//! controller can serve any number of containers.

use crate::offset_map::global_offset;
use crate::{
    annotation_at, compute_anchor, AnchorPoint, ContainerSession, Descriptor, GlossaryCapture, Rect,
    TextPoint,
};
use content_tree::{AnnotationId, AnnotationStyle, ContentTree, NodeId};

/// A selection waiting for the user to pick an action
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSelection {
    /// Global offsets, `start < end`
    pub start: usize,
    pub end: usize,
    pub text: String,
    /// Where to show the action menu; None when the host sent no geometry
    pub anchor: Option<AnchorPoint>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum SelectionState {
    #[default]
    Idle,
    MenuOpen(PendingSelection),
}

impl SelectionState {
    pub fn pending(&self) -> Option<&PendingSelection> {
        match self {
            SelectionState::Idle => None,
            SelectionState::MenuOpen(pending) => Some(pending),
        }
    }
}

/// A completed selection reported by the host
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionEvent {
    /// Where the selection started; may come after `focus`
    pub anchor: TextPoint,
    pub focus: TextPoint,
    /// Client rects of the selected text, one per line fragment
    pub rects: Vec<Rect>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissReason {
    ClickElsewhere,
    Resize,
    Escape,
}

/// Callbacks into the host UI. Every method defaults to doing nothing.
pub trait InteractionHooks {
    fn on_selection_ready(&mut self, _selection: &PendingSelection) {}

    fn on_applied(&mut self, _descriptor: &Descriptor) {}

    fn on_removed(&mut self, _id: AnnotationId) {}

    fn on_dismissed(&mut self, _reason: DismissReason) {}

    fn on_glossary_capture(&mut self, _capture: &GlossaryCapture) {}
}

/// Hooks that ignore every event
#[derive(Debug, Default)]
pub struct NoHooks;

impl InteractionHooks for NoHooks {}

/// Drives container sessions from selection events and menu choices
#[derive(Debug, Default)]
pub struct Controller<H: InteractionHooks> {
    hooks: H,
}

impl<H: InteractionHooks> Controller<H> {
    pub fn new(hooks: H) -> Self {
        Self { hooks }
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    /// Handle a finished selection. Returns true if the menu opened.
    ///
    /// Selections outside the container or shorter than the configured
    /// minimum are ignored and leave the state as it was.
    pub fn select<T: ContentTree>(&mut self, session: &mut ContainerSession<T>, event: &SelectionEvent) -> bool {
        let tree = session.tree();
        let root = session.root();
        let (Some(a), Some(b)) = (
            global_offset(tree, root, event.anchor),
            global_offset(tree, root, event.focus),
        ) else {
            tracing::trace!("selection outside container ignored");
            return false;
        };
        let (start, end) = (a.min(b), a.max(b));
        let min = session.config().min_selection_chars.max(1);
        if end - start < min {
            return false;
        }

        let text: String = session.text().chars().skip(start).take(end - start).collect();
        let pending = PendingSelection {
            start,
            end,
            text,
            anchor: compute_anchor(&event.rects, &session.config().menu),
        };
        self.hooks.on_selection_ready(&pending);
        session.set_state(SelectionState::MenuOpen(pending));
        true
    }

    /// Annotate the pending selection. The menu closes whether or not the
    /// span could be annotated.
    pub fn apply<T: ContentTree>(&mut self, session: &mut ContainerSession<T>, style: AnnotationStyle) -> Option<Descriptor> {
        let pending = take_pending(session)?;
        let descriptor = session.annotate(pending.start, pending.end, style).ok()?;
        self.hooks.on_applied(&descriptor);
        Some(descriptor)
    }

    /// Save the word(s) under the pending selection to the glossary
    pub fn capture_glossary<T: ContentTree>(&mut self, session: &mut ContainerSession<T>) -> Option<GlossaryCapture> {
        let pending = take_pending(session)?;
        let capture = session.capture_word(pending.start, pending.end).ok()?;
        if let Some(descriptor) = session.descriptor(capture.annotation_id) {
            self.hooks.on_applied(descriptor);
        }
        self.hooks.on_glossary_capture(&capture);
        Some(capture)
    }

    /// Remove an annotation by id
    pub fn remove<T: ContentTree>(&mut self, session: &mut ContainerSession<T>, id: AnnotationId) -> bool {
        session.set_state(SelectionState::Idle);
        let removed = session.unannotate(id);
        if removed {
            self.hooks.on_removed(id);
        }
        removed
    }

    /// Remove the annotation the user clicked on, if any
    pub fn remove_at<T: ContentTree>(&mut self, session: &mut ContainerSession<T>, target: NodeId) -> bool {
        match annotation_at(session.tree(), session.root(), target) {
            Some(marker) => self.remove(session, marker.annotation_id),
            None => false,
        }
    }

    pub fn restyle<T: ContentTree>(
        &mut self,
        session: &mut ContainerSession<T>,
        id: AnnotationId,
        style: AnnotationStyle,
    ) -> bool {
        session.set_state(SelectionState::Idle);
        session.restyle(id, style)
    }

    /// Close the menu without annotating anything
    pub fn dismiss<T: ContentTree>(&mut self, session: &mut ContainerSession<T>, reason: DismissReason) {
        if take_pending(session).is_some() {
            self.hooks.on_dismissed(reason);
        }
    }
}

fn take_pending<T: ContentTree>(session: &mut ContainerSession<T>) -> Option<PendingSelection> {
    match session.take_state() {
        SelectionState::MenuOpen(pending) => Some(pending),
        SelectionState::Idle => None,
    }
}
