//! World mutations requested during a frame, applied just before the
//! physics step so they never interleave with a step in progress.

use glam::Vec2;

use crate::api::types::BodyId;

/// A pending world mutation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeferredAction {
    /// Gravity in physics units.
    SetGravity(Vec2),
    /// Force in physics units, applied for one step.
    ApplyForce { body: BodyId, force: Vec2 },
    /// Position in pixels.
    SetPosition { body: BodyId, position: Vec2 },
}

/// FIFO of pending mutations.
#[derive(Debug, Default)]
pub struct DeferredQueue {
    actions: Vec<DeferredAction>,
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: DeferredAction) {
        self.actions.push(action);
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Hand every queued action to `apply` in insertion order.
    /// The queue is empty afterwards, even if `apply` panics.
    pub fn flush(&mut self, mut apply: impl FnMut(DeferredAction)) {
        for action in self.actions.drain(..) {
            apply(action);
        }
    }

    /// Drop pending actions without applying them.
    pub fn clear(&mut self) {
        self.actions.clear();
    }
}
