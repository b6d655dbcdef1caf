//! The transport seam the upload ring drives, plus a CPU-only presenter
//! for headless runs and tests.

use crate::fence::Fence;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;

/// Bytes per RGBA-f32 pixel moving through a presenter.
pub const PIXEL_BYTES: usize = 16;

/// Ring and presenter failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PresentError {
    #[error("upload ring needs at least 2 slots, got {given}")]
    RingTooSmall { given: usize },
    #[error("slot {slot} still has work in flight")]
    SlotBusy { slot: usize },
    #[error("slot growth to {needed} bytes refused (limit {limit} bytes)")]
    GrowRefused { needed: usize, limit: usize },
    #[error("frame byte length {got} does not match dimensions ({expected} bytes)")]
    SizeMismatch { expected: usize, got: usize },
}

/// Byte transport between staged CPU frames and the display destination.
///
/// The ring owns the cursor/fence bookkeeping; a presenter owns the actual
/// storage. `Slot` is the GPU-bound store behind one ring slot, `Target`
/// the destination texture handed to the compositor.
///
/// Call ordering contract: the ring invokes `watch` immediately after the
/// `stage` or `resolve` whose completion the fence should track, and `poll`
/// before reading any fence. `poll` must never block.
pub trait Presenter {
    type Slot;
    type Target;

    /// Creates one slot with `capacity` bytes reserved.
    fn create_slot(&mut self, capacity: usize) -> Self::Slot;

    /// Copies a `width`×`height` RGBA-f32 frame into the slot, growing its
    /// allocation when needed. On error the slot keeps its previous
    /// contents and the error is recoverable.
    fn stage(
        &mut self,
        slot: &mut Self::Slot,
        bytes: &[u8],
        width: u32,
        height: u32,
    ) -> Result<(), PresentError>;

    /// Copies the staged `width`×`height` frame out of the slot into the
    /// target, reallocating the target first when its dimensions differ.
    fn resolve(
        &mut self,
        slot: &Self::Slot,
        target: &mut Self::Target,
        width: u32,
        height: u32,
    ) -> Result<(), PresentError>;

    /// Registers `fence` to be signaled once all transport work submitted
    /// so far has completed.
    fn watch(&mut self, fence: &Fence);

    /// Non-blocking completion pump.
    fn poll(&mut self);
}

/// Hands out completions for a [`MemoryPresenter`] in manual mode. Clones
/// share the queue, so a test holds one handle while the presenter sits
/// inside the ring.
#[derive(Debug, Clone, Default)]
pub struct CompletionQueue {
    pending: Arc<Mutex<VecDeque<Fence>>>,
}

impl CompletionQueue {
    fn push(&self, fence: Fence) {
        self.pending.lock().push_back(fence);
    }

    /// Signals the oldest outstanding watch. Returns false when none are
    /// outstanding.
    pub fn signal_next(&self) -> bool {
        match self.pending.lock().pop_front() {
            Some(fence) => {
                fence.signal();
                true
            }
            None => false,
        }
    }

    /// Signals every outstanding watch in submission order.
    pub fn signal_all(&self) {
        while self.signal_next() {}
    }

    /// Outstanding watch count.
    pub fn in_flight(&self) -> usize {
        self.pending.lock().len()
    }
}

/// CPU-only presenter: slots are plain byte vectors, the target is a
/// [`MemoryTexture`]. In auto mode every watch signals on the next `poll`
/// (uploads "complete" instantly); in manual mode completions are driven
/// through the [`CompletionQueue`] returned by [`MemoryPresenter::manual`].
#[derive(Debug, Default)]
pub struct MemoryPresenter {
    completions: CompletionQueue,
    auto_complete: bool,
    grow_limit: Option<usize>,
}

/// Byte store behind one in-memory ring slot.
#[derive(Debug, Default)]
pub struct MemorySlot {
    bytes: Vec<u8>,
}

impl MemorySlot {
    #[inline]
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }
}

/// In-memory stand-in for the display texture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryTexture {
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

impl MemoryPresenter {
    /// Presenter whose watches signal on the next poll.
    pub fn auto() -> Self {
        Self {
            auto_complete: true,
            ..Self::default()
        }
    }

    /// Presenter whose watches signal only when the returned queue handle
    /// is driven.
    pub fn manual() -> (Self, CompletionQueue) {
        let presenter = Self::default();
        let completions = presenter.completions.clone();
        (presenter, completions)
    }

    /// Caps slot growth; staging beyond `limit` bytes fails with
    /// [`PresentError::GrowRefused`].
    pub fn with_grow_limit(mut self, limit: usize) -> Self {
        self.grow_limit = Some(limit);
        self
    }
}

impl Presenter for MemoryPresenter {
    type Slot = MemorySlot;
    type Target = MemoryTexture;

    fn create_slot(&mut self, capacity: usize) -> MemorySlot {
        MemorySlot {
            bytes: vec![0; capacity],
        }
    }

    fn stage(
        &mut self,
        slot: &mut MemorySlot,
        bytes: &[u8],
        _width: u32,
        _height: u32,
    ) -> Result<(), PresentError> {
        if bytes.len() > slot.bytes.len() {
            if let Some(limit) = self.grow_limit {
                if bytes.len() > limit {
                    return Err(PresentError::GrowRefused {
                        needed: bytes.len(),
                        limit,
                    });
                }
            }
            slot.bytes.resize(bytes.len(), 0);
        }
        slot.bytes[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    fn resolve(
        &mut self,
        slot: &MemorySlot,
        target: &mut MemoryTexture,
        width: u32,
        height: u32,
    ) -> Result<(), PresentError> {
        let needed = width as usize * height as usize * PIXEL_BYTES;
        debug_assert!(slot.bytes.len() >= needed);
        if target.width != width || target.height != height {
            target.width = width;
            target.height = height;
            target.bytes = vec![0; needed];
        }
        target.bytes.copy_from_slice(&slot.bytes[..needed]);
        Ok(())
    }

    fn watch(&mut self, fence: &Fence) {
        self.completions.push(fence.clone());
    }

    fn poll(&mut self) {
        if self.auto_complete {
            self.completions.signal_all();
        }
    }
}
