//! Fixed-capacity upload/display slot ring with non-blocking fences.

use crate::fence::{Fence, FenceState};
use crate::present::{PresentError, Presenter, PIXEL_BYTES};

/// Reference slot count.
pub const DEFAULT_SLOT_COUNT: usize = 3;

/// Initial per-slot reservation: one 1024×1024 RGBA-f32 frame.
pub const DEFAULT_SLOT_BYTES: usize = 1024 * 1024 * 4 * 4;

/// One ring slot: the presenter's byte store plus bookkeeping.
struct RingSlot<S> {
    store: S,
    fence: Fence,
    width: u32,
    height: u32,
    byte_len: usize,
    /// Monotonic upload stamp; 0 means never uploaded.
    sequence: u64,
}

/// Circular set of GPU-bound slots decoupling the CPU render cadence from
/// the display cadence.
///
/// Uploads walk `uploadIndex` forward one slot at a time, each guarded by
/// that slot's fence; the display walks `renderIndex` to the newest slot
/// whose fence has signaled, skipping in-flight and stale ones. All
/// operations are non-blocking; one thread drives the ring.
pub struct UploadRing<P: Presenter> {
    presenter: P,
    slots: Vec<RingSlot<P::Slot>>,
    upload_index: usize,
    render_index: usize,
    next_sequence: u64,
    /// Sequence of the frame currently on the display; 0 before any.
    shown_sequence: u64,
    /// Dimensions captured when the shown frame was displayed; the slot it
    /// came from may since have been reused by a newer upload.
    shown_width: u32,
    shown_height: u32,
}

impl<P: Presenter> UploadRing<P> {
    /// Ring with the reference capacity of 3 slots.
    pub fn new(presenter: P) -> Result<Self, PresentError> {
        Self::with_capacity(presenter, DEFAULT_SLOT_COUNT, DEFAULT_SLOT_BYTES)
    }

    /// Ring with `slots` slots (at least 2), each starting with
    /// `initial_bytes` reserved.
    pub fn with_capacity(
        mut presenter: P,
        slots: usize,
        initial_bytes: usize,
    ) -> Result<Self, PresentError> {
        if slots < 2 {
            return Err(PresentError::RingTooSmall { given: slots });
        }
        let slots = (0..slots)
            .map(|_| RingSlot {
                store: presenter.create_slot(initial_bytes),
                fence: Fence::new(),
                width: 0,
                height: 0,
                byte_len: 0,
                sequence: 0,
            })
            .collect();
        Ok(Self {
            presenter,
            slots,
            upload_index: 0,
            render_index: 1,
            next_sequence: 1,
            shown_sequence: 0,
            shown_width: 0,
            shown_height: 0,
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn upload_index(&self) -> usize {
        self.upload_index
    }

    #[inline]
    pub fn render_index(&self) -> usize {
        self.render_index
    }

    #[inline]
    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    #[inline]
    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    /// Dimensions of the frame currently on the display, once one exists.
    ///
    /// These track the displayed frame, not the slot behind `renderIndex`:
    /// that slot's metadata changes as soon as an upload wraps back onto it.
    pub fn displayed_dims(&self) -> Option<(u32, u32)> {
        if self.shown_sequence == 0 {
            return None;
        }
        Some((self.shown_width, self.shown_height))
    }

    /// True iff the slot the next upload would use is free to overwrite.
    pub fn can_upload(&mut self) -> bool {
        self.presenter.poll();
        let next = (self.upload_index + 1) % self.slots.len();
        self.slots[next].fence.state() != FenceState::Pending
    }

    /// Stages one frame into the next slot and advances `uploadIndex`.
    ///
    /// Never blocks: completion is signaled asynchronously through the
    /// slot's fence. `bytes` must hold exactly `width`×`height` RGBA-f32
    /// pixels. A mismatched byte length or a growth failure abandons the
    /// upload and leaves every cursor and slot unchanged; uploading over
    /// an in-flight slot is refused (`can_upload` gates it).
    pub fn upload(&mut self, bytes: &[u8], width: u32, height: u32) -> Result<(), PresentError> {
        let expected = width as usize * height as usize * PIXEL_BYTES;
        if bytes.len() != expected {
            return Err(PresentError::SizeMismatch {
                expected,
                got: bytes.len(),
            });
        }
        self.presenter.poll();
        let next = (self.upload_index + 1) % self.slots.len();
        let slot = &mut self.slots[next];
        if slot.fence.state() == FenceState::Pending {
            return Err(PresentError::SlotBusy { slot: next });
        }

        self.presenter.stage(&mut slot.store, bytes, width, height)?;
        if !slot.fence.try_arm() {
            return Err(PresentError::SlotBusy { slot: next });
        }
        self.presenter.watch(&slot.fence);

        slot.width = width;
        slot.height = height;
        slot.byte_len = bytes.len();
        slot.sequence = self.next_sequence;
        self.next_sequence += 1;
        self.upload_index = next;
        log::debug!(
            "upload: slot {} {}x{} ({} B) seq {}",
            next,
            width,
            height,
            bytes.len(),
            slot.sequence
        );
        Ok(())
    }

    /// Newest displayable slot, or none.
    ///
    /// A slot is displayable once its fence has signaled, it holds a
    /// non-empty frame, and that frame is newer than the one already on the
    /// display. Of the displayable slots the most recently uploaded wins,
    /// so the display only ever moves forward in upload order and skips
    /// frames the CPU has already superseded.
    pub fn find_renderable(&mut self) -> Option<usize> {
        self.presenter.poll();
        let mut best: Option<usize> = None;
        for (index, slot) in self.slots.iter().enumerate() {
            if slot.fence.state() != FenceState::Signaled
                || slot.width == 0
                || slot.height == 0
                || slot.sequence <= self.shown_sequence
            {
                continue;
            }
            if best.map_or(true, |b| slot.sequence > self.slots[b].sequence) {
                best = Some(index);
            }
        }
        best
    }

    /// Copies the newest signaled slot into `target` and advances
    /// `renderIndex` to it; reports "not ready" (false) when no such slot
    /// exists. The destination is reallocated by the presenter when its
    /// dimensions differ from the slot's. The displayed slot's fence is
    /// re-armed so the slot cannot be overwritten until the copy completes.
    pub fn display(&mut self, target: &mut P::Target) -> Result<bool, PresentError> {
        let Some(found) = self.find_renderable() else {
            log::trace!("display: not ready");
            return Ok(false);
        };

        let slot = &mut self.slots[found];
        self.presenter
            .resolve(&slot.store, target, slot.width, slot.height)?;
        if !slot.fence.try_arm() {
            return Err(PresentError::SlotBusy { slot: found });
        }
        self.presenter.watch(&slot.fence);

        self.render_index = found;
        self.shown_sequence = slot.sequence;
        self.shown_width = slot.width;
        self.shown_height = slot.height;
        log::debug!(
            "display: slot {} {}x{} seq {}",
            found,
            slot.width,
            slot.height,
            slot.sequence
        );
        Ok(true)
    }
}
