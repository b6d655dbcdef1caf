//! Fence-synchronized frame delivery on top of [`tilecast`].
//!
//! CPU-rendered frames flow through an [`UploadRing`] of GPU-bound slots:
//! uploads stage into the next slot and advance without blocking, while
//! the display picks the newest slot whose [`Fence`] has signaled. The
//! GPU seam is the [`Presenter`] trait, implemented by [`WgpuPresenter`]
//! for real devices and by [`MemoryPresenter`] for deterministic tests.
//! [`FrameDriver`] runs the whole pipeline once per frame.

pub mod driver;
pub mod fence;
pub mod gpu;
pub mod present;
pub mod ring;
pub mod timing;

pub use driver::{Compositor, FrameDriver, FrameReport};
pub use fence::{Fence, FenceState};
pub use gpu::{GpuContext, GpuSlot, WgpuPresenter};
pub use present::{
    CompletionQueue, MemoryPresenter, MemorySlot, MemoryTexture, PresentError, Presenter,
    PIXEL_BYTES,
};
pub use ring::{UploadRing, DEFAULT_SLOT_BYTES, DEFAULT_SLOT_COUNT};
pub use timing::FrameClock;
