//! wgpu-backed presenter and headless device setup.

use std::borrow::Cow;

use anyhow::{anyhow, Result};

use crate::fence::Fence;
use crate::present::{PresentError, Presenter, PIXEL_BYTES};

/// Holds the GPU device and queue for headless frame uploads.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Creates a context without a window, blocking on adapter selection.
    pub fn headless() -> Result<Self> {
        pollster::block_on(Self::request())
    }

    /// Requests a high-performance adapter and a device with default limits.
    pub async fn request() -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow!("Failed to find a suitable GPU adapter."))?;
        log::info!("adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Device"),
                    required_features: wgpu::Features::empty(),
                    // Use default limits for broad compatibility.
                    required_limits: wgpu::Limits::default(),
                },
                None, // no trace
            )
            .await?;

        Ok(Self { device, queue })
    }
}

/// Ring slot backed by a GPU staging buffer.
pub struct GpuSlot {
    buffer: wgpu::Buffer,
}

impl GpuSlot {
    /// Current buffer capacity in bytes.
    #[inline]
    pub fn capacity(&self) -> u64 {
        self.buffer.size()
    }
}

/// Presents frames by staging them into GPU buffers and copying into an
/// `Rgba32Float` texture. Completion is reported through queue callbacks,
/// so fences watched here signal once the copy has actually finished on
/// the device timeline.
pub struct WgpuPresenter {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl WgpuPresenter {
    pub fn new(context: GpuContext) -> Self {
        Self {
            device: context.device,
            queue: context.queue,
        }
    }

    #[inline]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[inline]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Creates a color texture sized for one frame.
    pub fn create_target(&self, width: u32, height: u32) -> wgpu::Texture {
        self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Frame Color Target"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba32Float,
            usage: wgpu::TextureUsages::COPY_DST | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        })
    }

    fn create_buffer(&self, capacity: u64) -> wgpu::Buffer {
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Upload Buffer"),
            size: capacity,
            usage: wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }
}

/// Row stride after padding to the copy alignment, in bytes.
fn aligned_stride(width: u32) -> u32 {
    wgpu::util::align_to(
        width * PIXEL_BYTES as u32,
        wgpu::COPY_BYTES_PER_ROW_ALIGNMENT,
    )
}

/// Re-lays rows so each starts on a copy-aligned offset, as
/// `copy_buffer_to_texture` requires. Borrows when the natural stride is
/// already aligned.
fn padded_rows(bytes: &[u8], width: u32, height: u32) -> Cow<'_, [u8]> {
    let row = width as usize * PIXEL_BYTES;
    let stride = aligned_stride(width) as usize;
    if stride == row {
        return Cow::Borrowed(bytes);
    }
    let mut padded = vec![0u8; stride * height as usize];
    for (src, dst) in bytes
        .chunks_exact(row)
        .zip(padded.chunks_exact_mut(stride))
    {
        dst[..row].copy_from_slice(src);
    }
    Cow::Owned(padded)
}

impl Presenter for WgpuPresenter {
    type Slot = GpuSlot;
    type Target = wgpu::Texture;

    fn create_slot(&mut self, capacity: usize) -> GpuSlot {
        GpuSlot {
            buffer: self.create_buffer(capacity as u64),
        }
    }

    fn stage(
        &mut self,
        slot: &mut GpuSlot,
        bytes: &[u8],
        width: u32,
        height: u32,
    ) -> Result<(), PresentError> {
        let padded = padded_rows(bytes, width, height);
        let needed = padded.len() as u64;
        if slot.buffer.size() < needed {
            log::debug!("slot buffer grows {} -> {} B", slot.buffer.size(), needed);
            slot.buffer = self.create_buffer(needed);
        }
        self.queue.write_buffer(&slot.buffer, 0, &padded);
        // Flush the staged write so completion callbacks can attach to it.
        self.queue.submit(std::iter::empty());
        Ok(())
    }

    fn resolve(
        &mut self,
        slot: &GpuSlot,
        target: &mut wgpu::Texture,
        width: u32,
        height: u32,
    ) -> Result<(), PresentError> {
        debug_assert!(slot.buffer.size() >= aligned_stride(width) as u64 * height as u64);
        if target.width() != width || target.height() != height {
            log::debug!(
                "target reallocated {}x{} -> {}x{}",
                target.width(),
                target.height(),
                width,
                height
            );
            *target = self.create_target(width, height);
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Copy Encoder"),
            });
        encoder.copy_buffer_to_texture(
            wgpu::ImageCopyBuffer {
                buffer: &slot.buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(aligned_stride(width)),
                    rows_per_image: Some(height),
                },
            },
            wgpu::ImageCopyTexture {
                texture: &*target,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    fn watch(&mut self, fence: &Fence) {
        let fence = fence.clone();
        self.queue.on_submitted_work_done(move || fence.signal());
    }

    fn poll(&mut self) {
        let _ = self.device.poll(wgpu::Maintain::Poll);
    }
}
