//! Per-frame orchestration: map the reconstructed frustum, render tiles,
//! feed the upload ring, and put the newest finished frame on screen.

use glam::Vec3;
use tilecast::{
    ray_cone_scale2, CameraMapping, CornerTable, FrameBuffer, PixelShader, TileScheduler,
    VoxelMarcher,
};

use crate::present::Presenter;
use crate::ring::UploadRing;
use crate::timing::FrameClock;

/// Consumes the displayed texture each frame, e.g. by drawing it to a
/// swapchain or encoding it to disk.
pub trait Compositor<T> {
    fn present(&mut self, texture: &T, width: u32, height: u32);
}

/// What one `run_frame` call did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    /// Pixels whose ray reached a surface.
    pub hit_pixels: usize,
    /// Whether the finished frame entered the ring.
    pub uploaded: bool,
    /// Whether a newer frame reached the display this call.
    pub presented: bool,
    /// Moving-average frame rate (Hz).
    pub fps: f32,
}

/// Drives the whole pipeline once per frame.
///
/// The CPU side renders and uploads at its own cadence; the display side
/// advances only when a previously uploaded frame has finished its GPU
/// copy. Neither side ever blocks on the other, so a slow upload shows up
/// as a repeated frame rather than a stall.
pub struct FrameDriver<P: Presenter> {
    table: CornerTable,
    scheduler: TileScheduler,
    ring: UploadRing<P>,
    frame: FrameBuffer,
    clock: FrameClock,
}

impl<P: Presenter> FrameDriver<P> {
    pub fn new(table: CornerTable, scheduler: TileScheduler, ring: UploadRing<P>) -> Self {
        Self {
            table,
            scheduler,
            ring,
            frame: FrameBuffer::default(),
            clock: FrameClock::default(),
        }
    }

    #[inline]
    pub fn ring(&self) -> &UploadRing<P> {
        &self.ring
    }

    #[inline]
    pub fn ring_mut(&mut self) -> &mut UploadRing<P> {
        &mut self.ring
    }

    /// Last frame rendered on the CPU side.
    #[inline]
    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    /// Renders one frame from the eight observed frustum corners and moves
    /// frames through the ring.
    ///
    /// - Renders `width`×`height` pixels through the tile scheduler.
    /// - Uploads the result when the next ring slot is free; a busy ring
    ///   drops the frame (the CPU keeps rendering at full rate).
    /// - Displays the newest signaled slot into `target`, then hands the
    ///   target to `compositor` as long as any frame is on display.
    ///
    /// A zero-area frame skips rendering and uploading but still lets the
    /// display side finish in-flight work.
    pub fn run_frame(
        &mut self,
        corners: &[Vec3; 8],
        width: u32,
        height: u32,
        scene: &dyn VoxelMarcher,
        shader: &dyn PixelShader,
        target: &mut P::Target,
        compositor: &mut dyn Compositor<P::Target>,
    ) -> FrameReport {
        let mut report = FrameReport {
            hit_pixels: 0,
            uploaded: false,
            presented: false,
            fps: 0.0,
        };

        // 1. Reconstruct the camera mapping from the observed corners.
        let mapping = CameraMapping::from_corners(corners, &self.table);

        // 2. Render into the CPU-side frame.
        self.frame.resize(width, height);
        if !self.frame.is_empty() {
            let cone_scale2 = ray_cone_scale2(&mapping, width);
            report.hit_pixels =
                self.scheduler
                    .render(&mut self.frame, &mapping, cone_scale2, scene, shader);

            // 3. Feed the ring when the next slot is free to overwrite.
            if self.ring.can_upload() {
                match self.ring.upload(self.frame.as_bytes(), width, height) {
                    Ok(()) => report.uploaded = true,
                    Err(err) => log::warn!("upload abandoned: {}", err),
                }
            } else {
                log::trace!("upload skipped: ring busy");
            }
        }

        // 4. Move the newest finished frame onto the display.
        match self.ring.display(target) {
            Ok(true) => report.presented = true,
            Ok(false) => {}
            Err(err) => log::warn!("display failed: {}", err),
        }
        if let Some((shown_w, shown_h)) = self.ring.displayed_dims() {
            compositor.present(target, shown_w, shown_h);
        }

        report.fps = self.clock.tick();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::present::{MemoryPresenter, MemoryTexture};
    use glam::Vec3;
    use tilecast::{Frustum, IterationHeat, MarchSample, SchedulerConfig};

    /// Analytic sphere scene.
    struct Orb {
        center: Vec3,
        radius: f32,
    }

    impl VoxelMarcher for Orb {
        fn march(&self, origin: Vec3, direction: Vec3, _cone_scale2: f32) -> MarchSample {
            let dir = direction.normalize();
            let oc = origin - self.center;
            let b = oc.dot(dir);
            let c = oc.length_squared() - self.radius * self.radius;
            let disc = b * b - c;
            if disc < 0.0 {
                return MarchSample::miss(4);
            }
            let t = -b - disc.sqrt();
            if t < 0.0 {
                return MarchSample::miss(6);
            }
            MarchSample {
                hit: true,
                normal: ((origin + dir * t) - self.center) / self.radius,
                distance: t,
                levels: 5,
                iterations: 20,
            }
        }
    }

    #[derive(Default)]
    struct RecordingCompositor {
        frames: Vec<(u32, u32)>,
    }

    impl Compositor<MemoryTexture> for RecordingCompositor {
        fn present(&mut self, texture: &MemoryTexture, width: u32, height: u32) {
            assert_eq!((texture.width, texture.height), (width, height));
            self.frames.push((width, height));
        }
    }

    fn corners() -> [Vec3; 8] {
        Frustum::new(Vec3::ZERO, Vec3::Z, Vec3::Y, 0.1, 100.0, 1.0, 1.0).corner_points()
    }

    fn make_driver(presenter: MemoryPresenter) -> FrameDriver<MemoryPresenter> {
        let table = CornerTable::canonical().unwrap();
        let scheduler = TileScheduler::new(SchedulerConfig {
            worker_threads: 2,
            tile_edge: 256,
        })
        .unwrap();
        let ring = UploadRing::with_capacity(presenter, 3, 0).unwrap();
        FrameDriver::new(table, scheduler, ring)
    }

    #[test]
    fn test_display_lags_uploads_until_fences_signal() {
        let _ = env_logger::builder().is_test(true).try_init();
        let (presenter, completions) = MemoryPresenter::manual();
        let mut driver = make_driver(presenter);
        let corners = corners();
        let scene = Orb {
            center: Vec3::new(0.0, 0.0, 60.0),
            radius: 15.0,
        };
        let mut target = MemoryTexture::default();
        let mut compositor = RecordingCompositor::default();

        // Two frames upload while their copies are still in flight.
        for expected_upload in [1, 2] {
            let report = driver.run_frame(
                &corners,
                256,
                256,
                &scene,
                &IterationHeat,
                &mut target,
                &mut compositor,
            );
            assert!(report.uploaded);
            assert!(!report.presented);
            assert!(report.hit_pixels > 0);
            assert_eq!(driver.ring().upload_index(), expected_upload);
        }
        assert!(compositor.frames.is_empty());

        // Once the copies complete, the next frame shows the newest one.
        completions.signal_all();
        let report = driver.run_frame(
            &corners,
            256,
            256,
            &scene,
            &IterationHeat,
            &mut target,
            &mut compositor,
        );
        assert!(report.uploaded);
        assert!(report.presented);
        assert_eq!(driver.ring().upload_index(), 0);
        assert_eq!(driver.ring().render_index(), 2);
        assert_eq!((target.width, target.height), (256, 256));
        assert_eq!(target.bytes, driver.frame().as_bytes());
        assert_eq!(compositor.frames, vec![(256, 256)]);
    }

    #[test]
    fn test_immediate_completion_presents_every_frame() {
        let mut driver = make_driver(MemoryPresenter::auto());
        let corners = corners();
        let scene = Orb {
            center: Vec3::new(0.0, 0.0, 60.0),
            radius: 15.0,
        };
        let mut target = MemoryTexture::default();
        let mut compositor = RecordingCompositor::default();

        for _ in 0..3 {
            let report = driver.run_frame(
                &corners,
                32,
                32,
                &scene,
                &IterationHeat,
                &mut target,
                &mut compositor,
            );
            assert!(report.uploaded);
            assert!(report.presented);
            assert_eq!(driver.ring().render_index(), driver.ring().upload_index());
        }
        assert_eq!(compositor.frames, vec![(32, 32); 3]);

        // The displayed texture carries shaded pixels: the center ray hits
        // the sphere, so its red channel holds the hit iteration count.
        let pixels: &[f32] = bytemuck::cast_slice(&target.bytes);
        let center = ((16 * 32 + 16) * 4) as usize;
        assert!((pixels[center] - 20.0 / 30.0).abs() < 1e-6);
        assert!((pixels[center + 3] - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_zero_area_frame_renders_nothing() {
        let mut driver = make_driver(MemoryPresenter::auto());
        let corners = corners();
        let scene = Orb {
            center: Vec3::ZERO,
            radius: 1.0,
        };
        let mut target = MemoryTexture::default();
        let mut compositor = RecordingCompositor::default();

        let report = driver.run_frame(
            &corners,
            0,
            128,
            &scene,
            &IterationHeat,
            &mut target,
            &mut compositor,
        );
        assert_eq!(report.hit_pixels, 0);
        assert!(!report.uploaded);
        assert!(!report.presented);
        assert!(compositor.frames.is_empty());

        // A real frame afterwards flows through normally.
        let report = driver.run_frame(
            &corners,
            16,
            16,
            &scene,
            &IterationHeat,
            &mut target,
            &mut compositor,
        );
        assert!(report.uploaded);
        assert!(report.presented);
        assert_eq!(compositor.frames, vec![(16, 16)]);
    }
}
