//! Fork-join tile scheduler: one task per tile on a persistent worker pool.

use crate::frame::FrameBuffer;
use crate::mapping::CameraMapping;
use crate::march::{PixelShader, VoxelMarcher};
use crate::tile::{self, Tile};
use rayon::prelude::*;
use std::time::Instant;

/// Default square tile edge in pixels.
pub const DEFAULT_TILE_EDGE: u32 = 256;

/// Worker-pool and partitioning parameters.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Worker thread count; 0 picks rayon's default for the machine.
    pub worker_threads: usize,
    /// Square tile edge in pixels.
    pub tile_edge: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            tile_edge: DEFAULT_TILE_EDGE,
        }
    }
}

/// Renders frames as independent tile tasks over a bounded worker pool.
/// The pool persists across frames; each `render` call is a fork-join.
pub struct TileScheduler {
    pool: rayon::ThreadPool,
    tile_edge: u32,
}

impl TileScheduler {
    pub fn new(config: SchedulerConfig) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .build()?;
        Ok(Self {
            pool,
            tile_edge: config.tile_edge.max(1),
        })
    }

    #[inline]
    pub fn tile_edge(&self) -> u32 {
        self.tile_edge
    }

    /// Renders one frame into `frame`, which must already hold the target
    /// dimensions (the `width · height · 4` length invariant comes from
    /// [`FrameBuffer`] itself). Blocks until every tile task has completed;
    /// returns the aggregate hit-pixel count.
    ///
    /// Each task renders into a tile-local buffer; the disjoint rectangles
    /// are blitted into the frame after the join, so tasks never share
    /// mutable pixels. The output is independent of tile edge and worker
    /// count.
    pub fn render(
        &self,
        frame: &mut FrameBuffer,
        mapping: &CameraMapping,
        cone_scale2: f32,
        scene: &dyn VoxelMarcher,
        shader: &dyn PixelShader,
    ) -> usize {
        if frame.is_empty() {
            return 0;
        }
        let started = Instant::now();
        let (width, height) = (frame.width(), frame.height());
        let tiles = tile::cover(width, height, self.tile_edge);

        let rendered: Vec<(Tile, Vec<f32>, usize)> = self.pool.install(|| {
            tiles
                .par_iter()
                .map(|&t| {
                    let (pixels, hits) =
                        render_tile(t, mapping, cone_scale2, width, height, scene, shader);
                    (t, pixels, hits)
                })
                .collect()
        });

        let mut hit_pixels = 0;
        let frame_stride = width as usize * 4;
        for (t, pixels, hits) in rendered {
            hit_pixels += hits;
            let tile_stride = t.width() as usize * 4;
            for row in 0..t.height() as usize {
                let src = &pixels[row * tile_stride..(row + 1) * tile_stride];
                let dst = (t.v0 as usize + row) * frame_stride + t.u0 as usize * 4;
                frame.pixels_mut()[dst..dst + tile_stride].copy_from_slice(src);
            }
        }

        log::debug!(
            "rendered {}x{}: tiles={} hit_px={} in {:.2} ms",
            width,
            height,
            tiles.len(),
            hit_pixels,
            started.elapsed().as_secs_f64() * 1e3
        );
        hit_pixels
    }
}

/// Marches every pixel of one tile into a fresh tile-local buffer.
fn render_tile(
    t: Tile,
    mapping: &CameraMapping,
    cone_scale2: f32,
    width: u32,
    height: u32,
    scene: &dyn VoxelMarcher,
    shader: &dyn PixelShader,
) -> (Vec<f32>, usize) {
    let mut pixels = Vec::with_capacity(t.area() * 4);
    let mut hits = 0;
    let inv_w = 1.0 / width as f32;
    let inv_h = 1.0 / height as f32;

    for nv in t.v0..t.v1 {
        // Pixel centers: offset half a pixel, then remap [0,1] to [-1,1].
        let nvf = (nv as f32 + 0.5) * inv_h;
        let v = nvf * 2.0 - 1.0;
        for nu in t.u0..t.u1 {
            let nuf = (nu as f32 + 0.5) * inv_w;
            let u = nuf * 2.0 - 1.0;

            let ray = mapping.uv_to_ray(u, v);
            let sample = scene.march(ray.source, ray.direction(), cone_scale2);
            if sample.hit {
                hits += 1;
            }
            pixels.extend_from_slice(&shader.shade(&sample));
        }
    }
    (pixels, hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Frustum;
    use crate::lod::ray_cone_scale2;
    use crate::mapping::CornerTable;
    use crate::march::{IterationHeat, MarchSample};
    use glam::Vec3;

    /// Analytic sphere standing in for the voxel scene.
    struct Orb {
        center: Vec3,
        radius: f32,
    }

    impl VoxelMarcher for Orb {
        fn march(&self, origin: Vec3, direction: Vec3, _cone_scale2: f32) -> MarchSample {
            let oc = origin - self.center;
            let b = oc.dot(direction);
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
                normal: (oc + direction * t) / self.radius,
                distance: t,
                levels: 5,
                iterations: 20,
            }
        }
    }

    fn view(width: u32, height: u32) -> (CameraMapping, f32) {
        let table = CornerTable::canonical().unwrap();
        let f = Frustum::new(
            Vec3::ZERO,
            Vec3::Z,
            Vec3::Y,
            0.1,
            100.0,
            1.0,
            width as f32 / height as f32,
        );
        let m = CameraMapping::from_frustum(&f, &table);
        let scale2 = ray_cone_scale2(&m, width);
        (m, scale2)
    }

    fn scene() -> Orb {
        Orb {
            center: Vec3::new(0.0, 0.0, 50.0),
            radius: 10.0,
        }
    }

    #[test]
    fn test_render_hits_match_per_pixel_recount() {
        let (width, height) = (64, 48);
        let (mapping, scale2) = view(width, height);
        let scene = scene();
        let scheduler = TileScheduler::new(SchedulerConfig {
            worker_threads: 2,
            tile_edge: 16,
        })
        .unwrap();

        let mut frame = FrameBuffer::new(width, height);
        let hits = scheduler.render(&mut frame, &mapping, scale2, &scene, &IterationHeat);

        let mut expected = 0;
        for nv in 0..height {
            for nu in 0..width {
                let u = (nu as f32 + 0.5) / width as f32 * 2.0 - 1.0;
                let v = (nv as f32 + 0.5) / height as f32 * 2.0 - 1.0;
                let ray = mapping.uv_to_ray(u, v);
                if scene.march(ray.source, ray.direction(), scale2).hit {
                    expected += 1;
                }
            }
        }
        assert!(hits > 0 && hits < (width * height) as usize);
        assert_eq!(hits, expected);
    }

    #[test]
    fn test_center_pixel_sees_the_sphere() {
        let (width, height) = (32, 32);
        let (mapping, scale2) = view(width, height);
        let scheduler = TileScheduler::new(SchedulerConfig::default()).unwrap();

        let mut frame = FrameBuffer::new(width, height);
        scheduler.render(&mut frame, &mapping, scale2, &scene(), &IterationHeat);

        // A hit pixel carries iterations=20, a miss 4 or 6; red encodes it.
        let center = ((height / 2) * width + width / 2) as usize * 4;
        assert!((frame.pixels()[center] - 20.0 / 30.0).abs() < 1e-6);
        assert!((frame.pixels()[center + 3] - 0.9).abs() < 1e-6);
        let corner = 0usize;
        assert!(frame.pixels()[corner] < 10.0 / 30.0);
    }

    #[test]
    fn test_output_independent_of_tiling_and_workers() {
        let _ = env_logger::builder().is_test(true).try_init();
        let (width, height) = (57, 41);
        let (mapping, scale2) = view(width, height);
        let scene = scene();

        let mut reference: Option<Vec<f32>> = None;
        for (threads, edge) in [(1, 256), (4, 16), (2, 7), (3, 1)] {
            let scheduler = TileScheduler::new(SchedulerConfig {
                worker_threads: threads,
                tile_edge: edge,
            })
            .unwrap();
            let mut frame = FrameBuffer::new(width, height);
            scheduler.render(&mut frame, &mapping, scale2, &scene, &IterationHeat);
            match &reference {
                None => reference = Some(frame.pixels().to_vec()),
                Some(r) => assert_eq!(
                    r.as_slice(),
                    frame.pixels(),
                    "threads={threads} edge={edge} diverged"
                ),
            }
        }
    }

    #[test]
    fn test_empty_frame_renders_nothing() {
        let (mapping, scale2) = view(8, 8);
        let scheduler = TileScheduler::new(SchedulerConfig::default()).unwrap();
        let mut frame = FrameBuffer::new(0, 0);
        let hits = scheduler.render(&mut frame, &mapping, scale2, &scene(), &IterationHeat);
        assert_eq!(hits, 0);
        assert!(frame.pixels().is_empty());
    }
}
