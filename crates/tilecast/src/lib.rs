//! Tile-parallel LOD raymarch core.
//!
//! Per frame: a camera provider's 8 frustum corners become a
//! [`CameraMapping`] (near "source" and far "target" quads) via a
//! process-lifetime [`CornerTable`]; [`ray_cone_scale2`] derives the LOD
//! cone contract for the external traversal primitive; [`TileScheduler`]
//! partitions the frame into disjoint tiles and marches every pixel on a
//! worker pool into the [`FrameBuffer`]. The voxel scene and the pixel
//! visualization are pluggable seams ([`VoxelMarcher`], [`PixelShader`]).

pub mod camera;
pub mod frame;
pub mod lod;
pub mod mapping;
pub mod march;
pub mod scheduler;
pub mod tile;

pub use camera::Frustum;
pub use frame::FrameBuffer;
pub use lod::ray_cone_scale2;
pub use mapping::{CameraMapping, CornerTable, MappingError, Quad, Ray};
pub use march::{IterationHeat, MarchSample, NormalShade, PixelShader, VoxelMarcher};
pub use scheduler::{SchedulerConfig, TileScheduler, DEFAULT_TILE_EDGE};
pub use tile::Tile;
