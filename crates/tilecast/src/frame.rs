//! CPU frame storage shared between the tile scheduler and the upload ring.

/// Dense row-major RGBA-f32 pixel buffer. The pixel vector length is always
/// exactly `width · height · 4`; resizing happens synchronously between
/// frames, never while tiles are in flight.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    pixels: Vec<f32>,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let mut frame = Self::default();
        frame.resize(width, height);
        frame
    }

    /// Resizes to the given dimensions, zero-filling the contents. A resize
    /// to the current dimensions leaves the pixels untouched.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.width == width && self.height == height {
            return;
        }
        self.width = width;
        self.height = height;
        let len = width as usize * height as usize * 4;
        self.pixels.clear();
        self.pixels.resize(len, 0.0);
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// True when either dimension is zero (nothing to render or upload).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn pixels(&self) -> &[f32] {
        &self.pixels
    }

    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [f32] {
        &mut self.pixels
    }

    /// The pixel storage viewed as raw little-endian bytes for upload.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }
}
