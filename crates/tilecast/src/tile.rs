//! Frame partitioning into disjoint, jointly exhaustive pixel tiles.

/// Axis-aligned half-open pixel rectangle `[u0,u1) × [v0,v1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub u0: u32,
    pub v0: u32,
    pub u1: u32,
    pub v1: u32,
}

impl Tile {
    #[inline]
    pub fn width(&self) -> u32 {
        self.u1 - self.u0
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.v1 - self.v0
    }

    #[inline]
    pub fn area(&self) -> usize {
        self.width() as usize * self.height() as usize
    }
}

/// Partitions `[0,width) × [0,height)` into square tiles of the given edge,
/// clipped at the image boundary. Zero-area tiles are never produced; an
/// empty frame yields no tiles.
pub fn cover(width: u32, height: u32, edge: u32) -> Vec<Tile> {
    debug_assert!(edge > 0);
    let edge = edge.max(1);
    let mut tiles = Vec::new();
    let mut v0 = 0;
    while v0 < height {
        let v1 = (v0 + edge).min(height);
        let mut u0 = 0;
        while u0 < width {
            let u1 = (u0 + edge).min(width);
            tiles.push(Tile { u0, v0, u1, v1 });
            u0 = u1;
        }
        v0 = v1;
    }
    tiles
}
