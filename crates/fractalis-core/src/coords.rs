//! Coordinate systems for the fractal grid hierarchy.
//!
//! Grids are centered on their local origin: voxel `(0, 0, 0)` spans
//! `[-HALF, -HALF + BLOCK_SIZE)` on every axis.

use crate::constants::{BLOCK_SIZE, GRID_SCALE, GRID_SIZE, GRID_VOLUME, HALF_GRID_EXTENT};
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Linear voxel index within a grid (`x + y*N + z*N^2`).
pub type VoxelIndex = usize;

/// Position within a grid (0 to GRID_SIZE-1 per axis).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalPos {
    pub x: u8,
    pub y: u8,
    pub z: u8,
}

impl LocalPos {
    /// Create a new local position
    #[inline]
    pub const fn new(x: u8, y: u8, z: u8) -> Self {
        debug_assert!((x as usize) < GRID_SIZE);
        debug_assert!((y as usize) < GRID_SIZE);
        debug_assert!((z as usize) < GRID_SIZE);
        Self { x, y, z }
    }

    /// Create from signed coordinates, returning `None` outside the grid
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_coords(x: i64, y: i64, z: i64) -> Option<Self> {
        let size = GRID_SIZE as i64;
        if (0..size).contains(&x) && (0..size).contains(&y) && (0..size).contains(&z) {
            Some(Self::new(x as u8, y as u8, z as u8))
        } else {
            None
        }
    }

    /// Voxel containing a point given in grid-local space
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_local_point(point: DVec3) -> Option<Self> {
        if !point.is_finite() {
            return None;
        }
        let cell = ((point + DVec3::splat(HALF_GRID_EXTENT)) / BLOCK_SIZE).floor();
        Self::from_coords(cell.x as i64, cell.y as i64, cell.z as i64)
    }

    /// Convert to linear index for flat array storage
    #[inline]
    pub const fn to_index(self) -> VoxelIndex {
        self.x as usize + (self.y as usize) * GRID_SIZE + (self.z as usize) * GRID_SIZE * GRID_SIZE
    }

    /// Create from linear index
    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_index(index: VoxelIndex) -> Self {
        debug_assert!(index < GRID_VOLUME);
        let x = (index % GRID_SIZE) as u8;
        let y = ((index / GRID_SIZE) % GRID_SIZE) as u8;
        let z = (index / (GRID_SIZE * GRID_SIZE)) as u8;
        Self { x, y, z }
    }

    /// Center of this voxel in grid-local space
    #[inline]
    pub fn center(self) -> DVec3 {
        DVec3::new(f64::from(self.x), f64::from(self.y), f64::from(self.z)) * BLOCK_SIZE
            - DVec3::splat(HALF_GRID_EXTENT)
            + DVec3::splat(BLOCK_SIZE * 0.5)
    }

    /// Coordinates as floats, in voxel units
    #[inline]
    pub fn as_dvec3(self) -> DVec3 {
        DVec3::new(f64::from(self.x), f64::from(self.y), f64::from(self.z))
    }

    /// Returns true if this voxel lies on the outer layer of the grid
    #[inline]
    pub const fn is_shell(self) -> bool {
        let max = (GRID_SIZE - 1) as u8;
        self.x == 0 || self.y == 0 || self.z == 0 || self.x == max || self.y == max || self.z == max
    }

    /// Face-adjacent neighbors that lie inside the grid
    pub fn neighbors(self) -> impl Iterator<Item = Self> {
        const OFFSETS: [(i64, i64, i64); 6] = [
            (-1, 0, 0),
            (1, 0, 0),
            (0, -1, 0),
            (0, 1, 0),
            (0, 0, -1),
            (0, 0, 1),
        ];
        OFFSETS.into_iter().filter_map(move |(dx, dy, dz)| {
            Self::from_coords(
                i64::from(self.x) + dx,
                i64::from(self.y) + dy,
                i64::from(self.z) + dz,
            )
        })
    }

    /// Iterate over every voxel position in index order
    pub fn all() -> impl Iterator<Item = Self> {
        (0..GRID_VOLUME).map(Self::from_index)
    }
}

/// Center of the voxel at `index` in grid-local space.
#[inline]
pub fn voxel_center(index: VoxelIndex) -> DVec3 {
    LocalPos::from_index(index).center()
}

/// Depth-independent position of a grid in the virtual fractal space.
///
/// `s` is the edge length of one voxel of this grid measured in root voxels,
/// so it shrinks by `GRID_SIZE` per level. The root grid sits at `(0, 0, 0, 1)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FractalCoord {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub s: f64,
}

impl FractalCoord {
    /// Offset of the root grid
    pub const ROOT: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    /// Create a new fractal coordinate
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64, s: f64) -> Self {
        Self { x, y, z, s }
    }

    /// Fractal-space sample point of a voxel of this grid
    #[inline]
    pub fn sample_point(self, pos: LocalPos) -> DVec3 {
        DVec3::new(self.x, self.y, self.z) + pos.as_dvec3() * self.s
    }

    /// Offset of the child grid created by splitting the voxel at `pos`
    #[inline]
    pub fn child(self, pos: LocalPos) -> Self {
        let p = self.sample_point(pos);
        Self::new(p.x, p.y, p.z, self.s / GRID_SCALE)
    }
}

impl Default for FractalCoord {
    fn default() -> Self {
        Self::ROOT
    }
}

/// Exact integer position of a grid's voxel lattice at its own depth.
///
/// A grid at depth `d` with fractal offset `o` has voxel `g` at lattice cell
/// `o * N^d + g`. That integer outgrows any float after a dozen levels, so it
/// is kept split per axis into a low part below [`Self::TILE_CELLS`] and a
/// tile number above it. The tile number wraps on overflow; it only has to
/// tell neighboring tiles apart.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LatticeCoord {
    pub tile: [u64; 3],
    pub cell: [u32; 3],
}

impl LatticeCoord {
    /// Cells per tile and axis
    pub const TILE_CELLS: u32 = 1 << 24;

    /// Lattice of the root grid
    pub const ROOT: Self = Self {
        tile: [0; 3],
        cell: [0; 3],
    };

    /// Lattice of the child grid created by splitting the voxel at `pos`
    #[allow(clippy::cast_possible_truncation)]
    pub fn child(self, pos: LocalPos) -> Self {
        let mut next = self;
        for (axis, g) in [pos.x, pos.y, pos.z].into_iter().enumerate() {
            let scaled = (u64::from(self.cell[axis]) + u64::from(g)) * GRID_SIZE as u64;
            let tiles = u64::from(Self::TILE_CELLS);
            next.cell[axis] = (scaled % tiles) as u32;
            next.tile[axis] = self.tile[axis]
                .wrapping_mul(GRID_SIZE as u64)
                .wrapping_add(scaled / tiles);
        }
        next
    }

    /// Position of a voxel within its tile, in cells. Always exact in `f64`.
    #[inline]
    pub fn cell_point(self, pos: LocalPos) -> DVec3 {
        DVec3::new(
            f64::from(self.cell[0]),
            f64::from(self.cell[1]),
            f64::from(self.cell[2]),
        ) + pos.as_dvec3()
    }
}
