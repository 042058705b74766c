//! Procedural block generation for fractal grids.
//!
//! Generation is a pure function of the world seed, the grid's context and the
//! voxel position. Cosmetic variants are drawn from a per-voxel generator, so
//! grids can be populated in parallel and regenerate identically.

use fractalis_core::constants::{GRID_SIZE, GRID_VOLUME};
use fractalis_core::{BlockType, FractalCoord, LatticeCoord, LocalPos};
use noise::NoiseFn;
use rayon::prelude::*;

use crate::{GridSeed, WorldSeed};

/// Tower pillar columns as (x, z).
const TOWER_COLUMNS: [(u8, u8); 4] = [(3, 3), (3, 12), (12, 3), (12, 12)];

/// The two middle layers form the 2x2 door on each face.
const DOOR_LOW: u8 = (GRID_SIZE / 2 - 1) as u8;
const DOOR_HIGH: u8 = (GRID_SIZE / 2) as u8;

const TOWER_VINES_CHANCE: f64 = 0.1;
const RUBBLE_VARIANT_CHANCE: f64 = 0.05;
const BLOCKY_AIR_CHANCE: f64 = 0.05;
const RUBBLE_AIR_CHANCE: f64 = 0.6;
const SPECK_CHANCE: f64 = 0.01;
const VINES_SPONGE_CHANCE: f64 = 0.01;

/// How cosmetic variants are randomized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CosmeticMode {
    /// Variants depend only on the grid seed and voxel index
    #[default]
    Seeded,
    /// Variants additionally depend on per-process entropy, so every run looks
    /// different while staying stable within the run
    PerRun,
}

/// Generator configuration.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Noise frequency in cycles per voxel, the same at every depth.
    pub base_frequency: f64,
    /// Noise value above which generic terrain is solid.
    pub solid_threshold: f64,
    /// Noise value above which vine sub-grids grow.
    pub vines_threshold: f64,
    /// Squared radius (in voxels) of the open chamber at the grid center.
    pub center_clearance_sq: f64,
    /// Cosmetic randomization mode.
    pub cosmetic: CosmeticMode,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_frequency: 0.35,
            solid_threshold: 0.58,
            vines_threshold: 0.7,
            center_clearance_sq: 12.0,
            cosmetic: CosmeticMode::Seeded,
        }
    }
}

/// Everything the generator needs to know about the grid being populated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridContext {
    /// Nesting depth (root = 0)
    pub depth: u32,
    /// Grid seed
    pub seed: GridSeed,
    /// Fractal-space offset of the grid
    pub offset: FractalCoord,
    /// Exact lattice position of the grid's voxels, used for noise sampling
    pub lattice: LatticeCoord,
    /// Type of the parent voxel before it was split, `None` for the root
    pub origin: Option<BlockType>,
}

impl GridContext {
    /// Context of the root grid
    pub const fn root(seed: WorldSeed) -> Self {
        Self {
            depth: 0,
            seed,
            offset: FractalCoord::ROOT,
            lattice: LatticeCoord::ROOT,
            origin: None,
        }
    }

    /// Context of the child grid created by splitting the voxel at `pos`
    pub fn child(&self, pos: LocalPos, origin: BlockType) -> Self {
        Self {
            depth: self.depth + 1,
            seed: self.seed.wrapping_add(pos.to_index() as u64),
            offset: self.offset.child(pos),
            lattice: self.lattice.child(pos),
            origin: Some(origin),
        }
    }
}

/// 3D value noise over a hashed integer lattice with quintic smoothing.
///
/// Output lies in `[0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueNoise {
    phase: f64,
}

impl ValueNoise {
    /// Create a noise field; different phases give unrelated fields
    pub const fn new(phase: f64) -> Self {
        Self { phase }
    }

    /// Pseudo-random value in `[0, 1)` for a lattice point
    #[inline]
    pub fn hash(&self, x: f64, y: f64, z: f64) -> f64 {
        let n = (x * 12.9898 + y * 78.233 + z * 37.719 + self.phase).sin() * 43_758.545_3;
        n - n.floor()
    }
}

impl NoiseFn<f64, 3> for ValueNoise {
    fn get(&self, point: [f64; 3]) -> f64 {
        let [x, y, z] = point;
        let (ix, iy, iz) = (x.floor(), y.floor(), z.floor());
        let (fx, fy, fz) = (fade(x - ix), fade(y - iy), fade(z - iz));

        let corner = |dx: f64, dy: f64, dz: f64| self.hash(ix + dx, iy + dy, iz + dz);

        let x00 = lerp(corner(0.0, 0.0, 0.0), corner(1.0, 0.0, 0.0), fx);
        let x10 = lerp(corner(0.0, 1.0, 0.0), corner(1.0, 1.0, 0.0), fx);
        let x01 = lerp(corner(0.0, 0.0, 1.0), corner(1.0, 0.0, 1.0), fx);
        let x11 = lerp(corner(0.0, 1.0, 1.0), corner(1.0, 1.0, 1.0), fx);

        lerp(lerp(x00, x10, fy), lerp(x01, x11, fy), fz)
    }
}

#[inline]
fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Procedural block generator for grids at any depth.
#[derive(Debug, Clone)]
pub struct TerrainGenerator {
    config: GeneratorConfig,
    seed: WorldSeed,
    run_entropy: u64,
}

impl TerrainGenerator {
    /// Create a new generator with the given configuration.
    pub fn new(config: GeneratorConfig, seed: WorldSeed) -> Self {
        let run_entropy = match config.cosmetic {
            CosmeticMode::Seeded => 0,
            CosmeticMode::PerRun => fastrand::u64(..),
        };
        Self {
            config,
            seed,
            run_entropy,
        }
    }

    /// Create a generator with default configuration.
    pub fn with_seed(seed: WorldSeed) -> Self {
        Self::new(GeneratorConfig::default(), seed)
    }

    /// Get the generator configuration.
    pub const fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// World seed
    pub const fn seed(&self) -> WorldSeed {
        self.seed
    }

    /// Noise field used at a given depth.
    ///
    /// Each depth gets its own phase so a grid does not repeat its ancestors.
    pub fn noise_for_depth(&self, depth: u32) -> ValueNoise {
        ValueNoise::new((self.seed % 10_000) as f64 + f64::from(depth))
    }

    /// Raw terrain density at a voxel, in `[0, 1)`.
    ///
    /// Sampled on the grid's own voxel lattice, so every depth sees the same
    /// number of noise cells per voxel and coordinates stay small however deep
    /// the grid is.
    pub fn density(&self, ctx: &GridContext, pos: LocalPos) -> f64 {
        let p = ctx.lattice.cell_point(pos) * self.config.base_frequency + tile_shift(ctx.lattice.tile);
        self.noise_for_depth(ctx.depth).get(p.to_array())
    }

    fn cosmetic_rng(&self, ctx: &GridContext, pos: LocalPos) -> fastrand::Rng {
        let voxel = (pos.to_index() as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        fastrand::Rng::with_seed(ctx.seed ^ voxel ^ self.run_entropy)
    }

    /// Block type of one voxel.
    pub fn generate(&self, ctx: &GridContext, pos: LocalPos) -> BlockType {
        let mut rng = self.cosmetic_rng(ctx, pos);

        if let Some(block) = sub_biome(ctx.origin, pos, &mut rng) {
            return block;
        }

        let density = self.density(ctx, pos);

        if ctx.origin == Some(BlockType::Vines) {
            return if density > self.config.vines_threshold {
                variant(&mut rng, VINES_SPONGE_CHANCE, BlockType::Sponge, BlockType::Vines)
            } else {
                BlockType::Air
            };
        }

        // Both variants are drawn every time to keep the draw order fixed
        let block = variant(&mut rng, RUBBLE_VARIANT_CHANCE, BlockType::Rubble, BlockType::Stone);
        let air = variant(&mut rng, BLOCKY_AIR_CHANCE, BlockType::BlockyAir, BlockType::Air);

        let door = is_door_axis(pos);
        if pos.is_shell() {
            return if door { air } else { block };
        }
        if door {
            return air;
        }
        if is_tower_column(pos) {
            return tower_block(&mut rng);
        }

        let mid = (GRID_SIZE as f64 - 1.0) / 2.0;
        if (pos.as_dvec3() - glam::DVec3::splat(mid)).length_squared() < self.config.center_clearance_sq {
            return air;
        }

        if density > self.config.solid_threshold {
            block
        } else {
            air
        }
    }

    /// Populate a whole grid, in index order.
    pub fn generate_grid(&self, ctx: &GridContext) -> Vec<BlockType> {
        (0..GRID_VOLUME)
            .into_par_iter()
            .map(|index| self.generate(ctx, LocalPos::from_index(index)))
            .collect()
    }
}

/// Noise-space offset of a lattice tile. Tile zero is unshifted, which covers
/// every grid down to depth 5.
fn tile_shift(tile: [u64; 3]) -> glam::DVec3 {
    let shift = |t: u64, salt: u64| {
        if t == 0 {
            return 0.0;
        }
        let mut h = t ^ salt;
        h ^= h >> 33;
        h = h.wrapping_mul(0xFF51_AFD7_ED55_8CCD);
        h ^= h >> 33;
        (h >> 44) as f64
    };
    glam::DVec3::new(
        shift(tile[0], 0x9E37_79B9),
        shift(tile[1], 0x85EB_CA6B),
        shift(tile[2], 0xC2B2_AE35),
    )
}

/// Overrides keyed on the parent voxel type.
fn sub_biome(origin: Option<BlockType>, pos: LocalPos, rng: &mut fastrand::Rng) -> Option<BlockType> {
    let block = match origin? {
        BlockType::Bamboo => {
            if is_tower_column(pos) {
                tower_block(rng)
            } else {
                BlockType::Air
            }
        }
        BlockType::Sponge => {
            if is_porous_cavity(pos) {
                BlockType::Air
            } else {
                BlockType::Sponge
            }
        }
        BlockType::Rubble => variant(rng, RUBBLE_AIR_CHANCE, BlockType::Air, BlockType::Rubble),
        BlockType::Solid => BlockType::Solid,
        BlockType::BlockyAir => variant(rng, SPECK_CHANCE, BlockType::Stone, BlockType::Air),
        _ => return None,
    };
    Some(block)
}

#[inline]
fn variant(rng: &mut fastrand::Rng, chance: f64, rare: BlockType, common: BlockType) -> BlockType {
    if rng.f64() < chance {
        rare
    } else {
        common
    }
}

fn tower_block(rng: &mut fastrand::Rng) -> BlockType {
    variant(rng, TOWER_VINES_CHANCE, BlockType::Vines, BlockType::Bamboo)
}

fn is_tower_column(pos: LocalPos) -> bool {
    TOWER_COLUMNS.contains(&(pos.x, pos.z))
}

/// Two of the three coordinates lie on the middle layers.
fn is_door_axis(pos: LocalPos) -> bool {
    let mid = |v: u8| v == DOOR_LOW || v == DOOR_HIGH;
    [mid(pos.x), mid(pos.y), mid(pos.z)].iter().filter(|m| **m).count() >= 2
}

/// Carved cavities of a sponge sub-grid: a hollow core plus a lattice of
/// holes with period 4.
fn is_porous_cavity(pos: LocalPos) -> bool {
    let core = |v: u8| v > 3 && v < 12;
    let hole = |v: u8| matches!(v % 4, 1 | 2);
    let (x, y, z) = (pos.x, pos.y, pos.z);

    ((core(x) || core(z)) && core(y))
        || (core(x) && core(z))
        || ((hole(x) || hole(z)) && hole(y))
        || (hole(x) && hole(z))
}
