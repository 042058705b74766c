//! Block types and their static properties.

use bytemuck::NoUninit;
use serde::{Deserialize, Serialize};

/// Type of a single voxel.
///
/// Every splittable base type has exactly one hitbox partner. A voxel holds
/// the hitbox type while its child grid exists; unsplitting restores the base
/// type through [`BlockType::split_from`].
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, NoUninit, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum BlockType {
    /// Empty space
    #[default]
    Air = 0,
    Stone = 1,
    StoneHitbox = 2,
    Bamboo = 3,
    BambooHitbox = 4,
    /// Marker left behind when a waypoint is saved
    Waypoint = 5,
    Vines = 6,
    VinesHitbox = 7,
    Sponge = 8,
    SpongeHitbox = 9,
    Rubble = 10,
    RubbleHitbox = 11,
    Solid = 12,
    SolidHitbox = 13,
    /// Walkable space that can still be split into a decorative sub-grid
    BlockyAir = 14,
    BlockyAirHitbox = 15,
    Cluster = 16,
    ClusterHitbox = 17,
}

/// Static per-type properties.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockProperties {
    /// Blocks player movement
    pub solid: bool,
    /// Can be subdivided into a child grid
    pub splits: bool,
    /// Type written into the voxel while its child grid exists
    pub hitbox: Option<BlockType>,
    /// Base type restored when the child grid is dropped
    pub split_from: Option<BlockType>,
}

impl BlockProperties {
    const EMPTY: Self = Self {
        solid: false,
        splits: false,
        hitbox: None,
        split_from: None,
    };

    const fn base(solid: bool, hitbox: BlockType) -> Self {
        Self {
            solid,
            splits: true,
            hitbox: Some(hitbox),
            split_from: None,
        }
    }

    const fn hitbox_of(base: BlockType) -> Self {
        Self {
            solid: false,
            splits: false,
            hitbox: None,
            split_from: Some(base),
        }
    }
}

static PROPERTIES: [BlockProperties; BlockType::COUNT] = [
    BlockProperties::EMPTY,
    BlockProperties::base(true, BlockType::StoneHitbox),
    BlockProperties::hitbox_of(BlockType::Stone),
    BlockProperties::base(true, BlockType::BambooHitbox),
    BlockProperties::hitbox_of(BlockType::Bamboo),
    BlockProperties::EMPTY,
    BlockProperties::base(true, BlockType::VinesHitbox),
    BlockProperties::hitbox_of(BlockType::Vines),
    BlockProperties::base(true, BlockType::SpongeHitbox),
    BlockProperties::hitbox_of(BlockType::Sponge),
    BlockProperties::base(true, BlockType::RubbleHitbox),
    BlockProperties::hitbox_of(BlockType::Rubble),
    BlockProperties::base(true, BlockType::SolidHitbox),
    BlockProperties::hitbox_of(BlockType::Solid),
    BlockProperties::base(false, BlockType::BlockyAirHitbox),
    BlockProperties::hitbox_of(BlockType::BlockyAir),
    BlockProperties::base(true, BlockType::ClusterHitbox),
    BlockProperties::hitbox_of(BlockType::Cluster),
];

impl BlockType {
    /// Number of block types
    pub const COUNT: usize = 18;

    /// All block types in id order
    pub const ALL: [Self; Self::COUNT] = [
        Self::Air,
        Self::Stone,
        Self::StoneHitbox,
        Self::Bamboo,
        Self::BambooHitbox,
        Self::Waypoint,
        Self::Vines,
        Self::VinesHitbox,
        Self::Sponge,
        Self::SpongeHitbox,
        Self::Rubble,
        Self::RubbleHitbox,
        Self::Solid,
        Self::SolidHitbox,
        Self::BlockyAir,
        Self::BlockyAirHitbox,
        Self::Cluster,
        Self::ClusterHitbox,
    ];

    /// Look up a block type by its numeric id
    #[inline]
    pub const fn from_id(id: u8) -> Option<Self> {
        if (id as usize) < Self::COUNT {
            Some(Self::ALL[id as usize])
        } else {
            None
        }
    }

    /// Numeric id of this type
    #[inline]
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Static properties of this type
    #[inline]
    pub fn properties(self) -> &'static BlockProperties {
        &PROPERTIES[self as usize]
    }

    /// Returns true if this block is air (empty)
    #[inline]
    pub const fn is_air(self) -> bool {
        matches!(self, Self::Air)
    }

    /// Returns true if this block blocks movement
    #[inline]
    pub fn is_solid(self) -> bool {
        self.properties().solid
    }

    /// Returns true if this block can be split into a child grid
    #[inline]
    pub fn splits(self) -> bool {
        self.properties().splits
    }

    /// Returns true if this block marks a split voxel
    #[inline]
    pub fn is_hitbox(self) -> bool {
        self.properties().split_from.is_some()
    }

    /// Hitbox partner of a splittable type
    #[inline]
    pub fn hitbox(self) -> Option<Self> {
        self.properties().hitbox
    }

    /// Base type of a hitbox type
    #[inline]
    pub fn split_from(self) -> Option<Self> {
        self.properties().split_from
    }
}
