//! Cross-crate behavior of generation, the grid tree and navigation.

use std::time::{Duration, Instant};

use approx::assert_relative_eq;
use fractalis_core::{BlockType, LocalPos};
use fractalis_physics::CollisionQuery;
use fractalis_test::{
    check_navigable, context_at_depth, door_cells, first_splittable, sample_density, solid_fraction,
    DensityTestConfig,
};
use fractalis_world::{
    GridContext, GridTransform, GridTransforms, GridTree, ScaleNavigator, StreamingConfig, StreamingScheduler,
    TerrainGenerator,
};
use glam::DVec3;

fn interior_positions() -> impl Iterator<Item = LocalPos> {
    [(1, 1, 1), (3, 12, 5), (14, 2, 9), (6, 6, 13), (10, 4, 2), (2, 9, 11)]
        .into_iter()
        .map(|(x, y, z)| LocalPos::new(x, y, z))
}

#[test]
fn generation_is_deterministic() {
    for seed in [0, 42, 9_999] {
        let a = TerrainGenerator::with_seed(seed);
        let b = TerrainGenerator::with_seed(seed);
        for depth in 0..4 {
            let ctx = context_at_depth(seed, depth, LocalPos::new(3, 12, 5));
            assert_eq!(a.generate_grid(&ctx), b.generate_grid(&ctx));
        }
    }
}

#[test]
fn density_is_stable_across_depths() {
    for seed in [1, 42, 777] {
        let generator = TerrainGenerator::with_seed(seed);
        let averages = sample_density(&generator, &DensityTestConfig::default()).unwrap();
        assert_eq!(averages.len(), 6);
    }
}

#[test]
fn density_holds_far_below_float_precision() {
    let generator = TerrainGenerator::with_seed(42);
    let shallow = sample_density(&generator, &DensityTestConfig::default()).unwrap();
    let reference = shallow.iter().sum::<f64>() / shallow.len() as f64;

    for depth in [16, 20, 32] {
        let fractions: Vec<f64> = interior_positions()
            .map(|pos| {
                let blocks = generator.generate_grid(&context_at_depth(42, depth, pos));
                check_navigable(&blocks).unwrap();
                solid_fraction(&blocks)
            })
            .collect();
        let average = fractions.iter().sum::<f64>() / fractions.len() as f64;
        assert!(
            (average - reference).abs() < 0.15,
            "depth {depth}: solid fraction {average:.3}, shallow mean {reference:.3}"
        );
        // Collapsed noise gives either a hollow box or a solid block
        assert!(fractions.iter().all(|f| (0.4..0.85).contains(f)), "depth {depth}: {fractions:?}");
    }
}

#[test]
fn generic_grids_connect_every_door() {
    for seed in [3, 42, 1234] {
        let generator = TerrainGenerator::with_seed(seed);
        check_navigable(&generator.generate_grid(&GridContext::root(seed))).unwrap();
        for depth in 1..=5 {
            for pos in interior_positions() {
                let blocks = generator.generate_grid(&context_at_depth(seed, depth, pos));
                check_navigable(&blocks).unwrap_or_else(|e| panic!("seed {seed} depth {depth} {pos:?}: {e}"));
            }
        }
    }
}

#[test]
fn split_then_unsplit_restores_parent() {
    let mut tree = GridTree::with_seed(42);
    let root = tree.root();
    let before = tree.get(root).unwrap().blocks().to_vec();
    let index = first_splittable(tree.get(root).unwrap()).unwrap();
    let base = before[index];

    let child = tree.split(root, index).unwrap();
    let node = tree.get(root).unwrap();
    assert_eq!(node.block(index), base.hitbox());
    assert_eq!(node.child(index), Some(child));

    assert!(tree.unsplit(root, index));
    assert_eq!(tree.get(root).unwrap().blocks(), before.as_slice());
    assert!(!tree.contains(child));
    assert_eq!(tree.len(), 1);
}

#[test]
fn unsplit_releases_whole_subtree() {
    let mut tree = GridTree::with_seed(42);
    let root = tree.root();
    let index = first_splittable(tree.get(root).unwrap()).unwrap();
    let child = tree.split(root, index).unwrap();
    let inner = first_splittable(tree.get(child).unwrap()).unwrap();
    let grandchild = tree.split(child, inner).unwrap();
    assert_eq!(tree.max_depth(), 2);

    assert!(tree.unsplit(root, index));
    assert!(!tree.contains(grandchild));
    assert_eq!(tree.len(), 1);
    assert_eq!(tree.max_depth(), 0);
}

#[test]
fn seed_42_spawn_and_first_split() {
    let mut tree = GridTree::with_seed(42);
    let root = tree.root();
    let node = tree.get(root).unwrap();

    // First open voxel of the center column is (8, 8, 1)
    let column = LocalPos::new(8, 8, 1);
    assert_eq!(node.block_at(column), BlockType::Air);
    let spawn = node.spawn_point();
    assert_relative_eq!(spawn.x, 0.5);
    assert_relative_eq!(spawn.y, 0.5);
    assert_relative_eq!(spawn.z, -7.1);

    let searched = (1..15)
        .map(|z| LocalPos::new(8, 8, z))
        .find(|pos| node.block_at(*pos) == BlockType::Air)
        .unwrap();
    assert_eq!(searched, column);
    assert_relative_eq!(spawn.z, column.center().z - 0.6);

    // Air does not split
    assert_eq!(tree.split(root, column.to_index()), None);
    assert_eq!(tree.len(), 1);

    let index = first_splittable(tree.get(root).unwrap()).unwrap();
    let child = tree.split(root, index).unwrap();
    let child_node = tree.get(child).unwrap();
    assert_eq!(child_node.depth(), 1);
    assert_relative_eq!(child_node.offset().s, 1.0 / 16.0);
    assert_eq!(tree.get(root).unwrap().child_count(), 1);
}

#[test]
fn descend_ascend_round_trip() {
    let mut tree = GridTree::with_seed(42);
    let root = tree.root();
    let index = first_splittable(tree.get(root).unwrap()).unwrap();
    let child = tree.split(root, index).unwrap();

    let mut navigator = ScaleNavigator::new(root, Duration::from_millis(200));
    let start = tree.get(root).unwrap().spawn_point();
    let mut camera = start;
    let now = Instant::now();

    navigator.descend(&tree, child, &mut camera, now).unwrap();
    assert_eq!(navigator.depth(), 1);
    assert_relative_eq!(navigator.world().scale, 16.0);

    let later = now + Duration::from_millis(250);
    navigator.ascend(&tree, &mut camera, later).unwrap();
    assert_eq!(navigator.depth(), 0);
    assert_eq!(navigator.active(), root);
    assert_relative_eq!(navigator.world().scale, 1.0);
    assert_relative_eq!(navigator.world().position.length(), 0.0, epsilon = 1e-9);
    assert_relative_eq!(camera.distance(start), 0.0, epsilon = 1e-9);
}

#[test]
fn streaming_enforces_depth_limit() {
    let mut tree = GridTree::with_seed(42);
    let root = tree.root();
    let index = first_splittable(tree.get(root).unwrap()).unwrap();
    let child = tree.split(root, index).unwrap();

    let mut navigator = ScaleNavigator::new(root, Duration::ZERO);
    let mut camera = GridTransform::IDENTITY.child_at(index).position;
    navigator.descend(&tree, child, &mut camera, Instant::now()).unwrap();

    // A stray grid below the active depth, hidden from the visible set
    let inner = first_splittable(tree.get(child).unwrap()).unwrap();
    let stray = tree.split(child, inner).unwrap();
    tree.set_visible(child, false);

    let scheduler = StreamingScheduler::new(StreamingConfig::default());
    let report = scheduler.run(&mut tree, navigator.view(), camera);

    assert!(!tree.contains(stray));
    assert!(report.collapsed >= 1);
    assert!(tree.contains(child));
    for node in tree.iter() {
        if node.depth() >= navigator.depth() {
            assert_eq!(node.child_count(), 0, "{} kept children", node.id());
        }
    }
}

#[test]
fn collision_boundary() {
    let tree = GridTree::with_seed(42);
    let root = tree.root();
    let transforms = GridTransforms::compute(&tree, root, GridTransform::IDENTITY);
    let query = CollisionQuery::new(&tree, &transforms, 0);
    let node = tree.get(root).unwrap();

    let solid = LocalPos::all().find(|pos| node.block_at(*pos).is_solid()).unwrap();
    assert!(query.is_point_blocked(solid.center()));

    for door in door_cells() {
        assert!(!query.is_point_blocked(door.center()), "door {door:?} blocked");
    }
    assert!(!query.is_point_blocked(DVec3::splat(100.0)));
}
