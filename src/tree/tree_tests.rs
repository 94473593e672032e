use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::math::{SpatialVector, Vec2, Vec3};
use crate::shapes::{Bounds, Ray};
use crate::tree::SpatialTree;

fn random_spheres(seed: u64, count: usize, extent: f64) -> Vec<Bounds<Vec3>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let center = Vec3::new(
                rng.random_range(-extent..extent),
                rng.random_range(-extent..extent),
                rng.random_range(-extent..extent),
            );
            Bounds::sphere(center, rng.random_range(0.5..4.0))
        })
        .collect()
}

fn brute_force_pairs(shapes: &[Bounds<Vec3>]) -> Vec<(u32, u32)> {
    let mut pairs = Vec::new();
    for a in 0..shapes.len() {
        for b in (a + 1)..shapes.len() {
            if shapes[a].intersects(&shapes[b]) {
                pairs.push((a as u32, b as u32));
            }
        }
    }
    pairs
}

/// Translates tree-local pairs back to caller indices and orders them for
/// comparison against the brute-force reference
fn mapped_sorted(tree: &mut SpatialTree<Vec3>) -> Vec<(u32, u32)> {
    let map: Vec<u32> = tree.index_map().to_vec();
    let mut pairs: Vec<(u32, u32)> = tree
        .collisions()
        .iter()
        .map(|&(a, b)| {
            let (x, y) = (map[a as usize], map[b as usize]);
            if x < y { (x, y) } else { (y, x) }
        })
        .collect();
    pairs.sort_unstable();
    pairs
}

#[test]
fn test_collisions_match_brute_force() {
    let shapes = random_spheres(7, 120, 50.0);
    let mut expected = brute_force_pairs(&shapes);
    expected.sort_unstable();

    let mut tree = SpatialTree::new(Vec3::splat(-60.0), Vec3::splat(60.0));
    tree.insert(&shapes).unwrap();
    assert_eq!(mapped_sorted(&mut tree), expected);
}

#[test]
fn test_collisions_complete_at_every_depth() {
    let shapes = random_spheres(13, 80, 40.0);
    let mut expected = brute_force_pairs(&shapes);
    expected.sort_unstable();

    for depth in 1..=5 {
        let mut tree = SpatialTree::new(Vec3::splat(-50.0), Vec3::splat(50.0));
        tree.set_depth(depth);
        tree.insert(&shapes).unwrap();
        assert_eq!(
            mapped_sorted(&mut tree),
            expected,
            "pair set diverged at depth {}",
            depth
        );
    }
}

#[test]
fn test_collisions_report_no_duplicates() {
    // Large shapes straddle many cells, so every pair co-occurs repeatedly
    let shapes: Vec<Bounds<Vec3>> = (0..10)
        .map(|i| Bounds::sphere(Vec3::splat(i as f64 * 0.5), 20.0))
        .collect();
    let mut tree = SpatialTree::new(Vec3::splat(-100.0), Vec3::splat(100.0));
    tree.set_depth(4);
    tree.insert(&shapes).unwrap();

    let mut pairs = tree.collisions().to_vec();
    let total = pairs.len();
    pairs.sort_unstable();
    pairs.dedup();
    assert_eq!(pairs.len(), total);
    assert_eq!(total, 10 * 9 / 2);
}

#[test]
fn test_insert_no_sort_keeps_input_order() {
    let shapes = vec![
        Bounds::sphere(Vec3::new(30.0, 0.0, 0.0), 1.0),
        Bounds::sphere(Vec3::new(-30.0, 0.0, 0.0), 1.0),
        Bounds::sphere(Vec3::new(-30.5, 0.0, 0.0), 1.0),
    ];
    let mut tree = SpatialTree::new(Vec3::splat(-50.0), Vec3::splat(50.0));
    tree.insert_no_sort(&shapes).unwrap();

    assert_eq!(tree.index_map(), &[0, 1, 2]);
    assert_eq!(tree.collisions(), &[(1, 2)]);
}

#[test]
fn test_index_map_translates_sorted_order() {
    let shapes = vec![
        Bounds::sphere(Vec3::new(40.0, 40.0, 40.0), 1.0),
        Bounds::sphere(Vec3::new(-40.0, -40.0, -40.0), 1.0),
    ];
    let mut tree = SpatialTree::new(Vec3::splat(-50.0), Vec3::splat(50.0));
    tree.insert(&shapes).unwrap();

    // Whatever order the sort produced, the map must lead back to the
    // original shapes
    for (local, &original) in tree.index_map().to_vec().iter().enumerate() {
        assert_eq!(tree.shapes()[local], shapes[original as usize]);
    }
}

#[test]
fn test_automatic_depth_tracks_shape_size() {
    let small = vec![Bounds::sphere(Vec3::zero(), 1.0)];
    let mut tree = SpatialTree::new(Vec3::splat(-100.0), Vec3::splat(100.0));
    tree.insert(&small).unwrap();
    let fine = tree.depth();

    let large = vec![Bounds::sphere(Vec3::zero(), 50.0)];
    tree.insert(&large).unwrap();
    let coarse = tree.depth();

    assert!(fine > coarse, "smaller shapes must produce deeper trees ({} vs {})", fine, coarse);
}

#[test]
fn test_depth_override_wins_over_heuristic() {
    let shapes = vec![Bounds::sphere(Vec3::zero(), 0.1)];
    let mut tree = SpatialTree::new(Vec3::splat(-100.0), Vec3::splat(100.0));
    tree.set_depth(3);
    tree.insert(&shapes).unwrap();
    assert_eq!(tree.depth(), 3);
}

#[test]
fn test_collisions_at_point_restricts_to_leaf() {
    let shapes = vec![
        Bounds::sphere(Vec3::new(-40.0, -40.0, -40.0), 2.0),
        Bounds::sphere(Vec3::new(-41.0, -40.0, -40.0), 2.0),
        Bounds::sphere(Vec3::new(40.0, 40.0, 40.0), 2.0),
        Bounds::sphere(Vec3::new(41.0, 40.0, 40.0), 2.0),
    ];
    let mut tree = SpatialTree::new(Vec3::splat(-50.0), Vec3::splat(50.0));
    tree.set_depth(2);
    tree.insert_no_sort(&shapes).unwrap();

    let near = tree.collisions_at_point(Vec3::splat(-40.0)).to_vec();
    assert_eq!(near, vec![(0, 1)]);

    let far = tree.collisions_at_point(Vec3::splat(40.0)).to_vec();
    assert_eq!(far, vec![(2, 3)]);
}

#[test]
fn test_point_inside_returns_leaf_keys() {
    let shapes = vec![
        Bounds::sphere(Vec3::new(-40.0, -40.0, -40.0), 2.0),
        Bounds::sphere(Vec3::new(40.0, 40.0, 40.0), 2.0),
        Bounds::sphere(Vec3::new(40.0, -40.0, 40.0), 2.0),
    ];
    let mut tree = SpatialTree::new(Vec3::splat(-50.0), Vec3::splat(50.0));
    tree.set_depth(1);
    tree.insert_no_sort(&shapes).unwrap();

    assert_eq!(tree.point_inside(Vec3::splat(-45.0)), &[0]);
    assert_eq!(tree.point_inside(Vec3::splat(45.0)), &[1]);
    // Points outside the world clamp to the nearest edge cell
    assert_eq!(tree.point_inside(Vec3::splat(-1000.0)), &[0]);
}

#[test]
fn test_overlap_returns_cell_candidates() {
    let shapes = vec![
        Bounds::sphere(Vec3::new(-40.0, -40.0, -40.0), 2.0),
        Bounds::sphere(Vec3::new(-38.0, -40.0, -40.0), 2.0),
        Bounds::sphere(Vec3::new(40.0, 40.0, 40.0), 2.0),
    ];
    let mut tree = SpatialTree::new(Vec3::splat(-50.0), Vec3::splat(50.0));
    tree.set_depth(2);
    tree.insert_no_sort(&shapes).unwrap();

    let query = Bounds::sphere(Vec3::new(-39.0, -40.0, -40.0), 1.0);
    let mut candidates = tree.overlap(&query).to_vec();
    candidates.sort_unstable();
    assert!(candidates.contains(&0));
    assert!(candidates.contains(&1));
    assert!(!candidates.contains(&2));
}

#[test]
fn test_ray_scenario_increasing_sizes() {
    // 100 disjoint spheres of increasing size along the x axis; each probed
    // with perpendicular rays fired from outside the world on both sides
    let mut shapes = Vec::new();
    let mut current = 0.0_f64;
    for i in 0..100 {
        current += 10.0 * (i + 1) as f64;
        shapes.push(Bounds::sphere(Vec3::new(current, 0.0, 0.0), 4.5 * (i + 1) as f64));
    }
    let world = current + 1000.0;
    let mut tree = SpatialTree::new(
        Vec3::new(-world, -world, -world),
        Vec3::new(world, world, world),
    );
    tree.insert_no_sort(&shapes).unwrap();

    let mut current = 0.0_f64;
    for i in 0..100 {
        current += 10.0 * (i + 1) as f64;

        let from_above = Ray::new(Vec3::new(current, world + 50.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
        let hits = tree.collisions_ray(&from_above).to_vec();
        assert_eq!(hits, vec![i as u32], "downward ray through sphere {}", i);

        let from_below = Ray::new(Vec3::new(current, -world - 50.0, 0.0), Vec3::new(0.0, 1.0, 0.0));
        let hits = tree.collisions_ray(&from_below).to_vec();
        assert_eq!(hits, vec![i as u32], "upward ray through sphere {}", i);
    }
}

#[test]
fn test_ray_stops_at_first_hit_cell() {
    // Two spheres on the ray's path in clearly separate cells: only the
    // first cell's hit is reported (documented early-exit behavior).
    // The third sphere sits off the ray and just keeps the root subdivided.
    let shapes = vec![
        Bounds::sphere(Vec3::new(-30.0, 0.0, 0.0), 2.0),
        Bounds::sphere(Vec3::new(30.0, 0.0, 0.0), 2.0),
        Bounds::sphere(Vec3::new(0.0, 30.0, 0.0), 2.0),
    ];
    let mut tree = SpatialTree::new(Vec3::splat(-50.0), Vec3::splat(50.0));
    tree.set_depth(3);
    tree.insert_no_sort(&shapes).unwrap();

    let ray = Ray::new(Vec3::new(-60.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
    assert_eq!(tree.collisions_ray(&ray), &[0]);

    let reverse = Ray::new(Vec3::new(60.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0));
    assert_eq!(tree.collisions_ray(&reverse), &[1]);
}

#[test]
fn test_ray_missing_world_reports_nothing() {
    let shapes = vec![Bounds::sphere(Vec3::zero(), 2.0)];
    let mut tree = SpatialTree::new(Vec3::splat(-50.0), Vec3::splat(50.0));
    tree.insert_no_sort(&shapes).unwrap();

    let ray = Ray::new(Vec3::new(0.0, 100.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
    assert!(tree.collisions_ray(&ray).is_empty());
}

#[test]
fn test_two_dimensional_tree() {
    let shapes = vec![
        Bounds::sphere(Vec2::new(-20.0, -20.0), 2.0),
        Bounds::sphere(Vec2::new(-19.0, -20.0), 2.0),
        Bounds::sphere(Vec2::new(20.0, 20.0), 2.0),
    ];
    let mut tree = SpatialTree::new(Vec2::splat(-50.0), Vec2::splat(50.0));
    tree.insert_no_sort(&shapes).unwrap();
    assert_eq!(tree.collisions(), &[(0, 1)]);
}

#[test]
fn test_empty_insert_is_quiet() {
    let mut tree: SpatialTree<Vec3> = SpatialTree::new(Vec3::splat(-50.0), Vec3::splat(50.0));
    tree.insert(&[]).unwrap();
    assert!(tree.collisions().is_empty());
    assert!(tree.point_inside(Vec3::zero()).is_empty());
}
