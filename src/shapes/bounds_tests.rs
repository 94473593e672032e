use std::f64::consts::PI;
use crate::assert_float_eq;
use crate::math::{Quaternion, SpatialVector, Vec2, Vec3};
use crate::shapes::{resolve, Bounds};

#[test]
fn test_sphere_sphere_intersection() {
    let a = Bounds::sphere(Vec3::zero(), 1.0);
    let b = Bounds::sphere(Vec3::new(1.5, 0.0, 0.0), 1.0);
    let c = Bounds::sphere(Vec3::new(3.0, 0.0, 0.0), 0.5);
    assert!(a.intersects(&b));
    assert!(b.intersects(&c));
    assert!(!a.intersects(&c));
}

#[test]
fn test_cuboid_cuboid_intersection() {
    let a = Bounds::cuboid(Vec3::zero(), Vec3::splat(1.0));
    let b = Bounds::cuboid(Vec3::new(1.5, 0.0, 0.0), Vec3::splat(1.0));
    let c = Bounds::cuboid(Vec3::new(0.0, 3.5, 0.0), Vec3::splat(1.0));
    assert!(a.intersects(&b));
    assert!(!a.intersects(&c));
}

#[test]
fn test_sphere_cuboid_intersection() {
    let cuboid = Bounds::cuboid(Vec3::zero(), Vec3::splat(1.0));
    let touching = Bounds::sphere(Vec3::new(1.9, 0.0, 0.0), 1.0);
    let corner_miss = Bounds::sphere(Vec3::new(1.9, 1.9, 0.0), 1.0);
    assert!(cuboid.intersects(&touching));
    assert!(touching.intersects(&cuboid));
    // Corner distance sqrt(0.9^2 + 0.9^2) > 1.0, so the closest-point test rejects
    assert!(!cuboid.intersects(&corner_miss));
}

#[test]
fn test_extents_and_square_size() {
    let sphere = Bounds::sphere(Vec2::new(1.0, 2.0), 0.5);
    assert_eq!(sphere.min_extent(), Vec2::new(0.5, 1.5));
    assert_eq!(sphere.max_extent(), Vec2::new(1.5, 2.5));
    assert_float_eq(sphere.square_size(), 2.0, 1e-12, None);

    let cuboid = Bounds::cuboid(Vec2::zero(), Vec2::new(1.0, 2.0));
    assert_float_eq(cuboid.square_size(), 4.0 + 16.0, 1e-12, None);
}

#[test]
fn test_set_position_translates_center() {
    let mut cuboid = Bounds::cuboid(Vec3::zero(), Vec3::splat(2.0));
    cuboid.set_position(Vec3::new(5.0, -1.0, 0.5));
    assert_eq!(cuboid.center(), Vec3::new(5.0, -1.0, 0.5));
    assert_eq!(cuboid.min_extent(), Vec3::new(3.0, -3.0, -1.5));
}

#[test]
fn test_resolve_sphere_sphere_normal_and_offset() {
    let a = Bounds::sphere(Vec3::zero(), 1.0);
    let b = Bounds::sphere(Vec3::new(1.5, 0.0, 0.0), 1.0);
    let contact = resolve(&a, &b, 1e-6).unwrap();
    assert_float_eq(contact.normal.x, 1.0, 1e-12, None);
    assert_float_eq(contact.offset.x, 0.5, 1e-12, None);
    assert_float_eq(contact.offset.y, 0.0, 1e-12, None);
}

#[test]
fn test_resolve_separated_returns_none() {
    let a = Bounds::sphere(Vec3::zero(), 1.0);
    let b = Bounds::sphere(Vec3::new(5.0, 0.0, 0.0), 1.0);
    assert!(resolve(&a, &b, 1e-6).is_none());
}

#[test]
fn test_resolve_coincident_centers_uses_fallback_axis() {
    let a = Bounds::sphere(Vec3::zero(), 1.0);
    let b = Bounds::sphere(Vec3::zero(), 1.0);
    let contact = resolve(&a, &b, 1e-6).unwrap();
    assert_float_eq(contact.normal.x, 1.0, 1e-12, None);
    assert_float_eq(contact.normal.length(), 1.0, 1e-12, None);
}

#[test]
fn test_resolve_box_box_minimum_penetration_axis() {
    // Deep x-overlap, shallow y-overlap: the normal must pick y
    let a = Bounds::cuboid(Vec3::zero(), Vec3::new(2.0, 1.0, 2.0));
    let b = Bounds::cuboid(Vec3::new(0.5, 1.8, 0.0), Vec3::new(2.0, 1.0, 2.0));
    let contact = resolve(&a, &b, 1e-6).unwrap();
    assert_float_eq(contact.normal.x, 0.0, 1e-12, None);
    assert_float_eq(contact.normal.y, 1.0, 1e-12, None);
    assert_float_eq(contact.offset.y, 0.2, 1e-12, None);
}

#[test]
fn test_resolve_sphere_box_outside() {
    let sphere = Bounds::sphere(Vec3::new(0.0, 1.8, 0.0), 1.0);
    let cuboid = Bounds::cuboid(Vec3::zero(), Vec3::splat(1.0));
    let contact = resolve(&sphere, &cuboid, 1e-6).unwrap();
    // Normal points from the sphere toward the box: straight down
    assert_float_eq(contact.normal.y, -1.0, 1e-12, None);
    assert_float_eq(contact.offset.y, -0.2, 1e-12, None);
    // And the flipped ordering flips the normal
    let flipped = resolve(&cuboid, &sphere, 1e-6).unwrap();
    assert_float_eq(flipped.normal.y, 1.0, 1e-12, None);
}

#[test]
fn test_resolve_respects_tolerance() {
    let a = Bounds::sphere(Vec3::zero(), 1.0);
    let b = Bounds::sphere(Vec3::new(1.9999999, 0.0, 0.0), 1.0);
    assert!(resolve(&a, &b, 1e-3).is_none());
}

#[test]
fn test_rotate_reextents_cuboid_without_drift() {
    let mut cuboid = Bounds::cuboid(Vec3::zero(), Vec3::new(1.0, 2.0, 3.0));
    let quarter = Quaternion::from_axis_angle(Vec3::new(0.0, 0.0, 1.0), PI / 2.0);

    cuboid.rotate(&quarter);
    // x and y half-extents swap under a quarter turn about z
    assert_float_eq(cuboid.max_extent().x, 2.0, 1e-10, None);
    assert_float_eq(cuboid.max_extent().y, 1.0, 1e-10, None);
    assert_float_eq(cuboid.max_extent().z, 3.0, 1e-10, None);

    // Applying the same absolute rotation again must not inflate the box
    cuboid.rotate(&quarter);
    assert_float_eq(cuboid.max_extent().x, 2.0, 1e-10, None);

    // And identity restores the intrinsic extents
    cuboid.rotate(&Quaternion::identity());
    assert_float_eq(cuboid.max_extent().x, 1.0, 1e-10, None);
    assert_float_eq(cuboid.max_extent().y, 2.0, 1e-10, None);
}

#[test]
fn test_rotate_leaves_sphere_unchanged() {
    let mut sphere = Bounds::sphere(Vec3::new(1.0, 1.0, 1.0), 2.0);
    let before = sphere.clone();
    sphere.rotate(&Quaternion::from_axis_angle(Vec3::new(1.0, 1.0, 0.0), 1.0));
    assert_eq!(sphere, before);
}
