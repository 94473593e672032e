use std::f64::consts::PI;
use crate::assert_float_eq;
use crate::math::{Quaternion, SpatialVector, Vec3};

#[test]
fn test_identity_leaves_vectors_unchanged() {
    let q = Quaternion::identity();
    let v = Vec3::new(1.0, -2.0, 3.0);
    let rotated = q.rotate(v);
    assert_float_eq(rotated.x, v.x, 1e-12, None);
    assert_float_eq(rotated.y, v.y, 1e-12, None);
    assert_float_eq(rotated.z, v.z, 1e-12, None);
}

#[test]
fn test_quarter_turn_about_z() {
    let q = Quaternion::from_axis_angle(Vec3::new(0.0, 0.0, 1.0), PI / 2.0);
    let rotated = q.rotate(Vec3::new(1.0, 0.0, 0.0));
    assert_float_eq(rotated.x, 0.0, 1e-10, None);
    assert_float_eq(rotated.y, 1.0, 1e-10, None);
    assert_float_eq(rotated.z, 0.0, 1e-10, None);
}

#[test]
fn test_degenerate_axis_yields_identity() {
    let q = Quaternion::from_axis_angle(Vec3::zero(), 1.5);
    assert_eq!(q, Quaternion::identity());
}

#[test]
fn test_composition_matches_sequential_rotation() {
    let qa = Quaternion::from_axis_angle(Vec3::new(0.0, 1.0, 0.0), PI / 3.0);
    let qb = Quaternion::from_axis_angle(Vec3::new(1.0, 0.0, 0.0), PI / 5.0);
    let v = Vec3::new(0.3, -1.2, 2.0);

    let sequential = qa.rotate(qb.rotate(v));
    let composed = qa.multiply(&qb).rotate(v);
    assert_float_eq(sequential.x, composed.x, 1e-10, None);
    assert_float_eq(sequential.y, composed.y, 1e-10, None);
    assert_float_eq(sequential.z, composed.z, 1e-10, None);
}

#[test]
fn test_rotate_inv_inverts_rotate() {
    let q = Quaternion::from_axis_angle(Vec3::new(1.0, 2.0, -1.0), 0.8);
    let v = Vec3::new(4.0, 0.5, -3.0);
    let round_trip = q.rotate_inv(q.rotate(v));
    assert_float_eq(round_trip.x, v.x, 1e-10, None);
    assert_float_eq(round_trip.y, v.y, 1e-10, None);
    assert_float_eq(round_trip.z, v.z, 1e-10, None);
}

#[test]
fn test_normalized_has_unit_magnitude() {
    let q = Quaternion { w: 2.0, x: 1.0, y: -1.0, z: 0.5 };
    assert_float_eq(q.normalized().magnitude(), 1.0, 1e-12, None);
}

#[test]
fn test_rotation_preserves_length() {
    let q = Quaternion::from_axis_angle(Vec3::new(0.2, 1.0, 0.7), 2.3);
    let v = Vec3::new(-1.0, 4.0, 0.25);
    assert_float_eq(q.rotate(v).length(), v.length(), 1e-10, None);
}
