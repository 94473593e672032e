mod vector;
mod quaternion;

pub use vector::*;
pub use quaternion::*;

#[cfg(test)]
mod quaternion_tests;
