mod bounds;
mod ray;

pub use bounds::*;
pub use ray::*;

#[cfg(test)]
mod bounds_tests;
