mod rigid;
mod linear;

pub use rigid::*;
pub use linear::*;
