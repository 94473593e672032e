mod response;
mod rigid_world;
mod linear_world;

pub use response::*;
pub use rigid_world::*;
pub use linear_world::*;
