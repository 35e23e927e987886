//! Resource definitions
//!
//! Shaders, materials and mesh data shared between passes and hosts.

mod material;
mod mesh;

pub use material::*;
pub use mesh::*;
