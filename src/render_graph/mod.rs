//! Render pass system
//!
//! Passes record work into command buffers and draw through the host backend.
//! The renderer schedules them per camera, in render pass event order.

pub mod command;
pub mod draw;
pub mod pass;
pub mod renderer;
pub mod resource;

pub use command::*;
pub use draw::*;
pub use pass::*;
pub use renderer::*;
pub use resource::*;
