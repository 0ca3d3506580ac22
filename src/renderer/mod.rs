//! Rendering module
//!
//! Turns simulation state into draw calls on host-supplied surfaces. Nothing
//! here feeds back into the simulation.

pub mod compositor;
pub mod shapes;
pub mod surface;
pub mod vertex;

pub use compositor::{SurfaceSet, composite};
pub use shapes::{QuadBatch, confetti_quad};
pub use surface::{Recording, RecordingSurface, RenderSurface, Sprite};
pub use vertex::Vertex;
