//! Hearth scene - bevy-side scene assembly for the AR viewer
//!
//! Camera, lighting, model normalization, and the placement reticle. The
//! viewer crate decides *when* these run (session phases, XR frames); this
//! crate owns *what* they do to the scene graph.

pub mod camera;
pub mod lighting;
pub mod model;
pub mod reticle;
pub mod types;

pub use camera::{Debouncer, MainCamera, ResizeDebounce};
pub use model::{HouseAnchor, HouseModel, NormalizeModel};
pub use reticle::ReticleVisual;
pub use types::{ActiveProfile, HousePlacement, LoadProgress, ReticleState, SessionStatus};
