//! Shared ECS resources wrapping the core session state
//!
//! All of these are single-writer: the viewer's controller systems mutate
//! them, everything else (UI, scene systems) only reads.

use bevy::prelude::*;
use hearth_core::{PlacementState, Reticle, RenderProfile, SessionPhase};

/// The tier profile the session is running under. Replaced wholesale on a
/// governor downgrade.
#[derive(Debug, Clone, Resource)]
pub struct ActiveProfile {
    pub profile: RenderProfile,
    pub auto_detected: bool,
}

/// Current session lifecycle phase; drives which UI is shown.
#[derive(Debug, Clone, Resource, Default)]
pub struct SessionStatus(pub SessionPhase);

/// Last known surface candidate from hit-testing.
#[derive(Debug, Clone, Copy, Resource, Default)]
pub struct ReticleState(pub Reticle);

/// Whether the house currently occupies the scene.
#[derive(Debug, Clone, Copy, Resource, Default)]
pub struct HousePlacement(pub PlacementState);

/// Model download progress for the UI.
#[derive(Debug, Clone, Copy, Resource, Default)]
pub struct LoadProgress {
    pub bytes_loaded: u64,
    /// `None` when the server did not send Content-Length.
    pub bytes_total: Option<u64>,
}

impl LoadProgress {
    pub fn percent(&self) -> Option<f32> {
        let total = self.bytes_total?;
        if total == 0 {
            return None;
        }
        Some((self.bytes_loaded as f32 / total as f32 * 100.0).min(100.0))
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
