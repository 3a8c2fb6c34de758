//! Reticle tracking and the tap-to-place state machine

use crate::tier::PerfTier;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Rigid transform expressed against the session's reference space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// A point offset in this pose's local frame, in reference-space
    /// coordinates.
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.translation + self.rotation * local
    }
}

/// Distance (meters) in front of the controller used by the fixed placement
/// strategy when hit-testing is unavailable.
pub const FORWARD_PLACEMENT_M: f32 = 1.5;

/// Most recent surface candidate. Recomputed every frame from hit-test
/// results; only the last known pose survives between frames.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Reticle {
    pub pose: Pose,
    pub visible: bool,
}

impl Reticle {
    /// Update from this frame's hit-test results: first hit wins, no hit
    /// hides the reticle but keeps the stale pose.
    pub fn update(&mut self, first_hit: Option<Pose>) {
        match first_hit {
            Some(pose) => {
                self.pose = pose;
                self.visible = true;
            }
            None => self.visible = false,
        }
    }
}

/// Whether the one-per-session asset currently occupies the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlacementState {
    #[default]
    Unplaced,
    Placed,
}

/// What a select event resolved to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TapOutcome {
    /// Show the asset at this pose and mark it placed.
    Place(Pose),
    /// Hide the asset and mark it unplaced.
    Hide,
    Ignored,
}

/// Resolve one select event.
///
/// Low tier has no hit-testing: the asset goes to a fixed offset in front of
/// the controller, and once placed it stays (re-selecting is a no-op). Other
/// tiers place at the visible reticle and toggle back to hidden on the next
/// select so the user can reposition.
pub fn on_select(
    tier: PerfTier,
    state: PlacementState,
    reticle: &Reticle,
    controller: Option<&Pose>,
) -> TapOutcome {
    if tier == PerfTier::Low {
        return match (state, controller) {
            (PlacementState::Unplaced, Some(ctl)) => {
                let translation = ctl.transform_point(Vec3::new(0.0, 0.0, -FORWARD_PLACEMENT_M));
                TapOutcome::Place(Pose::new(translation, ctl.rotation))
            }
            _ => TapOutcome::Ignored,
        };
    }

    match state {
        PlacementState::Unplaced if reticle.visible => TapOutcome::Place(reticle.pose),
        PlacementState::Unplaced => TapOutcome::Ignored,
        PlacementState::Placed => TapOutcome::Hide,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface_pose() -> Pose {
        Pose::new(
            Vec3::new(0.5, 0.0, -2.0),
            Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2),
        )
    }

    #[test]
    fn test_reticle_tracks_first_hit() {
        let mut reticle = Reticle::default();
        assert!(!reticle.visible);

        reticle.update(Some(surface_pose()));
        assert!(reticle.visible);
        assert_eq!(reticle.pose, surface_pose());

        // N empty frames keep it hidden for all N
        for _ in 0..5 {
            reticle.update(None);
            assert!(!reticle.visible);
        }
        // last known pose is retained while hidden
        assert_eq!(reticle.pose, surface_pose());
    }

    #[test]
    fn test_place_at_reticle_then_toggle() {
        let mut reticle = Reticle::default();
        reticle.update(Some(surface_pose()));

        let outcome = on_select(PerfTier::High, PlacementState::Unplaced, &reticle, None);
        assert_eq!(outcome, TapOutcome::Place(surface_pose()));

        let outcome = on_select(PerfTier::High, PlacementState::Placed, &reticle, None);
        assert_eq!(outcome, TapOutcome::Hide);
    }

    #[test]
    fn test_toggle_repeats_indefinitely() {
        let mut reticle = Reticle::default();
        reticle.update(Some(surface_pose()));
        let mut state = PlacementState::Unplaced;

        for _ in 0..50 {
            match on_select(PerfTier::Medium, state, &reticle, None) {
                TapOutcome::Place(_) => {
                    assert_eq!(state, PlacementState::Unplaced);
                    state = PlacementState::Placed;
                }
                TapOutcome::Hide => {
                    assert_eq!(state, PlacementState::Placed);
                    state = PlacementState::Unplaced;
                }
                TapOutcome::Ignored => panic!("toggle must never stall"),
            }
        }
    }

    #[test]
    fn test_hidden_reticle_ignores_select() {
        let reticle = Reticle::default();
        let outcome = on_select(PerfTier::High, PlacementState::Unplaced, &reticle, None);
        assert_eq!(outcome, TapOutcome::Ignored);
    }

    #[test]
    fn test_low_tier_places_in_front_of_controller() {
        let controller = Pose::new(Vec3::new(0.0, 1.6, 0.0), Quat::IDENTITY);
        let outcome = on_select(
            PerfTier::Low,
            PlacementState::Unplaced,
            &Reticle::default(),
            Some(&controller),
        );

        match outcome {
            TapOutcome::Place(pose) => {
                assert_eq!(
                    pose.translation,
                    Vec3::new(0.0, 1.6, -FORWARD_PLACEMENT_M)
                );
                assert_eq!(pose.rotation, Quat::IDENTITY);
            }
            other => panic!("expected placement, got {other:?}"),
        }
    }

    #[test]
    fn test_low_tier_never_hides() {
        let controller = Pose::default();
        let outcome = on_select(
            PerfTier::Low,
            PlacementState::Placed,
            &Reticle::default(),
            Some(&controller),
        );
        assert_eq!(outcome, TapOutcome::Ignored);
    }

    #[test]
    fn test_low_tier_rotated_controller() {
        // controller yawed 90 degrees left: "forward" is -X
        let controller = Pose::new(Vec3::ZERO, Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        let outcome = on_select(
            PerfTier::Low,
            PlacementState::Unplaced,
            &Reticle::default(),
            Some(&controller),
        );
        match outcome {
            TapOutcome::Place(pose) => {
                assert!((pose.translation.x + FORWARD_PLACEMENT_M).abs() < 1e-5);
                assert!(pose.translation.z.abs() < 1e-5);
            }
            other => panic!("expected placement, got {other:?}"),
        }
    }
}
