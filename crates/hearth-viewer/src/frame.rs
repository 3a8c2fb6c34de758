//! Per-frame state: viewer pose, reticle tracking, FPS, downgrade, taps

use bevy::prelude::*;
use bevy_egui::EguiContexts;

use hearth_core::{placement, PerfTier, Pose, RenderProfile, TapOutcome};
use hearth_scene::camera::MainCamera;
use hearth_scene::lighting::{self, MainDirectionalLight};
use hearth_scene::model::{HouseAnchor, HouseModel, NormalizeModel};
use hearth_scene::reticle::{apply_reticle, ReticleVisual};
use hearth_scene::types::{ActiveProfile, HousePlacement, ReticleState, SessionStatus};

use crate::app::{DowngradePending, HitSource, SessionClock};
use crate::loader::LoaderState;
use crate::xr::{self, XrBridge};

pub struct FramePlugin;

impl Plugin for FramePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (
                consume_xr_frames,
                tick_inline_frames,
                handle_taps,
                sync_reticle_visual,
                apply_downgrade,
            )
                .chain(),
        );
    }
}

/// Drain the latest XR frame snapshot: drive the camera from the viewer
/// pose, keep the hit-test source lifecycle moving, track the reticle, and
/// feed the FPS window.
fn consume_xr_frames(
    bridge: Res<XrBridge>,
    profile: Res<ActiveProfile>,
    status: Res<SessionStatus>,
    mut clock: ResMut<SessionClock>,
    mut reticle: ResMut<ReticleState>,
    mut hit_source: ResMut<HitSource>,
    mut downgrade: ResMut<DowngradePending>,
    mut cameras: Query<&mut Transform, With<MainCamera>>,
) {
    if !status.0.is_active() {
        return;
    }

    if let Some(acquired) = bridge.take_hit_source_acquired() {
        if acquired {
            hit_source.0.acquired();
        } else {
            tracing::warn!("hit-test source unavailable, reticle stays hidden");
        }
    }

    let Some(snapshot) = bridge.take_frame() else {
        return;
    };

    if let Some(viewer) = snapshot.viewer {
        if let Ok(mut transform) = cameras.single_mut() {
            transform.translation = viewer.translation;
            transform.rotation = viewer.rotation;
        }
    }

    // the low tier skips surface detection entirely
    if profile.profile.hit_testing {
        if hit_source.0.request() {
            xr::request_hit_test_source(&bridge);
        }

        if hit_source.0.is_ready() && snapshot.tracked {
            reticle.0.update(snapshot.hit);
        } else {
            reticle.0.update(None);
        }
    }

    observe_frame(&mut clock, &mut downgrade, snapshot.time_ms);
}

/// The inline fallback has no XR callback; sample the bevy frame clock
/// instead so the quality governor still sees real numbers.
fn tick_inline_frames(
    time: Res<Time<Real>>,
    status: Res<SessionStatus>,
    mut clock: ResMut<SessionClock>,
    mut downgrade: ResMut<DowngradePending>,
) {
    if !status.0.is_active() || xr::session_is_live() {
        return;
    }
    observe_frame(&mut clock, &mut downgrade, time.elapsed_secs_f64() * 1000.0);
}

fn observe_frame(clock: &mut SessionClock, downgrade: &mut DowngradePending, now_ms: f64) {
    let Some(fps) = clock.window.tick(now_ms) else {
        return;
    };
    if let Some(governor) = clock.governor.as_mut() {
        if governor.observe_fps(fps).is_some() {
            downgrade.0 = true;
        }
    }
}

/// Resolve select events through the placement state machine. In the inline
/// fallback a screen tap stands in for the XR select, with the camera pose
/// as the controller.
#[allow(clippy::too_many_arguments)]
fn handle_taps(
    bridge: Res<XrBridge>,
    status: Res<SessionStatus>,
    profile: Res<ActiveProfile>,
    loader: Res<LoaderState>,
    reticle: Res<ReticleState>,
    mut placement_state: ResMut<HousePlacement>,
    mouse: Res<ButtonInput<MouseButton>>,
    touches: Res<Touches>,
    mut contexts: EguiContexts,
    cameras: Query<&Transform, With<MainCamera>>,
    mut anchors: Query<(&mut Transform, &mut Visibility), (With<HouseAnchor>, Without<MainCamera>)>,
) {
    let mut taps = bridge.drain_taps();

    // a select before the model is ready does nothing
    if !status.0.is_active() || !loader.spawned {
        return;
    }

    if !xr::session_is_live() {
        let egui_wants_pointer = contexts.ctx_mut().wants_pointer_input();
        let tapped = mouse.just_pressed(MouseButton::Left)
            || touches.iter_just_pressed().next().is_some();
        if tapped && !egui_wants_pointer {
            if let Ok(camera) = cameras.single() {
                taps.push(Pose::new(camera.translation, camera.rotation));
            }
        }
    }

    for tap in taps {
        let outcome = placement::on_select(
            profile.profile.tier,
            placement_state.0,
            &reticle.0,
            Some(&tap),
        );
        let Ok((mut transform, mut visibility)) = anchors.single_mut() else {
            return;
        };
        match outcome {
            TapOutcome::Place(pose) => {
                transform.translation = pose.translation;
                transform.rotation = pose.rotation;
                *visibility = Visibility::Visible;
                placement_state.0 = placement::PlacementState::Placed;
                tracing::info!(at = ?pose.translation, "house placed");
            }
            TapOutcome::Hide => {
                *visibility = Visibility::Hidden;
                placement_state.0 = placement::PlacementState::Unplaced;
            }
            TapOutcome::Ignored => {}
        }
    }
}

/// Push tracked reticle state onto its visual.
fn sync_reticle_visual(
    status: Res<SessionStatus>,
    reticle: Res<ReticleState>,
    mut visuals: Query<(&mut Transform, &mut Visibility), With<ReticleVisual>>,
) {
    for (mut transform, mut visibility) in visuals.iter_mut() {
        apply_reticle(
            &reticle.0.pose,
            reticle.0.visible && status.0.is_active(),
            &mut transform,
            &mut visibility,
        );
    }
}

/// One-shot downgrade: swap the profile for the low tier, strip the
/// directional light, disable MSAA, clamp the pixel ratio, and re-run model
/// optimization on the loaded asset.
fn apply_downgrade(
    mut commands: Commands,
    mut downgrade: ResMut<DowngradePending>,
    mut profile: ResMut<ActiveProfile>,
    lights: Query<Entity, With<MainDirectionalLight>>,
    mut msaa: Query<&mut Msaa, With<MainCamera>>,
    mut windows: Query<&mut Window>,
    models: Query<Entity, With<HouseModel>>,
) {
    if !std::mem::take(&mut downgrade.0) {
        return;
    }

    profile.profile = RenderProfile::for_tier(PerfTier::Low);
    tracing::warn!("quality downgrade applied");

    lighting::remove_directional_light(&mut commands, &lights);

    for mut sample in msaa.iter_mut() {
        *sample = Msaa::Off;
    }

    if let Ok(mut window) = windows.single_mut() {
        let ratio = window.resolution.scale_factor();
        let clamped = profile.profile.clamp_pixel_ratio(ratio);
        if clamped < ratio {
            window.resolution.set_scale_factor_override(Some(clamped));
        }
    }

    for model in models.iter() {
        commands.entity(model).insert(NormalizeModel);
    }
}
