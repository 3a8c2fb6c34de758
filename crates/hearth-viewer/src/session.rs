//! Session orchestration: entry control, start flow, teardown

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

use hearth_core::{ArSupport, QualityGovernor, RenderProfile, SessionError, SessionPhase};
use hearth_scene::camera::{MainCamera, ResizeDebounce};
use hearth_scene::lighting::{self, MainDirectionalLight};
use hearth_scene::model::HouseAnchor;
use hearth_scene::reticle::{spawn_reticle, ReticleVisual};
use hearth_scene::types::{
    ActiveProfile, HousePlacement, LoadProgress, ReticleState, SessionStatus,
};

use crate::app::{
    DeviceInfo, DowngradePending, ExitRequested, HitSource, ModelStaging, SessionClock,
    SettleTimer, SupportState, ViewerConfig,
};
use crate::loader::{begin_loading, teardown_loader, FetchBridge, LoaderState};
use crate::overlay::{self, StartControl, StartMode};
use crate::xr::{self, XrBridge};

pub struct SessionPlugin;

impl Plugin for SessionPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<StartControl>()
            .init_resource::<ResizeDebounce>()
            .init_resource::<PendingFailure>()
            .add_systems(
                Startup,
                (
                    hearth_scene::camera::spawn_camera,
                    hearth_scene::lighting::setup_ambient,
                ),
            )
            .add_systems(
                Update,
                (
                    manage_start_control,
                    handle_start_click,
                    poll_session_granted,
                    notice_load_failure,
                    watch_session_end,
                    apply_pending_failure,
                    restore_profile_after_session,
                    hearth_scene::camera::debounced_resize,
                )
                    .chain(),
            );
    }
}

/// An error that must surface after the partial session has been torn down,
/// so the Error phase never coexists with live session resources.
#[derive(Resource, Default)]
pub struct PendingFailure(pub Option<SessionError>);

fn start_mode(support: &SupportState, profile: &ActiveProfile) -> StartMode {
    let xr = support.support == Some(ArSupport::ImmersiveAr);
    StartMode {
        xr,
        require_hit_test: xr && profile.profile.hit_testing,
    }
}

/// Inject the session entry control once the capability check has passed
/// and the canvas has had a moment to settle.
fn manage_start_control(
    time: Res<Time>,
    mut settle: ResMut<SettleTimer>,
    status: Res<SessionStatus>,
    support: Res<SupportState>,
    profile: Res<ActiveProfile>,
    mut control: ResMut<StartControl>,
    bridge: Res<XrBridge>,
) {
    settle.0.tick(time.delta());
    if !settle.0.finished() {
        return;
    }
    if !status.0.can_start() || control.injected {
        return;
    }

    overlay::inject_start_button(&mut control, &bridge, start_mode(&support, &profile));
}

/// The entry control was tapped: move into the loading phase, build the
/// session scene, and start the asset chain. The XR request itself already
/// went out from the click handler.
#[allow(clippy::too_many_arguments)]
fn handle_start_click(
    mut commands: Commands,
    control: Res<StartControl>,
    support: Res<SupportState>,
    profile: Res<ActiveProfile>,
    config: Res<ViewerConfig>,
    mut status: ResMut<SessionStatus>,
    mut clock: ResMut<SessionClock>,
    mut loader: ResMut<LoaderState>,
    fetch: Res<FetchBridge>,
    staging: Res<ModelStaging>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut windows: Query<&mut Window>,
) {
    if !control.take_click() {
        return;
    }
    if !status.0.begin_session() {
        return;
    }

    let tier = profile.profile.tier;
    tracing::info!(%tier, "session starting");

    if let Ok(mut window) = windows.single_mut() {
        let ratio = window.resolution.scale_factor();
        let clamped = profile.profile.clamp_pixel_ratio(ratio);
        if clamped < ratio {
            window.resolution.set_scale_factor_override(Some(clamped));
        }
    }

    lighting::spawn_session_lights(&mut commands, &profile);
    if profile.profile.hit_testing {
        spawn_reticle(&mut commands, &mut meshes, &mut materials);
    }

    clock.window.reset();
    clock.governor = Some(QualityGovernor::new(tier));

    begin_loading(&mut loader, &fetch, &staging, config.catalog.candidates(tier));

    // the inline fallback has no grant to wait for
    if !start_mode(&support, &profile).xr {
        status.0.session_granted();
        overlay::hide_start_button();
    }
}

/// The XR session request resolved.
fn poll_session_granted(
    bridge: Res<XrBridge>,
    mut status: ResMut<SessionStatus>,
    mut exit: ResMut<ExitRequested>,
    mut failure: ResMut<PendingFailure>,
) {
    match bridge.take_granted() {
        Some(Ok(())) => {
            status.0.session_granted();
            overlay::hide_start_button();
        }
        Some(Err(message)) => {
            // tear the partial session down first; the error lands after
            failure.0 = Some(SessionError::SessionStartFailed(message));
            exit.0 = true;
        }
        None => {}
    }
}

/// The loader ran out of candidates.
fn notice_load_failure(
    mut loader: ResMut<LoaderState>,
    mut exit: ResMut<ExitRequested>,
    mut failure: ResMut<PendingFailure>,
) {
    if std::mem::take(&mut loader.exhausted) {
        failure.0 = Some(SessionError::AssetLoadFailed);
        exit.0 = true;
    }
}

/// Surface a deferred failure once teardown has run.
fn apply_pending_failure(mut failure: ResMut<PendingFailure>, mut status: ResMut<SessionStatus>) {
    if let Some(error) = failure.0.take() {
        status.0.fail(error);
    }
}

/// Everything the teardown path touches, grouped to stay under the system
/// parameter limit.
#[derive(SystemParam)]
pub struct TeardownParams<'w, 's> {
    pub commands: Commands<'w, 's>,
    pub exit: ResMut<'w, ExitRequested>,
    pub bridge: Res<'w, XrBridge>,
    pub status: ResMut<'w, SessionStatus>,
    pub hit_source: ResMut<'w, HitSource>,
    pub control: ResMut<'w, StartControl>,
    pub loader: ResMut<'w, LoaderState>,
    pub progress: ResMut<'w, LoadProgress>,
    pub staging: Res<'w, ModelStaging>,
    pub clock: ResMut<'w, SessionClock>,
    pub reticle: ResMut<'w, ReticleState>,
    pub placement: ResMut<'w, HousePlacement>,
    pub downgrade: ResMut<'w, DowngradePending>,
    pub debounce: ResMut<'w, ResizeDebounce>,
    pub anchors: Query<'w, 's, Entity, With<HouseAnchor>>,
    pub reticle_visuals: Query<'w, 's, Entity, With<ReticleVisual>>,
    pub lights: Query<'w, 's, Entity, With<MainDirectionalLight>>,
}

/// Session end, from either direction: the XR `end` event or the exit
/// control. Releases the hit-test source and the injected DOM control
/// exactly once each, then resets per-session state.
fn watch_session_end(mut params: TeardownParams) {
    let ended_event = params.bridge.take_ended();
    let exit_requested = std::mem::take(&mut params.exit.0);

    if !ended_event && !exit_requested {
        return;
    }

    if exit_requested && xr::session_is_live() {
        // the XR end event will arrive later and find the session already
        // torn down; the phase guard makes that a no-op
        xr::end_session();
    }

    if !matches!(
        params.status.0,
        SessionPhase::LoadingAsset | SessionPhase::Active
    ) {
        return;
    }

    tracing::info!("tearing down session");

    if params.hit_source.0.release() {
        xr::release_hit_test_source();
    }
    overlay::remove_start_button(&mut params.control);
    xr::shutdown();
    params.bridge.clear();

    for entity in params.anchors.iter() {
        params.commands.entity(entity).despawn();
    }
    for entity in params.reticle_visuals.iter() {
        params.commands.entity(entity).despawn();
    }
    lighting::remove_directional_light(&mut params.commands, &params.lights);

    teardown_loader(&mut params.loader, &mut params.progress, &params.staging);

    params.hit_source.0 = Default::default();
    params.reticle.0 = Default::default();
    params.placement.0 = Default::default();
    params.downgrade.0 = false;
    params.clock.window.reset();
    params.clock.governor = None;
    params.debounce.0.reset();

    params.status.0.end();
}

/// A governor downgrade does not outlive its session: once the session has
/// ended, re-resolve the configured tier choice for the next entry.
fn restore_profile_after_session(
    status: Res<SessionStatus>,
    config: Res<ViewerConfig>,
    device: Res<DeviceInfo>,
    mut profile: ResMut<ActiveProfile>,
    mut msaa: Query<&mut Msaa, With<MainCamera>>,
    mut windows: Query<&mut Window>,
) {
    if !matches!(status.0, SessionPhase::Ended) {
        return;
    }
    let (tier, auto_detected) = config.tier_choice.resolve(&device.probe);
    if profile.profile.tier == tier {
        return;
    }

    profile.profile = RenderProfile::for_tier(tier);
    profile.auto_detected = auto_detected;
    for mut sample in msaa.iter_mut() {
        *sample = if profile.profile.antialias {
            Msaa::Sample4
        } else {
            Msaa::Off
        };
    }
    // lift any in-session pixel clamp; the next start re-applies its own
    if let Ok(mut window) = windows.single_mut() {
        window.resolution.set_scale_factor_override(None);
    }
}
