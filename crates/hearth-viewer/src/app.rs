//! Bevy application setup and shared controller resources

use bevy::asset::io::memory::{Dir, MemoryAssetReader};
use bevy::asset::io::{AssetSource, AssetSourceId};
use bevy::asset::AssetMetaCheck;
use bevy::prelude::*;
use bevy::render::settings::{PowerPreference, RenderCreation, WgpuSettings};
use bevy::render::RenderPlugin;
use bevy_egui::EguiPlugin;
use std::sync::{Arc, Mutex};

use hearth_core::{
    ArSupport, AssetCatalog, DeviceProbe, FrameWindow, HitSourceLifecycle, QualityGovernor,
    RenderProfile, TierChoice,
};
use hearth_scene::types::{ActiveProfile, HousePlacement, LoadProgress, ReticleState, SessionStatus};

use crate::capability::CapabilityPlugin;
use crate::frame::FramePlugin;
use crate::loader::LoaderPlugin;
use crate::session::SessionPlugin;
use crate::ui::UiPlugin;
use crate::xr::XrBridge;

/// Startup configuration: tier override and asset locations, from URL query
/// parameters where available.
#[derive(Debug, Clone, Resource)]
pub struct ViewerConfig {
    pub tier_choice: TierChoice,
    pub catalog: AssetCatalog,
}

/// What the capability probe found, kept for the UI.
#[derive(Debug, Clone, Resource, Default)]
pub struct DeviceInfo {
    pub probe: DeviceProbe,
}

/// Result of the async AR support query.
#[derive(Debug, Clone, Resource, Default)]
pub struct SupportState {
    pub support: Option<ArSupport>,
}

/// Bridge for the async support check, written from `spawn_local`.
#[derive(Resource, Clone, Default)]
pub struct SupportBridge(pub Arc<Mutex<Option<Result<ArSupport, String>>>>);

/// Lets the canvas and rendering context settle before the session entry
/// control appears. Not correctness-critical.
#[derive(Resource)]
pub struct SettleTimer(pub Timer);

impl Default for SettleTimer {
    fn default() -> Self {
        Self(Timer::from_seconds(0.4, TimerMode::Once))
    }
}

/// Per-session timing and quality state. `governor` exists only while a
/// session runs.
#[derive(Resource, Default)]
pub struct SessionClock {
    pub window: FrameWindow,
    pub governor: Option<QualityGovernor>,
}

/// Hit-test source lifecycle witness.
#[derive(Resource, Default)]
pub struct HitSource(pub HitSourceLifecycle);

/// Set by the governor; consumed by the downgrade application system.
#[derive(Resource, Default)]
pub struct DowngradePending(pub bool);

/// Set by the exit control; consumed by the teardown path.
#[derive(Resource, Default)]
pub struct ExitRequested(pub bool);

/// In-memory staging area backing the `fetched://` asset source.
#[derive(Resource, Clone)]
pub struct ModelStaging(pub Dir);

/// Run the Bevy application
pub fn run() {
    // Capability detection happens before the app starts: the GPU/memory
    // probe is synchronous, so the tier is known when the rendering context
    // is constructed. The async XR support query is bridged in afterwards.
    let config = crate::capability::read_url_config();
    let probe = crate::capability::probe_device();
    let (tier, auto_detected) = config.tier_choice.resolve(&probe);
    let profile = RenderProfile::for_tier(tier);
    tracing::info!(%tier, auto_detected, "starting viewer");

    let staging = Dir::default();
    let reader_root = staging.clone();

    let mut app = App::new();
    app.register_asset_source(
        AssetSourceId::from("fetched"),
        AssetSource::build().with_reader(move || {
            Box::new(MemoryAssetReader {
                root: reader_root.clone(),
            })
        }),
    );

    app.insert_resource(ClearColor(Color::srgba(0.0, 0.0, 0.0, 0.0)))
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "Hearth AR Viewer".to_string(),
                        canvas: Some("#viewer-canvas".to_string()),
                        fit_canvas_to_parent: true,
                        prevent_default_event_handling: false,
                        // AR passthrough shows through the page behind the
                        // canvas
                        transparent: true,
                        ..default()
                    }),
                    ..default()
                })
                .set(AssetPlugin {
                    file_path: "".to_string(),
                    // Don't look for .meta files - server doesn't have them
                    meta_check: AssetMetaCheck::Never,
                    ..default()
                })
                .set(RenderPlugin {
                    render_creation: RenderCreation::Automatic(WgpuSettings {
                        power_preference: if profile.low_power {
                            PowerPreference::LowPower
                        } else {
                            PowerPreference::HighPerformance
                        },
                        ..default()
                    }),
                    ..default()
                }),
        )
        .add_plugins(EguiPlugin::default())
        .insert_resource(config)
        .insert_resource(DeviceInfo { probe })
        .insert_resource(ActiveProfile {
            profile,
            auto_detected,
        })
        .insert_resource(ModelStaging(staging))
        .init_resource::<SupportState>()
        .init_resource::<SupportBridge>()
        .init_resource::<SettleTimer>()
        .init_resource::<SessionStatus>()
        .init_resource::<SessionClock>()
        .init_resource::<HitSource>()
        .init_resource::<DowngradePending>()
        .init_resource::<ExitRequested>()
        .init_resource::<ReticleState>()
        .init_resource::<HousePlacement>()
        .init_resource::<LoadProgress>()
        .init_resource::<XrBridge>()
        .add_plugins(CapabilityPlugin)
        .add_plugins(SessionPlugin)
        .add_plugins(LoaderPlugin)
        .add_plugins(FramePlugin)
        .add_plugins(UiPlugin)
        .run();
}
