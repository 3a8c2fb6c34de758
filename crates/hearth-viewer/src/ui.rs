//! UI overlays using bevy_egui

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};

use hearth_core::{ArSupport, PerfTier, RenderProfile, SessionPhase, TierChoice};
use hearth_scene::camera::MainCamera;
use hearth_scene::types::{ActiveProfile, HousePlacement, LoadProgress, SessionStatus};

use crate::app::{DeviceInfo, ExitRequested, SupportBridge, SupportState, ViewerConfig};
use crate::capability::launch_support_query;
use crate::loader::LoaderState;

/// Grouped system parameters for the main UI system to work around Bevy's
/// 16-param limit
#[derive(SystemParam)]
pub struct UiParams<'w, 's> {
    pub contexts: EguiContexts<'w, 's>,
    pub status: ResMut<'w, SessionStatus>,
    pub support: Res<'w, SupportState>,
    pub support_bridge: Res<'w, SupportBridge>,
    pub config: ResMut<'w, ViewerConfig>,
    pub device: Res<'w, DeviceInfo>,
    pub profile: ResMut<'w, ActiveProfile>,
    pub progress: Res<'w, LoadProgress>,
    pub loader: Res<'w, LoaderState>,
    pub placement: Res<'w, HousePlacement>,
    pub exit: ResMut<'w, ExitRequested>,
    pub msaa: Query<'w, 's, &'static mut Msaa, With<MainCamera>>,
}

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(EguiPrimaryContextPass, ui_system);
    }
}

fn tier_choice_label(choice: TierChoice) -> &'static str {
    match choice {
        TierChoice::Auto => "Auto",
        TierChoice::Forced(PerfTier::Low) => "Low",
        TierChoice::Forced(PerfTier::Medium) => "Medium",
        TierChoice::Forced(PerfTier::High) => "High",
    }
}

fn ui_system(mut params: UiParams) {
    let ctx = params.contexts.ctx_mut();

    egui::Window::new("Hearth")
        .anchor(egui::Align2::LEFT_TOP, [12.0, 12.0])
        .resizable(false)
        .collapsible(false)
        .show(ctx, |ui| {
            let phase = params.status.0.clone();
            match phase {
                SessionPhase::Idle | SessionPhase::CheckingSupport => {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Checking AR support...");
                    });
                }
                SessionPhase::Ready => render_ready(ui, &mut params),
                SessionPhase::LoadingAsset => {
                    render_progress(ui, &params);
                }
                SessionPhase::Active => render_active(ui, &mut params),
                SessionPhase::Ended => {
                    ui.label("Session ended.");
                    if ui.button("Back to start").clicked() {
                        restart(&mut params);
                    }
                }
                SessionPhase::Error(message) => {
                    ui.label(
                        egui::RichText::new(&message).color(egui::Color32::from_rgb(220, 80, 80)),
                    );
                    if ui.button("Try again").clicked() {
                        restart(&mut params);
                    }
                }
            }
        });
}

fn render_ready(ui: &mut egui::Ui, params: &mut UiParams) {
    ui.heading("Hearth AR Viewer");

    match params.support.support {
        Some(ArSupport::ImmersiveAr) => {
            ui.label("Tap Enter AR below to begin.");
        }
        Some(ArSupport::Inline) => {
            ui.label("AR passthrough unavailable - inline preview only.");
        }
        _ => {}
    }

    let mut choice = params.config.tier_choice;
    egui::ComboBox::from_label("Performance")
        .selected_text(tier_choice_label(choice))
        .show_ui(ui, |ui| {
            ui.selectable_value(&mut choice, TierChoice::Auto, "Auto");
            ui.selectable_value(&mut choice, TierChoice::Forced(PerfTier::Low), "Low");
            ui.selectable_value(&mut choice, TierChoice::Forced(PerfTier::Medium), "Medium");
            ui.selectable_value(&mut choice, TierChoice::Forced(PerfTier::High), "High");
        });

    if choice != params.config.tier_choice {
        params.config.tier_choice = choice;
        let (tier, auto_detected) = choice.resolve(&params.device.probe);
        params.profile.profile = RenderProfile::for_tier(tier);
        params.profile.auto_detected = auto_detected;
        for mut sample in params.msaa.iter_mut() {
            *sample = if params.profile.profile.antialias {
                Msaa::Sample4
            } else {
                Msaa::Off
            };
        }
        tracing::info!(%tier, "tier selection changed");
    }

    let tier = params.profile.profile.tier;
    if params.profile.auto_detected {
        ui.label(
            egui::RichText::new(format!("Detected tier: {tier}"))
                .small()
                .color(egui::Color32::GRAY),
        );
    }
}

fn render_progress(ui: &mut egui::Ui, params: &UiParams) {
    ui.label("Loading model...");
    match params.progress.percent() {
        Some(percent) => {
            ui.add(
                egui::ProgressBar::new(percent / 100.0).text(format!("{percent:.0}%")),
            );
        }
        None => {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label(format!("{} KB", params.progress.bytes_loaded / 1024));
            });
        }
    }
}

fn render_active(ui: &mut egui::Ui, params: &mut UiParams) {
    use hearth_core::PlacementState;

    if !params.loader.spawned {
        render_progress(ui, params);
    } else if params.profile.profile.tier == PerfTier::Low {
        ui.label("Tap to place the house in front of you.");
    } else {
        match params.placement.0 {
            PlacementState::Unplaced => {
                ui.label("Point your device at a surface and tap to place the house.");
            }
            PlacementState::Placed => {
                ui.label("Tap again to pick the house back up.");
            }
        }
    }

    ui.separator();
    if ui.button("Exit").clicked() {
        params.exit.0 = true;
    }
}

/// Leave a terminal phase and run the capability check again so the entry
/// flow can restart.
fn restart(params: &mut UiParams) {
    params.status.0.reset();
    params.status.0.begin_support_check();
    launch_support_query(&params.support_bridge);
}
