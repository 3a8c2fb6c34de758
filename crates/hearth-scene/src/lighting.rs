//! Session lighting - ambient always, directional only above low tier

use bevy::prelude::*;

use crate::types::ActiveProfile;

/// Marker component for the tier-gated directional light.
#[derive(Component)]
pub struct MainDirectionalLight;

/// Ambient light is part of every session regardless of tier.
pub fn setup_ambient(mut commands: Commands) {
    commands.insert_resource(AmbientLight {
        color: Color::srgb(1.0, 0.98, 0.92),
        brightness: 400.0,
        ..default()
    });
}

/// Spawn the directional light when the tier profile allows it. Called at
/// session start; a governor downgrade removes it again.
pub fn spawn_session_lights(commands: &mut Commands, profile: &ActiveProfile) {
    if !profile.profile.directional_light {
        return;
    }

    commands.spawn((
        DirectionalLight {
            illuminance: 6000.0,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_xyz(1.0, 3.0, 1.0).looking_at(Vec3::ZERO, Vec3::Y),
        MainDirectionalLight,
    ));
}

/// Remove the directional light. Tolerates it already being gone.
pub fn remove_directional_light(
    commands: &mut Commands,
    lights: &Query<Entity, With<MainDirectionalLight>>,
) {
    for entity in lights.iter() {
        commands.entity(entity).despawn();
    }
}
