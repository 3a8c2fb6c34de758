//! Placement reticle visual

use bevy::prelude::*;
use hearth_core::Pose;

/// Marker component for the reticle ring.
#[derive(Component)]
pub struct ReticleVisual;

/// Flat ring shown at the last detected surface point. Unlit so it reads
/// the same under any tier's lighting.
pub fn spawn_reticle(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
) {
    let ring = meshes.add(Torus::new(0.07, 0.08));
    let material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.3, 0.9, 0.5),
        unlit: true,
        ..default()
    });

    commands.spawn((
        Mesh3d(ring),
        MeshMaterial3d(material),
        Transform::IDENTITY,
        Visibility::Hidden,
        ReticleVisual,
    ));
}

/// Push the tracked reticle state onto the visual.
pub fn apply_reticle(pose: &Pose, visible: bool, transform: &mut Transform, visibility: &mut Visibility) {
    transform.translation = pose.translation;
    transform.rotation = pose.rotation;
    *visibility = if visible {
        Visibility::Visible
    } else {
        Visibility::Hidden
    };
}
