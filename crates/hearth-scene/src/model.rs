//! House model normalization - bounding fit, recentering, material cost

use bevy::prelude::*;
use bevy::render::primitives::Aabb;
use hearth_core::PerfTier;

use crate::types::ActiveProfile;

/// Placement target entity. Tap handling writes its transform and
/// visibility; it exists from asset load until session end.
#[derive(Component)]
pub struct HouseAnchor;

/// The glTF scene root under the anchor. Normalization rewrites this
/// entity's local transform so the anchor stays a clean placement handle.
#[derive(Component)]
pub struct HouseModel;

/// Request (re-)normalization of the model against the current tier
/// profile. Inserted on spawn and again on a governor downgrade.
#[derive(Component)]
pub struct NormalizeModel;

/// Models are commonly exported facing -Z; turn the house to face the
/// viewer on placement.
pub fn corrective_rotation() -> Quat {
    Quat::from_rotation_y(std::f32::consts::PI)
}

/// Uniform scale and centering offset that map a bounding box onto a target
/// largest dimension centered at the origin. Degenerate boxes keep their
/// size.
pub fn fit_to_size(min: Vec3, max: Vec3, target: f32) -> (f32, Vec3) {
    let size = max - min;
    let largest = size.max_element();
    let scale = if largest > f32::EPSILON {
        target / largest
    } else {
        1.0
    };
    let center = (min + max) * 0.5;
    (scale, -center * scale)
}

/// Merge descendant bounds into the model root's local space.
pub fn merged_local_aabb(
    root: &GlobalTransform,
    parts: &[(Aabb, GlobalTransform)],
) -> Option<(Vec3, Vec3)> {
    let root_inverse = root.affine().inverse();
    let mut min = Vec3::splat(f32::MAX);
    let mut max = Vec3::splat(f32::MIN);
    let mut any = false;

    for (aabb, part_transform) in parts {
        let to_local = root_inverse * part_transform.affine();
        let center = Vec3::from(aabb.center);
        let half = Vec3::from(aabb.half_extents);
        for corner in 0..8 {
            let sign = Vec3::new(
                if corner & 1 == 0 { -1.0 } else { 1.0 },
                if corner & 2 == 0 { -1.0 } else { 1.0 },
                if corner & 4 == 0 { -1.0 } else { 1.0 },
            );
            let point = to_local.transform_point3(center + half * sign);
            min = min.min(point);
            max = max.max(point);
            any = true;
        }
    }

    any.then_some((min, max))
}

/// Fit the loaded model to the tier's normalized size: recenter at the
/// origin, scale the largest dimension to the constant, apply the
/// corrective rotation, and (low tier) swap materials for unlit ones.
/// Waits until the glTF scene has spawned mesh descendants with bounds.
pub fn normalize_house_model(
    mut commands: Commands,
    profile: Res<ActiveProfile>,
    models: Query<(Entity, &GlobalTransform), (With<HouseModel>, With<NormalizeModel>)>,
    children: Query<&Children>,
    parts: Query<(&Aabb, &GlobalTransform), With<Mesh3d>>,
    mut transforms: Query<&mut Transform>,
    part_materials: Query<&MeshMaterial3d<StandardMaterial>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    for (entity, root_transform) in models.iter() {
        let mut bounds = Vec::new();
        let mut mesh_entities = Vec::new();
        for descendant in children.iter_descendants(entity) {
            if let Ok((aabb, part_transform)) = parts.get(descendant) {
                bounds.push((*aabb, *part_transform));
                mesh_entities.push(descendant);
            }
        }

        // scene instance still spawning
        if bounds.is_empty() {
            continue;
        }

        let Some((min, max)) = merged_local_aabb(root_transform, &bounds) else {
            continue;
        };

        let target = profile.profile.model_size;
        let (scale, offset) = fit_to_size(min, max, target);

        if let Ok(mut transform) = transforms.get_mut(entity) {
            transform.scale = Vec3::splat(scale);
            transform.translation = offset;
            transform.rotation = corrective_rotation();
        }

        if profile.profile.tier == PerfTier::Low {
            simplify_materials(
                &mut commands,
                &mesh_entities,
                &part_materials,
                &mut materials,
            );
        }

        tracing::info!(
            scale,
            target,
            meshes = mesh_entities.len(),
            "normalized house model"
        );
        commands.entity(entity).remove::<NormalizeModel>();
    }
}

/// Replace every mesh's material with an unlit variant, keeping base color
/// and texture. Shading cost drops to a single texture fetch per fragment.
fn simplify_materials(
    commands: &mut Commands,
    mesh_entities: &[Entity],
    part_materials: &Query<&MeshMaterial3d<StandardMaterial>>,
    materials: &mut Assets<StandardMaterial>,
) {
    for &entity in mesh_entities {
        let Ok(handle) = part_materials.get(entity) else {
            continue;
        };
        let Some(original) = materials.get(&handle.0) else {
            continue;
        };
        if original.unlit {
            continue;
        }

        let simplified = StandardMaterial {
            base_color: original.base_color,
            base_color_texture: original.base_color_texture.clone(),
            unlit: true,
            ..default()
        };
        let simplified_handle = materials.add(simplified);
        commands
            .entity(entity)
            .insert(MeshMaterial3d(simplified_handle));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_scales_largest_dimension_to_target() {
        let (scale, offset) = fit_to_size(Vec3::new(-1.0, 0.0, -0.5), Vec3::new(3.0, 2.0, 0.5), 0.8);
        // largest dimension is x: 4.0
        assert!((scale - 0.2).abs() < 1e-6);
        // center (1.0, 1.0, 0.0) maps to the origin
        assert_eq!(offset, Vec3::new(-0.2, -0.2, 0.0));

        let size_after = (Vec3::new(3.0, 2.0, 0.5) - Vec3::new(-1.0, 0.0, -0.5)) * scale;
        assert!((size_after.max_element() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_fit_tier_size_constants() {
        use hearth_core::RenderProfile;

        let min = Vec3::new(-2.0, 0.0, -3.0);
        let max = Vec3::new(2.0, 5.0, 3.0);
        for tier in [PerfTier::Low, PerfTier::Medium, PerfTier::High] {
            let target = RenderProfile::for_tier(tier).model_size;
            let (scale, _) = fit_to_size(min, max, target);
            let largest = ((max - min) * scale).max_element();
            assert!((largest - target).abs() < 1e-5, "tier {tier}");
        }
    }

    #[test]
    fn test_fit_degenerate_box_keeps_scale() {
        let (scale, offset) = fit_to_size(Vec3::ZERO, Vec3::ZERO, 1.0);
        assert_eq!(scale, 1.0);
        assert_eq!(offset, Vec3::ZERO);
    }

    #[test]
    fn test_merged_aabb_across_parts() {
        let root = GlobalTransform::IDENTITY;
        let parts = vec![
            (
                Aabb::from_min_max(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 2.0, 1.0)),
                GlobalTransform::IDENTITY,
            ),
            (
                Aabb::from_min_max(Vec3::splat(-0.5), Vec3::splat(0.5)),
                GlobalTransform::from(Transform::from_xyz(3.0, 0.0, 0.0)),
            ),
        ];

        let (min, max) = merged_local_aabb(&root, &parts).unwrap();
        assert_eq!(min, Vec3::new(-1.0, -0.5, -1.0));
        assert_eq!(max, Vec3::new(3.5, 2.0, 1.0));
    }

    #[test]
    fn test_merged_aabb_respects_root_offset() {
        // root shifted +10 in x; a part at the same spot is at local origin
        let root = GlobalTransform::from(Transform::from_xyz(10.0, 0.0, 0.0));
        let parts = vec![(
            Aabb::from_min_max(Vec3::splat(-1.0), Vec3::splat(1.0)),
            GlobalTransform::from(Transform::from_xyz(10.0, 0.0, 0.0)),
        )];

        let (min, max) = merged_local_aabb(&root, &parts).unwrap();
        assert_eq!(min, Vec3::splat(-1.0));
        assert_eq!(max, Vec3::splat(1.0));
    }

    #[test]
    fn test_merged_aabb_empty() {
        assert!(merged_local_aabb(&GlobalTransform::IDENTITY, &[]).is_none());
    }
}
