//! Camera setup and debounced viewport resizing

use bevy::prelude::*;
use bevy::window::WindowResized;

use crate::types::ActiveProfile;

/// Marker component for the main camera.
#[derive(Component)]
pub struct MainCamera;

/// Resize applications are collapsed to at most one per this many ms.
pub const RESIZE_DEBOUNCE_MS: f64 = 200.0;

/// Trailing-edge debouncer: each observation re-arms the deadline, and the
/// pending value is released once the stream has been quiet for the full
/// interval.
#[derive(Debug, Clone)]
pub struct Debouncer {
    interval_ms: f64,
    pending: Option<(f32, f32)>,
    deadline_ms: Option<f64>,
}

impl Debouncer {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            interval_ms,
            pending: None,
            deadline_ms: None,
        }
    }

    pub fn observe(&mut self, now_ms: f64, width: f32, height: f32) {
        self.pending = Some((width, height));
        self.deadline_ms = Some(now_ms + self.interval_ms);
    }

    pub fn poll(&mut self, now_ms: f64) -> Option<(f32, f32)> {
        let deadline = self.deadline_ms?;
        if now_ms < deadline {
            return None;
        }
        self.deadline_ms = None;
        self.pending.take()
    }

    pub fn reset(&mut self) {
        self.pending = None;
        self.deadline_ms = None;
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(RESIZE_DEBOUNCE_MS)
    }
}

#[derive(Resource, Default)]
pub struct ResizeDebounce(pub Debouncer);

/// Spawn the main camera. In an AR session its transform is overwritten
/// every frame by the viewer pose; the initial transform only matters for
/// the inline preview.
pub fn spawn_camera(mut commands: Commands, profile: Res<ActiveProfile>) {
    let msaa = if profile.profile.antialias {
        Msaa::Sample4
    } else {
        Msaa::Off
    };

    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            near: 0.01,
            far: 100.0,
            ..default()
        }),
        msaa,
        Transform::from_xyz(0.0, 1.6, 0.0),
        MainCamera,
    ));
}

/// Collect resize events and apply the latest one once the burst settles:
/// camera aspect ratio plus the tier's pixel-ratio clamp on the surface.
pub fn debounced_resize(
    time: Res<Time<Real>>,
    mut events: MessageReader<WindowResized>,
    mut debounce: ResMut<ResizeDebounce>,
    profile: Res<ActiveProfile>,
    mut windows: Query<&mut Window>,
    mut projections: Query<&mut Projection, With<MainCamera>>,
) {
    let now_ms = time.elapsed_secs_f64() * 1000.0;

    for resize in events.read() {
        debounce.0.observe(now_ms, resize.width, resize.height);
    }

    let Some((width, height)) = debounce.0.poll(now_ms) else {
        return;
    };
    if height <= 0.0 {
        return;
    }

    tracing::debug!(width, height, "applying debounced resize");

    for mut projection in projections.iter_mut() {
        if let Projection::Perspective(ref mut perspective) = *projection {
            perspective.aspect_ratio = width / height;
        }
    }

    if let Ok(mut window) = windows.single_mut() {
        let device_ratio = window.resolution.scale_factor();
        let clamped = profile.profile.clamp_pixel_ratio(device_ratio);
        if clamped < device_ratio {
            window.resolution.set_scale_factor_override(Some(clamped));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_collapses_to_one_application() {
        let mut debounce = Debouncer::new(200.0);

        // a burst of resize events within the window
        debounce.observe(0.0, 800.0, 600.0);
        debounce.observe(50.0, 810.0, 600.0);
        debounce.observe(120.0, 900.0, 700.0);

        // nothing released while the burst is live
        assert_eq!(debounce.poll(130.0), None);
        assert_eq!(debounce.poll(300.0), None);

        // only the last value survives, once the stream is quiet
        assert_eq!(debounce.poll(320.0), Some((900.0, 700.0)));
        assert_eq!(debounce.poll(321.0), None);
    }

    #[test]
    fn test_separate_events_apply_separately() {
        let mut debounce = Debouncer::new(200.0);

        debounce.observe(0.0, 800.0, 600.0);
        assert_eq!(debounce.poll(200.0), Some((800.0, 600.0)));

        debounce.observe(1000.0, 400.0, 300.0);
        assert_eq!(debounce.poll(1200.0), Some((400.0, 300.0)));
    }

    #[test]
    fn test_reset_drops_pending() {
        let mut debounce = Debouncer::new(200.0);
        debounce.observe(0.0, 800.0, 600.0);
        debounce.reset();
        assert_eq!(debounce.poll(500.0), None);
    }
}
