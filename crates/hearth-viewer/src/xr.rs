//! WebXR session runtime
//!
//! JS-owned handles (session, reference spaces, hit-test source, callbacks)
//! stay in a thread-local cell on the wasm side; systems only ever see the
//! plain-data [`XrBridge`]. The per-frame callback publishes one
//! [`FrameSnapshot`] per display refresh, which the ECS consumes on its next
//! update - a hit-test source requested in one frame may therefore resolve
//! a frame or two later, which is acceptable for reticle tracking.

use bevy::prelude::*;
use hearth_core::Pose;
use std::sync::{Arc, Mutex};

/// Plain-data view of one XR frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameSnapshot {
    pub time_ms: f64,
    pub viewer: Option<Pose>,
    /// Pose of the first hit-test result, when a source is live.
    pub hit: Option<Pose>,
    /// Whether the frame carried tracking data at all.
    pub tracked: bool,
}

#[derive(Debug, Default)]
pub struct XrShared {
    pub granted: Option<Result<(), String>>,
    pub ended: bool,
    pub frame: Option<FrameSnapshot>,
    /// Target-ray poses of select events since the last drain.
    pub taps: Vec<Pose>,
    pub hit_source_acquired: Option<bool>,
}

/// Shared cell between the JS callbacks and the ECS systems.
#[derive(Resource, Clone, Default)]
pub struct XrBridge(pub Arc<Mutex<XrShared>>);

impl XrBridge {
    pub fn take_granted(&self) -> Option<Result<(), String>> {
        self.0.lock().unwrap().granted.take()
    }

    pub fn take_ended(&self) -> bool {
        std::mem::take(&mut self.0.lock().unwrap().ended)
    }

    pub fn take_frame(&self) -> Option<FrameSnapshot> {
        self.0.lock().unwrap().frame.take()
    }

    pub fn drain_taps(&self) -> Vec<Pose> {
        std::mem::take(&mut self.0.lock().unwrap().taps)
    }

    pub fn take_hit_source_acquired(&self) -> Option<bool> {
        self.0.lock().unwrap().hit_source_acquired.take()
    }

    pub fn clear(&self) {
        *self.0.lock().unwrap() = XrShared::default();
    }
}

/// Request an immersive AR session. Must be called from inside a
/// user-activation callback (the injected start control's click handler).
#[allow(unused_variables)]
pub fn request_session(bridge: &XrBridge, require_hit_test: bool) {
    #[cfg(target_arch = "wasm32")]
    platform::request_session(bridge.clone(), require_hit_test);
    #[cfg(not(target_arch = "wasm32"))]
    {
        *bridge.0.lock().unwrap() = XrShared {
            granted: Some(Err("no capability surface".to_string())),
            ..Default::default()
        };
    }
}

/// Ask the session for a hit-test source against the viewer reference
/// space. Resolution is reported through the bridge.
#[allow(unused_variables)]
pub fn request_hit_test_source(bridge: &XrBridge) {
    #[cfg(target_arch = "wasm32")]
    platform::request_hit_test_source(bridge.clone());
}

/// Cancel and drop the hit-test source, if one is live.
pub fn release_hit_test_source() {
    #[cfg(target_arch = "wasm32")]
    platform::release_hit_test_source();
}

/// Ask the session to end; the `end` event flows back through the bridge.
pub fn end_session() {
    #[cfg(target_arch = "wasm32")]
    platform::end_session();
}

/// Drop the whole runtime: frame callback, listeners, spaces. After this no
/// further snapshots arrive.
pub fn shutdown() {
    #[cfg(target_arch = "wasm32")]
    platform::shutdown();
}

pub fn session_is_live() -> bool {
    #[cfg(target_arch = "wasm32")]
    {
        platform::session_is_live()
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        false
    }
}

#[cfg(target_arch = "wasm32")]
mod platform {
    use super::{FrameSnapshot, XrBridge, XrShared};
    use hearth_core::Pose;
    use std::cell::RefCell;
    use std::sync::{Arc, Mutex};
    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;
    use web_sys::{
        XrFrame, XrHitTestOptionsInit, XrHitTestResult, XrHitTestSource, XrInputSourceEvent,
        XrReferenceSpace, XrReferenceSpaceType, XrRenderStateInit, XrRigidTransform, XrSession,
        XrSessionInit, XrSessionMode, XrWebGlLayer,
    };

    struct Runtime {
        session: XrSession,
        local_space: XrReferenceSpace,
        viewer_space: XrReferenceSpace,
        hit_source: Option<XrHitTestSource>,
        raf: Option<Closure<dyn FnMut(f64, XrFrame)>>,
        _select: Closure<dyn FnMut(XrInputSourceEvent)>,
        _end: Closure<dyn FnMut(web_sys::Event)>,
        bridge: Arc<Mutex<XrShared>>,
    }

    thread_local! {
        static RUNTIME: RefCell<Option<Runtime>> = const { RefCell::new(None) };
    }

    fn rigid_to_pose(transform: &XrRigidTransform) -> Pose {
        let p = transform.position();
        let o = transform.orientation();
        Pose::new(
            glam::Vec3::new(p.x() as f32, p.y() as f32, p.z() as f32),
            glam::Quat::from_xyzw(o.x() as f32, o.y() as f32, o.z() as f32, o.w() as f32),
        )
    }

    pub fn request_session(bridge: XrBridge, require_hit_test: bool) {
        wasm_bindgen_futures::spawn_local(async move {
            let result = establish(bridge.0.clone(), require_hit_test).await;
            if let Err(message) = &result {
                tracing::error!("XR session request failed: {}", message);
            }
            bridge.0.lock().unwrap().granted = Some(result);
        });
    }

    async fn establish(shared: Arc<Mutex<XrShared>>, require_hit_test: bool) -> Result<(), String> {
        let window = web_sys::window().ok_or("no window")?;
        let xr = window.navigator().xr();

        let init = XrSessionInit::new();
        let required = js_sys::Array::new();
        if require_hit_test {
            required.push(&"hit-test".into());
        }
        init.set_required_features(&required);
        let optional = js_sys::Array::new();
        optional.push(&"dom-overlay".into());
        init.set_optional_features(&optional);

        let session: XrSession =
            JsFuture::from(xr.request_session_with_options(XrSessionMode::ImmersiveAr, &init))
                .await
                .map_err(|e| format!("requestSession rejected: {e:?}"))?
                .dyn_into()
                .map_err(|_| "requestSession returned a non-session")?;

        // The session needs a base layer before it will deliver frames; an
        // xrCompatible WebGL2 context on an offscreen canvas satisfies it.
        let document = window.document().ok_or("no document")?;
        let canvas: web_sys::HtmlCanvasElement = document
            .create_element("canvas")
            .map_err(|e| format!("canvas creation failed: {e:?}"))?
            .dyn_into()
            .map_err(|_| "canvas element cast failed")?;
        let attrs = js_sys::Object::new();
        js_sys::Reflect::set(&attrs, &"xrCompatible".into(), &true.into())
            .map_err(|e| format!("{e:?}"))?;
        let gl: web_sys::WebGl2RenderingContext = canvas
            .get_context_with_context_options("webgl2", &attrs)
            .map_err(|e| format!("webgl2 context failed: {e:?}"))?
            .ok_or("webgl2 unavailable")?
            .dyn_into()
            .map_err(|_| "webgl2 context cast failed")?;

        let layer = XrWebGlLayer::new_with_web_gl2_rendering_context(&session, &gl)
            .map_err(|e| format!("XRWebGLLayer failed: {e:?}"))?;
        let render_state = XrRenderStateInit::new();
        render_state.set_base_layer(Some(&layer));
        session.update_render_state_with_state(&render_state);

        let local_space: XrReferenceSpace =
            JsFuture::from(session.request_reference_space(XrReferenceSpaceType::Local))
                .await
                .map_err(|e| format!("local reference space rejected: {e:?}"))?
                .dyn_into()
                .map_err(|_| "local reference space cast failed")?;
        let viewer_space: XrReferenceSpace =
            JsFuture::from(session.request_reference_space(XrReferenceSpaceType::Viewer))
                .await
                .map_err(|e| format!("viewer reference space rejected: {e:?}"))?
                .dyn_into()
                .map_err(|_| "viewer reference space cast failed")?;

        // select: record the target-ray pose for the tap state machine
        let select_shared = shared.clone();
        let select_space = local_space.clone();
        let select = Closure::wrap(Box::new(move |event: XrInputSourceEvent| {
            let frame = event.frame();
            if let Some(pose) = frame.get_pose(&event.input_source().target_ray_space(), &select_space)
            {
                select_shared
                    .lock()
                    .unwrap()
                    .taps
                    .push(rigid_to_pose(&pose.transform()));
            }
        }) as Box<dyn FnMut(_)>);
        session
            .add_event_listener_with_callback("select", select.as_ref().unchecked_ref())
            .map_err(|e| format!("select listener failed: {e:?}"))?;

        let end_shared = shared.clone();
        let end = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            end_shared.lock().unwrap().ended = true;
        }) as Box<dyn FnMut(_)>);
        session
            .add_event_listener_with_callback("end", end.as_ref().unchecked_ref())
            .map_err(|e| format!("end listener failed: {e:?}"))?;

        let raf = Closure::wrap(Box::new(on_frame) as Box<dyn FnMut(f64, XrFrame)>);

        RUNTIME.with(|cell| {
            *cell.borrow_mut() = Some(Runtime {
                session,
                local_space,
                viewer_space,
                hit_source: None,
                raf: Some(raf),
                _select: select,
                _end: end,
                bridge: shared,
            });
        });
        arm_frame_callback();

        Ok(())
    }

    /// Re-request the next animation frame from inside the runtime cell.
    fn arm_frame_callback() {
        RUNTIME.with(|cell| {
            let runtime = cell.borrow();
            if let Some(rt) = runtime.as_ref() {
                if let Some(raf) = &rt.raf {
                    rt.session
                        .request_animation_frame(raf.as_ref().unchecked_ref());
                }
            }
        });
    }

    fn on_frame(time_ms: f64, frame: XrFrame) {
        RUNTIME.with(|cell| {
            let runtime = cell.borrow();
            let Some(rt) = runtime.as_ref() else {
                return;
            };

            let viewer_pose = frame.get_viewer_pose(&rt.local_space);
            let viewer = viewer_pose
                .as_ref()
                .map(|pose| rigid_to_pose(&pose.transform()));

            let mut hit = None;
            if let Some(source) = &rt.hit_source {
                let results = frame.get_hit_test_results(source);
                if results.length() > 0 {
                    let first: XrHitTestResult = results.get(0).unchecked_into();
                    if let Some(pose) = first.get_pose(&rt.local_space) {
                        hit = Some(rigid_to_pose(&pose.transform()));
                    }
                }
            }

            rt.bridge.lock().unwrap().frame = Some(FrameSnapshot {
                time_ms,
                viewer,
                hit,
                tracked: viewer_pose.is_some(),
            });
        });
        arm_frame_callback();
    }

    pub fn request_hit_test_source(bridge: XrBridge) {
        let handles = RUNTIME.with(|cell| {
            cell.borrow()
                .as_ref()
                .map(|rt| (rt.session.clone(), rt.viewer_space.clone()))
        });
        let Some((session, viewer_space)) = handles else {
            return;
        };

        wasm_bindgen_futures::spawn_local(async move {
            let options = XrHitTestOptionsInit::new(&viewer_space);
            let acquired = match JsFuture::from(session.request_hit_test_source(&options)).await {
                Ok(value) => match value.dyn_into::<XrHitTestSource>() {
                    Ok(source) => {
                        // the session may have ended while the request was
                        // in flight; cancel rather than store in that case
                        let stored = RUNTIME.with(|cell| {
                            if let Some(rt) = cell.borrow_mut().as_mut() {
                                rt.hit_source = Some(source.clone());
                                true
                            } else {
                                false
                            }
                        });
                        if !stored {
                            source.cancel();
                        }
                        stored
                    }
                    Err(_) => false,
                },
                Err(e) => {
                    tracing::warn!("hit-test source request rejected: {:?}", e);
                    false
                }
            };
            bridge.0.lock().unwrap().hit_source_acquired = Some(acquired);
        });
    }

    pub fn release_hit_test_source() {
        RUNTIME.with(|cell| {
            if let Some(rt) = cell.borrow_mut().as_mut() {
                if let Some(source) = rt.hit_source.take() {
                    source.cancel();
                }
            }
        });
    }

    pub fn end_session() {
        RUNTIME.with(|cell| {
            if let Some(rt) = cell.borrow().as_ref() {
                let _ = rt.session.end();
            }
        });
    }

    pub fn shutdown() {
        release_hit_test_source();
        RUNTIME.with(|cell| {
            // dropping the runtime drops the frame callback and listeners
            *cell.borrow_mut() = None;
        });
    }

    pub fn session_is_live() -> bool {
        RUNTIME.with(|cell| cell.borrow().is_some())
    }
}
