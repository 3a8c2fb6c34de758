//! Device capability detection: URL config, GPU/memory probe, AR support

use bevy::prelude::*;

use hearth_core::{ArSupport, AssetCatalog, DeviceProbe, SessionError, TierChoice};
use hearth_scene::types::SessionStatus;

use crate::app::{SupportBridge, SupportState, ViewerConfig};

pub struct CapabilityPlugin;

impl Plugin for CapabilityPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, begin_support_check)
            .add_systems(Update, poll_support);
    }
}

/// Read `?tier=` and `?model=` overrides from the page URL.
#[allow(unused_mut)]
pub fn read_url_config() -> ViewerConfig {
    let mut config = ViewerConfig {
        tier_choice: TierChoice::Auto,
        catalog: AssetCatalog::default(),
    };

    #[cfg(target_arch = "wasm32")]
    {
        let Some(window) = web_sys::window() else {
            return config;
        };
        let Ok(href) = window.location().href() else {
            return config;
        };
        if let Ok(url) = web_sys::Url::new(&href) {
            let params = url.search_params();
            if let Some(tier) = params.get("tier") {
                match tier.parse::<TierChoice>() {
                    Ok(choice) => config.tier_choice = choice,
                    Err(()) => tracing::warn!(tier = %tier, "ignoring unknown tier parameter"),
                }
            }
            if let Some(model) = params.get("model") {
                tracing::info!(model = %model, "model path from URL parameter");
                config.catalog.primary = model;
            }
        }
    }

    config
}

/// Synchronous device probe: GPU renderer string and reported memory. Runs
/// before the app is built so the tier is known when the rendering context
/// is constructed.
pub fn probe_device() -> DeviceProbe {
    #[cfg(target_arch = "wasm32")]
    {
        DeviceProbe {
            gpu_renderer: webgl_renderer_string(),
            device_memory_gb: reported_device_memory(),
        }
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        DeviceProbe::default()
    }
}

#[cfg(target_arch = "wasm32")]
fn webgl_renderer_string() -> Option<String> {
    use wasm_bindgen::JsCast;

    let document = web_sys::window()?.document()?;
    let canvas: web_sys::HtmlCanvasElement =
        document.create_element("canvas").ok()?.dyn_into().ok()?;
    let gl: web_sys::WebGlRenderingContext = canvas
        .get_context("webgl")
        .ok()
        .flatten()?
        .dyn_into()
        .ok()?;

    // WEBGL_debug_renderer_info exposes the unmasked renderer name; without
    // the extension the masked RENDERER string is better than nothing
    let param = gl
        .get_extension("WEBGL_debug_renderer_info")
        .ok()
        .flatten()
        .and_then(|ext| {
            js_sys::Reflect::get(&ext, &"UNMASKED_RENDERER_WEBGL".into())
                .ok()
                .and_then(|v| v.as_f64())
                .map(|v| v as u32)
        })
        .unwrap_or(web_sys::WebGlRenderingContext::RENDERER);

    gl.get_parameter(param).ok()?.as_string()
}

#[cfg(target_arch = "wasm32")]
fn reported_device_memory() -> Option<f64> {
    let navigator = web_sys::window()?.navigator();
    js_sys::Reflect::get(navigator.as_ref(), &"deviceMemory".into())
        .ok()?
        .as_f64()
}

/// Kick off the async AR support query.
fn begin_support_check(mut status: ResMut<SessionStatus>, bridge: Res<SupportBridge>) {
    status.0.begin_support_check();
    launch_support_query(&bridge);
}

/// Query `immersive-ar` support, falling back to a probe for `inline`. The
/// result lands in the bridge for `poll_support` to pick up.
#[allow(unused_variables)]
pub fn launch_support_query(bridge: &SupportBridge) {
    #[cfg(target_arch = "wasm32")]
    {
        let cell = bridge.0.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let result = query_ar_support().await;
            *cell.lock().unwrap() = Some(result);
        });
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        // no capability surface outside the browser
        *bridge.0.lock().unwrap() = Some(Ok(ArSupport::Unsupported));
    }
}

#[cfg(target_arch = "wasm32")]
async fn query_ar_support() -> Result<ArSupport, String> {
    use wasm_bindgen_futures::JsFuture;
    use web_sys::XrSessionMode;

    let window = web_sys::window().ok_or("no window")?;
    let navigator = window.navigator();

    let has_xr = js_sys::Reflect::has(navigator.as_ref(), &"xr".into()).unwrap_or(false);
    if !has_xr {
        return Ok(ArSupport::Unsupported);
    }
    let xr = navigator.xr();

    let immersive = JsFuture::from(xr.is_session_supported(XrSessionMode::ImmersiveAr))
        .await
        .map_err(|e| format!("support query failed: {e:?}"))?;
    if immersive.as_bool() == Some(true) {
        return Ok(ArSupport::ImmersiveAr);
    }

    let inline = JsFuture::from(xr.is_session_supported(XrSessionMode::Inline))
        .await
        .map_err(|e| format!("support query failed: {e:?}"))?;
    if inline.as_bool() == Some(true) {
        return Ok(ArSupport::Inline);
    }

    Ok(ArSupport::Unsupported)
}

/// Drain the support bridge into session state.
fn poll_support(
    bridge: Res<SupportBridge>,
    mut support: ResMut<SupportState>,
    mut status: ResMut<SessionStatus>,
) {
    let Ok(mut cell) = bridge.0.try_lock() else {
        return;
    };
    let Some(result) = cell.take() else {
        return;
    };
    drop(cell);

    match result {
        Ok(found) => {
            tracing::info!(?found, "AR support check complete");
            support.support = Some(found);
            status.0.support_checked(found);
        }
        Err(message) => {
            support.support = Some(ArSupport::Unsupported);
            status.0.fail(SessionError::SupportCheckFailed(message));
        }
    }
}
