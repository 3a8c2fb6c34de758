//! Model loading: fetch with progress, fallback chain, glTF spawn

use bevy::asset::LoadState;
use bevy::gltf::Gltf;
use bevy::prelude::*;
use std::path::Path;
use std::sync::{Arc, Mutex};

use hearth_core::FallbackChain;
use hearth_scene::model::{HouseAnchor, HouseModel, NormalizeModel};
use hearth_scene::types::LoadProgress;

use crate::app::ModelStaging;

pub struct LoaderPlugin;

impl Plugin for LoaderPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<LoaderState>()
            .init_resource::<FetchBridge>()
            .add_systems(
                Update,
                (
                    poll_progress,
                    poll_fetch,
                    poll_gltf,
                    hearth_scene::model::normalize_house_model,
                ),
            );
    }
}

/// Where the loader is in the candidate chain.
#[derive(Resource, Default)]
pub struct LoaderState {
    pub chain: Option<FallbackChain>,
    pub current_path: Option<String>,
    pub handle: Option<Handle<Gltf>>,
    pub staged: Vec<String>,
    pub spawned: bool,
    /// Every candidate failed; the session controller turns this into the
    /// user-visible load error after teardown.
    pub exhausted: bool,
}

/// Async fetch results and byte progress, written from `spawn_local`.
#[derive(Resource, Clone, Default)]
pub struct FetchBridge {
    pub done: Arc<Mutex<Option<Result<String, String>>>>,
    pub progress: Arc<Mutex<Option<(u64, Option<u64>)>>>,
}

/// Start the chain for this session's tier. Called once at session start.
pub fn begin_loading(
    state: &mut LoaderState,
    bridge: &FetchBridge,
    staging: &ModelStaging,
    chain: FallbackChain,
) {
    state.chain = Some(chain);
    state.handle = None;
    state.spawned = false;
    state.exhausted = false;
    advance_chain(state, bridge, staging);
}

/// Try the next candidate; exhaustion is the load failure.
fn advance_chain(state: &mut LoaderState, bridge: &FetchBridge, staging: &ModelStaging) {
    let Some(chain) = state.chain.as_mut() else {
        return;
    };

    match chain.next() {
        Some(path) => {
            let staged_name = staged_file_name(&path, chain.attempts());
            state.current_path = Some(path.clone());
            spawn_fetch(path, staged_name, bridge, staging);
        }
        None => {
            state.chain = None;
            state.current_path = None;
            state.exhausted = true;
        }
    }
}

/// Name for the staged copy inside the memory source. Keeps the source
/// extension so the glTF loader is selected, and the attempt index so a
/// retried path never collides with a failed stage.
fn staged_file_name(path: &str, attempt: usize) -> String {
    let name = path
        .rsplit('/')
        .next()
        .unwrap_or(path)
        .split('?')
        .next()
        .unwrap_or("model.glb");
    if name.contains('.') {
        format!("{attempt:02}-{name}")
    } else {
        format!("{attempt:02}-model.glb")
    }
}

#[allow(unused_variables)]
fn spawn_fetch(path: String, staged_name: String, bridge: &FetchBridge, staging: &ModelStaging) {
    #[cfg(target_arch = "wasm32")]
    {
        let done = bridge.done.clone();
        let progress = bridge.progress.clone();
        let dir = staging.0.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let result = match fetch_bytes(&path, &progress).await {
                Ok(bytes) => {
                    tracing::info!(path = %path, bytes = bytes.len(), "model fetched");
                    dir.insert_asset(Path::new(&staged_name), bytes);
                    Ok(staged_name)
                }
                Err(message) => {
                    tracing::warn!(path = %path, "model fetch failed: {}", message);
                    Err(message)
                }
            };
            *done.lock().unwrap() = Some(result);
        });
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        *bridge.done.lock().unwrap() = Some(Err("model fetch unavailable off-web".to_string()));
    }
}

/// Stream the response body so the UI can show bytes-loaded / total.
#[cfg(target_arch = "wasm32")]
async fn fetch_bytes(
    url: &str,
    progress: &Arc<Mutex<Option<(u64, Option<u64>)>>>,
) -> Result<Vec<u8>, String> {
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;

    let window = web_sys::window().ok_or("no window")?;

    let resp: web_sys::Response = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(|e| format!("fetch failed: {e:?}"))?
        .dyn_into()
        .map_err(|_| "response cast failed")?;

    if !resp.ok() {
        return Err(format!("HTTP {}: {}", resp.status(), resp.status_text()));
    }

    let total = resp
        .headers()
        .get("Content-Length")
        .ok()
        .flatten()
        .and_then(|v| v.parse::<u64>().ok());

    let body = resp.body().ok_or("response had no body")?;
    let reader: web_sys::ReadableStreamDefaultReader = body
        .get_reader()
        .dyn_into()
        .map_err(|_| "stream reader cast failed")?;

    let mut bytes = Vec::new();
    loop {
        let chunk = JsFuture::from(reader.read())
            .await
            .map_err(|e| format!("stream read failed: {e:?}"))?;
        let done = js_sys::Reflect::get(&chunk, &"done".into())
            .ok()
            .and_then(|v| v.as_bool())
            .unwrap_or(true);
        if done {
            break;
        }
        let value = js_sys::Reflect::get(&chunk, &"value".into())
            .map_err(|e| format!("stream chunk failed: {e:?}"))?;
        let array = js_sys::Uint8Array::new(&value);
        let offset = bytes.len();
        bytes.resize(offset + array.length() as usize, 0);
        array.copy_to(&mut bytes[offset..]);

        *progress.lock().unwrap() = Some((bytes.len() as u64, total));
    }

    Ok(bytes)
}

/// Surface byte progress to the UI resource.
fn poll_progress(bridge: Res<FetchBridge>, mut progress: ResMut<LoadProgress>) {
    let Ok(mut cell) = bridge.progress.try_lock() else {
        return;
    };
    if let Some((loaded, total)) = cell.take() {
        progress.bytes_loaded = loaded;
        progress.bytes_total = total;
    }
}

/// Completed fetches: hand staged bytes to the asset server, or advance the
/// chain on failure.
fn poll_fetch(
    bridge: Res<FetchBridge>,
    mut state: ResMut<LoaderState>,
    staging: Res<ModelStaging>,
    asset_server: Res<AssetServer>,
) {
    let Ok(mut cell) = bridge.done.try_lock() else {
        return;
    };
    let Some(result) = cell.take() else {
        return;
    };
    drop(cell);

    match result {
        Ok(staged_name) => {
            let handle: Handle<Gltf> = asset_server.load(format!("fetched://{staged_name}"));
            state.staged.push(staged_name);
            state.handle = Some(handle);
        }
        Err(_) => advance_chain(&mut state, &bridge, &staging),
    }
}

/// Check loading state and spawn the scene from a loaded glTF.
fn poll_gltf(
    mut commands: Commands,
    mut state: ResMut<LoaderState>,
    bridge: Res<FetchBridge>,
    staging: Res<ModelStaging>,
    asset_server: Res<AssetServer>,
    gltf_assets: Res<Assets<Gltf>>,
) {
    let Some(handle) = state.handle.clone() else {
        return;
    };

    match asset_server.get_load_state(handle.id()) {
        Some(LoadState::Loaded) => {
            state.handle = None;
            let Some(gltf) = gltf_assets.get(&handle) else {
                return;
            };
            let scene = gltf
                .default_scene
                .clone()
                .or_else(|| gltf.scenes.first().cloned());
            match scene {
                Some(scene_handle) => {
                    let path = state.current_path.take().unwrap_or_default();
                    tracing::info!(path = %path, "model ready");
                    spawn_house(&mut commands, scene_handle);
                    state.chain = None;
                    state.spawned = true;
                }
                None => {
                    tracing::warn!("glTF contained no scenes");
                    advance_chain(&mut state, &bridge, &staging);
                }
            }
        }
        Some(LoadState::Failed(_)) => {
            tracing::warn!("glTF parse failed");
            state.handle = None;
            advance_chain(&mut state, &bridge, &staging);
        }
        _ => {
            // still loading
        }
    }
}

/// The anchor carries placement; the child scene root carries the
/// normalization transform. Starts hidden and unplaced.
fn spawn_house(commands: &mut Commands, scene: Handle<Scene>) {
    commands
        .spawn((HouseAnchor, Transform::IDENTITY, Visibility::Hidden))
        .with_children(|parent| {
            parent.spawn((
                SceneRoot(scene),
                HouseModel,
                NormalizeModel,
                Transform::IDENTITY,
                Visibility::Inherited,
            ));
        });
}

/// Drop staged bytes and any in-flight handle at session end.
pub fn teardown_loader(
    state: &mut LoaderState,
    progress: &mut LoadProgress,
    staging: &ModelStaging,
) {
    for name in state.staged.drain(..) {
        // overwrite with an empty buffer; the memory source keeps the entry
        // but the decoded bytes are released
        staging.0.insert_asset(Path::new(&name), Vec::<u8>::new());
    }
    state.chain = None;
    state.current_path = None;
    state.handle = None;
    state.spawned = false;
    state.exhausted = false;
    progress.reset();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staged_names_keep_extension_and_attempt() {
        assert_eq!(staged_file_name("models/house.glb", 1), "01-house.glb");
        assert_eq!(
            staged_file_name("https://cdn.example.com/h.gltf?v=2", 3),
            "03-h.gltf"
        );
        assert_eq!(staged_file_name("models/house", 2), "02-model.glb");
    }
}
