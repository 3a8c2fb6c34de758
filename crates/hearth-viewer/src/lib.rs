//! Hearth Viewer - browser AR house viewer
//!
//! Places a 3D house model in the user's environment through WebXR:
//! capability detection, tier-based quality selection, tap-to-place against
//! hit-tested surfaces, and a one-way adaptive downgrade when the frame
//! rate drops.

mod app;
mod capability;
mod frame;
mod loader;
mod overlay;
mod session;
mod ui;
mod xr;

use wasm_bindgen::prelude::*;

/// WASM entry point
#[wasm_bindgen(start)]
pub fn main() {
    // Set up panic hook for better error messages
    console_error_panic_hook::set_once();

    // Initialize logging with filtering to reduce noise
    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(tracing::Level::INFO)
            .build(),
    );

    // Run the Bevy app
    app::run();
}
