//! Injected DOM control for session entry
//!
//! WebXR session requests must run inside a user-activation callback, so
//! the start control is a real DOM button rather than an egui widget; its
//! click handler both flags the controller and issues the session request.

use bevy::prelude::*;
use std::sync::{Arc, Mutex};

use crate::xr::XrBridge;

const ENTER_BUTTON_ID: &str = "hearth-enter-ar";

/// How the click handler should enter the session.
#[derive(Debug, Clone, Copy)]
pub struct StartMode {
    /// Request a WebXR session (false for the inline fallback).
    pub xr: bool,
    pub require_hit_test: bool,
}

/// Tracks the injected control so removal happens exactly once.
#[derive(Resource, Clone, Default)]
pub struct StartControl {
    pub injected: bool,
    pub clicked: Arc<Mutex<bool>>,
}

impl StartControl {
    pub fn take_click(&self) -> bool {
        let mut clicked = self.clicked.lock().unwrap();
        std::mem::take(&mut *clicked)
    }
}

/// Create the button and append it to the document body.
#[allow(unused_variables)]
pub fn inject_start_button(control: &mut StartControl, bridge: &XrBridge, mode: StartMode) {
    if control.injected {
        return;
    }
    control.injected = true;

    #[cfg(target_arch = "wasm32")]
    {
        use wasm_bindgen::prelude::*;
        use wasm_bindgen::JsCast;

        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };

        let button: web_sys::HtmlButtonElement = match document
            .create_element("button")
            .ok()
            .and_then(|el| el.dyn_into().ok())
        {
            Some(button) => button,
            None => {
                tracing::error!("failed to create session entry button");
                return;
            }
        };

        button.set_id(ENTER_BUTTON_ID);
        button.set_text_content(Some(if mode.xr { "Enter AR" } else { "View model" }));
        let style = button.style();
        let _ = style.set_property("position", "absolute");
        let _ = style.set_property("bottom", "24px");
        let _ = style.set_property("left", "50%");
        let _ = style.set_property("transform", "translateX(-50%)");
        let _ = style.set_property("padding", "12px 28px");
        let _ = style.set_property("z-index", "10");

        let clicked = control.clicked.clone();
        let xr_bridge = bridge.clone();
        let closure = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            *clicked.lock().unwrap() = true;
            if mode.xr {
                // must happen inside the activation callback
                crate::xr::request_session(&xr_bridge, mode.require_hit_test);
            }
        }) as Box<dyn FnMut(_)>);
        button.set_onclick(Some(closure.as_ref().unchecked_ref()));
        closure.forget();

        let Some(body) = document.body() else {
            return;
        };
        if let Err(e) = body.append_child(&button) {
            tracing::error!("failed to inject session entry button: {:?}", e);
        }
    }
}

/// Hide without removing: the session is live but teardown still owns the
/// single removal.
pub fn hide_start_button() {
    #[cfg(target_arch = "wasm32")]
    {
        if let Some(button) = find_button() {
            let _ = button.style().set_property("display", "none");
        }
    }
}

pub fn show_start_button() {
    #[cfg(target_arch = "wasm32")]
    {
        if let Some(button) = find_button() {
            let _ = button.style().set_property("display", "block");
        }
    }
}

/// Remove the control from the DOM. Returns whether this call performed the
/// removal; tolerates the node already being gone.
pub fn remove_start_button(control: &mut StartControl) -> bool {
    if !control.injected {
        return false;
    }
    control.injected = false;
    *control.clicked.lock().unwrap() = false;

    #[cfg(target_arch = "wasm32")]
    {
        if let Some(button) = find_button() {
            if let Some(parent) = button.parent_node() {
                let _ = parent.remove_child(&button);
            }
        }
    }
    true
}

#[cfg(target_arch = "wasm32")]
fn find_button() -> Option<web_sys::HtmlElement> {
    use wasm_bindgen::JsCast;

    web_sys::window()?
        .document()?
        .get_element_by_id(ENTER_BUTTON_ID)?
        .dyn_into()
        .ok()
}
