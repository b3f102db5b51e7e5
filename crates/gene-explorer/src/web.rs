#![cfg(target_arch = "wasm32")]

use crate::config::ExplorerConfig;
use crate::create_app;
use eframe::WebRunner;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::*;

/// Launch the explorer inside the canvas referenced by `index.html`.
/// The graph data service is expected on the page's own origin.
#[wasm_bindgen]
pub async fn start() -> Result<(), JsValue> {
    use web_sys::HtmlCanvasElement;

    console_error_panic_hook::set_once();

    let window = web_sys::window().ok_or("No window")?;
    let document = window.document().ok_or("No document")?;

    let canvas = document
        .get_element_by_id("the_canvas_id")
        .ok_or("Canvas not found")?
        .dyn_into::<HtmlCanvasElement>()?;

    let mut config = ExplorerConfig::default();
    if let Ok(origin) = window.location().origin() {
        config.service.base_url = origin;
    }

    let web_options = eframe::WebOptions::default();

    WebRunner::new()
        .start(
            canvas,
            web_options,
            Box::new(|cc| Ok(Box::new(create_app(cc, config)))),
        )
        .await
}
