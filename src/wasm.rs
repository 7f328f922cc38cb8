use wasm_bindgen::prelude::*;

use crate::config::LayoutConfig;

#[wasm_bindgen]
pub fn strip_spacers(html: &str) -> String {
    crate::strip_spacers(html)
}

/// Paginate `html` with a JSON layout config (empty string for defaults).
/// Returns `{ "html": ..., "pages": n }` as JSON.
#[wasm_bindgen]
pub fn paginate_html(html: &str, config_json: &str) -> Result<String, JsValue> {
    let config = if config_json.trim().is_empty() {
        LayoutConfig::default()
    } else {
        LayoutConfig::from_json(config_json).map_err(|e| JsValue::from_str(&e.to_string()))?
    };
    let (html, pages) =
        crate::paginate_html(html, &config).map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(serde_json::json!({ "html": html, "pages": pages }).to_string())
}
