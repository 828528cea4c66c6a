use solar_core::{PackingMode, Point, Session, cardinal_direction};
use wasm_bindgen::prelude::*;
use web_sys::HtmlCanvasElement;

mod events;
mod state;
mod utils;

use crate::state::SharedSession;
use crate::utils::{init_logging, parse_config, parse_level, parse_orientation_update, to_json};

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    init_logging(parse_level(None));
}

/// Override the console log level ("error", "warn", "info", "debug", "trace", "off").
#[wasm_bindgen(js_name = setLogLevel)]
pub fn set_log_level(level: &str) {
    log::set_max_level(parse_level(Some(level)));
}

/// Compass label ("East", "South", "West") for an azimuth, if any.
#[wasm_bindgen(js_name = cardinalDirection)]
pub fn cardinal_direction_label(azimuth: f64) -> Option<String> {
    cardinal_direction(azimuth).map(str::to_string)
}

/// Roof drawing session handed to the page script.
///
/// Pointer coordinates are drawing-surface pixels. Getters return JSON strings.
#[wasm_bindgen]
pub struct SolarSession {
    shared: SharedSession,
}

#[wasm_bindgen]
impl SolarSession {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<SolarSession, JsValue> {
        let config = parse_config(config_json.as_deref()).map_err(|e| JsValue::from_str(&e))?;
        log::info!("solar session created. config: {:?}", config);
        Ok(SolarSession {
            shared: SharedSession::new(Session::new(config)),
        })
    }

    /// Called with no arguments after every change to the roofs or their estimates.
    #[wasm_bindgen(js_name = onChange)]
    pub fn on_change(&self, callback: Option<js_sys::Function>) {
        self.shared.set_on_change(callback);
    }

    #[wasm_bindgen(js_name = attachCanvas)]
    pub fn attach_canvas(&self, canvas: &HtmlCanvasElement) -> Result<(), JsValue> {
        events::attach_pointer_handlers(&self.shared, canvas)
    }

    #[wasm_bindgen(js_name = searchSucceeded)]
    pub fn search_succeeded(&self) {
        self.shared.update(|s| s.search_succeeded());
    }

    #[wasm_bindgen(js_name = confirmMap)]
    pub fn confirm_map(&self) -> Result<(), JsValue> {
        self.shared.try_update(|s| s.confirm_map())
    }

    #[wasm_bindgen(js_name = addAnotherRoof)]
    pub fn add_another_roof(&self) -> Result<(), JsValue> {
        self.shared.try_update(|s| s.add_another_roof())
    }

    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&self, x: f64, y: f64) -> Result<String, JsValue> {
        let outcome = self.shared.try_update(|s| s.pointer_down(Point::new(x, y)))?;
        to_json(&outcome)
    }

    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&self, x: f64, y: f64) -> Result<String, JsValue> {
        let outcome = self.shared.try_update(|s| s.pointer_move(Point::new(x, y)))?;
        to_json(&outcome)
    }

    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&self) -> Result<String, JsValue> {
        to_json(&self.shared.update(|s| s.pointer_up()))
    }

    /// Close the outline in progress; returns the new roof index.
    #[wasm_bindgen(js_name = closePolygon)]
    pub fn close_polygon(&self) -> Result<usize, JsValue> {
        self.shared.try_update(|s| s.close_polygon())
    }

    #[wasm_bindgen(js_name = editRoof)]
    pub fn edit_roof(&self, index: usize) -> Result<(), JsValue> {
        self.shared.try_update(|s| s.edit_roof(index))
    }

    #[wasm_bindgen(js_name = doneEditing)]
    pub fn done_editing(&self) -> Result<(), JsValue> {
        self.shared.try_update(|s| s.done_editing())
    }

    /// Drop the outline in progress, or the most recent roof.
    pub fn clear(&self) {
        self.shared.update(|s| s.clear());
    }

    #[wasm_bindgen(js_name = deleteRoof)]
    pub fn delete_roof(&self, index: usize) -> Result<(), JsValue> {
        self.shared.try_update(|s| s.delete_roof(index).map(|_| ()))
    }

    pub fn complete(&self) -> Result<(), JsValue> {
        self.shared.try_update(|s| s.complete())
    }

    pub fn reset(&self) {
        self.shared.update(|s| s.reset());
    }

    /// Apply any of `{"orientation": "landscape"|"portrait", "angle": deg, "azimuth": deg}`.
    #[wasm_bindgen(js_name = updateOrientation)]
    pub fn update_orientation(&self, index: usize, update_json: &str) -> Result<(), JsValue> {
        let update = parse_orientation_update(update_json).map_err(|e| JsValue::from_str(&e))?;
        self.shared.try_update(|s| s.update_orientation(index, &update))
    }

    #[wasm_bindgen(js_name = setRoofTags)]
    pub fn set_roof_tags(
        &self,
        index: usize,
        pitch: Option<String>,
        direction: Option<String>,
    ) -> Result<(), JsValue> {
        self.shared.try_update(|s| s.set_roof_tags(index, pitch, direction))
    }

    /// Placed panel rectangles for one roof; switches counting to exact containment.
    #[wasm_bindgen(js_name = previewLayout)]
    pub fn preview_layout(&self, index: usize) -> Result<String, JsValue> {
        let cells = self.shared.try_update(|s| s.preview_layout(index))?;
        to_json(&cells)
    }

    #[wasm_bindgen(js_name = exactPacking)]
    pub fn exact_packing(&self) -> bool {
        self.shared
            .read(|s| s.store().packing_mode() == PackingMode::Exact)
    }

    #[wasm_bindgen(js_name = roofsJson)]
    pub fn roofs_json(&self) -> Result<String, JsValue> {
        self.shared.read(|s| to_json(&s.store().roofs()))
    }

    #[wasm_bindgen(js_name = aggregateJson)]
    pub fn aggregate_json(&self) -> Result<String, JsValue> {
        self.shared.read(|s| to_json(&s.aggregate()))
    }

    #[wasm_bindgen(js_name = inProgressJson)]
    pub fn in_progress_json(&self) -> Result<String, JsValue> {
        self.shared.read(|s| to_json(&s.in_progress_points()))
    }

    #[wasm_bindgen(js_name = roofLabelPosition)]
    pub fn roof_label_position(&self, index: usize) -> Result<String, JsValue> {
        self.shared.read(|s| {
            let label = s.store().roof(index).and_then(|r| r.label_position());
            to_json(&label)
        })
    }

    #[wasm_bindgen(js_name = activeRoof)]
    pub fn active_roof(&self) -> Option<usize> {
        self.shared.read(|s| s.active_roof())
    }

    /// One of "idle", "mapAdjusting", "drawing", "editing", "completed".
    pub fn state(&self) -> Result<String, JsValue> {
        let kind = self.shared.read(|s| s.state().kind());
        serde_json::to_value(kind)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .ok_or_else(|| JsValue::from_str("unserializable state"))
    }

    #[wasm_bindgen(js_name = hoveringClose)]
    pub fn hovering_close(&self) -> bool {
        self.shared.read(|s| {
            matches!(
                s.state(),
                solar_core::SessionState::Drawing {
                    hovering_close: true,
                    ..
                }
            )
        })
    }

    pub fn hint(&self) -> String {
        self.shared.read(|s| s.hint().to_string())
    }
}
