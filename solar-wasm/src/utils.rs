use log::{Level, LevelFilter};
use solar_core::{OrientationUpdate, SolarConfig};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{HtmlCanvasElement, MouseEvent};

/// Level for console_log, which has no "off" level.
fn console_level(filter: LevelFilter) -> Option<Level> {
    filter.to_level()
}

/// Route `log` records to the browser console. Later calls only adjust the level.
pub fn init_logging(filter: LevelFilter) {
    let Some(level) = console_level(filter) else {
        return;
    };
    if console_log::init_with_level(level).is_err() {
        log::set_max_level(filter);
    }
}

pub fn parse_level(name: Option<&str>) -> LevelFilter {
    match name.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("off") => LevelFilter::Off,
        Some("error") => LevelFilter::Error,
        Some("warn") => LevelFilter::Warn,
        Some("debug") => LevelFilter::Debug,
        Some("trace") => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

/// Config from an optional JSON object; missing fields keep their defaults.
pub fn parse_config(json: Option<&str>) -> Result<SolarConfig, String> {
    let config = match json.map(str::trim).filter(|s| !s.is_empty()) {
        Some(text) => serde_json::from_str::<SolarConfig>(text)
            .map_err(|e| format!("Invalid solar config: {e}"))?,
        None => SolarConfig::default(),
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

pub fn parse_orientation_update(json: &str) -> Result<OrientationUpdate, String> {
    let update: OrientationUpdate =
        serde_json::from_str(json).map_err(|e| format!("Invalid orientation update: {e}"))?;
    for (field, value) in [("angle", update.angle), ("azimuth", update.azimuth)] {
        if let Some(v) = value
            && !v.is_finite()
        {
            return Err(format!("{field} must be a finite number"));
        }
    }
    Ok(update)
}

/// Convert client coordinates into canvas pixel coordinates so hit testing
/// works even if CSS scales the canvas element.
pub fn event_canvas_coords(e: &MouseEvent, cv: &HtmlCanvasElement) -> (f64, f64) {
    if let Some(el) = cv.dyn_ref::<web_sys::Element>() {
        let rect = el.get_bounding_client_rect();
        let x = (e.client_x() as f64 - rect.left()) * (cv.width() as f64) / rect.width().max(1.0);
        let y = (e.client_y() as f64 - rect.top()) * (cv.height() as f64) / rect.height().max(1.0);
        (x, y)
    } else {
        (e.offset_x() as f64, e.offset_y() as f64)
    }
}

pub fn to_js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

pub fn to_json<T: serde::Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(to_js_error)
}
