use log::warn;
use solar_core::Point;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{HtmlCanvasElement, MouseEvent};

use crate::state::SharedSession;
use crate::utils::event_canvas_coords;

// Wires mousedown/mousemove/mouseup on the drawing canvas into the session.
pub fn attach_pointer_handlers(
    shared: &SharedSession,
    canvas: &HtmlCanvasElement,
) -> Result<(), JsValue> {
    {
        let st = shared.clone();
        let cv = canvas.clone();
        let mousedown = Closure::<dyn FnMut(MouseEvent)>::wrap(Box::new(move |e: MouseEvent| {
            let p = Point::from(event_canvas_coords(&e, &cv));
            if let Err(err) = st.update(|s| s.pointer_down(p)) {
                warn!("pointer down failed: {err}");
            }
        }));
        canvas.add_event_listener_with_callback("mousedown", mousedown.as_ref().unchecked_ref())?;
        mousedown.forget();
    }
    {
        let st = shared.clone();
        let cv = canvas.clone();
        let mousemove = Closure::<dyn FnMut(MouseEvent)>::wrap(Box::new(move |e: MouseEvent| {
            let p = Point::from(event_canvas_coords(&e, &cv));
            if let Err(err) = st.update(|s| s.pointer_move(p)) {
                warn!("pointer move failed: {err}");
            }
        }));
        canvas.add_event_listener_with_callback("mousemove", mousemove.as_ref().unchecked_ref())?;
        mousemove.forget();
    }
    {
        let st = shared.clone();
        let mouseup = Closure::<dyn FnMut(MouseEvent)>::wrap(Box::new(move |_e: MouseEvent| {
            st.update(|s| s.pointer_up());
        }));
        canvas.add_event_listener_with_callback("mouseup", mouseup.as_ref().unchecked_ref())?;
        mouseup.forget();
    }
    Ok(())
}
