use std::cell::{Cell, RefCell};
use std::rc::Rc;

use solar_core::Session;
use wasm_bindgen::JsValue;

use crate::utils::to_js_error;

/// Session shared between the exported object and the canvas event closures.
///
/// Store notifications only raise a flag; the JS callback runs after the
/// session borrow is released because it is expected to query the session.
#[derive(Clone)]
pub struct SharedSession {
    session: Rc<RefCell<Session>>,
    changed: Rc<Cell<bool>>,
    on_change: Rc<RefCell<Option<js_sys::Function>>>,
}

impl SharedSession {
    pub fn new(mut session: Session) -> Self {
        let changed = Rc::new(Cell::new(false));
        let flag = changed.clone();
        session.subscribe(move || flag.set(true));
        Self {
            session: Rc::new(RefCell::new(session)),
            changed,
            on_change: Rc::new(RefCell::new(None)),
        }
    }

    pub fn set_on_change(&self, callback: Option<js_sys::Function>) {
        self.on_change.replace(callback);
    }

    pub fn read<R>(&self, f: impl FnOnce(&Session) -> R) -> R {
        f(&self.session.borrow())
    }

    /// Run a mutation, then fire the change callback if the roofs changed.
    pub fn update<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        let result = {
            let mut session = self.session.borrow_mut();
            f(&mut session)
        };
        self.flush();
        result
    }

    pub fn try_update<R, E: std::fmt::Display>(
        &self,
        f: impl FnOnce(&mut Session) -> Result<R, E>,
    ) -> Result<R, JsValue> {
        self.update(f).map_err(to_js_error)
    }

    fn flush(&self) {
        if !self.changed.replace(false) {
            return;
        }
        let callback = self.on_change.borrow().clone();
        if let Some(callback) = callback
            && let Err(e) = callback.call0(&JsValue::NULL)
        {
            log::error!("change callback failed: {:?}", e);
        }
    }
}
