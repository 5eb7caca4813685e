//! Browser entry points.

mod dom;
mod emscripten;

use std::rc::Rc;
use std::sync::Once;

use futures::FutureExt;
use js_sys::Promise;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::EventTarget;

pub use dom::DomSurface;
pub use emscripten::{EmscriptenEngine, EmscriptenModule};

use crate::config::DemoConfig;
use crate::controller::{Controller, RunOutcome};
use crate::error::ConfigError;
use crate::readiness::ModuleCell;

type PageController = Controller<EmscriptenEngine, DomSurface>;

#[wasm_bindgen(start)]
pub fn start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

static LOGGER: Once = Once::new();

/// Routes `log` records to the browser console. The console logger is
/// installed once; later calls only change the level.
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging(level: &str) {
    let config = DemoConfig {
        log_level: level.to_string(),
        ..DemoConfig::default()
    };
    // the installed logger passes everything, `max_level` does the filtering
    LOGGER.call_once(|| wasm_logger::init(wasm_logger::Config::new(log::Level::Trace)));
    log::set_max_level(config.level().to_level_filter());
}

#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Parses the constructor argument; `undefined` and `null` mean defaults.
pub fn parse_config(value: JsValue) -> Result<DemoConfig, ConfigError> {
    let config = if value.is_undefined() || value.is_null() {
        DemoConfig::default()
    } else {
        serde_wasm_bindgen::from_value(value).map_err(|e| ConfigError::Parse(e.to_string()))?
    };
    config.validate()?;
    Ok(config)
}

struct Listener {
    target: EventTarget,
    event: &'static str,
    callback: Closure<dyn FnMut()>,
}

/// The demo mounted on the current page.
#[wasm_bindgen]
pub struct CompressionDemo {
    controller: Rc<PageController>,
    listeners: Vec<Listener>,
}

#[wasm_bindgen]
impl CompressionDemo {
    /// Binds the page controls and starts loading the compression module.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<CompressionDemo, JsValue> {
        let config = parse_config(config).map_err(|e| JsValue::from(JsError::new(&e.to_string())))?;
        init_logging(&config.log_level);

        let ui = DomSurface::bind(&config)?;
        let factory = config.module_factory.clone();
        let export = config.compress_export.clone();
        let module = Rc::new(ModuleCell::new(
            async move {
                EmscriptenEngine::load(&factory, &export)
                    .await
                    .map(Rc::new)
            }
            .boxed_local(),
        ));
        let controller = Rc::new(Controller::new(config, module, ui));

        let mut demo = CompressionDemo {
            controller,
            listeners: Vec::new(),
        };
        demo.wire()?;

        let warm = Rc::clone(&demo.controller);
        warm.module().start();
        wasm_bindgen_futures::spawn_local(async move {
            let _ = warm.module().get().await;
        });

        demo.controller.update_quality_label();
        log::info!("compression demo mounted");
        Ok(demo)
    }

    /// Runs one compression, as if the trigger was clicked. Resolves to the
    /// space saved in percent, or `null` when a run was already in flight.
    pub fn compress(&self) -> Promise {
        let controller = Rc::clone(&self.controller);
        wasm_bindgen_futures::future_to_promise(async move {
            match controller.trigger().await {
                Ok(RunOutcome::Completed(report)) => {
                    Ok(JsValue::from_f64(report.space_saved_percent()))
                }
                Ok(RunOutcome::Busy) => Ok(JsValue::NULL),
                Err(e) => Err(JsError::new(&e.to_string()).into()),
            }
        })
    }

    /// Resolves once the compression module has loaded.
    pub fn ready(&self) -> Promise {
        let controller = Rc::clone(&self.controller);
        wasm_bindgen_futures::future_to_promise(async move {
            controller
                .module()
                .get()
                .await
                .map(|_| JsValue::UNDEFINED)
                .map_err(|e| JsError::new(&e.to_string()).into())
        })
    }

    /// `"uninitialized"`, `"initializing"`, `"ready"` or `"failed"`.
    pub fn lifecycle(&self) -> String {
        self.controller.module().lifecycle().to_string()
    }

    #[wasm_bindgen(js_name = isBusy)]
    pub fn is_busy(&self) -> bool {
        self.controller.is_busy()
    }
}

impl CompressionDemo {
    fn wire(&mut self) -> Result<(), JsValue> {
        let slider = Rc::clone(&self.controller);
        let target: EventTarget = self.controller.ui().quality.clone().into();
        self.listen(target, "input", move || slider.update_quality_label())?;

        let runner = Rc::clone(&self.controller);
        let target: EventTarget = self.controller.ui().trigger.clone().into();
        self.listen(target, "click", move || {
            let runner = Rc::clone(&runner);
            wasm_bindgen_futures::spawn_local(async move {
                let _ = runner.trigger().await;
            });
        })
    }

    fn listen(
        &mut self,
        target: EventTarget,
        event: &'static str,
        handler: impl FnMut() + 'static,
    ) -> Result<(), JsValue> {
        let callback = Closure::wrap(Box::new(handler) as Box<dyn FnMut()>);
        target.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())?;
        self.listeners.push(Listener {
            target,
            event,
            callback,
        });
        Ok(())
    }
}

impl Drop for CompressionDemo {
    fn drop(&mut self) {
        for listener in self.listeners.drain(..) {
            let _ = listener.target.remove_event_listener_with_callback(
                listener.event,
                listener.callback.as_ref().unchecked_ref(),
            );
        }
    }
}
