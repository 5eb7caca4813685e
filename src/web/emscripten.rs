//! Bindings to an Emscripten `MODULARIZE` build exposing `FS_writeFile`,
//! `FS_readFile`, `FS_unlink` and `ccall`.

use js_sys::{Array, Function, Promise, Reflect, Uint8Array};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

use crate::engine::{CompressCall, Contract, Engine};
use crate::error::CompressionFailure;

#[wasm_bindgen]
extern "C" {
    /// Instance resolved from the module factory's promise.
    #[wasm_bindgen(extends = js_sys::Object)]
    #[derive(Clone, Debug)]
    pub type EmscriptenModule;

    #[wasm_bindgen(method, catch, js_name = FS_writeFile)]
    fn fs_write_file(this: &EmscriptenModule, path: &str, data: &Uint8Array)
        -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = FS_readFile)]
    fn fs_read_file(this: &EmscriptenModule, path: &str) -> Result<Uint8Array, JsValue>;

    #[wasm_bindgen(method, catch, js_name = FS_unlink)]
    fn fs_unlink(this: &EmscriptenModule, path: &str) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch)]
    fn ccall(
        this: &EmscriptenModule,
        ident: &str,
        return_type: &str,
        arg_types: &Array,
        args: &Array,
    ) -> Result<JsValue, JsValue>;
}

pub(crate) fn describe(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            value
                .dyn_ref::<js_sys::Error>()
                .map(|e| String::from(e.message()))
        })
        .unwrap_or_else(|| format!("{:?}", value))
}

pub struct EmscriptenEngine {
    module: EmscriptenModule,
    export: String,
}

impl EmscriptenEngine {
    pub fn new(module: EmscriptenModule, export: impl Into<String>) -> Self {
        Self {
            module,
            export: export.into(),
        }
    }

    /// Calls the global factory and waits for the instance.
    pub async fn load(factory: &str, export: &str) -> Result<Self, CompressionFailure> {
        let unavailable = CompressionFailure::ModuleUnavailable;

        let global = js_sys::global();
        let factory_fn = Reflect::get(&global, &JsValue::from_str(factory))
            .map_err(|e| unavailable(describe(&e)))?
            .dyn_into::<Function>()
            .map_err(|_| unavailable(format!("`{}` is not a function", factory)))?;

        let instance = factory_fn
            .call0(&JsValue::NULL)
            .map_err(|e| unavailable(describe(&e)))?;
        let instance = match instance.dyn_into::<Promise>() {
            Ok(promise) => JsFuture::from(promise)
                .await
                .map_err(|e| unavailable(describe(&e)))?,
            Err(ready) => ready,
        };
        if !instance.is_object() {
            return Err(unavailable(format!("`{}` did not produce a module", factory)));
        }
        log::info!("loaded compression module from `{}`", factory);
        Ok(Self::new(instance.unchecked_into(), export))
    }
}

impl Engine for EmscriptenEngine {
    fn export(&self) -> &str {
        &self.export
    }

    fn write_file(&self, name: &str, bytes: &[u8]) -> Result<(), CompressionFailure> {
        self.module
            .fs_write_file(name, &Uint8Array::from(bytes))
            .map_err(|e| CompressionFailure::Stage {
                name: name.to_string(),
                reason: describe(&e),
            })
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>, CompressionFailure> {
        self.module
            .fs_read_file(name)
            .map(|data| data.to_vec())
            .map_err(|e| CompressionFailure::Fetch {
                name: name.to_string(),
                reason: describe(&e),
            })
    }

    fn remove_file(&self, name: &str) -> Result<(), CompressionFailure> {
        self.module
            .fs_unlink(name)
            .map_err(|e| CompressionFailure::Stage {
                name: name.to_string(),
                reason: describe(&e),
            })
    }

    fn compress(&self, call: &CompressCall<'_>) -> Result<f64, CompressionFailure> {
        let arg_types = Array::of3(&"string".into(), &"string".into(), &"number".into());
        let args = Array::of3(
            &call.source.into(),
            &call.destination.into(),
            &call.quality.into(),
        );
        if call.contract == Contract::LegacyFlag {
            arg_types.push(&"number".into());
            args.push(&JsValue::from(0));
        }

        let returned = self
            .module
            .ccall(&self.export, "number", &arg_types, &args)
            .map_err(|e| CompressionFailure::Call {
                export: self.export.clone(),
                reason: describe(&e),
            })?;

        returned
            .as_f64()
            .or_else(|| returned.as_bool().map(|ok| if ok { 1.0 } else { 0.0 }))
            .ok_or_else(|| CompressionFailure::Call {
                export: self.export.clone(),
                reason: format!("unexpected return value {:?}", returned),
            })
    }
}
