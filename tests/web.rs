#![cfg(target_arch = "wasm32")]

use js_sys::{Array, Function, Object, Reflect, Uint8Array};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::*;
use web_sys::{
    DataTransfer, Document, Element, Event, File, HtmlAnchorElement, HtmlButtonElement,
    HtmlElement, HtmlImageElement, HtmlInputElement,
};

use jpeg_compress_demo::web::{init_logging, parse_config, CompressionDemo, EmscriptenEngine};
use jpeg_compress_demo::{CompressCall, CompressionFailure, ConfigError, Contract, Engine};

wasm_bindgen_test_configure!(run_in_browser);

/// A stand-in for an Emscripten module instance with an in-memory FS.
fn fake_module() -> JsValue {
    let module = Object::new();
    let set = |name: &str, args: &str, body: &str| {
        Reflect::set(
            &module,
            &JsValue::from_str(name),
            &Function::new_with_args(args, body),
        )
        .unwrap();
    };
    set(
        "FS_writeFile",
        "path, data",
        "this.files = this.files || {}; this.files[path] = data;",
    );
    set(
        "FS_readFile",
        "path",
        "if (!this.files || !(path in this.files)) { throw new Error('ENOENT: ' + path); } \
         return this.files[path];",
    );
    set(
        "FS_unlink",
        "path",
        "if (!this.files || !(path in this.files)) { throw new Error('ENOENT: ' + path); } \
         delete this.files[path];",
    );
    // `result` overrides the returned fraction; `triggerId` records whether
    // that button was disabled during the call
    set(
        "ccall",
        "ident, ret, types, args",
        "if (this.triggerId) { this.busySeen = document.getElementById(this.triggerId).disabled; } \
         if (!this.files || !(args[0] in this.files)) { return types.length === 3 ? -1 : 0; } \
         this.files[args[1]] = this.files[args[0]].slice(0, 2); \
         if (types.length !== 3) { return 1; } \
         return 'result' in this ? this.result : 0.5;",
    );
    module.into()
}

#[wasm_bindgen_test]
fn undefined_config_uses_defaults() {
    let config = parse_config(JsValue::UNDEFINED).unwrap();
    assert_eq!(config.output_name, "out.jpg");
    assert_eq!(config.module_factory, "MozJPEG");
}

#[wasm_bindgen_test]
fn partial_config_overrides_fields() {
    let value = Object::new();
    Reflect::set(&value, &"outputName".into(), &"small.jpg".into()).unwrap();
    Reflect::set(&value, &"contract".into(), &"legacy-flag".into()).unwrap();

    let config = parse_config(value.into()).unwrap();
    assert_eq!(config.output_name, "small.jpg");
    assert_eq!(config.contract, Contract::LegacyFlag);
    assert_eq!(config.trigger_id, "compress");
}

#[wasm_bindgen_test]
fn invalid_config_is_rejected() {
    let value = Object::new();
    Reflect::set(&value, &"defaultQuality".into(), &JsValue::from(400)).unwrap();
    assert!(matches!(
        parse_config(value.into()),
        Err(ConfigError::QualityOutOfRange(400))
    ));
}

#[wasm_bindgen_test]
fn engine_round_trips_through_module_fs() {
    let engine = EmscriptenEngine::new(fake_module().unchecked_into(), "wasm_compress");
    engine.write_file("cat.jpg", &[1, 2, 3, 4]).unwrap();

    let raw = engine
        .compress(&CompressCall {
            source: "cat.jpg",
            destination: "out.jpg",
            quality: 80,
            contract: Contract::ReductionFraction,
        })
        .unwrap();
    assert_eq!(raw, 0.5);
    assert_eq!(engine.read_file("out.jpg").unwrap(), vec![1, 2]);

    let flag = engine
        .compress(&CompressCall {
            source: "cat.jpg",
            destination: "out.jpg",
            quality: 80,
            contract: Contract::LegacyFlag,
        })
        .unwrap();
    assert_eq!(flag, 1.0);
}

#[wasm_bindgen_test]
fn missing_staged_output_is_a_fetch_failure() {
    let engine = EmscriptenEngine::new(fake_module().unchecked_into(), "wasm_compress");
    assert!(matches!(
        engine.read_file("out.jpg"),
        Err(CompressionFailure::Fetch { .. })
    ));
}

#[wasm_bindgen_test]
fn unlinked_input_is_gone() {
    let engine = EmscriptenEngine::new(fake_module().unchecked_into(), "wasm_compress");
    engine.write_file("cat.jpg", &[1, 2, 3]).unwrap();
    engine.remove_file("cat.jpg").unwrap();
    assert!(matches!(
        engine.read_file("cat.jpg"),
        Err(CompressionFailure::Fetch { .. })
    ));
    assert!(matches!(
        engine.remove_file("cat.jpg"),
        Err(CompressionFailure::Stage { .. })
    ));
}

#[wasm_bindgen_test]
fn logging_level_can_change_after_install() {
    init_logging("warn");
    assert_eq!(log::max_level(), log::LevelFilter::Warn);
    init_logging("debug");
    assert_eq!(log::max_level(), log::LevelFilter::Debug);
    init_logging("info");
    assert_eq!(log::max_level(), log::LevelFilter::Info);
}

#[wasm_bindgen_test]
async fn missing_factory_leaves_module_unavailable() {
    let err = EmscriptenEngine::load("NoSuchFactory", "wasm_compress")
        .await
        .err()
        .unwrap();
    assert!(matches!(err, CompressionFailure::ModuleUnavailable(_)));
}

fn document() -> Document {
    web_sys::window().unwrap().document().unwrap()
}

fn create<T: JsCast>(tag: &str, id: &str) -> T {
    let element = document().create_element(tag).unwrap();
    element.set_id(id);
    document().body().unwrap().append_child(&element).unwrap();
    element.dyn_into::<T>().unwrap()
}

fn display(element: &HtmlElement) -> String {
    element.style().get_property_value("display").unwrap()
}

/// The demo controls under `<prefix>-*` ids, plus a fake module factory
/// registered as `<prefix>Factory` and an `alert` that records messages.
struct Page {
    prefix: String,
    module: Object,
    alerts: Array,
    input: HtmlInputElement,
    quality: HtmlInputElement,
    label: HtmlElement,
    trigger: HtmlButtonElement,
    download: HtmlAnchorElement,
    preview: HtmlImageElement,
    rate: HtmlElement,
}

impl Page {
    fn new(prefix: &str) -> Self {
        let id = |name: &str| format!("{}-{}", prefix, name);

        let input: HtmlInputElement = create("input", &id("input"));
        input.set_type("file");
        let quality: HtmlInputElement = create("input", &id("quality"));
        quality.set_type("range");
        quality.set_min("1");
        quality.set_max("100");
        quality.set_value("75");
        let label: HtmlElement = create("span", &id("qval"));
        let trigger: HtmlButtonElement = create("button", &id("compress"));
        let download: HtmlAnchorElement = create("a", &id("download"));
        download.style().set_property("display", "none").unwrap();
        let preview: HtmlImageElement = create("img", &id("preview"));
        let rate: HtmlElement = create("span", &id("rate"));
        rate.style().set_property("display", "none").unwrap();

        let module: Object = fake_module().unchecked_into();
        Reflect::set(&module, &"triggerId".into(), &id("compress").into()).unwrap();
        let factory = Function::new_with_args("m", "return () => Promise.resolve(m);")
            .call1(&JsValue::NULL, &module)
            .unwrap();
        Reflect::set(&js_sys::global(), &format!("{}Factory", prefix).into(), &factory).unwrap();

        let alerts = Array::new();
        let alert = Function::new_with_args("alerts", "return (msg) => { alerts.push(msg); };")
            .call1(&JsValue::NULL, &alerts)
            .unwrap();
        Reflect::set(&web_sys::window().unwrap(), &"alert".into(), &alert).unwrap();

        Self {
            prefix: prefix.to_string(),
            module,
            alerts,
            input,
            quality,
            label,
            trigger,
            download,
            preview,
            rate,
        }
    }

    fn config(&self) -> JsValue {
        let config = Object::new();
        for (key, name) in [
            ("inputId", "input"),
            ("qualityId", "quality"),
            ("qualityLabelId", "qval"),
            ("triggerId", "compress"),
            ("downloadId", "download"),
            ("previewId", "preview"),
            ("rateId", "rate"),
        ] {
            let id = format!("{}-{}", self.prefix, name);
            Reflect::set(&config, &key.into(), &id.into()).unwrap();
        }
        let factory = format!("{}Factory", self.prefix);
        Reflect::set(&config, &"moduleFactory".into(), &factory.into()).unwrap();
        config.into()
    }

    fn select(&self, name: &str, bytes: &[u8]) {
        let parts = Array::of1(&Uint8Array::from(bytes));
        let file = File::new_with_u8_array_sequence(&parts, name).unwrap();
        let transfer = DataTransfer::new().unwrap();
        transfer.items().add_with_file(&file).unwrap();
        self.input.set_files(transfer.files().as_ref());
    }

    fn slide(&self, value: &str) {
        self.quality.set_value(value);
        self.quality
            .dispatch_event(&Event::new("input").unwrap())
            .unwrap();
    }

    fn alerts(&self) -> Vec<String> {
        self.alerts.iter().filter_map(|a| a.as_string()).collect()
    }

    fn busy_seen(&self) -> JsValue {
        Reflect::get(&self.module, &"busySeen".into()).unwrap()
    }
}

impl Drop for Page {
    fn drop(&mut self) {
        for element in [
            self.input.unchecked_ref::<Element>(),
            self.quality.unchecked_ref(),
            self.label.unchecked_ref(),
            self.trigger.unchecked_ref(),
            self.download.unchecked_ref(),
            self.preview.unchecked_ref(),
            self.rate.unchecked_ref(),
        ] {
            element.remove();
        }
        let factory = format!("{}Factory", self.prefix);
        let _ = Reflect::delete_property(&js_sys::global(), &factory.into());
    }
}

#[wasm_bindgen_test]
async fn compression_publishes_download_preview_and_rate() {
    let page = Page::new("published");
    let demo = CompressionDemo::new(page.config()).unwrap();
    JsFuture::from(demo.ready()).await.unwrap();
    assert_eq!(demo.lifecycle(), "ready");

    page.select("cat.png", &[9; 2048]);
    let saved = JsFuture::from(demo.compress()).await.unwrap();
    assert_eq!(saved.as_f64(), Some(50.0));

    let href = page.download.href();
    assert!(href.starts_with("blob:"), "href was {}", href);
    assert_eq!(page.download.download(), "out.jpg");
    assert_eq!(page.download.text_content().unwrap(), "Download JPEG (0 kB)");
    assert_eq!(display(&page.download), "inline");
    assert_eq!(page.preview.src(), href);
    assert_eq!(page.rate.text_content().unwrap(), "Space saved: 50.0%");
    assert_eq!(display(&page.rate), "inline");

    // the trigger is disabled during the call and enabled again after
    assert_eq!(page.busy_seen(), JsValue::TRUE);
    assert!(!page.trigger.disabled());
    assert!(!demo.is_busy());
    assert!(page.alerts().is_empty());
}

#[wasm_bindgen_test]
async fn failed_compression_leaves_download_hidden() {
    let page = Page::new("rejected");
    Reflect::set(&page.module, &"result".into(), &JsValue::from(-1)).unwrap();
    let demo = CompressionDemo::new(page.config()).unwrap();
    JsFuture::from(demo.ready()).await.unwrap();

    page.select("cat.png", &[9; 2048]);
    assert!(JsFuture::from(demo.compress()).await.is_err());

    assert_eq!(page.download.href(), "");
    assert_eq!(display(&page.download), "none");
    assert_eq!(page.preview.src(), "");
    assert_eq!(display(&page.rate), "none");
    assert_eq!(page.alerts(), vec!["Compression failed."]);
    assert!(!page.trigger.disabled());
}

#[wasm_bindgen_test]
async fn compressing_without_a_file_alerts() {
    let page = Page::new("empty");
    let demo = CompressionDemo::new(page.config()).unwrap();

    assert!(JsFuture::from(demo.compress()).await.is_err());
    assert_eq!(page.alerts(), vec!["Select an image first."]);
    assert_eq!(page.busy_seen(), JsValue::UNDEFINED);
    assert!(!page.trigger.disabled());
}

#[wasm_bindgen_test]
fn slider_label_follows_until_demo_is_dropped() {
    let page = Page::new("slider");
    let demo = CompressionDemo::new(page.config()).unwrap();
    assert_eq!(page.label.text_content().unwrap(), "75");

    page.slide("42");
    assert_eq!(page.label.text_content().unwrap(), "42");

    drop(demo);
    page.slide("13");
    assert_eq!(page.label.text_content().unwrap(), "42");
}
