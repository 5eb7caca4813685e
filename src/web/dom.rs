use futures::FutureExt;
use js_sys::{Array, Uint8Array};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    Blob, BlobPropertyBag, Document, HtmlAnchorElement, HtmlButtonElement, HtmlElement,
    HtmlImageElement, HtmlInputElement, Url, Window,
};

use super::emscripten::describe;
use crate::config::DemoConfig;
use crate::controller::{PendingRead, SourceImage, UiSurface};
use crate::error::CompressionFailure;
use crate::report::ResultView;

fn element<T: JsCast>(document: &Document, id: &str) -> Result<T, JsValue> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("no element with id `{}`", id)))?
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("element `{}` has the wrong type", id)))
}

/// The demo's page controls, looked up by id once at mount.
pub struct DomSurface {
    window: Window,
    pub(crate) input: HtmlInputElement,
    pub(crate) quality: HtmlInputElement,
    quality_label: HtmlElement,
    pub(crate) trigger: HtmlButtonElement,
    download: HtmlAnchorElement,
    preview: HtmlImageElement,
    rate: HtmlElement,
}

impl DomSurface {
    pub fn bind(config: &DemoConfig) -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no global window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document on window"))?;

        Ok(Self {
            input: element(&document, &config.input_id)?,
            quality: element(&document, &config.quality_id)?,
            quality_label: element(&document, &config.quality_label_id)?,
            trigger: element(&document, &config.trigger_id)?,
            download: element(&document, &config.download_id)?,
            preview: element(&document, &config.preview_id)?,
            rate: element(&document, &config.rate_id)?,
            window,
        })
    }
}

impl UiSurface for DomSurface {
    fn selected_file(&self) -> Option<PendingRead> {
        let file = self.input.files()?.get(0)?;
        Some(
            async move {
                let name = file.name();
                let buffer = JsFuture::from(file.array_buffer())
                    .await
                    .map_err(|e| CompressionFailure::ReadSource(describe(&e)))?;
                let bytes = Uint8Array::new(&buffer).to_vec();
                log::debug!("read {} ({} bytes)", name, bytes.len());
                Ok(SourceImage::new(name, bytes))
            }
            .boxed_local(),
        )
    }

    fn quality_value(&self) -> String {
        self.quality.value()
    }

    fn set_quality_label(&self, text: &str) {
        self.quality_label.set_text_content(Some(text));
    }

    fn set_busy(&self, busy: bool) {
        self.trigger.set_disabled(busy);
    }

    fn alert(&self, message: &str) {
        if let Err(e) = self.window.alert_with_message(message) {
            log::warn!("alert failed: {}", describe(&e));
        }
    }

    fn publish(&self, bytes: Vec<u8>, mime: &str) -> Result<String, CompressionFailure> {
        let parts = Array::of1(&Uint8Array::from(bytes.as_slice()));
        let options = BlobPropertyBag::new();
        options.set_type(mime);
        let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &options)
            .map_err(|e| CompressionFailure::Publish(describe(&e)))?;
        Url::create_object_url_with_blob(&blob)
            .map_err(|e| CompressionFailure::Publish(describe(&e)))
    }

    fn show_result(&self, view: &ResultView) {
        self.download.set_href(&view.url);
        self.download.set_download(&view.file_name);
        self.download.set_text_content(Some(&view.download_label));
        if let Err(e) = self.download.style().set_property("display", "inline") {
            log::warn!("could not reveal download link: {}", describe(&e));
        }

        self.rate.set_text_content(Some(&view.metric_label));
        if let Err(e) = self.rate.style().set_property("display", "inline") {
            log::warn!("could not reveal rate label: {}", describe(&e));
        }

        self.preview.set_src(&view.url);
    }
}
