//! The compression workflow behind the demo page.
//!
//! One run is: check a file is selected, read it, wait for the module, stage
//! the bytes, call the compressor, read the staged output back and publish it.
//! Runs never overlap; a trigger arriving mid-run is refused.

use std::cell::Cell;
use std::rc::Rc;

use futures::future::LocalBoxFuture;

use crate::config::DemoConfig;
use crate::engine::{CompressCall, CompressReport, Engine};
use crate::error::{CompressionFailure, DemoError};
use crate::readiness::ModuleCell;
use crate::report::ResultView;

/// Bytes of the file the user picked.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceImage {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SourceImage {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

pub type PendingRead = LocalBoxFuture<'static, Result<SourceImage, CompressionFailure>>;

/// The page controls the controller drives.
pub trait UiSurface {
    /// Starts reading the selected file, or `None` when nothing is selected.
    fn selected_file(&self) -> Option<PendingRead>;

    /// Current slider value, as displayed.
    fn quality_value(&self) -> String;

    fn set_quality_label(&self, text: &str);

    /// Disables the trigger while a run is in flight.
    fn set_busy(&self, busy: bool);

    fn alert(&self, message: &str);

    /// Wraps the output in a blob and returns its object URL.
    fn publish(&self, bytes: Vec<u8>, mime: &str) -> Result<String, CompressionFailure>;

    fn show_result(&self, view: &ResultView);
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(CompressReport),
    /// Another run was already in flight.
    Busy,
}

/// Marks the controller busy until dropped, on every exit path.
struct BusyGuard<'a, U: UiSurface + ?Sized> {
    flag: &'a Cell<bool>,
    ui: &'a U,
}

impl<'a, U: UiSurface + ?Sized> BusyGuard<'a, U> {
    fn acquire(flag: &'a Cell<bool>, ui: &'a U) -> Option<Self> {
        if flag.replace(true) {
            return None;
        }
        ui.set_busy(true);
        Some(Self { flag, ui })
    }
}

impl<U: UiSurface + ?Sized> Drop for BusyGuard<'_, U> {
    fn drop(&mut self) {
        self.flag.set(false);
        self.ui.set_busy(false);
    }
}

pub struct Controller<E: Engine + 'static, U: UiSurface> {
    config: DemoConfig,
    module: Rc<ModuleCell<Rc<E>>>,
    ui: U,
    busy: Cell<bool>,
}

impl<E: Engine + 'static, U: UiSurface> Controller<E, U> {
    pub fn new(config: DemoConfig, module: Rc<ModuleCell<Rc<E>>>, ui: U) -> Self {
        Self {
            config,
            module,
            ui,
            busy: Cell::new(false),
        }
    }

    pub fn config(&self) -> &DemoConfig {
        &self.config
    }

    pub fn module(&self) -> &Rc<ModuleCell<Rc<E>>> {
        &self.module
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn is_busy(&self) -> bool {
        self.busy.get()
    }

    /// Mirrors the slider into its label. Called on every slider change.
    pub fn update_quality_label(&self) {
        self.ui.set_quality_label(&self.ui.quality_value());
    }

    /// Runs once and reports any error to the user.
    pub async fn trigger(&self) -> Result<RunOutcome, DemoError> {
        let result = self.execute().await;
        if let Err(err) = &result {
            if let DemoError::Compression(failure) = err {
                log::error!("compression failed: {}", failure);
            }
            self.ui.alert(err.user_message());
        }
        result
    }

    /// Runs once without reporting. On error the previous result stays on
    /// the page.
    pub async fn execute(&self) -> Result<RunOutcome, DemoError> {
        if self.busy.get() {
            log::warn!("compression already in progress, ignoring trigger");
            return Ok(RunOutcome::Busy);
        }
        let pending = self.ui.selected_file().ok_or(DemoError::NoFileSelected)?;
        let Some(_guard) = BusyGuard::acquire(&self.busy, &self.ui) else {
            return Ok(RunOutcome::Busy);
        };

        let source = pending.await?;
        let quality = self.quality();
        let engine = self.module.get().await?;
        let report = self.compress(engine.as_ref(), &source, quality)?;
        Ok(RunOutcome::Completed(report))
    }

    fn quality(&self) -> i32 {
        let raw = self.ui.quality_value();
        match raw.trim().parse::<i32>() {
            Ok(quality) => quality,
            Err(_) => {
                log::warn!(
                    "quality `{}` is not a number, using {}",
                    raw,
                    self.config.default_quality
                );
                self.config.default_quality
            }
        }
    }

    fn compress(
        &self,
        engine: &E,
        source: &SourceImage,
        quality: i32,
    ) -> Result<CompressReport, CompressionFailure> {
        log::debug!(
            "staging {} ({} bytes) for {}",
            source.name,
            source.len(),
            engine.export()
        );
        engine.write_file(&source.name, &source.bytes)?;

        let result = self.process(engine, source, quality);
        if let Err(err) = engine.remove_file(&source.name) {
            log::warn!("could not release staged {}: {}", source.name, err);
        }
        result
    }

    /// Runs the staged call and publishes the result. The staged input is
    /// released by the caller whatever happens here.
    fn process(
        &self,
        engine: &E,
        source: &SourceImage,
        quality: i32,
    ) -> Result<CompressReport, CompressionFailure> {
        let destination = self.config.output_name.as_str();
        let contract = self.config.contract;

        let raw = engine.compress(&CompressCall {
            source: &source.name,
            destination,
            quality,
            contract,
        })?;
        if contract.is_failure(raw) {
            return Err(CompressionFailure::Rejected {
                source_name: source.name.clone(),
                code: raw,
            });
        }

        let output = engine.read_file(destination)?;
        if output.is_empty() {
            return Err(CompressionFailure::EmptyOutput(destination.to_string()));
        }
        let report = contract.interpret(&source.name, raw, source.len(), output.len())?;

        let url = self.ui.publish(output, &self.config.output_mime)?;
        let view = ResultView::new(url, destination, &report);
        log::info!(
            "compressed {} at quality {}: {} -> {} bytes, {}",
            source.name,
            quality,
            report.input_bytes,
            report.output_bytes,
            view.metric_label
        );
        self.ui.show_result(&view);
        Ok(report)
    }
}
