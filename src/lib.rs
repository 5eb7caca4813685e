//! Browser demo that recompresses a user-selected image to JPEG through an
//! external Emscripten module.
//!
//! The page workflow lives in [`controller::Controller`], written against two
//! seams: [`engine::Engine`] for the external module's staged storage and
//! compress call, and [`controller::UiSurface`] for the page controls. The
//! `web` module (wasm32 only) binds both to the browser and exports
//! `CompressionDemo`; [`native::ImageEngine`] provides an in-process engine
//! for everything else.
//!
//! # Example Usage (JavaScript)
//!
//! ```javascript
//! import init, { CompressionDemo, initLogging } from './jpeg_compress_demo.js';
//!
//! await init();
//! initLogging('debug');
//!
//! // `MozJPEG` must already be defined by the Emscripten build script.
//! const demo = new CompressionDemo({ outputName: 'out.jpg' });
//! await demo.ready();
//! ```

pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod native;
pub mod readiness;
pub mod report;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use config::DemoConfig;
pub use controller::{Controller, RunOutcome, SourceImage, UiSurface};
pub use engine::{CompressCall, CompressReport, Contract, Engine};
pub use error::{CompressionFailure, ConfigError, DemoError};
pub use readiness::{Lifecycle, ModuleCell};
pub use report::ResultView;
