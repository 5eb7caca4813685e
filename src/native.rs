//! In-process engine: staged files kept in memory, JPEG re-encoding done by
//! the `image` crate. Stands in for the Emscripten module outside the browser.

use std::cell::RefCell;
use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, GenericImageView};

use crate::engine::{size_reduction, CompressCall, Contract, Engine};
use crate::error::CompressionFailure;

const EXPORT: &str = "image_recompress";

struct Encoded {
    input_bytes: usize,
    output_bytes: usize,
    width: u32,
    height: u32,
}

#[derive(Default)]
pub struct ImageEngine {
    files: RefCell<HashMap<String, Vec<u8>>>,
}

impl ImageEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.borrow().contains_key(name)
    }

    fn recompress(&self, source: &str, destination: &str, quality: i32) -> Result<Encoded> {
        let quality = u8::try_from(quality)
            .ok()
            .filter(|q| (1..=100).contains(q))
            .ok_or_else(|| anyhow!("quality {} is outside 1..=100", quality))?;

        let input = self
            .files
            .borrow()
            .get(source)
            .cloned()
            .ok_or_else(|| anyhow!("no staged file named `{}`", source))?;

        let img = image::load_from_memory(&input).context("Failed to decode source image")?;
        let (width, height) = img.dimensions();
        log::debug!("Loaded image {}x{}", width, height);

        // JPEG has no alpha channel
        let rgb = img.to_rgb8();

        let mut buffer = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
        encoder
            .encode(rgb.as_raw(), width, height, ColorType::Rgb8.into())
            .context("Failed to encode JPEG")?;
        log::debug!("Compression produced {} bytes", buffer.len());

        let encoded = Encoded {
            input_bytes: input.len(),
            output_bytes: buffer.len(),
            width,
            height,
        };
        self.files
            .borrow_mut()
            .insert(destination.to_string(), buffer);
        Ok(encoded)
    }
}

impl Engine for ImageEngine {
    fn export(&self) -> &str {
        EXPORT
    }

    fn write_file(&self, name: &str, bytes: &[u8]) -> Result<(), CompressionFailure> {
        if name.is_empty() {
            return Err(CompressionFailure::Stage {
                name: name.to_string(),
                reason: "empty file name".into(),
            });
        }
        self.files
            .borrow_mut()
            .insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>, CompressionFailure> {
        self.files
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| CompressionFailure::Fetch {
                name: name.to_string(),
                reason: "no such file".into(),
            })
    }

    fn remove_file(&self, name: &str) -> Result<(), CompressionFailure> {
        self.files
            .borrow_mut()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| CompressionFailure::Stage {
                name: name.to_string(),
                reason: "no such file".into(),
            })
    }

    /// Codec errors are reported through the return value, as the external
    /// module does, never as `Err`.
    fn compress(&self, call: &CompressCall<'_>) -> Result<f64, CompressionFailure> {
        log::debug!(
            "{}: '{}' -> '{}' quality={}",
            EXPORT,
            call.source,
            call.destination,
            call.quality
        );
        let encoded = match self.recompress(call.source, call.destination, call.quality) {
            Ok(encoded) => encoded,
            Err(e) => {
                log::warn!("{} failed for '{}': {:#}", EXPORT, call.source, e);
                return Ok(match call.contract {
                    Contract::ReductionFraction => -1.0,
                    Contract::LegacyFlag => 0.0,
                });
            }
        };

        let pixels = u64::from(encoded.width) * u64::from(encoded.height);
        if pixels > 0 {
            log::debug!(
                "{:.3} bits per pixel",
                encoded.output_bytes as f64 * 8.0 / pixels as f64
            );
        }

        Ok(match call.contract {
            Contract::ReductionFraction => {
                size_reduction(encoded.input_bytes, encoded.output_bytes)
            }
            Contract::LegacyFlag => 1.0,
        })
    }
}
