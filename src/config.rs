//! JSON run configuration, as written by `searchpdf config`.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::{PdftoppmRenderer, TesseractEngine};
use crate::error::{Error, Result};
use crate::pipeline::{OcrOptions, OcrPipeline};

/// Everything a run can be configured with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub options: OcrOptions,
    pub renderer: PdftoppmRenderer,
    pub tesseract: TesseractEngine,
}

impl OcrConfig {
    /// The configuration with every field at its default value.
    pub fn template() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::InvalidArgument(format!("invalid configuration: {}", e)))?;
        config.options.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        Self::from_json(&json).map_err(|e| match e {
            Error::InvalidArgument(msg) => {
                Error::InvalidArgument(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::InvalidArgument(format!("cannot serialize configuration: {}", e)))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut json = self.to_json()?;
        json.push('\n');
        fs::write(path, json)?;
        Ok(())
    }

    /// Build the command line tool pipeline this configuration describes.
    pub fn pipeline(&self) -> OcrPipeline<PdftoppmRenderer, TesseractEngine> {
        OcrPipeline::new(self.renderer.clone(), self.tesseract.clone()).with_options(self.options.clone())
    }
}
