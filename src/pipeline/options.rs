//! Pipeline options and configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::language::{validate_expression, DEFAULT_LANGUAGE};

/// Rendering zoom: 2.0 renders at 144 pixels per inch.
pub const DEFAULT_ZOOM: f32 = 2.0;

/// When to check that the OCR language is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageCheck {
    /// Before the first page, against the engine's installed languages.
    #[default]
    Eager,
    /// Leave it to the engine to fail on the first page.
    Lazy,
}

/// Options for adding a text layer to a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrOptions {
    /// Rendering zoom factor (1.0 = 72 DPI)
    pub zoom: f32,

    /// Language expression that overrides the document language
    pub language: Option<String>,

    /// Language used when the document declares none
    pub default_language: String,

    /// When to check language availability
    pub language_check: LanguageCheck,

    /// Compress streams in the saved document
    pub compress: bool,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            zoom: DEFAULT_ZOOM,
            language: None,
            default_language: DEFAULT_LANGUAGE.to_string(),
            language_check: LanguageCheck::Eager,
            compress: true,
        }
    }
}

impl OcrOptions {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rendering zoom factor.
    pub fn with_zoom(mut self, zoom: f32) -> Self {
        self.zoom = zoom;
        self
    }

    /// Force a language instead of the document's own.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Set the fallback language.
    pub fn with_default_language(mut self, language: impl Into<String>) -> Self {
        self.default_language = language.into();
        self
    }

    pub fn with_language_check(mut self, check: LanguageCheck) -> Self {
        self.language_check = check;
        self
    }

    /// Enable or disable stream compression on save.
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !self.zoom.is_finite() || self.zoom <= 0.0 {
            return Err(Error::InvalidArgument(format!(
                "zoom must be a positive number, got {}",
                self.zoom
            )));
        }
        if let Some(lang) = &self.language {
            validate_expression(lang)?;
        }
        validate_expression(&self.default_language)
    }
}
