//! Text recognition through the `tesseract` command line tool.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde::{Deserialize, Serialize};

use super::{OcrEngine, RenderedImage};
use crate::error::{Error, Result};

/// Runs `tesseract` with its `pdf` output config in text-only mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseractEngine {
    /// Executable to run.
    pub program: PathBuf,
    /// Directory holding the `.traineddata` files, if not the default.
    pub tessdata_dir: Option<PathBuf>,
    /// Page segmentation mode (`--psm`).
    pub psm: Option<u8>,
    /// Resolution to assume for the input image (`--dpi`).
    pub dpi: Option<u32>,
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self {
            program: PathBuf::from("tesseract"),
            tessdata_dir: None,
            psm: None,
            dpi: None,
        }
    }
}

impl TesseractEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_tessdata_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tessdata_dir = Some(dir.into());
        self
    }

    pub fn with_psm(mut self, psm: u8) -> Self {
        self.psm = Some(psm);
        self
    }

    /// Whether the executable can be started.
    pub fn is_available(&self) -> bool {
        Command::new(&self.program).arg("--version").output().is_ok()
    }

    fn base_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        if let Some(dir) = &self.tessdata_dir {
            cmd.arg("--tessdata-dir").arg(dir);
        }
        cmd
    }

    fn recognize_command(&self, image: &Path, out_base: &Path, language: &str) -> Command {
        let mut cmd = self.base_command();
        cmd.arg(image).arg(out_base).arg("-l").arg(language);
        if let Some(psm) = self.psm {
            cmd.arg("--psm").arg(psm.to_string());
        }
        if let Some(dpi) = self.dpi {
            cmd.arg("--dpi").arg(dpi.to_string());
        }
        cmd.arg("-c").arg("textonly_pdf=1").arg("pdf");
        cmd
    }

    fn run(&self, mut cmd: Command) -> Result<Output> {
        cmd.output()
            .map_err(|e| Error::Ocr(format!("cannot run {}: {}", self.program.display(), e)))
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, image: &RenderedImage, language: &str) -> Result<Vec<u8>> {
        let workdir = tempfile::Builder::new().prefix("searchpdf-ocr-").tempdir()?;
        let out_base = workdir.path().join("page");

        let output = self.run(self.recognize_command(image.path(), &out_base, language))?;
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            if is_missing_language(&stderr) {
                return Err(Error::LanguageUnavailable {
                    language: language.to_string(),
                    installed: self.installed_languages().unwrap_or_default(),
                });
            }
            return Err(Error::Ocr(format!(
                "tesseract failed ({}): {}",
                output.status,
                stderr.trim()
            )));
        }

        let pdf = std::fs::read(out_base.with_extension("pdf")).map_err(|e| {
            Error::Ocr(format!(
                "tesseract produced no PDF output ({}): {}",
                e,
                stderr.trim()
            ))
        })?;
        Ok(pdf)
    }

    fn installed_languages(&self) -> Result<Vec<String>> {
        let mut cmd = self.base_command();
        cmd.arg("--list-langs");
        let output = self.run(cmd)?;
        if !output.status.success() {
            return Err(Error::Ocr(format!(
                "tesseract --list-langs failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        // Older releases print the list on stderr.
        let mut listing = String::from_utf8_lossy(&output.stdout).into_owned();
        listing.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(parse_language_list(&listing))
    }
}

fn is_missing_language(stderr: &str) -> bool {
    stderr.contains("Failed loading language") || stderr.contains("couldn't load any languages")
}

/// Extract language codes from `tesseract --list-langs` output.
pub fn parse_language_list(output: &str) -> Vec<String> {
    let mut langs: Vec<String> = output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("List of available languages"))
        .filter(|line| {
            line.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '/')
        })
        .map(str::to_string)
        .collect();
    langs.sort();
    langs.dedup();
    langs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_recognize_command() {
        let engine = TesseractEngine::new()
            .with_tessdata_dir("/opt/tessdata")
            .with_psm(3);
        let cmd = engine.recognize_command(Path::new("page.png"), Path::new("/tmp/out"), "deu+eng");
        assert_eq!(
            args(&cmd),
            vec![
                "--tessdata-dir",
                "/opt/tessdata",
                "page.png",
                "/tmp/out",
                "-l",
                "deu+eng",
                "--psm",
                "3",
                "-c",
                "textonly_pdf=1",
                "pdf"
            ]
        );
    }

    #[test]
    fn test_parse_language_list() {
        let output = "List of available languages in \"/usr/share/tessdata/\" (4):\n\
                      eng\nosd\nchi_sim\neng\n\n";
        assert_eq!(parse_language_list(output), vec!["chi_sim", "eng", "osd"]);
        assert!(parse_language_list("").is_empty());
    }

    #[test]
    fn test_missing_language_detection() {
        assert!(is_missing_language(
            "Error opening data file /usr/share/tessdata/xyz.traineddata\n\
             Failed loading language 'xyz'\nTesseract couldn't load any languages!"
        ));
        assert!(!is_missing_language("Estimating resolution as 300"));
    }

    #[test]
    fn test_missing_program_is_ocr_error() {
        let engine = TesseractEngine::new().with_program("/nonexistent/tesseract");
        assert!(!engine.is_available());
        assert!(matches!(engine.installed_languages(), Err(Error::Ocr(_))));
    }
}
