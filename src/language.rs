//! Mapping document language tags to Tesseract language codes.
//!
//! PDF documents declare their language as a BCP-47 tag (`en-US`, `zh-Hant`).
//! Tesseract names its models with mostly ISO 639-2/T codes plus a few
//! script variants (`chi_sim`, `srp_latn`).

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

/// Language used when neither the caller nor the document names one.
pub const DEFAULT_LANGUAGE: &str = "eng";

/// (ISO 639-1, Tesseract code, other ISO 639-2 codes for the same language)
const LANGUAGES: &[(&str, &str, &[&str])] = &[
    ("af", "afr", &[]),
    ("am", "amh", &[]),
    ("ar", "ara", &[]),
    ("as", "asm", &[]),
    ("az", "aze", &[]),
    ("be", "bel", &[]),
    ("bg", "bul", &[]),
    ("bn", "ben", &[]),
    ("bo", "bod", &["tib"]),
    ("bs", "bos", &[]),
    ("ca", "cat", &[]),
    ("cs", "ces", &["cze"]),
    ("cy", "cym", &["wel"]),
    ("da", "dan", &[]),
    ("de", "deu", &["ger"]),
    ("el", "ell", &["gre"]),
    ("en", "eng", &[]),
    ("eo", "epo", &[]),
    ("es", "spa", &[]),
    ("et", "est", &[]),
    ("eu", "eus", &["baq"]),
    ("fa", "fas", &["per"]),
    ("fi", "fin", &[]),
    ("fr", "fra", &["fre"]),
    ("ga", "gle", &[]),
    ("gl", "glg", &[]),
    ("gu", "guj", &[]),
    ("he", "heb", &[]),
    ("hi", "hin", &[]),
    ("hr", "hrv", &[]),
    ("ht", "hat", &[]),
    ("hu", "hun", &[]),
    ("hy", "hye", &["arm"]),
    ("id", "ind", &[]),
    ("is", "isl", &["ice"]),
    ("it", "ita", &[]),
    ("ja", "jpn", &[]),
    ("jv", "jav", &[]),
    ("ka", "kat", &["geo"]),
    ("kk", "kaz", &[]),
    ("km", "khm", &[]),
    ("kn", "kan", &[]),
    ("ko", "kor", &[]),
    ("ky", "kir", &[]),
    ("la", "lat", &[]),
    ("lo", "lao", &[]),
    ("lt", "lit", &[]),
    ("lv", "lav", &[]),
    ("mk", "mkd", &["mac"]),
    ("ml", "mal", &[]),
    ("mn", "mon", &[]),
    ("mr", "mar", &[]),
    ("ms", "msa", &["may"]),
    ("mt", "mlt", &[]),
    ("my", "mya", &["bur"]),
    ("ne", "nep", &[]),
    ("nl", "nld", &["dut"]),
    ("no", "nor", &["nob", "nno"]),
    ("or", "ori", &[]),
    ("pa", "pan", &[]),
    ("pl", "pol", &[]),
    ("ps", "pus", &[]),
    ("pt", "por", &[]),
    ("ro", "ron", &["rum"]),
    ("ru", "rus", &[]),
    ("sa", "san", &[]),
    ("si", "sin", &[]),
    ("sk", "slk", &["slo"]),
    ("sl", "slv", &[]),
    ("sq", "sqi", &["alb"]),
    ("sr", "srp", &[]),
    ("sv", "swe", &[]),
    ("sw", "swa", &[]),
    ("ta", "tam", &[]),
    ("te", "tel", &[]),
    ("tg", "tgk", &[]),
    ("th", "tha", &[]),
    ("tl", "tgl", &["fil"]),
    ("tr", "tur", &[]),
    ("ug", "uig", &[]),
    ("uk", "ukr", &[]),
    ("ur", "urd", &[]),
    ("uz", "uzb", &[]),
    ("vi", "vie", &[]),
    ("yi", "yid", &[]),
    ("zh", "chi_sim", &["chi", "zho"]),
];

fn expression_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_]+(\+[A-Za-z0-9_]+)*$").expect("language pattern is valid")
    })
}

/// Map a language tag (ISO 639-1, ISO 639-2 or BCP-47) to a Tesseract code.
///
/// Returns `None` for tags Tesseract has no model for.
pub fn to_tesseract(tag: &str) -> Option<String> {
    let tag = tag.trim().replace('_', "-").to_ascii_lowercase();
    let mut subtags = tag.split('-').filter(|s| !s.is_empty());
    let primary = subtags.next()?;
    let rest: Vec<&str> = subtags.collect();

    let code = LANGUAGES
        .iter()
        .find(|(iso1, tess, others)| {
            *iso1 == primary || *tess == primary || others.contains(&primary)
        })
        .map(|(_, tess, _)| *tess)?;

    let code = match code {
        "chi_sim" if rest.iter().any(|s| matches!(*s, "hant" | "tw" | "hk" | "mo")) => "chi_tra",
        "srp" if rest.contains(&"latn") => "srp_latn",
        other => other,
    };
    Some(code.to_string())
}

/// Check that `expr` is a Tesseract language expression such as `eng` or
/// `deu+eng`.
pub fn validate_expression(expr: &str) -> Result<()> {
    if expr.len() > 64 || !expression_pattern().is_match(expr) {
        return Err(Error::InvalidArgument(format!(
            "invalid language '{}': expected codes like 'eng' or 'deu+eng'",
            expr
        )));
    }
    Ok(())
}

/// Pick the OCR language: an explicit override, then the document's
/// declared language, then `default`.
pub fn resolve(override_lang: Option<&str>, document_lang: Option<&str>, default: &str) -> Result<String> {
    if let Some(lang) = override_lang.map(str::trim).filter(|l| !l.is_empty()) {
        validate_expression(lang)?;
        return Ok(lang.to_string());
    }

    if let Some(tag) = document_lang {
        match to_tesseract(tag) {
            Some(code) => return Ok(code),
            None => log::warn!(
                "document language '{}' has no OCR model mapping, using '{}'",
                tag,
                default
            ),
        }
    }

    validate_expression(default)?;
    Ok(default.to_string())
}

/// Codes of an expression that are not in `installed`.
pub fn missing_languages<'a>(expr: &'a str, installed: &[String]) -> Vec<&'a str> {
    expr.split('+')
        .filter(|code| !installed.iter().any(|i| i == code))
        .collect()
}
