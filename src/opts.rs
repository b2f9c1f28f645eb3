use crate::Result;
use crate::error::Error;
use crate::model_size::ModelSize;

/// Numeric precision of the model weights handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Precision {
    /// Full (f16) GGML weights.
    #[default]
    Full,

    /// Quantized weights: smaller and faster, slightly less accurate.
    Reduced,
}

/// Options that control how each file is transcribed.
///
/// This struct represents *library-level configuration*, not CLI flags directly.
/// It is constructed once per batch and shared read-only across every per-file invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptionOptions {
    /// Quality/speed tier. Part of every artifact name and completion key.
    pub model_size: ModelSize,

    /// Optional language hint (e.g. `"en"`, `"es"`).
    ///
    /// When `None`, Whisper auto-detects the spoken language.
    pub language: Option<String>,

    /// Full or reduced precision weights.
    pub precision: Precision,

    /// Whether the engine should produce token-level timestamps.
    pub word_level_timestamps: bool,
}

/// Full language names accepted in place of ISO codes.
const LANGUAGE_NAMES: &[(&str, &str)] = &[
    ("english", "en"),
    ("spanish", "es"),
    ("french", "fr"),
    ("german", "de"),
    ("italian", "it"),
    ("portuguese", "pt"),
    ("dutch", "nl"),
    ("russian", "ru"),
    ("chinese", "zh"),
    ("japanese", "ja"),
    ("korean", "ko"),
    ("arabic", "ar"),
    ("hindi", "hi"),
    ("polish", "pl"),
    ("turkish", "tr"),
    ("swedish", "sv"),
    ("ukrainian", "uk"),
];

/// Normalize a user-supplied language hint.
///
/// `auto` (or an empty string) means auto-detect. Codes pass through lowercased when whisper.cpp
/// knows them; a handful of English language names map onto their codes.
pub fn parse_language(raw: &str) -> Result<Option<String>> {
    let lang = raw.trim().to_ascii_lowercase();
    if lang.is_empty() || lang == "auto" {
        return Ok(None);
    }

    let looks_like_code =
        (2..=3).contains(&lang.len()) && lang.chars().all(|c| c.is_ascii_alphabetic());
    if looks_like_code && whisper_rs::get_lang_id(&lang).is_some() {
        return Ok(Some(lang));
    }

    LANGUAGE_NAMES
        .iter()
        .find(|(name, _)| *name == lang)
        .map(|(_, code)| Some((*code).to_owned()))
        .ok_or_else(|| Error::msg(format!("unknown language '{}'", raw.trim())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_language_handles_auto_codes_and_names() -> anyhow::Result<()> {
        assert_eq!(parse_language("auto")?, None);
        assert_eq!(parse_language("  ")?, None);
        assert_eq!(parse_language("EN")?, Some("en".to_owned()));
        assert_eq!(parse_language("English")?, Some("en".to_owned()));
        assert_eq!(parse_language(" spanish ")?, Some("es".to_owned()));
        assert_eq!(parse_language("haw")?, Some("haw".to_owned()));
        Ok(())
    }

    #[test]
    fn parse_language_rejects_unknown_names() {
        let err = parse_language("Klingon").unwrap_err();
        assert!(err.to_string().contains("unknown language 'Klingon'"));

        for code in ["eng", "zz", "xyz"] {
            let err = parse_language(code).unwrap_err();
            assert!(err.to_string().contains("unknown language"), "{code} accepted");
        }
    }

    #[test]
    fn defaults_are_smallest_tier_full_precision_auto_language() {
        let opts = TranscriptionOptions::default();
        assert_eq!(opts.model_size, ModelSize::Tiny);
        assert_eq!(opts.precision, Precision::Full);
        assert_eq!(opts.language, None);
        assert!(!opts.word_level_timestamps);
    }
}
