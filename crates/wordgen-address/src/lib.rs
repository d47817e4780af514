//! Canonical, storage-stable identifiers for words, languages and parts of
//! speech.
//!
//! Every function here is pure and total: malformed input degrades to a
//! usable value instead of failing. The composed `pk`/`sk` tokens are the
//! addressing scheme the rest of the system treats as opaque.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use wordgen_protocol::StorageAddress;

pub mod extract;

pub use extract::{redirect_address, route_from_address};

static LANGUAGE_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    for (alias, code) in [
        ("auto", "auto"),
        ("english", "en"),
        ("en", "en"),
        ("en-us", "en"),
        ("en-gb", "en"),
        ("german", "de"),
        ("deutsch", "de"),
        ("de", "de"),
        ("de-de", "de"),
        ("spanish", "es"),
        ("espanol", "es"),
        ("español", "es"),
        ("es", "es"),
        ("french", "fr"),
        ("francais", "fr"),
        ("français", "fr"),
        ("fr", "fr"),
        ("italian", "it"),
        ("italiano", "it"),
        ("it", "it"),
        ("portuguese", "pt"),
        ("portugues", "pt"),
        ("português", "pt"),
        ("pt", "pt"),
        ("pt-br", "pt"),
        ("dutch", "nl"),
        ("nederlands", "nl"),
        ("nl", "nl"),
        ("russian", "ru"),
        ("ru", "ru"),
        ("polish", "pl"),
        ("polski", "pl"),
        ("pl", "pl"),
        ("turkish", "tr"),
        ("tr", "tr"),
        ("swedish", "sv"),
        ("sv", "sv"),
        ("danish", "da"),
        ("da", "da"),
        ("norwegian", "no"),
        ("no", "no"),
        ("japanese", "ja"),
        ("ja", "ja"),
        ("korean", "ko"),
        ("ko", "ko"),
        ("chinese", "zh"),
        ("mandarin", "zh"),
        ("zh", "zh"),
        ("zh-cn", "zh"),
        ("arabic", "ar"),
        ("ar", "ar"),
        ("hindi", "hi"),
        ("hi", "hi"),
    ] {
        m.insert(alias, code);
    }
    m
});

/// Lower-case, strip diacritics, keep alphanumerics only. Idempotent.
pub fn normalize_word(text: &str) -> String {
    text.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Collapse gendered noun labels ("masculine noun", "Noun (f)") to `noun`;
/// empty or absent input yields `pending`.
pub fn normalize_part_of_speech(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    if lowered.is_empty() {
        return "pending".to_string();
    }
    if lowered.contains("noun") {
        return "noun".to_string();
    }
    lowered
}

/// Map a language name, locale or alias to a short code. Unrecognized
/// input falls back to its own lower-cased two-character prefix.
pub fn language_code(input: &str) -> String {
    let lowered = input.trim().to_lowercase();
    if let Some(code) = LANGUAGE_ALIASES.get(lowered.as_str()) {
        return (*code).to_string();
    }
    lowered.chars().take(2).collect()
}

/// Compose the storage address for a (word, source language, target
/// language) triple, optionally scoped by part of speech.
pub fn build_address(
    source_word: &str,
    source_lang_input: &str,
    target_lang_input: &str,
    pos: Option<&str>,
) -> StorageAddress {
    let pk = format!(
        "SRC#{}#{}",
        language_code(source_lang_input),
        normalize_word(source_word)
    );
    let sk = match pos {
        Some(p) => format!(
            "TGT#{}#POS#{}",
            language_code(target_lang_input),
            normalize_part_of_speech(p)
        ),
        None => format!("TGT#{}", language_code(target_lang_input)),
    };
    StorageAddress::new(pk, sk)
}

/// Navigation route for a resolved word: `/words/{src}/{tgt}/{pos}/{word}`.
pub fn word_route(
    source_lang_input: &str,
    target_lang_input: &str,
    pos: Option<&str>,
    word: &str,
) -> String {
    format!(
        "/words/{}/{}/{}/{}",
        language_code(source_lang_input),
        language_code(target_lang_input),
        normalize_part_of_speech(pos.unwrap_or("")),
        normalize_word(word)
    )
}
