//! The partially-revealed result record of one request.
//!
//! Fields arrive piecemeal across frames; presence in a payload reveals a
//! field and clears its loading flag, absence never resets anything.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ResultField {
    Word,
    Definitions,
    PartOfSpeech,
    Syllables,
    Phonetics,
    Synonyms,
    Examples,
    Conjugation,
    Pronunciation,
    Media,
}

impl ResultField {
    pub const ALL: [ResultField; 10] = [
        ResultField::Word,
        ResultField::Definitions,
        ResultField::PartOfSpeech,
        ResultField::Syllables,
        ResultField::Phonetics,
        ResultField::Synonyms,
        ResultField::Examples,
        ResultField::Conjugation,
        ResultField::Pronunciation,
        ResultField::Media,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResultField::Word => "word",
            ResultField::Definitions => "definitions",
            ResultField::PartOfSpeech => "part_of_speech",
            ResultField::Syllables => "syllables",
            ResultField::Phonetics => "phonetics",
            ResultField::Synonyms => "synonyms",
            ResultField::Examples => "examples",
            ResultField::Conjugation => "conjugation",
            ResultField::Pronunciation => "pronunciation",
            ResultField::Media => "media",
        }
    }

    /// Payload keys that reveal this field, in lookup order.
    fn payload_keys(&self) -> &'static [&'static str] {
        match self {
            ResultField::Word => &["word", "target_word", "translated_word"],
            ResultField::Definitions => &["definitions", "definition"],
            ResultField::PartOfSpeech => &["part_of_speech", "pos"],
            ResultField::Syllables => &["syllables"],
            ResultField::Phonetics => &["phonetics", "phonetic"],
            ResultField::Synonyms => &["synonyms"],
            ResultField::Examples => &["examples", "example_sentences"],
            ResultField::Conjugation => &["conjugation", "conjugations"],
            ResultField::Pronunciation => &["pronunciation", "pronunciation_url", "audio"],
            ResultField::Media => &["media", "media_ref", "image"],
        }
    }
}

/// Render-ready record: revealed values plus the set of fields still
/// loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordRecord {
    pub word: Option<String>,
    pub part_of_speech: Option<String>,
    pub source_language: Option<String>,
    pub definitions: Option<Value>,
    pub syllables: Option<Value>,
    pub phonetics: Option<Value>,
    pub synonyms: Option<Value>,
    pub examples: Option<Value>,
    pub conjugation: Option<Value>,
    pub pronunciation: Option<Value>,
    pub media: Option<Value>,
    pub loading: BTreeSet<ResultField>,
}

impl WordRecord {
    /// Skeleton record: nothing revealed, everything loading.
    pub fn skeleton() -> Self {
        Self {
            word: None,
            part_of_speech: None,
            source_language: None,
            definitions: None,
            syllables: None,
            phonetics: None,
            synonyms: None,
            examples: None,
            conjugation: None,
            pronunciation: None,
            media: None,
            loading: ResultField::ALL.into_iter().collect(),
        }
    }

    pub fn is_loading(&self, field: ResultField) -> bool {
        self.loading.contains(&field)
    }

    pub fn clear_all_loading(&mut self) {
        self.loading.clear();
    }

    /// Copy every present field out of a payload and clear its loading
    /// flag. Returns the fields revealed by this payload.
    pub fn apply_fields(&mut self, data: &Value) -> Vec<ResultField> {
        let mut revealed = Vec::new();
        if !data.is_object() {
            return revealed;
        }
        for field in ResultField::ALL {
            let Some(value) = field
                .payload_keys()
                .iter()
                .find_map(|key| data.get(*key))
                .filter(|v| !v.is_null())
            else {
                continue;
            };
            match field {
                ResultField::Word => self.word = value.as_str().map(|s| s.to_string()),
                ResultField::PartOfSpeech => {
                    self.part_of_speech = value.as_str().map(|s| s.to_string())
                }
                ResultField::Definitions => self.definitions = Some(value.clone()),
                ResultField::Syllables => self.syllables = Some(value.clone()),
                ResultField::Phonetics => self.phonetics = Some(value.clone()),
                ResultField::Synonyms => self.synonyms = Some(value.clone()),
                ResultField::Examples => self.examples = Some(value.clone()),
                ResultField::Conjugation => self.conjugation = Some(value.clone()),
                ResultField::Pronunciation => self.pronunciation = Some(value.clone()),
                ResultField::Media => self.media = Some(value.clone()),
            }
            self.loading.remove(&field);
            revealed.push(field);
        }
        // The result's own source language is not a revealed field but is
        // needed for addressing; track it when offered.
        if let Some(lang) = data.get("source_language").and_then(|v| v.as_str()) {
            if !lang.is_empty() {
                self.source_language = Some(lang.to_string());
            }
        }
        revealed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn skeleton_has_every_field_loading() {
        let record = WordRecord::skeleton();
        assert_eq!(record.loading.len(), ResultField::ALL.len());
        assert!(record.is_loading(ResultField::Word));
        assert!(record.word.is_none());
    }

    #[test]
    fn present_fields_reveal_absent_fields_stay() {
        let mut record = WordRecord::skeleton();
        let revealed = record.apply_fields(&json!({
            "word": "house",
            "synonyms": ["home", "dwelling"]
        }));
        assert_eq!(revealed, vec![ResultField::Word, ResultField::Synonyms]);
        assert_eq!(record.word.as_deref(), Some("house"));
        assert!(!record.is_loading(ResultField::Word));
        assert!(record.is_loading(ResultField::Definitions));
    }

    #[test]
    fn a_later_frame_never_resets_a_revealed_field() {
        let mut record = WordRecord::skeleton();
        record.apply_fields(&json!({"word": "house", "examples": ["a big house"]}));
        let revealed = record.apply_fields(&json!({"syllables": ["house"]}));
        assert_eq!(revealed, vec![ResultField::Syllables]);
        assert_eq!(record.word.as_deref(), Some("house"));
        assert!(record.examples.is_some());
    }

    #[test]
    fn alternate_payload_keys_are_recognized() {
        let mut record = WordRecord::skeleton();
        record.apply_fields(&json!({"pos": "noun", "audio": "https://cdn/haus.mp3"}));
        assert_eq!(record.part_of_speech.as_deref(), Some("noun"));
        assert!(record.pronunciation.is_some());
    }

    #[test]
    fn null_values_do_not_reveal() {
        let mut record = WordRecord::skeleton();
        let revealed = record.apply_fields(&json!({"word": null}));
        assert!(revealed.is_empty());
        assert!(record.is_loading(ResultField::Word));
    }

    #[test]
    fn non_object_payload_is_a_no_op() {
        let mut record = WordRecord::skeleton();
        assert!(record.apply_fields(&json!("nope")).is_empty());
        assert!(record.apply_fields(&Value::Null).is_empty());
    }
}
