//! crates/diary_core/src/analysis.rs
//!
//! The analysis record attached to an entry and the normalizer that turns a
//! model's raw text output into it.
//!
//! The four top-level keys are always present. What sits inside them is
//! whatever the model produced; it is stored and returned as-is.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::Lang;

const TRANSLATION: &str = "translation";
const CORRECTIONS: &str = "corrections";
const VOCAB_SUGGESTIONS: &str = "vocab_suggestions";
const SCORE: &str = "score";

/// A normalized language-learning analysis of one entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default = "empty_object")]
    pub translation: Value,
    #[serde(default = "empty_object")]
    pub corrections: Value,
    #[serde(default = "empty_array")]
    pub vocab_suggestions: Value,
    #[serde(default = "empty_object")]
    pub score: Value,
    /// The unparsed model output. Only set when it was not a JSON object.
    #[serde(
        default,
        deserialize_with = "raw_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub raw: Option<String>,
    /// Any other top-level keys the model returned.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn empty_array() -> Value {
    Value::Array(Vec::new())
}

/// Accepts any stored `raw` value; non-strings are kept as their JSON text.
fn raw_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(other) => Some(other.to_string()),
    })
}

impl Default for AnalysisResult {
    fn default() -> Self {
        Self {
            translation: empty_object(),
            corrections: empty_object(),
            vocab_suggestions: empty_array(),
            score: empty_object(),
            raw: None,
            extra: Map::new(),
        }
    }
}

impl AnalysisResult {
    /// A result carrying only the unparsed text and the defaulted keys.
    pub fn unparsed(raw_text: &str) -> Self {
        Self {
            raw: Some(raw_text.to_string()),
            ..Self::default()
        }
    }

    /// Builds a result from a model's JSON object, defaulting absent keys.
    ///
    /// A `raw` key sent by the model is an ordinary extra key; `raw` is only
    /// set by `unparsed`.
    pub fn from_object(mut object: Map<String, Value>) -> Self {
        let translation = object.remove(TRANSLATION).unwrap_or_else(empty_object);
        let corrections = object.remove(CORRECTIONS).unwrap_or_else(empty_object);
        let vocab_suggestions = object.remove(VOCAB_SUGGESTIONS).unwrap_or_else(empty_array);
        let score = object.remove(SCORE).unwrap_or_else(empty_object);

        Self {
            translation,
            corrections,
            vocab_suggestions,
            score,
            raw: None,
            extra: object,
        }
    }

    /// Whether the model output could not be read as a JSON object.
    pub fn is_unparsed(&self) -> bool {
        self.raw.is_some()
    }

    /// `score.value`, when the model returned it as an integer.
    pub fn score_value(&self) -> Option<i64> {
        self.score.get("value").and_then(Value::as_i64)
    }

    /// `translation.to`, when it names a known language.
    pub fn translation_target(&self) -> Option<Lang> {
        self.translation
            .get("to")
            .and_then(Value::as_str)
            .and_then(|to| to.parse().ok())
    }
}

/// Parses the model's raw output into an `AnalysisResult`. Never fails.
///
/// A JSON object (optionally wrapped in a Markdown code fence) is taken as the
/// result body. Anything else yields a result whose `raw` field holds the
/// original text.
pub fn normalize(raw_text: &str) -> AnalysisResult {
    match serde_json::from_str::<Value>(strip_json_fences(raw_text)) {
        Ok(Value::Object(object)) => AnalysisResult::from_object(object),
        Ok(_) => {
            tracing::warn!("Model output was JSON but not an object; keeping raw text");
            AnalysisResult::unparsed(raw_text)
        }
        Err(e) => {
            tracing::warn!("Model output is not valid JSON ({}); keeping raw text", e);
            AnalysisResult::unparsed(raw_text)
        }
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"));
    match inner {
        Some(inner) => inner.trim(),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_non_json_text_keeps_raw_and_all_keys() {
        let result = normalize("Sorry, I cannot help with that.");
        assert_eq!(result.raw.as_deref(), Some("Sorry, I cannot help with that."));
        assert_eq!(result.translation, json!({}));
        assert_eq!(result.corrections, json!({}));
        assert_eq!(result.vocab_suggestions, json!([]));
        assert_eq!(result.score, json!({}));
    }

    #[test]
    fn test_empty_text_is_unparsed() {
        let result = normalize("");
        assert!(result.is_unparsed());
        assert_eq!(result.raw.as_deref(), Some(""));
    }

    #[test]
    fn test_missing_score_defaults_to_empty_object() {
        let raw = r#"{"translation": {"to": "ko", "text": "오늘은 좋았다"},
                      "corrections": {"corrected": "Today was good.", "explanations": []},
                      "vocab_suggestions": []}"#;
        let result = normalize(raw);
        assert_eq!(result.score, json!({}));
        assert!(!result.is_unparsed());
        assert_eq!(result.translation_target(), Some(Lang::Ko));
    }

    #[test]
    fn test_wrong_nested_shapes_pass_through() {
        let raw = r#"{"translation": "just a string", "score": {"value": "ninety"}, "vocab_suggestions": {"word": "x"}}"#;
        let result = normalize(raw);
        assert_eq!(result.translation, json!("just a string"));
        assert_eq!(result.score, json!({"value": "ninety"}));
        assert_eq!(result.vocab_suggestions, json!({"word": "x"}));
        assert_eq!(result.score_value(), None);
    }

    #[test]
    fn test_json_array_is_treated_as_unparsed() {
        let result = normalize("[1, 2, 3]");
        assert_eq!(result.raw.as_deref(), Some("[1, 2, 3]"));
        assert_eq!(result.vocab_suggestions, json!([]));
    }

    #[test]
    fn test_fenced_json_is_parsed() {
        let raw = "```json\n{\"score\": {\"value\": 72}}\n```";
        let result = normalize(raw);
        assert!(!result.is_unparsed());
        assert_eq!(result.score_value(), Some(72));
        assert_eq!(result.translation, json!({}));
    }

    #[test]
    fn test_extra_keys_are_preserved_on_serialize() {
        let result = normalize(r#"{"score": {"value": 10}, "note": "extra"}"#);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["note"], json!("extra"));
        assert!(value.get("raw").is_none());
        assert_eq!(value["vocab_suggestions"], json!([]));
    }

    #[test]
    fn test_unparsed_serializes_raw_field() {
        let value = serde_json::to_value(normalize("oops")).unwrap();
        assert_eq!(
            value,
            json!({
                "translation": {},
                "corrections": {},
                "vocab_suggestions": [],
                "score": {},
                "raw": "oops"
            })
        );
    }

    #[test]
    fn test_stored_value_deserializes_back() {
        let stored = json!({"translation": {"to": "en", "text": "Hi"}, "score": {"value": 88}});
        let result: AnalysisResult = serde_json::from_value(stored).unwrap();
        assert_eq!(result.corrections, json!({}));
        assert_eq!(result.score_value(), Some(88));
        assert_eq!(result.translation_target(), Some(Lang::En));
    }

    #[test]
    fn test_model_supplied_raw_key_is_an_extra() {
        let result = normalize(r#"{"score": {"value": 60}, "raw": {"notes": "draft"}}"#);
        assert!(!result.is_unparsed());
        assert_eq!(result.raw, None);
        assert_eq!(result.extra["raw"], json!({"notes": "draft"}));
        assert_eq!(result.score_value(), Some(60));
    }

    #[test]
    fn test_stored_non_string_raw_still_deserializes() {
        let stored = json!({"score": {}, "raw": {"notes": "draft"}});
        let result: AnalysisResult = serde_json::from_value(stored).unwrap();
        assert_eq!(result.raw.as_deref(), Some(r#"{"notes":"draft"}"#));
    }

    #[test]
    fn test_strip_json_fences_variants() {
        assert_eq!(strip_json_fences("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_json_fences("  {\"a\": 1}  "), "{\"a\": 1}");
        assert_eq!(strip_json_fences("```json {\"a\": 1}"), "```json {\"a\": 1}");
    }
}
