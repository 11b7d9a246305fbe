//! crates/diary_core/src/prompt.rs
//!
//! Builds the instructions sent to the analysis model.

use crate::domain::{Lang, Meta};

/// The system instruction given with every analysis request. Declares the only
/// JSON shape the model may answer with.
pub const SYSTEM_INSTRUCTION: &str = r#"You are an English writing tutor for Korean users who keep a daily diary.
Return results ONLY as a single JSON object with exactly these keys and no others:
{
  "translation": {"to": "en"|"ko", "text": string},
  "corrections": {"corrected": string, "explanations": string[]},
  "vocab_suggestions": [{"word": string, "meaning_ko": string, "example_en": string}],
  "score": {"value": integer 0-100, "comment_ko": string, "focus_next_time": string}
}
Do not add extra keys. "score.value" must be an integer between 0 and 100.
Keep explanations concise and helpful, written in Korean."#;

const ENGLISH_GOALS: &str = r#"The entry is written in ENGLISH.
- translation: a natural Korean paraphrase of the entry ("to": "ko").
- corrections.corrected: the entry rewritten in improved, natural English that keeps the writer's meaning and diary voice.
- corrections.explanations: short Korean bullet points explaining each grammar, vocabulary or naturalness fix.
- vocab_suggestions: 3 to 5 words or expressions worth remembering, with example sentences written in a first-person diary voice.
- score: 0-100, judged on grammar accuracy, naturalness, and how specific and descriptive the writing is."#;

const KOREAN_GOALS: &str = r#"The entry is written in KOREAN.
- translation: a natural English version of the entry in a first-person diary voice ("to": "en").
- corrections.corrected: the Korean entry polished the way a native speaker would write it.
- corrections.explanations: short Korean explanations of the changes and of how to say the key parts in English.
- vocab_suggestions: 3 to 5 English words or expressions from the translation worth remembering, with diary-style example sentences.
- score: 0-100, judged on the quality of the attempt and how much expressive potential the entry shows for English writing."#;

/// Builds the per-entry prompt. Pure and deterministic for identical input.
pub fn build_prompt(lang: Lang, text: &str, title: Option<&str>, meta: Option<&Meta>) -> String {
    let goals = match lang {
        Lang::En => ENGLISH_GOALS,
        Lang::Ko => KOREAN_GOALS,
    };

    let title = title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or("(none)");

    format!(
        "{goals}\n\nTitle: {title}\nMetadata:\n{meta}\n\n<<<ENTRY\n{text}\nENTRY>>>\n\n\
         Respond with JSON only, matching the schema declared in the system instruction.",
        goals = goals,
        title = title,
        meta = format_meta(meta),
        text = text,
    )
}

/// Renders metadata as a flat `- key: value` listing, sorted by key.
fn format_meta(meta: Option<&Meta>) -> String {
    let Some(meta) = meta.filter(|m| !m.is_empty()) else {
        return "(none)".to_string();
    };

    let mut pairs: Vec<(&String, &serde_json::Value)> = meta.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    pairs
        .into_iter()
        .map(|(key, value)| match value {
            serde_json::Value::String(s) => format!("- {}: {}", key, s),
            other => format!("- {}: {}", key, other),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta() -> Meta {
        let value = json!({"weather": "sunny", "mood": "good", "steps": 8000});
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_english_branch_asks_for_korean_translation() {
        let prompt = build_prompt(Lang::En, "I went hiking.", Some("Hike"), None);
        assert!(prompt.contains("written in ENGLISH"));
        assert!(prompt.contains("\"to\": \"ko\""));
        assert!(prompt.contains("grammar accuracy"));
        assert!(!prompt.contains("written in KOREAN"));
    }

    #[test]
    fn test_korean_branch_asks_for_english_translation() {
        let prompt = build_prompt(Lang::Ko, "오늘 등산을 했다.", Some("등산"), None);
        assert!(prompt.contains("written in KOREAN"));
        assert!(prompt.contains("\"to\": \"en\""));
        assert!(prompt.contains("expressive potential"));
    }

    #[test]
    fn test_text_is_embedded_between_markers() {
        let prompt = build_prompt(Lang::En, "Line one.\nLine two.", None, None);
        assert!(prompt.contains("<<<ENTRY\nLine one.\nLine two.\nENTRY>>>"));
        assert!(prompt.trim_end().ends_with("matching the schema declared in the system instruction."));
    }

    #[test]
    fn test_missing_title_and_meta_render_as_none() {
        let prompt = build_prompt(Lang::En, "text", Some("   "), Some(&Meta::new()));
        assert!(prompt.contains("Title: (none)"));
        assert!(prompt.contains("Metadata:\n(none)"));
    }

    #[test]
    fn test_meta_is_flat_and_sorted() {
        let prompt = build_prompt(Lang::En, "text", Some("Walk"), Some(&meta()));
        assert!(prompt.contains("Title: Walk"));
        assert!(prompt.contains("- mood: good\n- steps: 8000\n- weather: sunny"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let m = meta();
        let a = build_prompt(Lang::Ko, "같은 글", Some("제목"), Some(&m));
        let b = build_prompt(Lang::Ko, "같은 글", Some("제목"), Some(&m));
        assert_eq!(a, b);
    }

    #[test]
    fn test_system_instruction_declares_schema() {
        for key in ["translation", "corrections", "vocab_suggestions", "score", "focus_next_time"] {
            assert!(SYSTEM_INSTRUCTION.contains(key), "missing {}", key);
        }
        assert!(SYSTEM_INSTRUCTION.contains("integer between 0 and 100"));
    }
}
