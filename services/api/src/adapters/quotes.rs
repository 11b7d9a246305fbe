//! services/api/src/adapters/quotes.rs
//!
//! Quote-of-the-day content, loaded once from a JSON file at startup.

use diary_core::domain::Quote;
use rand::seq::IndexedRandom;
use std::path::Path;
use tracing::{info, warn};

/// How many quotes one request returns at most.
pub const QUOTES_PER_DAY: usize = 3;

/// The pool of learning sentences served by `GET /quotes`.
#[derive(Debug, Clone)]
pub struct QuoteBook {
    quotes: Vec<Quote>,
}

impl QuoteBook {
    pub fn new(quotes: Vec<Quote>) -> Self {
        Self { quotes }
    }

    /// Reads a JSON array of `{en, ko}` objects. A missing, unreadable or empty
    /// file falls back to the built-in quotes.
    pub fn load(path: &Path) -> Self {
        let parsed = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|text| serde_json::from_str::<Vec<Quote>>(&text).map_err(|e| e.to_string()));

        match parsed {
            Ok(quotes) if !quotes.is_empty() => {
                info!("Loaded {} quotes from {}", quotes.len(), path.display());
                Self::new(quotes)
            }
            Ok(_) => {
                warn!("Quote file {} is empty; using built-in quotes", path.display());
                Self::builtin()
            }
            Err(e) => {
                warn!("Could not load quotes from {}: {}; using built-in quotes", path.display(), e);
                Self::builtin()
            }
        }
    }

    pub fn builtin() -> Self {
        let quote = |en: &str, ko: &str| Quote {
            en: en.to_string(),
            ko: ko.to_string(),
        };
        Self::new(vec![
            quote(
                "I'm trying to focus on progress, not perfection.",
                "완벽보다 조금씩 나아지는 것에 집중하려고 해요.",
            ),
            quote(
                "Today felt overwhelming, but I made it through.",
                "오늘은 버거웠지만 그래도 버텼어요.",
            ),
            quote(
                "I'm slowly getting comfortable with being myself.",
                "조금씩 있는 그대로의 나를 편하게 느끼는 중이에요.",
            ),
        ])
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Picks up to `QUOTES_PER_DAY` distinct quotes at random.
    pub fn pick(&self) -> Vec<Quote> {
        let mut rng = rand::rng();
        self.quotes
            .choose_multiple(&mut rng, QUOTES_PER_DAY.min(self.quotes.len()))
            .cloned()
            .collect()
    }
}
