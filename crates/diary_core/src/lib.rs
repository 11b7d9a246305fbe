pub mod analysis;
pub mod domain;
pub mod journal;
pub mod ports;
pub mod prompt;
pub mod validation;

#[cfg(any(test, feature = "test-support"))]
pub mod memory;

pub use analysis::{normalize, AnalysisResult};
pub use domain::{Entry, EntryDraft, Lang, Meta, Quote, UpsertAction, UpsertOutcome, User};
pub use journal::{analyze_entry, create_entry, upsert_entry_by_date, UpsertRequest};
pub use ports::{AnalysisService, DatabaseService, PortError, PortResult};
