pub mod analysis_llm;
pub mod db;
pub mod quotes;

pub use analysis_llm::OpenAiAnalysisAdapter;
pub use db::DbAdapter;
pub use quotes::QuoteBook;
