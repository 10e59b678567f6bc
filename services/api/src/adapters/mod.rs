pub mod db;
pub mod heuristic;
pub mod openai_analyzer;
pub mod storage;

pub use db::PgMetadataStore;
pub use heuristic::HeuristicAnalyzer;
pub use openai_analyzer::OpenAiAnalyzer;
pub use storage::ObjectContentStore;
