pub mod heuristic_analyzer;
pub mod llm_analyzer;
pub mod traits;
