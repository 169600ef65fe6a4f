pub mod artifact;
pub mod error;
pub mod llm_config;
