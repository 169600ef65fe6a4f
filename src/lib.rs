//! Progressive test-artifact generation: requirement document, scenarios,
//! test points and test cases, produced stage by stage through an LLM
//! collaborator, filtered for internal consistency, selected through a
//! tri-state cascade and persisted in all-or-nothing batches.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;

pub use application::use_cases::draft_repository::{DraftPatch, DraftStore};
pub use application::use_cases::persistence::{SaveOutcome, SessionSummary};
pub use application::use_cases::pipeline::{
    BatchReport, BatchSkip, CaseGenerationRequest, CaseGenerationResult, GenerationClient,
    LlmGenerationClient, PipelineConfig, PipelineUseCase, Stage, TestPointRequest,
};
pub use application::use_cases::selection::TriState;
pub use domain::artifact::{
    DraftCase, Priority, RejectedCase, RequirementDocument, RiskLevel, Scenario, SectionRef,
    TestPoint, TestPointDetail,
};
pub use domain::error::{AppError, Result};
pub use domain::llm_config::{LLMConfig, LLMProvider};
pub use infrastructure::case_store::{CaseStoreClient, HttpCaseStore};
pub use infrastructure::llm_clients::{LLMClient, RouterClient};
pub use interfaces::session::{PipelineSession, ScenarioView, TestPointView};

/// Install the default tracing subscriber; safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_env_filter("info").try_init();
}
