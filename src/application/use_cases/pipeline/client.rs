use crate::application::use_cases::pipeline::prompts::{
    build_case_system_prompt, build_case_user_prompt, build_requirement_system_prompt,
    build_requirement_user_prompt, build_scenario_system_prompt, build_scenario_user_prompt,
    build_test_point_system_prompt, build_test_point_user_prompt,
};
use crate::application::use_cases::pipeline::types::{
    CaseGenerationOutput, RequirementDocOutput, ScenarioDraft, ScenarioSplitOutput,
    TestPointDraft, TestPointSplitOutput,
};
use crate::domain::artifact::{RequirementDocument, SectionRef, TestPoint};
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::infrastructure::llm_clients::LLMClient;
use crate::infrastructure::response::{clean_llm_response, extract_json_payload, preview_text};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;

pub struct TestPointRequest<'a> {
    pub scenario_id: &'a str,
    pub scenario_name: &'a str,
    pub description: &'a str,
    pub requirement_text: &'a str,
    pub related_sections: &'a [SectionRef],
    pub session_id: &'a str,
}

pub struct CaseGenerationRequest<'a> {
    pub test_point: &'a TestPoint,
    pub scenario_id: &'a str,
    pub scenario_name: &'a str,
    pub description: &'a str,
    pub requirement_text: &'a str,
    pub module_context: &'a str,
    pub related_sections: &'a [SectionRef],
    pub session_id: &'a str,
}

/// Structured generation collaborator consumed by the stage orchestrator.
/// Returns raw candidates; the validity filter owns the accepted/rejected
/// partition so rejection stays deterministic and client-independent.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate_requirement_document(
        &self,
        config: &LLMConfig,
        input: &str,
    ) -> Result<RequirementDocument>;

    async fn split_scenarios(
        &self,
        config: &LLMConfig,
        requirement_text: &str,
        session_id: &str,
    ) -> Result<Vec<ScenarioDraft>>;

    async fn split_test_points(
        &self,
        config: &LLMConfig,
        request: TestPointRequest<'_>,
    ) -> Result<Vec<TestPointDraft>>;

    async fn generate_test_cases(
        &self,
        config: &LLMConfig,
        request: CaseGenerationRequest<'_>,
    ) -> Result<CaseGenerationOutput>;
}

/// Production implementation: prompts into a chat-completion client, then
/// response cleanup and JSON parsing on the way back.
pub struct LlmGenerationClient {
    llm: Arc<dyn LLMClient + Send + Sync>,
    language: String,
}

impl LlmGenerationClient {
    pub fn new(llm: Arc<dyn LLMClient + Send + Sync>) -> Self {
        Self {
            llm,
            language: "English".to_string(),
        }
    }

    pub fn with_language(llm: Arc<dyn LLMClient + Send + Sync>, language: &str) -> Self {
        let trimmed = language.trim();
        Self {
            llm,
            language: if trimmed.is_empty() {
                "English".to_string()
            } else {
                trimmed.to_string()
            },
        }
    }

    fn parse_payload<T: DeserializeOwned>(raw: &str, what: &str) -> Result<T> {
        let cleaned = clean_llm_response(raw);
        let normalized = extract_json_payload(&cleaned);
        serde_json::from_str::<T>(&normalized).map_err(|err| {
            let snippet = preview_text(&normalized, 600);
            AppError::ParseError(format!(
                "Failed to parse LLM {} output: {} | output_snippet={}",
                what, err, snippet
            ))
        })
    }
}

#[async_trait]
impl GenerationClient for LlmGenerationClient {
    async fn generate_requirement_document(
        &self,
        config: &LLMConfig,
        input: &str,
    ) -> Result<RequirementDocument> {
        let system = build_requirement_system_prompt(&self.language);
        let user = build_requirement_user_prompt(input, &self.language);
        let raw = self.llm.generate(config, &system, &user).await?;
        let parsed: RequirementDocOutput = Self::parse_payload(&raw, "requirement document")?;
        Ok(RequirementDocument {
            requirement_text: parsed.requirement_text,
            sections: parsed
                .sections
                .into_iter()
                .map(|section| SectionRef {
                    id: section.id,
                    name: section.name,
                })
                .collect(),
        })
    }

    async fn split_scenarios(
        &self,
        config: &LLMConfig,
        requirement_text: &str,
        session_id: &str,
    ) -> Result<Vec<ScenarioDraft>> {
        let system = build_scenario_system_prompt(&self.language);
        let user = build_scenario_user_prompt(requirement_text, session_id, &self.language);
        let raw = self.llm.generate(config, &system, &user).await?;
        let parsed: ScenarioSplitOutput = Self::parse_payload(&raw, "scenario split")?;
        Ok(parsed.scenarios)
    }

    async fn split_test_points(
        &self,
        config: &LLMConfig,
        request: TestPointRequest<'_>,
    ) -> Result<Vec<TestPointDraft>> {
        let system = build_test_point_system_prompt(&self.language);
        let user = build_test_point_user_prompt(&request, &self.language);
        let raw = self.llm.generate(config, &system, &user).await?;
        let parsed: TestPointSplitOutput = Self::parse_payload(&raw, "test point split")?;
        Ok(parsed.test_points)
    }

    async fn generate_test_cases(
        &self,
        config: &LLMConfig,
        request: CaseGenerationRequest<'_>,
    ) -> Result<CaseGenerationOutput> {
        let system = build_case_system_prompt(&self.language);
        let user = build_case_user_prompt(&request, &self.language);
        let raw = self.llm.generate(config, &system, &user).await?;
        Self::parse_payload(&raw, "test case")
    }
}
