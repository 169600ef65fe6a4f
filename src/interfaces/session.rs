//! Session facade over the stage orchestrator.
//!
//! Owns one `PipelineUseCase` per authoring session and exposes the view
//! shapes a frontend renders directly: scenario and test point trees with
//! their tri-state selection already derived, so callers never touch the
//! selection cascade or the draft store themselves.

use crate::application::use_cases::draft_repository::DraftPatch;
use crate::application::use_cases::persistence::{SaveOutcome, SessionSummary};
use crate::application::use_cases::pipeline::{
    BatchReport, CaseGenerationResult, GenerationClient, PipelineConfig, PipelineUseCase, Stage,
};
use crate::application::use_cases::selection::TriState;
use crate::application::use_cases::stats::GenerationStats;
use crate::domain::artifact::{
    DraftCase, Priority, RejectedCase, RequirementDocument, RiskLevel, SectionRef,
};
use crate::domain::error::Result;
use crate::infrastructure::case_store::CaseStoreClient;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestPointView {
    pub test_point: String,
    pub description: String,
    pub risk_level: RiskLevel,
    pub coverage_area: String,
    pub estimated_case_count: u32,
    pub case_ids: Vec<String>,
    pub rejected_count: usize,
    pub generating: bool,
    pub expanded: bool,
    pub selection_state: TriState,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub priority: Priority,
    pub related_sections: Vec<SectionRef>,
    pub test_points: Vec<TestPointView>,
    pub generating: bool,
    pub expanded: bool,
    pub saved: bool,
    pub selection_state: TriState,
    pub created_at: i64,
}

pub struct PipelineSession {
    pipeline: PipelineUseCase,
}

impl PipelineSession {
    pub fn new(
        generation_client: Arc<dyn GenerationClient>,
        store_client: Arc<dyn CaseStoreClient + Send + Sync>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            pipeline: PipelineUseCase::new(generation_client, store_client, config),
        }
    }

    pub fn from_pipeline(pipeline: PipelineUseCase) -> Self {
        Self { pipeline }
    }

    pub fn session_id(&self) -> &str {
        self.pipeline.session_id()
    }

    pub fn stage(&self) -> Stage {
        self.pipeline.stage()
    }

    pub fn requirement(&self) -> Option<&RequirementDocument> {
        self.pipeline.requirement()
    }

    pub fn stats(&self) -> &GenerationStats {
        self.pipeline.stats()
    }

    // ---- generation --------------------------------------------------------

    pub async fn generate_requirement(&mut self, input: &str) -> Result<RequirementDocument> {
        self.pipeline.generate_requirement(input).await
    }

    pub async fn analyze_scenarios(&mut self, requirement_text: &str) -> Result<Vec<ScenarioView>> {
        self.pipeline.analyze_scenarios(requirement_text).await?;
        Ok(self.scenarios())
    }

    pub async fn generate_test_points(
        &mut self,
        scenario_id: &str,
        regenerate: bool,
    ) -> Result<Vec<TestPointView>> {
        self.pipeline
            .generate_test_points(scenario_id, regenerate)
            .await?;
        Ok(self
            .scenario(scenario_id)
            .map(|view| view.test_points)
            .unwrap_or_default())
    }

    pub async fn generate_test_cases(
        &mut self,
        scenario_id: &str,
        test_point_label: &str,
        regenerate: bool,
    ) -> Result<CaseGenerationResult> {
        self.pipeline
            .generate_test_cases(scenario_id, test_point_label, regenerate)
            .await
    }

    pub async fn batch_generate_test_cases(&mut self, scenario_id: &str) -> Result<BatchReport> {
        self.pipeline.batch_generate_test_cases(scenario_id).await
    }

    // ---- views -------------------------------------------------------------

    pub fn scenarios(&self) -> Vec<ScenarioView> {
        self.pipeline
            .scenarios()
            .iter()
            .map(|scenario| self.view_of(scenario))
            .collect()
    }

    pub fn scenario(&self, scenario_id: &str) -> Option<ScenarioView> {
        self.pipeline
            .scenarios()
            .iter()
            .find(|scenario| scenario.id == scenario_id)
            .map(|scenario| self.view_of(scenario))
    }

    pub fn cases_for_test_point(&self, scenario_id: &str, label: &str) -> Vec<DraftCase> {
        self.pipeline
            .drafts()
            .for_test_point(scenario_id, label)
            .cloned()
            .collect()
    }

    pub fn case(&self, case_id: &str) -> Option<&DraftCase> {
        self.pipeline.case(case_id)
    }

    pub fn rejected_cases(&self, scenario_id: &str, label: &str) -> Result<&[RejectedCase]> {
        self.pipeline.rejected_cases(scenario_id, label)
    }

    // ---- selection and edits -----------------------------------------------

    pub fn toggle_case(&mut self, case_id: &str, checked: bool) -> Result<()> {
        self.pipeline.toggle_case(case_id, checked)
    }

    pub fn toggle_test_point(
        &mut self,
        scenario_id: &str,
        label: &str,
        checked: bool,
    ) -> Result<()> {
        self.pipeline.toggle_test_point(scenario_id, label, checked)
    }

    pub fn toggle_scenario(&mut self, scenario_id: &str, checked: bool) -> Result<()> {
        self.pipeline.toggle_scenario(scenario_id, checked)
    }

    pub fn update_case(&mut self, case_id: &str, patch: DraftPatch) -> Result<()> {
        self.pipeline.update_case(case_id, patch)
    }

    pub fn remove_case(&mut self, case_id: &str) -> Result<()> {
        self.pipeline.remove_case(case_id)
    }

    // ---- persistence -------------------------------------------------------

    pub async fn save_selected(&mut self) -> Result<SaveOutcome> {
        self.pipeline.save_selected().await
    }

    pub async fn save_and_finish(&mut self) -> Result<SessionSummary> {
        self.pipeline.save_and_finish().await
    }

    fn view_of(&self, scenario: &crate::domain::artifact::Scenario) -> ScenarioView {
        ScenarioView {
            id: scenario.id.clone(),
            name: scenario.name.clone(),
            description: scenario.description.clone(),
            priority: scenario.priority,
            related_sections: scenario.related_sections.clone(),
            test_points: scenario
                .test_points
                .iter()
                .map(|tp| TestPointView {
                    test_point: tp.test_point.clone(),
                    description: tp.description.clone(),
                    risk_level: tp.risk_level,
                    coverage_area: tp.coverage_area.clone(),
                    estimated_case_count: tp.estimated_case_count,
                    case_ids: tp.case_ids.clone(),
                    rejected_count: tp.rejected.len(),
                    generating: tp.generating,
                    expanded: tp.expanded,
                    selection_state: self
                        .pipeline
                        .test_point_selection_state(&scenario.id, &tp.test_point),
                })
                .collect(),
            generating: scenario.generating,
            expanded: scenario.expanded,
            saved: scenario.saved,
            selection_state: self.pipeline.scenario_selection_state(&scenario.id),
            created_at: scenario.created_at,
        }
    }
}
