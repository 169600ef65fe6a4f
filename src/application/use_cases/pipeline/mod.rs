//! Stage orchestrator for the generation funnel.
//!
//! Drives requirement document → scenarios → test points → test cases,
//! refusing to run any stage on missing prerequisites and keeping
//! per-entity progress observable through advisory in-flight flags.
//! One file per operation, mirroring how the stages are retried and
//! consumed independently.

mod batch;
pub mod client;
pub(crate) mod hashing;
mod prompts;
mod scenarios;
mod test_cases;
mod test_points;
pub mod types;

pub use batch::{BatchReport, BatchSkip};
pub use client::{CaseGenerationRequest, GenerationClient, LlmGenerationClient, TestPointRequest};
pub use test_cases::CaseGenerationResult;

use crate::application::use_cases::draft_repository::{DraftPatch, DraftStore};
use crate::application::use_cases::id_gen::{CounterIds, IdStrategy};
use crate::application::use_cases::selection::{SelectionCascade, TriState};
use crate::application::use_cases::stats::GenerationStats;
use crate::application::use_cases::validity_filter::ValidityFilter;
use crate::domain::artifact::{DraftCase, RejectedCase, RequirementDocument, Scenario};
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::infrastructure::case_store::CaseStoreClient;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Funnel position. Advanced on stage success; `analyze_scenarios` rolls
/// back to `Requirement` on failure so the caller returns to editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    Requirement,
    Scenarios,
    TestPoints,
    Cases,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub llm: LLMConfig,
    /// Module code stamped into display ids and passed as model context.
    pub module_code: String,
    /// Pacing delay between sequential batch generation calls.
    pub batch_delay: Duration,
    /// Ceiling on any single collaborator call.
    pub generation_timeout: Duration,
    /// Keep already-persisted cases when their test point is regenerated.
    pub preserve_saved_on_regenerate: bool,
    pub id_pad: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            llm: LLMConfig::default(),
            module_code: "CASE".to_string(),
            batch_delay: Duration::from_millis(800),
            generation_timeout: Duration::from_secs(120),
            preserve_saved_on_regenerate: true,
            id_pad: 3,
        }
    }
}

pub struct PipelineUseCase {
    generation_client: Arc<dyn GenerationClient>,
    pub(crate) store_client: Arc<dyn CaseStoreClient + Send + Sync>,
    filter: ValidityFilter,
    ids: Box<dyn IdStrategy>,
    pub(crate) config: PipelineConfig,
    pub(crate) session_id: String,
    stage: Stage,
    pub(crate) requirement: Option<RequirementDocument>,
    pub(crate) scenarios: Vec<Scenario>,
    pub(crate) drafts: DraftStore,
    pub(crate) selection: SelectionCascade,
    pub(crate) requirement_doc_id: Option<String>,
    pub(crate) stats: GenerationStats,
}

impl PipelineUseCase {
    pub fn new(
        generation_client: Arc<dyn GenerationClient>,
        store_client: Arc<dyn CaseStoreClient + Send + Sync>,
        config: PipelineConfig,
    ) -> Self {
        let id_pad = config.id_pad;
        Self {
            generation_client,
            store_client,
            filter: ValidityFilter::with_default_rules(),
            ids: Box::new(CounterIds::new(id_pad)),
            config,
            session_id: Uuid::new_v4().to_string(),
            stage: Stage::Requirement,
            requirement: None,
            scenarios: Vec::new(),
            drafts: DraftStore::new(),
            selection: SelectionCascade::new(),
            requirement_doc_id: None,
            stats: GenerationStats::default(),
        }
    }

    pub fn with_id_strategy(mut self, ids: Box<dyn IdStrategy>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_filter(mut self, filter: ValidityFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn requirement(&self) -> Option<&RequirementDocument> {
        self.requirement.as_ref()
    }

    pub fn requirement_doc_id(&self) -> Option<&str> {
        self.requirement_doc_id.as_deref()
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn drafts(&self) -> &DraftStore {
        &self.drafts
    }

    pub fn stats(&self) -> &GenerationStats {
        &self.stats
    }

    /// Run the upstream document-generation collaborator and hold onto the
    /// result for the later stages.
    pub async fn generate_requirement(&mut self, input: &str) -> Result<RequirementDocument> {
        if input.trim().is_empty() {
            return Err(AppError::PreconditionError(
                "requirement input is empty".to_string(),
            ));
        }
        let started = std::time::Instant::now();
        let document = self
            .timed(
                self.generation_client
                    .generate_requirement_document(&self.config.llm, input),
            )
            .await?;
        self.stats
            .record_generation(started.elapsed().as_millis() as u64);
        self.requirement = Some(document.clone());
        self.stage = Stage::Requirement;
        Ok(document)
    }

    // ---- selection surface -------------------------------------------------

    pub fn toggle_case(&mut self, case_id: &str, checked: bool) -> Result<()> {
        self.selection.toggle_case(&mut self.drafts, case_id, checked)
    }

    pub fn toggle_test_point(
        &mut self,
        scenario_id: &str,
        test_point_label: &str,
        checked: bool,
    ) -> Result<()> {
        self.require_scenario(scenario_id)?;
        self.selection
            .toggle_test_point(&mut self.drafts, scenario_id, test_point_label, checked)
    }

    pub fn toggle_scenario(&mut self, scenario_id: &str, checked: bool) -> Result<()> {
        self.require_scenario(scenario_id)?;
        self.selection
            .toggle_scenario(&mut self.drafts, scenario_id, checked)
    }

    pub fn case_selected(&self, case_id: &str) -> bool {
        self.selection.is_selected(case_id)
    }

    pub fn scenario_selection_state(&self, scenario_id: &str) -> TriState {
        self.selection.scenario_state(&self.drafts, scenario_id)
    }

    pub fn test_point_selection_state(&self, scenario_id: &str, label: &str) -> TriState {
        self.selection
            .test_point_state(&self.drafts, scenario_id, label)
    }

    // ---- draft surface -----------------------------------------------------

    pub fn case(&self, case_id: &str) -> Option<&DraftCase> {
        self.drafts.get(case_id)
    }

    /// Explicit user removal of one draft from the repository.
    pub fn remove_case(&mut self, case_id: &str) -> Result<()> {
        let removed = self
            .drafts
            .remove(case_id)
            .ok_or_else(|| AppError::NotFound(format!("draft case {}", case_id)))?;
        if let Some(scenario) = self
            .scenarios
            .iter_mut()
            .find(|s| s.id == removed.lineage.scenario_id)
        {
            if let Some(tp) = scenario.test_point_mut(&removed.lineage.test_point_label) {
                tp.case_ids.retain(|id| id != case_id);
            }
        }
        self.selection.rebuild(&self.drafts);
        Ok(())
    }

    pub fn update_case(&mut self, case_id: &str, patch: DraftPatch) -> Result<()> {
        self.drafts.update(case_id, patch)
    }

    pub fn rejected_cases(&self, scenario_id: &str, label: &str) -> Result<&[RejectedCase]> {
        let scenario = self.require_scenario(scenario_id)?;
        let tp = scenario
            .test_point(label)
            .ok_or_else(|| AppError::NotFound(format!("test point {}", label)))?;
        Ok(&tp.rejected)
    }

    // ---- internals ---------------------------------------------------------

    pub(crate) fn require_scenario(&self, scenario_id: &str) -> Result<&Scenario> {
        self.scenarios
            .iter()
            .find(|s| s.id == scenario_id)
            .ok_or_else(|| {
                AppError::PreconditionError(format!("scenario {} does not exist", scenario_id))
            })
    }

    pub(crate) fn require_scenario_mut(&mut self, scenario_id: &str) -> Result<&mut Scenario> {
        self.scenarios
            .iter_mut()
            .find(|s| s.id == scenario_id)
            .ok_or_else(|| {
                AppError::PreconditionError(format!("scenario {} does not exist", scenario_id))
            })
    }

    pub(crate) fn requirement_text(&self) -> Result<&str> {
        self.requirement
            .as_ref()
            .map(|doc| doc.requirement_text.as_str())
            .ok_or_else(|| {
                AppError::PreconditionError("no requirement document for this session".to_string())
            })
    }

    pub(crate) async fn timed<T>(
        &self,
        call: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.config.generation_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(AppError::LLMError(format!(
                "generation timed out after {}s",
                self.config.generation_timeout.as_secs()
            ))),
        }
    }

    pub(crate) fn set_stage(&mut self, stage: Stage) {
        self.stage = stage;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::pipeline::types::{
        CaseGenerationOutput, RawCase, RawCaseDetail, RawSectionRef, ScenarioDraft, TestPointDraft,
    };
    use crate::infrastructure::case_store::{
        DocumentRef, RequirementDocMeta, SaveCasePayload, SavedBatch,
    };
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn raw_case(name: &str, valid: bool) -> RawCase {
        RawCase {
            name: name.to_string(),
            description: format!("{} description", name),
            priority: Some("high".to_string()),
            details: vec![RawCaseDetail {
                purpose: "verify the behavior".to_string(),
                steps: if valid {
                    vec!["Open the page".to_string(), "Submit the form".to_string()]
                } else {
                    Vec::new()
                },
                expected_result: "Accepted".to_string(),
                risk_level: Some("low".to_string()),
                step_count: if valid { Some(2) } else { None },
            }],
        }
    }

    #[derive(Default)]
    struct StubGeneration {
        fail_test_points: AtomicBool,
        relabel_test_points: AtomicBool,
        duplicate_scenario_ids: AtomicBool,
        failing_case_labels: Mutex<HashSet<String>>,
    }

    #[async_trait]
    impl GenerationClient for StubGeneration {
        async fn generate_requirement_document(
            &self,
            _config: &LLMConfig,
            input: &str,
        ) -> Result<RequirementDocument> {
            Ok(RequirementDocument {
                requirement_text: input.to_string(),
                sections: vec![crate::domain::artifact::SectionRef {
                    id: "S1".to_string(),
                    name: "Authentication".to_string(),
                }],
            })
        }

        async fn split_scenarios(
            &self,
            _config: &LLMConfig,
            _requirement_text: &str,
            _session_id: &str,
        ) -> Result<Vec<ScenarioDraft>> {
            let mut drafts = vec![ScenarioDraft {
                id: Some("s1".to_string()),
                name: "Login".to_string(),
                description: "login flows".to_string(),
                priority: Some("high".to_string()),
                related_sections: vec![RawSectionRef {
                    id: "S1".to_string(),
                    name: "Authentication".to_string(),
                }],
            }];
            if self.duplicate_scenario_ids.load(Ordering::SeqCst) {
                drafts.push(ScenarioDraft {
                    id: Some("s1".to_string()),
                    name: "Checkout".to_string(),
                    description: "checkout flows".to_string(),
                    priority: Some("medium".to_string()),
                    related_sections: Vec::new(),
                });
            }
            Ok(drafts)
        }

        async fn split_test_points(
            &self,
            _config: &LLMConfig,
            _request: TestPointRequest<'_>,
        ) -> Result<Vec<TestPointDraft>> {
            if self.fail_test_points.load(Ordering::SeqCst) {
                return Err(AppError::LLMError("model unavailable".to_string()));
            }
            if self.relabel_test_points.load(Ordering::SeqCst) {
                return Ok(vec![TestPointDraft {
                    test_point: "session timeout".to_string(),
                    description: "expired session rejected".to_string(),
                    risk_level: Some("high".to_string()),
                    coverage_area: "security".to_string(),
                    estimated_case_count: Some(1),
                }]);
            }
            Ok(vec![
                TestPointDraft {
                    test_point: "valid credentials".to_string(),
                    description: "valid login accepted".to_string(),
                    risk_level: Some("high".to_string()),
                    coverage_area: "happy path".to_string(),
                    estimated_case_count: Some(2),
                },
                TestPointDraft {
                    test_point: "wrong password".to_string(),
                    description: "invalid login rejected".to_string(),
                    risk_level: Some("medium".to_string()),
                    coverage_area: "error handling".to_string(),
                    estimated_case_count: Some(2),
                },
            ])
        }

        async fn generate_test_cases(
            &self,
            _config: &LLMConfig,
            request: CaseGenerationRequest<'_>,
        ) -> Result<CaseGenerationOutput> {
            let label = &request.test_point.test_point;
            if self.failing_case_labels.lock().unwrap().contains(label) {
                return Err(AppError::LLMError("model unavailable".to_string()));
            }
            Ok(CaseGenerationOutput {
                test_cases: vec![
                    raw_case(&format!("{} basic", label), true),
                    raw_case(&format!("{} boundary", label), true),
                    raw_case(&format!("{} broken", label), false),
                ],
                total_generated: Some(3),
            })
        }
    }

    #[derive(Default)]
    struct StubStore {
        fail_batch: AtomicBool,
        confirm_first_only: AtomicBool,
        batches: Mutex<Vec<Vec<SaveCasePayload>>>,
        doc_creates: AtomicUsize,
    }

    #[async_trait]
    impl CaseStoreClient for StubStore {
        async fn batch_save_test_cases(
            &self,
            cases: &[SaveCasePayload],
            _session_id: &str,
        ) -> Result<SavedBatch> {
            if self.fail_batch.load(Ordering::SeqCst) {
                return Err(AppError::PersistenceError("store is down".to_string()));
            }
            self.batches.lock().unwrap().push(cases.to_vec());
            let confirmed = if self.confirm_first_only.load(Ordering::SeqCst) {
                cases.iter().take(1)
            } else {
                cases.iter().take(cases.len())
            };
            Ok(SavedBatch {
                saved_ids: confirmed.map(|c| c.case_id.clone()).collect(),
            })
        }

        async fn create_requirement_document(
            &self,
            _meta: &RequirementDocMeta,
        ) -> Result<DocumentRef> {
            self.doc_creates.fetch_add(1, Ordering::SeqCst);
            Ok(DocumentRef {
                id: "doc-1".to_string(),
            })
        }
    }

    fn pipeline_with(
        generation: Arc<StubGeneration>,
        store: Arc<StubStore>,
    ) -> PipelineUseCase {
        let config = PipelineConfig {
            batch_delay: Duration::from_millis(0),
            ..PipelineConfig::default()
        };
        PipelineUseCase::new(generation, store, config)
    }

    async fn pipeline_at_cases(
        generation: Arc<StubGeneration>,
        store: Arc<StubStore>,
    ) -> PipelineUseCase {
        let mut pipeline = pipeline_with(generation, store);
        pipeline.analyze_scenarios("Users must be able to log in").await.unwrap();
        pipeline.generate_test_points("s1", false).await.unwrap();
        pipeline
            .generate_test_cases("s1", "valid credentials", false)
            .await
            .unwrap();
        pipeline
    }

    #[tokio::test]
    async fn test_full_funnel_produces_filtered_cases() {
        let generation = Arc::new(StubGeneration::default());
        let store = Arc::new(StubStore::default());
        let mut pipeline = pipeline_with(generation, store);

        pipeline.analyze_scenarios("Users must be able to log in").await.unwrap();
        assert_eq!(pipeline.stage(), Stage::Scenarios);
        assert_eq!(pipeline.scenarios().len(), 1);

        let points = pipeline.generate_test_points("s1", false).await.unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(pipeline.stage(), Stage::TestPoints);

        let result = pipeline
            .generate_test_cases("s1", "valid credentials", false)
            .await
            .unwrap();
        assert_eq!(result.accepted.len(), 2);
        assert_eq!(result.rejected.len(), 1);
        assert_eq!(result.total_generated, 3);
        assert_eq!(result.accepted[0].id, "CASE_001");
        assert_eq!(result.accepted[1].id, "CASE_002");
        assert!(result.rejected[0].id.ends_with("_F"));
        assert_eq!(pipeline.stage(), Stage::Cases);

        let scenario = pipeline.scenarios().first().cloned().unwrap();
        let tp = scenario.test_point("valid credentials").unwrap();
        assert_eq!(tp.case_ids, vec!["CASE_001", "CASE_002"]);
        assert_eq!(tp.rejected.len(), 1);
    }

    #[tokio::test]
    async fn test_stage_preconditions_are_enforced() {
        let generation = Arc::new(StubGeneration::default());
        let store = Arc::new(StubStore::default());
        let mut pipeline = pipeline_with(generation, store);

        assert!(matches!(
            pipeline.analyze_scenarios("  ").await,
            Err(AppError::PreconditionError(_))
        ));
        assert!(matches!(
            pipeline.generate_test_points("s1", false).await,
            Err(AppError::PreconditionError(_))
        ));
        pipeline.analyze_scenarios("Users must be able to log in").await.unwrap();
        assert!(matches!(
            pipeline.generate_test_cases("missing", "tp", false).await,
            Err(AppError::PreconditionError(_))
        ));
        assert!(matches!(
            pipeline.generate_test_cases("s1", "  ", false).await,
            Err(AppError::PreconditionError(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_test_point_split_leaves_scenario_untouched() {
        let generation = Arc::new(StubGeneration::default());
        let store = Arc::new(StubStore::default());
        let mut pipeline = pipeline_at_cases(generation.clone(), store).await;
        let before = pipeline.scenarios()[0].clone();

        generation.fail_test_points.store(true, Ordering::SeqCst);
        let err = pipeline.generate_test_points("s1", true).await.unwrap_err();
        assert!(matches!(err, AppError::LLMError(_)));

        let after = &pipeline.scenarios()[0];
        assert!(!after.generating);
        assert_eq!(after.test_points.len(), before.test_points.len());
        assert_eq!(
            after.test_point("valid credentials").unwrap().case_ids,
            before.test_point("valid credentials").unwrap().case_ids
        );
        assert_eq!(pipeline.drafts().len(), 2);
    }

    #[tokio::test]
    async fn test_regenerate_preserves_saved_cases_and_mints_fresh_ids() {
        let generation = Arc::new(StubGeneration::default());
        let store = Arc::new(StubStore::default());
        let mut pipeline = pipeline_at_cases(generation, store).await;

        pipeline.toggle_case("CASE_001", true).unwrap();
        pipeline.save_selected().await.unwrap();

        // The rejected candidate consumed CASE_003 on the first pass, so
        // the replacements continue from CASE_004.
        let result = pipeline
            .generate_test_cases("s1", "valid credentials", true)
            .await
            .unwrap();
        assert_eq!(result.accepted[0].id, "CASE_004");
        assert_eq!(result.accepted[1].id, "CASE_005");

        let ids: Vec<&str> = pipeline
            .drafts()
            .for_test_point("s1", "valid credentials")
            .map(|case| case.id.as_str())
            .collect();
        assert_eq!(ids, vec!["CASE_001", "CASE_004", "CASE_005"]);
        assert!(pipeline.case("CASE_001").unwrap().saved);
        // The evicted unsaved id is gone and is never minted again.
        assert!(pipeline.case("CASE_002").is_none());

        let scenario = &pipeline.scenarios()[0];
        assert_eq!(
            scenario.test_point("valid credentials").unwrap().case_ids,
            vec!["CASE_001", "CASE_004", "CASE_005"]
        );
    }

    #[tokio::test]
    async fn test_scenario_regenerate_evicts_saved_cases() {
        let generation = Arc::new(StubGeneration::default());
        let store = Arc::new(StubStore::default());
        let mut pipeline = pipeline_at_cases(generation.clone(), store).await;

        pipeline.toggle_case("CASE_001", true).unwrap();
        pipeline.save_selected().await.unwrap();
        assert!(pipeline.case("CASE_001").unwrap().saved);

        // The replacement points carry different labels, so nothing from
        // the previous generation may survive under the scenario.
        generation.relabel_test_points.store(true, Ordering::SeqCst);
        let points = pipeline.generate_test_points("s1", true).await.unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].test_point, "session timeout");
        assert!(points[0].case_ids.is_empty());

        let scenario = &pipeline.scenarios()[0];
        assert!(scenario.test_point("valid credentials").is_none());
        assert!(pipeline.case("CASE_001").is_none());
        assert!(pipeline.case("CASE_002").is_none());
        assert!(pipeline.drafts().is_empty());
    }

    #[tokio::test]
    async fn test_save_reconciles_from_store_confirmation() {
        let generation = Arc::new(StubGeneration::default());
        let store = Arc::new(StubStore::default());
        let mut pipeline = pipeline_at_cases(generation, store.clone()).await;

        pipeline.toggle_test_point("s1", "valid credentials", true).unwrap();
        store.confirm_first_only.store(true, Ordering::SeqCst);

        let outcome = pipeline.save_selected().await.unwrap();
        assert_eq!(outcome.saved_ids, vec!["CASE_001"]);

        // The unconfirmed case stays unsaved and selected for a retry.
        assert!(pipeline.case("CASE_001").unwrap().saved);
        assert!(!pipeline.case("CASE_002").unwrap().saved);
        assert!(pipeline.case_selected("CASE_002"));
        assert_eq!(pipeline.stats().cases_saved, 1);
    }

    #[tokio::test]
    async fn test_duplicate_scenario_ids_get_fresh_ids() {
        let generation = Arc::new(StubGeneration::default());
        let store = Arc::new(StubStore::default());
        let mut pipeline = pipeline_with(generation.clone(), store);

        generation.duplicate_scenario_ids.store(true, Ordering::SeqCst);
        let scenarios = pipeline
            .analyze_scenarios("Users must be able to log in")
            .await
            .unwrap();
        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios[0].id, "s1");
        assert_ne!(scenarios[1].id, "s1");
        assert_eq!(scenarios[1].name, "Checkout");
        assert!(pipeline.require_scenario(&scenarios[1].id).is_ok());
    }

    #[tokio::test]
    async fn test_batch_generation_skips_failed_points() {
        let generation = Arc::new(StubGeneration::default());
        let store = Arc::new(StubStore::default());
        let mut pipeline = pipeline_with(generation.clone(), store);
        pipeline.analyze_scenarios("Users must be able to log in").await.unwrap();
        pipeline.generate_test_points("s1", false).await.unwrap();

        generation
            .failing_case_labels
            .lock()
            .unwrap()
            .insert("wrong password".to_string());

        let report = pipeline.batch_generate_test_cases("s1").await.unwrap();
        assert_eq!(report.attempted, 2);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.cases_generated, 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].test_point_label, "wrong password");
        assert_eq!(pipeline.stats().batch_items_skipped, 1);

        // A later batch only queues the still-empty point.
        generation.failing_case_labels.lock().unwrap().clear();
        let report = pipeline.batch_generate_test_cases("s1").await.unwrap();
        assert_eq!(report.attempted, 1);
        assert_eq!(report.succeeded, 1);
    }

    #[tokio::test]
    async fn test_save_commits_only_the_selected_subset() {
        let generation = Arc::new(StubGeneration::default());
        let store = Arc::new(StubStore::default());
        let mut pipeline = pipeline_at_cases(generation, store.clone()).await;

        pipeline.toggle_test_point("s1", "valid credentials", true).unwrap();
        pipeline.toggle_case("CASE_002", false).unwrap();

        let outcome = pipeline.save_selected().await.unwrap();
        assert_eq!(outcome.saved_ids, vec!["CASE_001"]);
        assert_eq!(outcome.requirement_doc_id.as_deref(), Some("doc-1"));

        let batches = store.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 1);
        assert_eq!(batches[0][0].case_id, "CASE_001");
        assert_eq!(batches[0][0].scenario_name, "Login");
        assert_eq!(batches[0][0].test_point_label, "valid credentials");
        assert_eq!(batches[0][0].requirement_doc_id, "doc-1");
        drop(batches);

        assert!(pipeline.case("CASE_001").unwrap().saved);
        assert!(!pipeline.case("CASE_002").unwrap().saved);
        assert_eq!(pipeline.stats().cases_saved, 1);

        // Second save reuses the cached document id.
        pipeline.toggle_case("CASE_002", true).unwrap();
        pipeline.save_selected().await.unwrap();
        assert_eq!(store.doc_creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_save_changes_nothing_locally() {
        let generation = Arc::new(StubGeneration::default());
        let store = Arc::new(StubStore::default());
        let mut pipeline = pipeline_at_cases(generation, store.clone()).await;

        pipeline.toggle_test_point("s1", "valid credentials", true).unwrap();
        store.fail_batch.store(true, Ordering::SeqCst);
        let err = pipeline.save_selected().await.unwrap_err();
        assert!(matches!(err, AppError::PersistenceError(_)));

        assert!(!pipeline.case("CASE_001").unwrap().saved);
        assert!(pipeline.case_selected("CASE_001"));
        assert_eq!(pipeline.stats().cases_saved, 0);

        // The retry succeeds without creating a second document.
        store.fail_batch.store(false, Ordering::SeqCst);
        let outcome = pipeline.save_selected().await.unwrap();
        assert_eq!(outcome.saved_ids.len(), 2);
        assert_eq!(store.doc_creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_selection_save_is_a_no_op() {
        let generation = Arc::new(StubGeneration::default());
        let store = Arc::new(StubStore::default());
        let mut pipeline = pipeline_at_cases(generation, store.clone()).await;

        let outcome = pipeline.save_selected().await.unwrap();
        assert!(outcome.saved_ids.is_empty());
        assert!(store.batches.lock().unwrap().is_empty());
        assert_eq!(store.doc_creates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_save_and_finish_reports_session_summary() {
        let generation = Arc::new(StubGeneration::default());
        let store = Arc::new(StubStore::default());
        let mut pipeline = pipeline_at_cases(generation, store).await;

        pipeline.toggle_case("CASE_001", true).unwrap();
        let summary = pipeline.save_and_finish().await.unwrap();
        assert_eq!(summary.stage, Stage::Cases);
        assert_eq!(summary.scenario_count, 1);
        assert_eq!(summary.test_point_count, 2);
        assert_eq!(summary.saved_case_ids, vec!["CASE_001"]);
        assert_eq!(summary.stats.cases_saved, 1);
    }
}
