//! Save reconciliation between the draft repository and the external
//! test-case store.
//!
//! The store's batch endpoint is all-or-nothing, and the local side
//! mirrors that: nothing is flagged saved until the store confirms the
//! whole batch, so a transport failure leaves selection and drafts
//! untouched and the save can simply be retried.

use crate::application::use_cases::pipeline::{PipelineUseCase, Stage};
use crate::application::use_cases::stats::GenerationStats;
use crate::domain::artifact::RiskLevel;
use crate::domain::error::{AppError, Result};
use crate::infrastructure::case_store::{RequirementDocMeta, SaveCasePayload};
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOutcome {
    pub saved_ids: Vec<String>,
    pub requirement_doc_id: Option<String>,
}

/// Closing snapshot of a session, returned by `save_and_finish`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub stage: Stage,
    pub requirement_doc_id: Option<String>,
    pub scenario_count: usize,
    pub test_point_count: usize,
    pub saved_case_ids: Vec<String>,
    pub stats: GenerationStats,
}

impl PipelineUseCase {
    /// Persist every selected, unsaved draft case as one batch.
    ///
    /// An empty selection returns immediately without touching the store.
    /// On success the saved cases drop out of the selection cascade and
    /// their scenarios are reconciled; on failure no local state changes.
    pub async fn save_selected(&mut self) -> Result<SaveOutcome> {
        let snapshot = self.selection.selected_unsaved_ids(&self.drafts);
        if snapshot.is_empty() {
            debug!("Save requested with empty selection; nothing to do");
            return Ok(SaveOutcome {
                saved_ids: Vec::new(),
                requirement_doc_id: self.requirement_doc_id.clone(),
            });
        }

        let doc_id = self.ensure_requirement_doc().await?;
        let payloads = self.build_payloads(&snapshot, &doc_id)?;

        self.stats.saves_attempted += 1;
        let batch = self
            .store_client
            .batch_save_test_cases(&payloads, &self.session_id)
            .await?;

        // Only the ids the store confirmed flip to saved; a store that
        // commits a different set cannot desynchronize local state.
        let saved_ids = batch.saved_ids;
        self.drafts.mark_saved(&saved_ids);
        self.selection.mark_saved(&self.drafts, &saved_ids);
        self.reconcile_saved_scenarios(&saved_ids);
        self.stats.cases_saved += saved_ids.len() as u64;

        info!(
            "Saved {} of {} cases for session {} under document {}",
            saved_ids.len(),
            snapshot.len(),
            self.session_id,
            doc_id
        );
        Ok(SaveOutcome {
            saved_ids,
            requirement_doc_id: Some(doc_id),
        })
    }

    /// Save the current selection, then report the session's closing state.
    pub async fn save_and_finish(&mut self) -> Result<SessionSummary> {
        let outcome = self.save_selected().await?;
        Ok(SessionSummary {
            session_id: self.session_id.clone(),
            stage: self.stage(),
            requirement_doc_id: outcome.requirement_doc_id,
            scenario_count: self.scenarios.len(),
            test_point_count: self
                .scenarios
                .iter()
                .map(|s| s.test_points.len())
                .sum(),
            saved_case_ids: outcome.saved_ids,
            stats: self.stats.clone(),
        })
    }

    /// Create the remote requirement document on first save only; later
    /// saves in the session reuse the cached id. The id survives a failed
    /// batch, so retries do not create duplicate documents.
    async fn ensure_requirement_doc(&mut self) -> Result<String> {
        if let Some(id) = &self.requirement_doc_id {
            return Ok(id.clone());
        }
        let requirement = self.requirement.as_ref().ok_or_else(|| {
            AppError::PreconditionError("no requirement document for this session".to_string())
        })?;
        let title = requirement
            .requirement_text
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("Requirement document")
            .chars()
            .take(80)
            .collect::<String>();
        let meta = RequirementDocMeta {
            session_id: self.session_id.clone(),
            title,
            section_count: requirement.sections.len() as u32,
        };
        let reference = self.store_client.create_requirement_document(&meta).await?;
        self.requirement_doc_id = Some(reference.id.clone());
        Ok(reference.id)
    }

    fn build_payloads(&self, ids: &[String], doc_id: &str) -> Result<Vec<SaveCasePayload>> {
        let mut payloads = Vec::with_capacity(ids.len());
        for id in ids {
            let case = self
                .drafts
                .get(id)
                .ok_or_else(|| AppError::Internal(format!("selected case {} missing", id)))?;
            let scenario = self
                .scenarios
                .iter()
                .find(|s| s.id == case.lineage.scenario_id);
            let test_point =
                scenario.and_then(|s| s.test_point(&case.lineage.test_point_label));
            let details_json = serde_json::to_string(&case.details)
                .map_err(|err| AppError::Internal(format!("serialize case details: {}", err)))?;
            payloads.push(SaveCasePayload {
                case_id: case.id.clone(),
                name: case.name.clone(),
                description: case.description.clone(),
                priority: case.priority,
                scenario_name: case.lineage.scenario_name.clone(),
                scenario_description: scenario
                    .map(|s| s.description.clone())
                    .unwrap_or_default(),
                test_point_label: case.lineage.test_point_label.clone(),
                test_point_purpose: test_point
                    .map(|tp| tp.description.clone())
                    .unwrap_or_default(),
                section_id: case.lineage.section_id.clone(),
                section_name: case.lineage.section_name.clone(),
                risk_level: test_point
                    .map(|tp| tp.risk_level)
                    .or_else(|| case.details.first().map(|d| d.risk_level))
                    .unwrap_or(RiskLevel::Medium),
                details_json,
                requirement_doc_id: doc_id.to_string(),
            });
        }
        Ok(payloads)
    }

    /// Flip `scenario.saved` for scenarios whose every draft case is now
    /// persisted.
    fn reconcile_saved_scenarios(&mut self, saved_ids: &[String]) {
        let affected: std::collections::HashSet<String> = saved_ids
            .iter()
            .filter_map(|id| self.drafts.get(id))
            .map(|case| case.lineage.scenario_id.clone())
            .collect();
        for scenario in &mut self.scenarios {
            if !affected.contains(&scenario.id) {
                continue;
            }
            let mut any = false;
            let mut all_saved = true;
            for case in self.drafts.for_scenario(&scenario.id) {
                any = true;
                if !case.saved {
                    all_saved = false;
                }
            }
            scenario.saved = any && all_saved;
        }
    }
}
