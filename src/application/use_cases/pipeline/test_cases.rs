use super::{CaseGenerationRequest, PipelineUseCase, Stage};
use crate::domain::artifact::{CaseLineage, DraftCase, RejectedCase};
use crate::domain::error::{AppError, Result};
use serde::Serialize;
use std::time::Instant;
use tracing::info;

/// Outcome of one stage-3 call, after validity filtering.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseGenerationResult {
    pub accepted: Vec<DraftCase>,
    pub rejected: Vec<RejectedCase>,
    pub total_generated: u32,
    pub filtered_count: u32,
}

impl PipelineUseCase {
    /// Stage 3: generate test cases for one test point.
    ///
    /// First generation appends; `regenerate` evicts the point's unsaved
    /// cases and always mints fresh ids, so a stale reference can never
    /// resolve to a replacement case. A failed call leaves the test point
    /// exactly as it was.
    pub async fn generate_test_cases(
        &mut self,
        scenario_id: &str,
        test_point_label: &str,
        regenerate: bool,
    ) -> Result<CaseGenerationResult> {
        if test_point_label.trim().is_empty() {
            return Err(AppError::PreconditionError(
                "test point label is empty".to_string(),
            ));
        }
        {
            let scenario = self.require_scenario(scenario_id)?;
            let tp = scenario.test_point(test_point_label).ok_or_else(|| {
                AppError::PreconditionError(format!(
                    "test point {} does not exist under scenario {}",
                    test_point_label, scenario_id
                ))
            })?;
            if tp.generating {
                return Err(AppError::ValidationError(format!(
                    "case generation already in flight for test point {}",
                    test_point_label
                )));
            }
        }

        self.set_test_point_generating(scenario_id, test_point_label, true)?;
        let started = Instant::now();
        let outcome = {
            let scenario = self.require_scenario(scenario_id)?;
            // Checked above; the in-flight flag cannot drop the point.
            let tp = match scenario.test_point(test_point_label) {
                Some(tp) => tp,
                None => {
                    return Err(AppError::Internal(format!(
                        "test point {} vanished mid-call",
                        test_point_label
                    )))
                }
            };
            let request = CaseGenerationRequest {
                test_point: tp,
                scenario_id: &scenario.id,
                scenario_name: &scenario.name,
                description: &scenario.description,
                requirement_text: self
                    .requirement
                    .as_ref()
                    .map(|doc| doc.requirement_text.as_str())
                    .unwrap_or_default(),
                module_context: &self.config.module_code,
                related_sections: &scenario.related_sections,
                session_id: &self.session_id,
            };
            self.timed(
                self.generation_client
                    .generate_test_cases(&self.config.llm, request),
            )
            .await
        };
        self.set_test_point_generating(scenario_id, test_point_label, false)?;
        let output = outcome?;
        self.stats
            .record_generation(started.elapsed().as_millis() as u64);

        let reported_total = output
            .total_generated
            .unwrap_or(output.test_cases.len() as u32);
        let lineage = {
            let scenario = self.require_scenario(scenario_id)?;
            let section = scenario.related_sections.first();
            CaseLineage {
                scenario_id: scenario.id.clone(),
                scenario_name: scenario.name.clone(),
                test_point_label: test_point_label.to_string(),
                section_id: section.map(|s| s.id.clone()),
                section_name: section.map(|s| s.name.clone()),
            }
        };
        let created_at = chrono::Utc::now().timestamp_millis();
        let filtered = self.filter.partition(
            output.test_cases,
            &lineage,
            &self.config.module_code,
            self.ids.as_mut(),
            created_at,
        );
        let accepted = filtered.accepted;
        let rejected = filtered.rejected;

        if regenerate {
            self.drafts.replace_for_test_point(
                scenario_id,
                test_point_label,
                accepted.clone(),
                self.config.preserve_saved_on_regenerate,
            )?;
        } else {
            self.drafts.add(accepted.clone())?;
        }

        let case_ids: Vec<String> = self
            .drafts
            .for_test_point(scenario_id, test_point_label)
            .map(|case| case.id.clone())
            .collect();
        let scenario = self.require_scenario_mut(scenario_id)?;
        scenario.expanded = true;
        if let Some(tp) = scenario.test_point_mut(test_point_label) {
            tp.case_ids = case_ids;
            if regenerate {
                tp.rejected = rejected.clone();
            } else {
                tp.rejected.extend(rejected.iter().cloned());
            }
            tp.expanded = true;
        }
        self.selection.rebuild(&self.drafts);
        self.stats.cases_accepted += accepted.len() as u64;
        self.stats.cases_filtered += rejected.len() as u64;
        if self.stage() < Stage::Cases {
            self.set_stage(Stage::Cases);
        }

        info!(
            "Generated {} cases ({} filtered) for test point {} in scenario {}",
            accepted.len(),
            rejected.len(),
            test_point_label,
            scenario_id
        );
        let filtered_count = rejected.len() as u32;
        Ok(CaseGenerationResult {
            accepted,
            rejected,
            total_generated: reported_total,
            filtered_count,
        })
    }

    fn set_test_point_generating(
        &mut self,
        scenario_id: &str,
        test_point_label: &str,
        value: bool,
    ) -> Result<()> {
        let scenario = self.require_scenario_mut(scenario_id)?;
        if let Some(tp) = scenario.test_point_mut(test_point_label) {
            tp.generating = value;
        }
        Ok(())
    }
}
