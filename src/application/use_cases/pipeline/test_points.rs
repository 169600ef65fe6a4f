use super::{PipelineUseCase, Stage, TestPointRequest};
use crate::domain::artifact::{RiskLevel, TestPoint};
use crate::domain::error::{AppError, Result};
use std::time::Instant;
use tracing::{debug, info, warn};

impl PipelineUseCase {
    /// Stage 2: break one scenario into test points.
    ///
    /// With `regenerate` unset, an already-populated scenario is a guarded
    /// no-op. With it set, every draft case owned by the scenario is
    /// evicted before the new test points are installed; stale cases would
    /// otherwise reference replaced test points. A failed call leaves the
    /// scenario exactly as it was.
    pub async fn generate_test_points(
        &mut self,
        scenario_id: &str,
        regenerate: bool,
    ) -> Result<Vec<TestPoint>> {
        self.requirement_text()?;
        {
            let scenario = self.require_scenario(scenario_id)?;
            if scenario.generating {
                return Err(AppError::ValidationError(format!(
                    "test point generation already in flight for scenario {}",
                    scenario_id
                )));
            }
            if !regenerate && !scenario.test_points.is_empty() {
                debug!(
                    "Scenario {} already has test points; skipping generation",
                    scenario_id
                );
                return Ok(scenario.test_points.clone());
            }
        }

        self.require_scenario_mut(scenario_id)?.generating = true;
        let started = Instant::now();
        let outcome = {
            let scenario = self.require_scenario(scenario_id)?;
            let request = TestPointRequest {
                scenario_id: &scenario.id,
                scenario_name: &scenario.name,
                description: &scenario.description,
                requirement_text: self.requirement_text()?,
                related_sections: &scenario.related_sections,
                session_id: &self.session_id,
            };
            self.timed(
                self.generation_client
                    .split_test_points(&self.config.llm, request),
            )
            .await
        };
        self.require_scenario_mut(scenario_id)?.generating = false;
        let drafts = outcome?;
        self.stats
            .record_generation(started.elapsed().as_millis() as u64);

        let mut points = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let label = draft.test_point.trim().to_string();
            if label.is_empty() {
                warn!(
                    "Skipping test point with empty label under scenario {}",
                    scenario_id
                );
                continue;
            }
            points.push(TestPoint {
                test_point: label,
                description: draft.description.trim().to_string(),
                risk_level: draft
                    .risk_level
                    .as_deref()
                    .and_then(RiskLevel::parse)
                    .unwrap_or(RiskLevel::Medium),
                coverage_area: draft.coverage_area.trim().to_string(),
                estimated_case_count: draft.estimated_case_count.unwrap_or(0),
                case_ids: Vec::new(),
                rejected: Vec::new(),
                generating: false,
                expanded: false,
            });
        }

        if regenerate {
            // Every case under the scenario goes, saved included: a case
            // kept here would carry lineage into a replaced test point.
            let evicted = self.drafts.remove_for_scenario(scenario_id, false);
            if !evicted.is_empty() {
                info!(
                    "Evicted {} stale cases before reinstalling test points for scenario {}",
                    evicted.len(),
                    scenario_id
                );
            }
        }

        let count = points.len();
        let scenario = self.require_scenario_mut(scenario_id)?;
        scenario.test_points = points;
        let installed = scenario.test_points.clone();
        self.selection.rebuild(&self.drafts);
        self.stats.test_points_generated += count as u64;
        if self.stage() < Stage::TestPoints {
            self.set_stage(Stage::TestPoints);
        }

        info!(
            "Generated {} test points for scenario {}",
            count, scenario_id
        );
        Ok(installed)
    }
}
