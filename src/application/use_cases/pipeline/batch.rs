use super::PipelineUseCase;
use crate::domain::error::Result;
use serde::Serialize;
use tracing::{info, warn};

/// One test point passed over during a batch run, with the error that
/// caused it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSkip {
    pub test_point_label: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub scenario_id: String,
    pub attempted: usize,
    pub succeeded: usize,
    pub cases_generated: usize,
    pub cases_filtered: usize,
    pub skipped: Vec<BatchSkip>,
}

impl PipelineUseCase {
    /// Fill every empty test point of a scenario, one call at a time.
    ///
    /// Points that already hold cases or are mid-generation are left
    /// alone. Calls run strictly sequentially with a pacing delay between
    /// them, and a failure on one point is recorded and skipped rather
    /// than aborting the rest of the queue.
    pub async fn batch_generate_test_cases(&mut self, scenario_id: &str) -> Result<BatchReport> {
        let queue: Vec<String> = self
            .require_scenario(scenario_id)?
            .test_points
            .iter()
            .filter(|tp| tp.case_ids.is_empty() && !tp.generating)
            .map(|tp| tp.test_point.clone())
            .collect();

        let mut report = BatchReport {
            scenario_id: scenario_id.to_string(),
            attempted: queue.len(),
            succeeded: 0,
            cases_generated: 0,
            cases_filtered: 0,
            skipped: Vec::new(),
        };

        for (index, label) in queue.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.batch_delay).await;
            }
            match self.generate_test_cases(scenario_id, label, false).await {
                Ok(result) => {
                    report.succeeded += 1;
                    report.cases_generated += result.accepted.len();
                    report.cases_filtered += result.rejected.len();
                }
                Err(err) => {
                    warn!(
                        "Batch generation skipped test point {} in scenario {}: {}",
                        label, scenario_id, err
                    );
                    self.stats.batch_items_skipped += 1;
                    report.skipped.push(BatchSkip {
                        test_point_label: label.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        info!(
            "Batch generation for scenario {}: {}/{} test points filled, {} cases",
            scenario_id, report.succeeded, report.attempted, report.cases_generated
        );
        Ok(report)
    }
}
