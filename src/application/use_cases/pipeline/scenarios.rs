use super::{PipelineUseCase, Stage};
use crate::application::use_cases::pipeline::hashing::hash_input;
use crate::domain::artifact::{Priority, RequirementDocument, Scenario, SectionRef};
use crate::domain::error::{AppError, Result};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info, warn};

impl PipelineUseCase {
    /// Stage 1: split the requirement document into scenarios.
    ///
    /// Re-entry is idempotent: prior scenarios, drafts and selections are
    /// cleared before the new list is installed. On failure the funnel
    /// rolls back one step so the caller returns to requirement editing.
    pub async fn analyze_scenarios(&mut self, requirement_text: &str) -> Result<Vec<Scenario>> {
        if requirement_text.trim().is_empty() {
            return Err(AppError::PreconditionError(
                "requirement text is empty".to_string(),
            ));
        }

        debug!(
            "scenario split input digest {}",
            hash_input(requirement_text, &self.config.llm.model)
        );

        let started = Instant::now();
        let outcome = self
            .timed(self.generation_client.split_scenarios(
                &self.config.llm,
                requirement_text,
                &self.session_id,
            ))
            .await;
        let drafts = match outcome {
            Ok(drafts) => drafts,
            Err(err) => {
                self.set_stage(Stage::Requirement);
                return Err(err);
            }
        };
        self.stats
            .record_generation(started.elapsed().as_millis() as u64);

        let created_at = chrono::Utc::now().timestamp_millis();
        let mut scenarios = Vec::with_capacity(drafts.len());
        let mut seen_ids: HashSet<String> = HashSet::new();
        for draft in drafts {
            // Model-supplied ids are kept only while unique; scenario lookup
            // is by id, so a collision would shadow an earlier scenario.
            let id = match draft.id.filter(|id| !id.trim().is_empty()) {
                Some(id) if seen_ids.insert(id.clone()) => id,
                Some(duplicate) => {
                    warn!(
                        "Duplicate scenario id {} in model output; assigning a fresh id",
                        duplicate
                    );
                    self.ids.entity_id()
                }
                None => self.ids.entity_id(),
            };
            scenarios.push(Scenario {
                id,
                name: draft.name.trim().to_string(),
                description: draft.description.trim().to_string(),
                priority: draft
                    .priority
                    .as_deref()
                    .and_then(Priority::parse)
                    .unwrap_or(Priority::Medium),
                related_sections: draft
                    .related_sections
                    .into_iter()
                    .map(|section| SectionRef {
                        id: section.id,
                        name: section.name,
                    })
                    .collect(),
                test_points: Vec::new(),
                generating: false,
                expanded: false,
                saved: false,
                created_at,
            });
        }

        let count = scenarios.len();
        self.scenarios = scenarios;
        self.drafts.clear();
        self.selection.rebuild(&self.drafts);
        match self.requirement.as_mut() {
            Some(document) => document.requirement_text = requirement_text.to_string(),
            None => {
                self.requirement = Some(RequirementDocument {
                    requirement_text: requirement_text.to_string(),
                    sections: Vec::new(),
                });
            }
        }
        self.stats.scenarios_generated += count as u64;
        self.set_stage(Stage::Scenarios);

        info!("Analyzed {} scenarios for session {}", count, self.session_id);
        Ok(self.scenarios.clone())
    }
}
