//! Validity filtering of raw model output.
//!
//! Separates candidates that are internally consistent from ones that are
//! not. Rejected candidates are never dropped silently: each carries a
//! human-readable reason and stays visible next to its test point. The
//! rule set is pluggable; rejection is deterministic for identical input.

use crate::application::use_cases::id_gen::IdStrategy;
use crate::application::use_cases::pipeline::hashing::hash_value;
use crate::application::use_cases::pipeline::types::RawCase;
use crate::domain::artifact::{
    CaseLineage, DraftCase, Priority, RejectedCase, RiskLevel, TestPointDetail,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static STEP_REFERENCE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)step\s+(\d+)").unwrap());

/// One consistency rule. Returns a rejection reason when the candidate
/// fails, `None` when it passes.
pub trait ValidationRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn check(&self, case: &RawCase) -> Option<String>;
}

struct NonEmptyName;

impl ValidationRule for NonEmptyName {
    fn name(&self) -> &'static str {
        "non_empty_name"
    }

    fn check(&self, case: &RawCase) -> Option<String> {
        if case.name.trim().is_empty() {
            Some("case name is missing".to_string())
        } else {
            None
        }
    }
}

struct HasSteps;

impl ValidationRule for HasSteps {
    fn name(&self) -> &'static str {
        "has_steps"
    }

    fn check(&self, case: &RawCase) -> Option<String> {
        if case.details.is_empty() {
            return Some("case has no test point details".to_string());
        }
        for (index, detail) in case.details.iter().enumerate() {
            if detail.steps.iter().all(|s| s.trim().is_empty()) {
                return Some(format!("detail {} has no steps", index + 1));
            }
        }
        None
    }
}

struct StepCountConsistent;

impl ValidationRule for StepCountConsistent {
    fn name(&self) -> &'static str {
        "step_count_consistent"
    }

    fn check(&self, case: &RawCase) -> Option<String> {
        for (index, detail) in case.details.iter().enumerate() {
            if let Some(reported) = detail.step_count {
                let actual = detail.steps.len() as u32;
                if reported != actual {
                    return Some(format!(
                        "detail {} reports {} steps but lists {}",
                        index + 1,
                        reported,
                        actual
                    ));
                }
            }
        }
        None
    }
}

struct NonEmptyExpectedResult;

impl ValidationRule for NonEmptyExpectedResult {
    fn name(&self) -> &'static str {
        "non_empty_expected_result"
    }

    fn check(&self, case: &RawCase) -> Option<String> {
        for (index, detail) in case.details.iter().enumerate() {
            if detail.expected_result.trim().is_empty() {
                return Some(format!("detail {} has no expected result", index + 1));
            }
        }
        None
    }
}

struct StepReferenceInRange;

impl ValidationRule for StepReferenceInRange {
    fn name(&self) -> &'static str {
        "step_reference_in_range"
    }

    fn check(&self, case: &RawCase) -> Option<String> {
        for (index, detail) in case.details.iter().enumerate() {
            let step_count = detail.steps.len() as u64;
            for capture in STEP_REFERENCE_PATTERN.captures_iter(&detail.expected_result) {
                let referenced: u64 = match capture[1].parse() {
                    Ok(n) => n,
                    Err(_) => continue,
                };
                if referenced == 0 || referenced > step_count {
                    return Some(format!(
                        "detail {} expected result references step {} but only {} steps exist",
                        index + 1,
                        referenced,
                        step_count
                    ));
                }
            }
        }
        None
    }
}

struct ParseablePriority;

impl ValidationRule for ParseablePriority {
    fn name(&self) -> &'static str {
        "parseable_priority"
    }

    fn check(&self, case: &RawCase) -> Option<String> {
        if let Some(priority) = case.priority.as_deref() {
            if !priority.trim().is_empty() && Priority::parse(priority).is_none() {
                return Some(format!("unrecognized priority \"{}\"", priority.trim()));
            }
        }
        for (index, detail) in case.details.iter().enumerate() {
            if let Some(risk) = detail.risk_level.as_deref() {
                if !risk.trim().is_empty() && RiskLevel::parse(risk).is_none() {
                    return Some(format!(
                        "detail {} has unrecognized risk level \"{}\"",
                        index + 1,
                        risk.trim()
                    ));
                }
            }
        }
        None
    }
}

/// Result of filtering one raw batch.
#[derive(Debug, Default)]
pub struct FilterOutcome {
    pub accepted: Vec<DraftCase>,
    pub rejected: Vec<RejectedCase>,
}

pub struct ValidityFilter {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl ValidityFilter {
    pub fn new(rules: Vec<Box<dyn ValidationRule>>) -> Self {
        Self { rules }
    }

    pub fn with_default_rules() -> Self {
        Self::new(vec![
            Box::new(NonEmptyName),
            Box::new(HasSteps),
            Box::new(StepCountConsistent),
            Box::new(NonEmptyExpectedResult),
            Box::new(StepReferenceInRange),
            Box::new(ParseablePriority),
        ])
    }

    /// Partition one raw batch for a single test point. Accepted cases get
    /// fresh display ids from the injected strategy; duplicates of earlier
    /// candidates in the same batch are rejected.
    pub fn partition(
        &self,
        raw: Vec<RawCase>,
        lineage: &CaseLineage,
        module: &str,
        ids: &mut dyn IdStrategy,
        created_at: i64,
    ) -> FilterOutcome {
        let mut outcome = FilterOutcome::default();
        let mut seen: HashSet<String> = HashSet::new();

        for case in raw {
            if let Some(reason) = self.first_failure(&case) {
                outcome.rejected.push(Self::reject(case, reason, module, ids));
                continue;
            }

            let digest = content_digest(&case);
            if !seen.insert(digest) {
                outcome.rejected.push(Self::reject(
                    case,
                    "duplicate of an earlier candidate in this batch".to_string(),
                    module,
                    ids,
                ));
                continue;
            }

            outcome.accepted.push(DraftCase {
                id: ids.next_case_id(module),
                name: case.name.trim().to_string(),
                description: case.description.trim().to_string(),
                priority: case
                    .priority
                    .as_deref()
                    .and_then(Priority::parse)
                    .unwrap_or(Priority::Medium),
                details: case
                    .details
                    .iter()
                    .map(|detail| TestPointDetail {
                        purpose: detail.purpose.trim().to_string(),
                        steps: detail
                            .steps
                            .iter()
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                            .collect(),
                        expected_result: detail.expected_result.trim().to_string(),
                        risk_level: detail
                            .risk_level
                            .as_deref()
                            .and_then(RiskLevel::parse)
                            .unwrap_or(RiskLevel::Medium),
                    })
                    .collect(),
                lineage: lineage.clone(),
                selected: false,
                saved: false,
                created_at,
            });
        }

        outcome
    }

    fn first_failure(&self, case: &RawCase) -> Option<String> {
        for rule in &self.rules {
            if let Some(reason) = rule.check(case) {
                return Some(reason);
            }
        }
        None
    }

    fn reject(
        case: RawCase,
        reason: String,
        module: &str,
        ids: &mut dyn IdStrategy,
    ) -> RejectedCase {
        RejectedCase {
            id: ids.next_rejected_id(module),
            name: case.name.trim().to_string(),
            description: case.description.trim().to_string(),
            filter_reason: reason,
            selected: false,
        }
    }
}

fn content_digest(case: &RawCase) -> String {
    let steps: Vec<String> = case
        .details
        .iter()
        .flat_map(|detail| detail.steps.iter().map(|s| s.trim().to_string()))
        .collect();
    hash_value(&format!("{}:{}", case.name.trim(), steps.join("|")))
}
