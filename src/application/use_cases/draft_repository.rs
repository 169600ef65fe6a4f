//! In-memory store of generated draft cases.
//!
//! Single source of truth for every case in the session, independent of
//! which scenario or test point view currently displays it. Ids are unique
//! for the lifetime of the session, even across regenerate operations.

use crate::domain::artifact::{DraftCase, Priority, TestPointDetail};
use crate::domain::error::{AppError, Result};
use serde::Deserialize;
use std::collections::HashSet;

/// Fields a user may hand-edit on a draft before saving.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub details: Option<Vec<TestPointDetail>>,
}

#[derive(Debug, Default)]
pub struct DraftStore {
    cases: Vec<DraftCase>,
    known_ids: HashSet<String>,
}

impl DraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append accepted cases. An id seen before in this session is a
    /// programming error upstream (ids must never be reused).
    pub fn add(&mut self, cases: Vec<DraftCase>) -> Result<()> {
        for case in &cases {
            if !self.known_ids.insert(case.id.clone()) {
                return Err(AppError::Internal(format!(
                    "draft case id {} was reused within the session",
                    case.id
                )));
            }
        }
        self.cases.extend(cases);
        Ok(())
    }

    /// Regenerate support: evict this test point's cases, then install the
    /// replacements. Saved cases are preserved when `preserve_saved` is set
    /// (they are already committed externally). Returns the evicted ids.
    pub fn replace_for_test_point(
        &mut self,
        scenario_id: &str,
        test_point_label: &str,
        cases: Vec<DraftCase>,
        preserve_saved: bool,
    ) -> Result<Vec<String>> {
        let evicted = self.evict(|case| {
            case.lineage.scenario_id == scenario_id
                && case.lineage.test_point_label == test_point_label
                && !(preserve_saved && case.saved)
        });
        self.add(cases)?;
        Ok(evicted)
    }

    /// Cascading eviction used before a scenario's test points are
    /// regenerated; stale cases would otherwise reference replaced points.
    pub fn remove_for_scenario(&mut self, scenario_id: &str, preserve_saved: bool) -> Vec<String> {
        self.evict(|case| {
            case.lineage.scenario_id == scenario_id && !(preserve_saved && case.saved)
        })
    }

    /// Explicit user removal of a single draft.
    pub fn remove(&mut self, id: &str) -> Option<DraftCase> {
        let index = self.cases.iter().position(|case| case.id == id)?;
        // known_ids intentionally keeps the id: it must never be minted again.
        Some(self.cases.remove(index))
    }

    pub fn mark_saved(&mut self, ids: &[String]) {
        for case in &mut self.cases {
            if ids.iter().any(|id| id == &case.id) {
                case.saved = true;
                case.selected = false;
            }
        }
    }

    pub fn update(&mut self, id: &str, patch: DraftPatch) -> Result<()> {
        let case = self
            .cases
            .iter_mut()
            .find(|case| case.id == id)
            .ok_or_else(|| AppError::NotFound(format!("draft case {}", id)))?;
        if case.saved {
            return Err(AppError::ValidationError(
                "saved cases cannot be edited".to_string(),
            ));
        }
        if let Some(name) = patch.name {
            case.name = name;
        }
        if let Some(description) = patch.description {
            case.description = description;
        }
        if let Some(priority) = patch.priority {
            case.priority = priority;
        }
        if let Some(details) = patch.details {
            case.details = details;
        }
        Ok(())
    }

    pub fn set_selected(&mut self, id: &str, selected: bool) {
        if let Some(case) = self.cases.iter_mut().find(|case| case.id == id) {
            if !case.saved {
                case.selected = selected;
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&DraftCase> {
        self.cases.iter().find(|case| case.id == id)
    }

    pub fn all(&self) -> &[DraftCase] {
        &self.cases
    }

    pub fn for_scenario<'a>(
        &'a self,
        scenario_id: &'a str,
    ) -> impl Iterator<Item = &'a DraftCase> {
        self.cases
            .iter()
            .filter(move |case| case.lineage.scenario_id == scenario_id)
    }

    pub fn for_test_point<'a>(
        &'a self,
        scenario_id: &'a str,
        test_point_label: &'a str,
    ) -> impl Iterator<Item = &'a DraftCase> {
        self.cases.iter().filter(move |case| {
            case.lineage.scenario_id == scenario_id
                && case.lineage.test_point_label == test_point_label
        })
    }

    /// Stage-1 re-entry: drop every draft. Minted ids stay reserved.
    pub fn clear(&mut self) {
        self.cases.clear();
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    fn evict<F: Fn(&DraftCase) -> bool>(&mut self, predicate: F) -> Vec<String> {
        let mut evicted = Vec::new();
        self.cases.retain(|case| {
            if predicate(case) {
                evicted.push(case.id.clone());
                false
            } else {
                true
            }
        });
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::artifact::{CaseLineage, RiskLevel};

    fn case(id: &str, scenario: &str, label: &str, saved: bool) -> DraftCase {
        DraftCase {
            id: id.to_string(),
            name: format!("case {}", id),
            description: String::new(),
            priority: Priority::Medium,
            details: vec![TestPointDetail {
                purpose: "p".to_string(),
                steps: vec!["s1".to_string()],
                expected_result: "ok".to_string(),
                risk_level: RiskLevel::Low,
            }],
            lineage: CaseLineage {
                scenario_id: scenario.to_string(),
                scenario_name: scenario.to_string(),
                test_point_label: label.to_string(),
                section_id: None,
                section_name: None,
            },
            selected: false,
            saved,
            created_at: 0,
        }
    }

    #[test]
    fn test_add_rejects_reused_id() {
        let mut store = DraftStore::new();
        store.add(vec![case("a", "s1", "tp", false)]).unwrap();
        let result = store.add(vec![case("a", "s1", "tp", false)]);
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[test]
    fn test_removed_id_stays_reserved() {
        let mut store = DraftStore::new();
        store.add(vec![case("a", "s1", "tp", false)]).unwrap();
        store.remove("a").unwrap();
        // A removed id must fail safely if something tries to re-add it.
        assert!(store.add(vec![case("a", "s1", "tp", false)]).is_err());
    }

    #[test]
    fn test_replace_preserves_saved_cases() {
        let mut store = DraftStore::new();
        store
            .add(vec![case("a", "s1", "tp", true), case("b", "s1", "tp", false)])
            .unwrap();
        let evicted = store
            .replace_for_test_point("s1", "tp", vec![case("c", "s1", "tp", false)], true)
            .unwrap();
        assert_eq!(evicted, vec!["b".to_string()]);
        let ids: Vec<&str> = store.all().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_remove_for_scenario_is_cascading() {
        let mut store = DraftStore::new();
        store
            .add(vec![
                case("a", "s1", "tp1", false),
                case("b", "s1", "tp2", false),
                case("c", "s2", "tp1", false),
            ])
            .unwrap();
        let evicted = store.remove_for_scenario("s1", true);
        assert_eq!(evicted.len(), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.all()[0].id, "c");
    }

    #[test]
    fn test_mark_saved_clears_selection_flag() {
        let mut store = DraftStore::new();
        store.add(vec![case("a", "s1", "tp", false)]).unwrap();
        store.set_selected("a", true);
        store.mark_saved(&["a".to_string()]);
        let saved = store.get("a").unwrap();
        assert!(saved.saved);
        assert!(!saved.selected);
    }

    #[test]
    fn test_update_refuses_saved_case() {
        let mut store = DraftStore::new();
        store.add(vec![case("a", "s1", "tp", true)]).unwrap();
        let patch = DraftPatch {
            name: Some("edited".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            store.update("a", patch),
            Err(AppError::ValidationError(_))
        ));
    }
}
