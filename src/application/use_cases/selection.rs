//! Tri-state selection cascade over scenario / test point / case.
//!
//! The three maps are a cache over the per-case selection booleans in the
//! draft store, never a ledger: `rebuild` can reconstruct all of them from
//! scratch at any time. Saved cases are excluded everywhere, so a stale
//! checked ancestor can never re-save an already persisted case.

use crate::application::use_cases::draft_repository::DraftStore;
use crate::domain::error::{AppError, Result};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TriState {
    Checked,
    Unchecked,
    Indeterminate,
}

#[derive(Debug, Default)]
pub struct SelectionCascade {
    scenario: HashMap<String, bool>,
    test_point: HashMap<(String, String), bool>,
    case: HashMap<String, bool>,
}

impl SelectionCascade {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconstruct every map from the store. Called after any mutation of
    /// the case population (add, evict, mark saved) so the cache cannot
    /// drift from the authoritative per-case booleans.
    pub fn rebuild(&mut self, store: &DraftStore) {
        self.scenario.clear();
        self.test_point.clear();
        self.case.clear();

        let mut scenario_ids: HashSet<String> = HashSet::new();
        let mut test_point_keys: HashSet<(String, String)> = HashSet::new();
        for case in store.all().iter().filter(|case| !case.saved) {
            self.case.insert(case.id.clone(), case.selected);
            scenario_ids.insert(case.lineage.scenario_id.clone());
            test_point_keys.insert((
                case.lineage.scenario_id.clone(),
                case.lineage.test_point_label.clone(),
            ));
        }
        for (scenario_id, label) in test_point_keys {
            self.recompute_test_point(store, &scenario_id, &label);
        }
        for scenario_id in scenario_ids {
            self.recompute_scenario(store, &scenario_id);
        }
    }

    pub fn toggle_case(&mut self, store: &mut DraftStore, case_id: &str, checked: bool) -> Result<()> {
        let (scenario_id, label, saved) = {
            let case = store
                .get(case_id)
                .ok_or_else(|| AppError::NotFound(format!("draft case {}", case_id)))?;
            (
                case.lineage.scenario_id.clone(),
                case.lineage.test_point_label.clone(),
                case.saved,
            )
        };
        if saved {
            return Err(AppError::ValidationError(
                "saved cases cannot be selected".to_string(),
            ));
        }

        self.case.insert(case_id.to_string(), checked);
        store.set_selected(case_id, checked);
        self.recompute_test_point(store, &scenario_id, &label);
        self.recompute_scenario(store, &scenario_id);
        Ok(())
    }

    /// Set every unsaved case under the test point, then recompute upward.
    pub fn toggle_test_point(
        &mut self,
        store: &mut DraftStore,
        scenario_id: &str,
        label: &str,
        checked: bool,
    ) -> Result<()> {
        let ids: Vec<String> = store
            .for_test_point(scenario_id, label)
            .filter(|case| !case.saved)
            .map(|case| case.id.clone())
            .collect();
        for id in &ids {
            self.case.insert(id.clone(), checked);
            store.set_selected(id, checked);
        }
        self.recompute_test_point(store, scenario_id, label);
        self.recompute_scenario(store, scenario_id);
        Ok(())
    }

    /// Set every unsaved case under any of the scenario's test points.
    pub fn toggle_scenario(
        &mut self,
        store: &mut DraftStore,
        scenario_id: &str,
        checked: bool,
    ) -> Result<()> {
        let entries: Vec<(String, String)> = store
            .for_scenario(scenario_id)
            .filter(|case| !case.saved)
            .map(|case| (case.id.clone(), case.lineage.test_point_label.clone()))
            .collect();
        let mut labels: HashSet<String> = HashSet::new();
        for (id, label) in entries {
            self.case.insert(id.clone(), checked);
            store.set_selected(&id, checked);
            labels.insert(label);
        }
        for label in labels {
            self.recompute_test_point(store, scenario_id, &label);
        }
        self.recompute_scenario(store, scenario_id);
        Ok(())
    }

    /// Drop persisted ids from all three maps. The store must already have
    /// the cases flagged saved.
    pub fn mark_saved(&mut self, store: &DraftStore, ids: &[String]) {
        let mut affected: HashSet<(String, String)> = HashSet::new();
        for id in ids {
            self.case.remove(id);
            if let Some(case) = store.get(id) {
                affected.insert((
                    case.lineage.scenario_id.clone(),
                    case.lineage.test_point_label.clone(),
                ));
            }
        }
        let scenarios: HashSet<String> = affected.iter().map(|(s, _)| s.clone()).collect();
        for (scenario_id, label) in affected {
            self.recompute_test_point(store, &scenario_id, &label);
        }
        for scenario_id in scenarios {
            self.recompute_scenario(store, &scenario_id);
        }
    }

    pub fn is_selected(&self, case_id: &str) -> bool {
        self.case.get(case_id).copied().unwrap_or(false)
    }

    pub fn scenario_checked(&self, scenario_id: &str) -> bool {
        self.scenario.get(scenario_id).copied().unwrap_or(false)
    }

    pub fn test_point_checked(&self, scenario_id: &str, label: &str) -> bool {
        self.test_point
            .get(&(scenario_id.to_string(), label.to_string()))
            .copied()
            .unwrap_or(false)
    }

    /// Selected, unsaved ids in store order; the save snapshot.
    pub fn selected_unsaved_ids(&self, store: &DraftStore) -> Vec<String> {
        store
            .all()
            .iter()
            .filter(|case| !case.saved && self.is_selected(&case.id))
            .map(|case| case.id.clone())
            .collect()
    }

    /// Display derivation for a test point. Saved cases show as completed,
    /// so a test point with a saved and an unselected case reads as mixed.
    pub fn test_point_state(&self, store: &DraftStore, scenario_id: &str, label: &str) -> TriState {
        self.derive(store.for_test_point(scenario_id, label))
    }

    pub fn scenario_state(&self, store: &DraftStore, scenario_id: &str) -> TriState {
        self.derive(store.for_scenario(scenario_id))
    }

    fn derive<'a, I: Iterator<Item = &'a crate::domain::artifact::DraftCase>>(
        &self,
        cases: I,
    ) -> TriState {
        let mut total = 0usize;
        let mut checked = 0usize;
        for case in cases {
            total += 1;
            if case.saved || self.is_selected(&case.id) {
                checked += 1;
            }
        }
        if total == 0 || checked == 0 {
            TriState::Unchecked
        } else if checked == total {
            TriState::Checked
        } else {
            TriState::Indeterminate
        }
    }

    /// True iff every unsaved case under the test point is selected and at
    /// least one unsaved case exists; the key is dropped otherwise.
    fn recompute_test_point(&mut self, store: &DraftStore, scenario_id: &str, label: &str) {
        let mut unsaved = 0usize;
        let mut all_selected = true;
        for case in store
            .for_test_point(scenario_id, label)
            .filter(|case| !case.saved)
        {
            unsaved += 1;
            if !self.is_selected(&case.id) {
                all_selected = false;
            }
        }
        let key = (scenario_id.to_string(), label.to_string());
        if unsaved == 0 {
            self.test_point.remove(&key);
        } else {
            self.test_point.insert(key, all_selected);
        }
    }

    fn recompute_scenario(&mut self, store: &DraftStore, scenario_id: &str) {
        let mut unsaved = 0usize;
        let mut all_selected = true;
        for case in store.for_scenario(scenario_id).filter(|case| !case.saved) {
            unsaved += 1;
            if !self.is_selected(&case.id) {
                all_selected = false;
            }
        }
        if unsaved == 0 {
            self.scenario.remove(scenario_id);
        } else {
            self.scenario.insert(scenario_id.to_string(), all_selected);
        }
    }

    #[cfg(test)]
    fn snapshot(&self) -> (Vec<(String, bool)>, Vec<((String, String), bool)>, Vec<(String, bool)>) {
        let mut s: Vec<_> = self.scenario.clone().into_iter().collect();
        let mut t: Vec<_> = self.test_point.clone().into_iter().collect();
        let mut c: Vec<_> = self.case.clone().into_iter().collect();
        s.sort();
        t.sort();
        c.sort();
        (s, t, c)
    }
}
