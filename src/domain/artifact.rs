use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Lenient parse used on model output; the validity filter rejects the
    /// candidate when the value is unrecognizable.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "high" | "p0" | "p1" => Some(Priority::High),
            "medium" | "mid" | "p2" => Some(Priority::Medium),
            "low" | "p3" => Some(Priority::Low),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

impl RiskLevel {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "high" => Some(RiskLevel::High),
            "medium" | "mid" => Some(RiskLevel::Medium),
            "low" => Some(RiskLevel::Low),
            _ => None,
        }
    }
}

/// Reference to a section of the generated requirement document.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SectionRef {
    pub id: String,
    pub name: String,
}

/// Top-level grouping of test intent, produced by stage-1 generation.
/// Mutated only by stage-2 generation (test point replacement) and by
/// save reconciliation. Never deleted within a session.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub id: String,
    pub name: String,
    pub description: String,
    pub priority: Priority,
    pub related_sections: Vec<SectionRef>,
    pub test_points: Vec<TestPoint>,
    /// Advisory in-flight flag for stage-2 generation on this scenario.
    pub generating: bool,
    /// UI affordance set once case generation completed under this scenario.
    pub expanded: bool,
    /// Set by save reconciliation once every case under it is persisted.
    pub saved: bool,
    pub created_at: i64,
}

impl Scenario {
    pub fn test_point(&self, label: &str) -> Option<&TestPoint> {
        self.test_points.iter().find(|tp| tp.test_point == label)
    }

    pub fn test_point_mut(&mut self, label: &str) -> Option<&mut TestPoint> {
        self.test_points.iter_mut().find(|tp| tp.test_point == label)
    }
}

/// A specific condition or risk inside a scenario. Identity is the
/// `(scenario id, label)` pair; stage-2 generation creates or replaces it.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TestPoint {
    /// Label; doubles as the identity component inside the owning scenario.
    pub test_point: String,
    pub description: String,
    pub risk_level: RiskLevel,
    pub coverage_area: String,
    pub estimated_case_count: u32,
    /// Ids of accepted draft cases, in generation order.
    pub case_ids: Vec<String>,
    /// Candidates the validity filter rejected, kept visible with a reason.
    pub rejected: Vec<RejectedCase>,
    /// Advisory in-flight flag for stage-3 generation on this test point.
    pub generating: bool,
    pub expanded: bool,
}

/// Denormalized execution detail embedded in a draft case. A copy, not a
/// reference: the case can outlive the summary on its parent test point.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TestPointDetail {
    pub purpose: String,
    pub steps: Vec<String>,
    pub expected_result: String,
    pub risk_level: RiskLevel,
}

/// Lineage stamped onto every draft case so persistence can denormalize it
/// without foreign keys back into the in-memory scenario graph.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CaseLineage {
    pub scenario_id: String,
    pub scenario_name: String,
    pub test_point_label: String,
    pub section_id: Option<String>,
    pub section_name: Option<String>,
}

/// A generated test case held in memory prior to persistence.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DraftCase {
    pub id: String,
    pub name: String,
    pub description: String,
    pub priority: Priority,
    pub details: Vec<TestPointDetail>,
    pub lineage: CaseLineage,
    /// Cascade-derived; the selection maps are authoritative.
    pub selected: bool,
    pub saved: bool,
    pub created_at: i64,
}

/// A candidate that failed consistency validation; shown but never saveable.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RejectedCase {
    pub id: String,
    pub name: String,
    pub description: String,
    pub filter_reason: String,
    /// Always false; rejected candidates are not selectable.
    pub selected: bool,
}

/// Output of the upstream document-generation collaborator.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RequirementDocument {
    pub requirement_text: String,
    pub sections: Vec<SectionRef>,
}
