use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RawSectionRef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Stage-1 output: one candidate scenario as the model emitted it.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScenarioDraft {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub related_sections: Vec<RawSectionRef>,
}

#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct ScenarioSplitOutput {
    #[serde(default)]
    pub(crate) scenarios: Vec<ScenarioDraft>,
}

/// Stage-2 output: one candidate test point.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TestPointDraft {
    #[serde(default)]
    pub test_point: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub risk_level: Option<String>,
    #[serde(default)]
    pub coverage_area: String,
    #[serde(default)]
    pub estimated_case_count: Option<u32>,
}

#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct TestPointSplitOutput {
    #[serde(default)]
    pub(crate) test_points: Vec<TestPointDraft>,
}

/// Stage-3 output: one raw candidate case, prior to validity filtering.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RawCase {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub details: Vec<RawCaseDetail>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RawCaseDetail {
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub expected_result: String,
    #[serde(default)]
    pub risk_level: Option<String>,
    /// Step count as reported by the model; checked against `steps.len()`.
    #[serde(default)]
    pub step_count: Option<u32>,
}

/// Raw stage-3 batch as returned by the generation collaborator. The
/// accepted/rejected partition happens locally in the validity filter.
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct CaseGenerationOutput {
    #[serde(default)]
    pub test_cases: Vec<RawCase>,
    #[serde(default)]
    pub total_generated: Option<u32>,
}

#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct RequirementDocOutput {
    #[serde(default)]
    pub(crate) requirement_text: String,
    #[serde(default)]
    pub(crate) sections: Vec<RawSectionRef>,
}
