use crate::application::use_cases::pipeline::client::{CaseGenerationRequest, TestPointRequest};

const MAX_REQUIREMENT_CHARS: usize = 12_000;

pub(crate) fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let prefix: String = value.chars().take(max_chars).collect();
    format!("{}…", prefix)
}

pub(crate) fn build_requirement_system_prompt(language: &str) -> String {
    format!(
        "You are a QA requirements analyst. Rewrite the provided raw input into a structured requirement document with numbered sections. Respond in {}. Return JSON with keys: requirement_text (markdown), sections (list of {{id, name}}). Return only JSON.",
        language
    )
}

pub(crate) fn build_requirement_user_prompt(input: &str, language: &str) -> String {
    let mut body = String::new();
    body.push_str(&format!("Response language: {}\n", language));
    body.push_str("\nRaw requirement input:\n");
    body.push_str(&truncate(input, MAX_REQUIREMENT_CHARS));
    body.push('\n');
    body
}

pub(crate) fn build_scenario_system_prompt(language: &str) -> String {
    format!(
        "You are a QA test design assistant. Split the requirement document into independent test scenarios. Respond in {}. Return JSON with key scenarios: list of {{id, name, description, priority (high|medium|low), related_sections (list of {{id, name}})}}. Return only JSON.",
        language
    )
}

pub(crate) fn build_scenario_user_prompt(
    requirement_text: &str,
    session_id: &str,
    language: &str,
) -> String {
    let mut body = String::new();
    body.push_str(&format!("Session: {}\n", session_id));
    body.push_str(&format!("Response language: {}\n", language));
    body.push_str("\nRequirement document:\n");
    body.push_str(&truncate(requirement_text, MAX_REQUIREMENT_CHARS));
    body.push('\n');
    body
}

pub(crate) fn build_test_point_system_prompt(language: &str) -> String {
    format!(
        "You are a QA test design assistant. Break the scenario into concrete test points. Respond in {}. Return JSON with key test_points: list of {{test_point, description, risk_level (high|medium|low), coverage_area, estimated_case_count}}. Return only JSON.",
        language
    )
}

pub(crate) fn build_test_point_user_prompt(request: &TestPointRequest<'_>, language: &str) -> String {
    let mut body = String::new();
    body.push_str(&format!("Session: {}\n", request.session_id));
    body.push_str(&format!("Response language: {}\n", language));
    body.push_str(&format!("Scenario: {}\n", request.scenario_name));
    body.push_str(&format!("Scenario description: {}\n", request.description));
    if !request.related_sections.is_empty() {
        body.push_str("Related requirement sections:\n");
        for section in request.related_sections {
            body.push_str(&format!("- [{}] {}\n", section.id, section.name));
        }
    }
    body.push_str("\nRequirement document:\n");
    body.push_str(&truncate(request.requirement_text, MAX_REQUIREMENT_CHARS));
    body.push('\n');
    body
}

pub(crate) fn build_case_system_prompt(language: &str) -> String {
    format!(
        "You are a QA test design assistant. Generate executable test cases for the given test point. Respond in {}. Return JSON with keys: test_cases (list of {{name, description, priority (high|medium|low), details}}), total_generated. Each detail: {{purpose, steps (list), expected_result, risk_level, step_count}}. step_count must equal the number of steps. Return only JSON.",
        language
    )
}

pub(crate) fn build_case_user_prompt(request: &CaseGenerationRequest<'_>, language: &str) -> String {
    let mut body = String::new();
    body.push_str(&format!("Session: {}\n", request.session_id));
    body.push_str(&format!("Response language: {}\n", language));
    body.push_str(&format!("Module: {}\n", request.module_context));
    body.push_str(&format!("Scenario: {}\n", request.scenario_name));
    body.push_str(&format!("Scenario description: {}\n", request.description));
    body.push_str(&format!("Test point: {}\n", request.test_point.test_point));
    body.push_str(&format!(
        "Test point description: {}\n",
        request.test_point.description
    ));
    body.push_str(&format!(
        "Coverage area: {}\n",
        request.test_point.coverage_area
    ));
    body.push_str(&format!(
        "Estimated case count: {}\n",
        request.test_point.estimated_case_count
    ));
    if !request.related_sections.is_empty() {
        body.push_str("Related requirement sections:\n");
        for section in request.related_sections {
            body.push_str(&format!("- [{}] {}\n", section.id, section.name));
        }
    }
    body.push_str("\nRequirement document:\n");
    body.push_str(&truncate(request.requirement_text, MAX_REQUIREMENT_CHARS));
    body.push('\n');
    body
}
