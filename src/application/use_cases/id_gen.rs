use uuid::Uuid;

/// Id generation strategy for generated artifacts. Injected into the
/// pipeline so display ids stay deterministic under test while internal
/// ids stay opaque.
///
/// Contract: ids handed out by one instance are never repeated for the
/// lifetime of the session, including across regenerate operations, so a
/// stale reference to an evicted case can never resolve to a new one.
pub trait IdStrategy: Send + Sync {
    /// Display id for an accepted case, e.g. `LOGIN_007`.
    fn next_case_id(&mut self, module: &str) -> String;

    /// Id for a rejected candidate; carries a suffix so it can never be
    /// confused with an accepted case id.
    fn next_rejected_id(&mut self, module: &str) -> String;

    /// Opaque id for internal entities (scenarios, documents).
    fn entity_id(&mut self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Default strategy: one monotonic counter shared by accepted and rejected
/// ids, zero-padded under an uppercased module code.
pub struct CounterIds {
    next: u64,
    pad: usize,
}

impl CounterIds {
    pub fn new(pad: usize) -> Self {
        Self { next: 0, pad }
    }

    fn bump(&mut self) -> u64 {
        self.next += 1;
        self.next
    }
}

impl Default for CounterIds {
    fn default() -> Self {
        Self::new(3)
    }
}

impl IdStrategy for CounterIds {
    fn next_case_id(&mut self, module: &str) -> String {
        let seq = self.bump();
        format!(
            "{}_{:0width$}",
            sanitize_module(module),
            seq,
            width = self.pad
        )
    }

    fn next_rejected_id(&mut self, module: &str) -> String {
        let seq = self.bump();
        format!(
            "{}_{:0width$}_F",
            sanitize_module(module),
            seq,
            width = self.pad
        )
    }
}

fn sanitize_module(module: &str) -> String {
    let cleaned: String = module
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "CASE".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_ids_are_zero_padded_and_monotonic() {
        let mut ids = CounterIds::new(3);
        assert_eq!(ids.next_case_id("login"), "LOGIN_001");
        assert_eq!(ids.next_case_id("login"), "LOGIN_002");
    }

    #[test]
    fn test_rejected_ids_share_the_counter() {
        let mut ids = CounterIds::new(3);
        let accepted = ids.next_case_id("pay");
        let rejected = ids.next_rejected_id("pay");
        assert_eq!(accepted, "PAY_001");
        assert_eq!(rejected, "PAY_002_F");
    }

    #[test]
    fn test_module_sanitized() {
        let mut ids = CounterIds::new(2);
        assert_eq!(ids.next_case_id("user auth"), "USER_AUTH_01");
        assert_eq!(ids.next_case_id("  "), "CASE_02");
    }
}
