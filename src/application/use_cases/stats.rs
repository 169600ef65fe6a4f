use serde::Serialize;

/// Session-scoped generation counters surfaced to the UI. Filtered
/// candidates are tracked separately from accepted ones and never count
/// toward actionable work.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationStats {
    pub scenarios_generated: u64,
    pub test_points_generated: u64,
    pub cases_accepted: u64,
    pub cases_filtered: u64,
    pub batch_items_skipped: u64,
    pub saves_attempted: u64,
    pub cases_saved: u64,
    pub generation_calls: u64,
    pub average_generation_ms: f64,
}

impl GenerationStats {
    /// Fold one completed collaborator call into the rolling average.
    pub fn record_generation(&mut self, elapsed_ms: u64) {
        self.generation_calls += 1;
        let calls = self.generation_calls as f64;
        self.average_generation_ms =
            self.average_generation_ms + (elapsed_ms as f64 - self.average_generation_ms) / calls;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_average() {
        let mut stats = GenerationStats::default();
        stats.record_generation(100);
        stats.record_generation(300);
        assert_eq!(stats.generation_calls, 2);
        assert!((stats.average_generation_ms - 200.0).abs() < f64::EPSILON);
    }
}
