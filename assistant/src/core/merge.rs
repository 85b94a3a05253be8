//! Merging a retry pass back into the original execution log.

use std::collections::BTreeMap;

use crate::core::types::{ExecutionLog, StepResult};

/// Overlay `retried` onto `original` by `step_id`.
///
/// The result holds exactly one entry per distinct step id, with retried
/// entries replacing the originals, sorted ascending by step id. Neither input
/// is modified.
pub fn merge_execution_logs(original: &ExecutionLog, retried: &ExecutionLog) -> ExecutionLog {
    let mut by_id: BTreeMap<u32, StepResult> = BTreeMap::new();
    for result in original.steps.iter().chain(&retried.steps) {
        by_id.insert(result.step_id, result.clone());
    }
    ExecutionLog {
        steps: by_id.into_values().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{failed_result, ok_result};

    #[test]
    fn retried_entry_replaces_original() {
        let original = ExecutionLog {
            steps: vec![ok_result(1, "github"), failed_result(2, "weather", "timeout")],
        };
        let retried = ExecutionLog {
            steps: vec![ok_result(2, "weather")],
        };

        let merged = merge_execution_logs(&original, &retried);
        assert_eq!(merged.step_ids(), vec![1, 2]);
        assert_eq!(merged.get(2), Some(&retried.steps[0]));
        assert_eq!(merged.get(1), Some(&original.steps[0]));
    }

    #[test]
    fn merged_log_is_sorted_by_step_id() {
        let original = ExecutionLog {
            steps: vec![ok_result(3, "github"), ok_result(1, "github")],
        };
        let retried = ExecutionLog {
            steps: vec![ok_result(2, "weather")],
        };

        let merged = merge_execution_logs(&original, &retried);
        assert_eq!(merged.step_ids(), vec![1, 2, 3]);
    }

    #[test]
    fn empty_retry_keeps_original_entries() {
        let original = ExecutionLog {
            steps: vec![ok_result(1, "github"), ok_result(2, "weather")],
        };
        let merged = merge_execution_logs(&original, &ExecutionLog::default());
        assert_eq!(merged, original);
    }
}
