//! Parse-then-validate for judge output, plus the deterministic fallback.

use serde_json::Value;

use crate::core::schema::verification_violations;
use crate::core::types::{JsonObject, VerificationResult, VerificationStatus};

/// Summary used when the judge's response cannot be used.
pub const FALLBACK_SUMMARY: &str = "Verifier returned un-parseable JSON; falling back to raw text.";

/// Parse `raw` as JSON and validate it against the verification schema.
///
/// Returns a human-readable reason on failure.
pub fn parse_verification(raw: &str) -> Result<VerificationResult, String> {
    let value: Value = serde_json::from_str(raw).map_err(|err| format!("invalid json: {err}"))?;
    let errors = verification_violations(&value);
    if !errors.is_empty() {
        return Err(format!(
            "schema validation failed:\n- {}",
            errors.join("\n- ")
        ));
    }
    serde_json::from_value(value).map_err(|err| format!("verification shape mismatch: {err}"))
}

/// Verdict substituted for an unusable judge response.
///
/// Always reports `ok` so that a malformed judge never triggers a retry round.
pub fn fallback_verification(raw: &str) -> VerificationResult {
    let mut structured_output = JsonObject::new();
    structured_output.insert("raw".to_string(), Value::String(raw.to_string()));
    VerificationResult {
        status: VerificationStatus::Ok,
        retry_step_ids: Vec::new(),
        summary: FALLBACK_SUMMARY.to_string(),
        structured_output,
        steps: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_full_verdict() {
        let raw = json!({
            "status": "retry",
            "retry_step_ids": [2],
            "summary": "weather missing",
            "structured_output": {"github": {"count": 2}},
            "steps": [
                {"step_id": 1, "ok": true},
                {"step_id": 2, "ok": false, "issues": ["empty response"]}
            ]
        })
        .to_string();

        let verdict = parse_verification(&raw).expect("verdict");
        assert_eq!(verdict.status, VerificationStatus::Retry);
        assert_eq!(verdict.retry_step_ids, vec![2]);
        assert!(verdict.steps[0].issues.is_empty());
        assert_eq!(verdict.steps[1].issues, vec!["empty response".to_string()]);
    }

    #[test]
    fn accepts_ids_outside_any_plan() {
        let raw = r#"{"status": "retry", "retry_step_ids": [0, 2], "summary": "redo",
                      "steps": [{"step_id": 0, "ok": false}]}"#;
        let verdict = parse_verification(raw).expect("verdict");
        assert_eq!(verdict.retry_step_ids, vec![0, 2]);
        assert_eq!(verdict.steps[0].step_id, 0);
        assert!(verdict.requests_retry());
    }

    #[test]
    fn rejects_negative_ids() {
        let raw = r#"{"status": "retry", "retry_step_ids": [-1], "summary": "redo"}"#;
        let err = parse_verification(raw).expect_err("should reject");
        assert!(err.starts_with("schema validation failed"));
    }

    #[test]
    fn rejects_missing_summary() {
        let err = parse_verification(r#"{"status": "ok"}"#).expect_err("should reject");
        assert!(err.contains("summary"));
    }

    #[test]
    fn rejects_non_json() {
        let err = parse_verification("all good!").expect_err("should reject");
        assert!(err.starts_with("invalid json"));
    }

    #[test]
    fn fallback_wraps_raw_text() {
        let verdict = fallback_verification("not json");
        assert_eq!(verdict.status, VerificationStatus::Ok);
        assert!(verdict.retry_step_ids.is_empty());
        assert!(verdict.steps.is_empty());
        assert_eq!(verdict.summary, FALLBACK_SUMMARY);
        assert_eq!(verdict.structured_output.get("raw"), Some(&json!("not json")));
        assert_eq!(verdict.structured_output.len(), 1);
    }
}
