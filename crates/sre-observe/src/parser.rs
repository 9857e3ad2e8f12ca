//! Parsing of model responses into [`AnalysisResult`]s.
//!
//! Missing or mistyped fields fall back to defaults. Output that is not a
//! JSON object at all is rejected; no structure is guessed from free text.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ObserveError, Result};
use crate::types::AnalysisResult;

/// The parts of an inference response envelope this crate reads.
#[derive(Debug, Deserialize)]
struct ResponseEnvelope {
    #[serde(default)]
    content: Vec<ResponseBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

/// Extracts the answer text from a raw response envelope.
///
/// The answer is the text of the first content block.
///
/// # Errors
///
/// Returns `ObserveError::MalformedEnvelope` if the envelope is not JSON or
/// its first content block carries no text.
pub fn extract_answer_text(raw: &str) -> Result<String> {
    let envelope: ResponseEnvelope =
        serde_json::from_str(raw).map_err(|e| ObserveError::MalformedEnvelope {
            reason: e.to_string(),
        })?;

    if envelope.stop_reason.as_deref() == Some("max_tokens") {
        warn!("model output hit the token limit and may be truncated");
    }

    let block = envelope
        .content
        .into_iter()
        .next()
        .ok_or_else(|| ObserveError::MalformedEnvelope {
            reason: "response has no content blocks".to_string(),
        })?;

    if let Some(kind) = block.kind.as_deref().filter(|k| *k != "text") {
        return Err(ObserveError::MalformedEnvelope {
            reason: format!("first content block has type '{kind}', expected 'text'"),
        });
    }

    block.text.ok_or_else(|| ObserveError::MalformedEnvelope {
        reason: "first content block has no text".to_string(),
    })
}

/// Returns the body of one enclosing markdown code fence, if `text` is fenced.
fn fenced_body(text: &str) -> Option<&str> {
    let rest = text.trim().strip_prefix("```")?;
    let body = rest.strip_suffix("```")?;
    // Drop the info string (e.g. `json`) on the opening fence line.
    Some(body.split_once('\n').map_or(body, |(_, inner)| inner).trim())
}

/// Parses the model's answer text into an [`AnalysisResult`].
///
/// # Errors
///
/// Returns `ObserveError::AnalysisParse` if the text is not a JSON object.
pub fn parse_analysis(text: &str) -> Result<AnalysisResult> {
    let candidate = match fenced_body(text) {
        Some(body) => {
            debug!("stripped markdown code fence from answer");
            body
        }
        None => text.trim(),
    };

    let value: Value =
        serde_json::from_str(candidate).map_err(|e| ObserveError::AnalysisParse {
            reason: e.to_string(),
        })?;

    if !value.is_object() {
        return Err(ObserveError::AnalysisParse {
            reason: format!("expected a JSON object, got {}", json_kind(&value)),
        });
    }

    let result =
        AnalysisResult::deserialize(value).map_err(|e| ObserveError::AnalysisParse {
            reason: e.to_string(),
        })?;

    debug!(
        severity = %result.severity(),
        hypotheses = result.hypotheses.len(),
        actions = result.recommended_actions.len(),
        facts = result.facts.entries().len(),
        "parsed analysis"
    );

    Ok(result)
}

/// Extracts the answer from a raw envelope and parses it.
///
/// # Errors
///
/// Returns `ObserveError::MalformedEnvelope` or `ObserveError::AnalysisParse`.
pub fn parse_response(raw: &str) -> Result<AnalysisResult> {
    parse_analysis(&extract_answer_text(raw)?)
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Priority, Severity};

    fn envelope(text: &str) -> String {
        serde_json::json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": text}],
            "stop_reason": "end_turn"
        })
        .to_string()
    }

    mod envelope_tests {
        use super::*;

        #[test]
        fn extracts_first_text_block() {
            let raw = r#"{"content": [{"type": "text", "text": "first"}, {"type": "text", "text": "second"}]}"#;
            assert_eq!(extract_answer_text(raw).expect("extracts"), "first");
        }

        #[test]
        fn rejects_non_json_envelope() {
            let err = extract_answer_text("<html>502</html>").unwrap_err();
            assert!(matches!(err, ObserveError::MalformedEnvelope { .. }));
        }

        #[test]
        fn rejects_empty_content() {
            let err = extract_answer_text(r#"{"content": []}"#).unwrap_err();
            assert!(err.to_string().contains("no content blocks"));
        }

        #[test]
        fn rejects_non_text_first_block() {
            let err = extract_answer_text(r#"{"content": [{"type": "tool_use", "id": "x"}]}"#)
                .unwrap_err();
            assert!(err.to_string().contains("tool_use"));
        }

        #[test]
        fn accepts_truncated_answer_envelope() {
            let raw = r#"{"content": [{"type": "text", "text": "{\"a\":"}], "stop_reason": "max_tokens"}"#;
            assert_eq!(extract_answer_text(raw).expect("extracts"), "{\"a\":");
        }
    }

    mod analysis_tests {
        use super::*;

        #[test]
        fn parses_full_answer() {
            let answer = r#"{
                "facts": {"error_type": "ConditionalCheckFailed", "affected_service": "AppLambda", "key_log_lines": ["Exception: ConditionalCheckFailed"]},
                "hypotheses": [{"title": "Demo exception", "reasoning": "raised explicitly", "confidence": 90}],
                "recommended_actions": [{"action": "Check the demo mode parameter", "priority": "high"}],
                "overall_assessment": {"summary": "Intentional exception", "severity": "P3"}
            }"#;

            let result = parse_analysis(answer).expect("parses");
            assert_eq!(result.facts.error_type.as_deref(), Some("ConditionalCheckFailed"));
            assert_eq!(result.hypotheses.as_slice()[0].confidence, 90);
            assert_eq!(result.recommended_actions[0].priority, Priority::High);
            assert_eq!(result.severity(), Severity::P3);
        }

        #[test]
        fn missing_keys_use_defaults() {
            let result = parse_analysis(r#"{"overall_assessment": {"summary": "x"}}"#)
                .expect("parses");
            assert_eq!(result.severity(), Severity::P2);
            assert!(result.hypotheses.is_empty());
            assert!(result.recommended_actions.is_empty());
        }

        #[test]
        fn unknown_severity_defaults_to_p2() {
            let result = parse_analysis(r#"{"overall_assessment": {"severity": "SEV1"}}"#)
                .expect("parses");
            assert_eq!(result.severity(), Severity::P2);
        }

        #[test]
        fn rejects_free_text() {
            let err = parse_analysis("The service is timing out because the DB is slow.")
                .unwrap_err();
            assert!(matches!(err, ObserveError::AnalysisParse { .. }));
        }

        #[test]
        fn rejects_json_that_is_not_an_object() {
            let err = parse_analysis(r#"["P1", "DB timeout"]"#).unwrap_err();
            assert!(err.to_string().contains("an array"));
        }

        #[test]
        fn rejects_json_followed_by_prose() {
            let err = parse_analysis(r#"{"facts": {}} Hope this helps!"#).unwrap_err();
            assert!(matches!(err, ObserveError::AnalysisParse { .. }));
        }

        #[test]
        fn accepts_fenced_json() {
            let answer = "```json\n{\"overall_assessment\": {\"severity\": \"P0\"}}\n```";
            assert_eq!(parse_analysis(answer).expect("parses").severity(), Severity::P0);
        }

        #[test]
        fn accepts_fence_without_info_string() {
            let answer = "  ```\n{}\n```  ";
            assert!(parse_analysis(answer).is_ok());
        }

        #[test]
        fn fence_detection() {
            assert_eq!(fenced_body("```json\n{}\n```"), Some("{}"));
            assert_eq!(fenced_body("  ```\n{\"a\": 1}\n```  "), Some("{\"a\": 1}"));
            assert_eq!(fenced_body("{}"), None);
            assert_eq!(fenced_body("```json\n{}"), None);
        }

        #[test]
        fn unterminated_fence_is_rejected() {
            let err = parse_analysis("```json\n{}").unwrap_err();
            assert!(matches!(err, ObserveError::AnalysisParse { .. }));
        }
    }

    #[test]
    fn parse_response_end_to_end() {
        let raw = envelope(
            r#"{"overall_assessment":{"summary":"DB timeout","severity":"P1"},"facts":{},"hypotheses":[],"recommended_actions":[]}"#,
        );
        let result = parse_response(&raw).expect("parses");
        assert_eq!(result.overall_assessment.summary, "DB timeout");
        assert_eq!(result.severity(), Severity::P1);
    }

    #[test]
    fn parse_response_keeps_error_kinds_apart() {
        assert!(matches!(
            parse_response("not json").unwrap_err(),
            ObserveError::MalformedEnvelope { .. }
        ));
        assert!(matches!(
            parse_response(&envelope("not json")).unwrap_err(),
            ObserveError::AnalysisParse { .. }
        ));
    }
}
