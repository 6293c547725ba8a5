//! Line-delimited JSON messages exchanged with the engine server.
use super::trace::{parse_trace, TraceLine};
use crate::error::{Error, Result};
use crate::lexicon::domain::Rule;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvolveRequest {
    #[serde(rename = "type")]
    kind: &'static str,
    pub words: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_before: Option<String>,
    pub trace_words: Vec<String>,
    pub romanize: bool,
}

impl EvolveRequest {
    /// Evolve `words` from `start` (inclusive) up to `end` (exclusive),
    /// tracing every word when `trace` is set.
    pub fn new(words: Vec<String>, start: Option<&Rule>, end: Option<&Rule>, trace: bool) -> Self {
        let trace_words = if trace { words.clone() } else { Vec::new() };
        Self {
            kind: "evolve",
            words,
            start_at: start.map(|rule| rule.name().to_string()),
            stop_before: end.map(|rule| rule.name().to_string()),
            trace_words,
            romanize: true,
        }
    }

    pub fn to_line(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|err| Error::Protocol(format!("encode request: {err}")))
    }
}

/// A successful evolution: modern (romanized) and phonetic forms, one per
/// requested word, plus any trace lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Changed {
    pub words: Vec<String>,
    pub phonetic: Vec<String>,
    pub trace: Vec<TraceLine>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangedMessage {
    words: Vec<String>,
    #[serde(default)]
    intermediates: Option<Intermediates>,
    #[serde(default)]
    trace_lines: Vec<String>,
}

#[derive(Deserialize)]
struct Intermediates {
    #[serde(default)]
    phonetic: Option<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorMessage {
    message: String,
    #[serde(default)]
    stack_trace: Vec<String>,
}

/// Decode one response line for `request`.
pub fn parse_response(line: &str, request: &EvolveRequest) -> Result<Changed> {
    let value: Value = serde_json::from_str(line)
        .map_err(|err| Error::Protocol(format!("invalid JSON response: {err}")))?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::ResponseMissingType(abbreviate(line)))?
        .to_string();
    match kind.as_str() {
        "changed" => {
            let message: ChangedMessage = serde_json::from_value(value)
                .map_err(|err| Error::Protocol(format!("malformed changed response: {err}")))?;
            changed(message, request)
        }
        "error" => {
            let message: ErrorMessage = serde_json::from_value(value)
                .map_err(|err| Error::Protocol(format!("malformed error response: {err}")))?;
            Err(Error::Evolve {
                message: message.message,
                stack_trace: message.stack_trace,
            })
        }
        _ => Err(Error::ResponseBadType(kind)),
    }
}

fn changed(message: ChangedMessage, request: &EvolveRequest) -> Result<Changed> {
    let phonetic = message
        .intermediates
        .and_then(|intermediates| intermediates.phonetic)
        .unwrap_or_else(|| message.words.clone());
    if message.words.len() != request.words.len() || phonetic.len() != request.words.len() {
        return Err(Error::Protocol(format!(
            "sent {} words but received {} modern and {} phonetic forms",
            request.words.len(),
            message.words.len(),
            phonetic.len()
        )));
    }
    let default_word = request.words.first().map(String::as_str).unwrap_or_default();
    let trace = parse_trace(&message.trace_lines.join("\n"), default_word);
    Ok(Changed {
        words: message.words,
        phonetic,
        trace,
    })
}

fn abbreviate(line: &str) -> String {
    const LIMIT: usize = 80;
    match line.char_indices().nth(LIMIT) {
        Some((at, _)) => format!("{}...", &line[..at]),
        None => line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> EvolveRequest {
        EvolveRequest::new(
            vec!["apaki".to_string()],
            None,
            Some(&Rule::new("era1")),
            true,
        )
    }

    #[test]
    fn requests_use_engine_field_names() {
        let line = request().to_line().expect("encode");
        let value: Value = serde_json::from_str(&line).expect("json");
        assert_eq!(value["type"], "evolve");
        assert_eq!(value["words"][0], "apaki");
        assert_eq!(value["stopBefore"], "era1");
        assert_eq!(value["traceWords"][0], "apaki");
        assert_eq!(value["romanize"], true);
        assert!(value.get("startAt").is_none());
    }

    #[test]
    fn changed_reads_phonetic_intermediates() {
        let line = r#"{"type":"changed","words":["abashi"],"intermediates":{"phonetic":["abaʃi"]},"traceLines":["Applied palatalization to apaki: apaki -> apaʃi"]}"#;
        let changed = parse_response(line, &request()).expect("changed");
        assert_eq!(changed.words, ["abashi"]);
        assert_eq!(changed.phonetic, ["abaʃi"]);
        assert_eq!(changed.trace.len(), 1);
        assert_eq!(changed.trace[0].rule, "palatalization");
    }

    #[test]
    fn phonetic_defaults_to_words() {
        let line = r#"{"type":"changed","words":["apaʃi"]}"#;
        let changed = parse_response(line, &request()).expect("changed");
        assert_eq!(changed.phonetic, ["apaʃi"]);
        assert!(changed.trace.is_empty());
    }

    #[test]
    fn error_responses_become_evolve_errors() {
        let line = r#"{"type":"error","message":"No rule named era9","stackTrace":["at Lexurgy"]}"#;
        let err = parse_response(line, &request()).expect_err("error response");
        let Error::Evolve {
            message,
            stack_trace,
        } = err
        else {
            panic!("expected evolve error");
        };
        assert_eq!(message, "No rule named era9");
        assert_eq!(stack_trace, ["at Lexurgy"]);
    }

    #[test]
    fn missing_and_unknown_types_are_rejected() {
        assert!(matches!(
            parse_response(r#"{"words":[]}"#, &request()),
            Err(Error::ResponseMissingType(_))
        ));
        assert!(matches!(
            parse_response(r#"{"type":"surprise"}"#, &request()),
            Err(Error::ResponseBadType(kind)) if kind == "surprise"
        ));
    }

    #[test]
    fn word_count_mismatch_is_a_protocol_error() {
        let line = r#"{"type":"changed","words":["a","b"]}"#;
        assert!(matches!(
            parse_response(line, &request()),
            Err(Error::Protocol(_))
        ));
    }
}
