use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// One rule application reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraceLine {
    pub rule: String,
    pub word: String,
    pub before: String,
    pub after: String,
}

fn applied_regex() -> &'static Regex {
    static APPLIED: OnceLock<Regex> = OnceLock::new();
    APPLIED.get_or_init(|| {
        Regex::new(r"^Applied (\S+)(?: to (\S+))?: (.*?) -> (.*)$").expect("regex for trace lines")
    })
}

/// Parse the engine's trace block.
///
/// `Tracing WORD` headers set the word for the lines that follow; lines
/// naming their own word keep it, and anything before the first header is
/// attributed to `default_word`. Applications that left the string
/// unchanged are dropped.
pub fn parse_trace(text: &str, default_word: &str) -> Vec<TraceLine> {
    let mut current = default_word.to_string();
    let mut lines = Vec::new();
    for line in text.lines().map(str::trim) {
        if let Some(word) = line.strip_prefix("Tracing ") {
            current = word.trim().to_string();
            continue;
        }
        let Some(captures) = applied_regex().captures(line) else {
            continue;
        };
        let before = captures[3].trim();
        let after = captures[4].trim();
        if before == after {
            continue;
        }
        let word = captures
            .get(2)
            .map_or_else(|| current.clone(), |word| word.as_str().to_string());
        lines.push(TraceLine {
            rule: captures[1].to_string(),
            word,
            before: before.to_string(),
            after: after.to_string(),
        });
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_attribute_following_lines() {
        let text = "\
Tracing apaki
Applied palatalization: apaki -> apaʃi
Applied intervocalic-voicing: apaʃi -> abaʃi
Tracing iki
Applied palatalization: iki -> iʃi
";
        let lines = parse_trace(text, "unused");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].word, "apaki");
        assert_eq!(lines[1].rule, "intervocalic-voicing");
        assert_eq!(lines[2].word, "iki");
        assert_eq!(lines[2].after, "iʃi");
    }

    #[test]
    fn explicit_word_and_default_word() {
        let text = "Applied Romanizer: abaʃi -> abashi\nApplied palatalization to iki: iki -> iʃi";
        let lines = parse_trace(text, "apaki");
        assert_eq!(lines[0].word, "apaki");
        assert_eq!(lines[0].rule, "Romanizer");
        assert_eq!(lines[1].word, "iki");
    }

    #[test]
    fn unchanged_applications_and_noise_are_dropped() {
        let text = "Applied era1: apaki -> apaki\nsome banner\nApplied palatalization: apaki -> apaʃi";
        let lines = parse_trace(text, "apaki");
        assert_eq!(
            lines,
            vec![TraceLine {
                rule: "palatalization".to_string(),
                word: "apaki".to_string(),
                before: "apaki".to_string(),
                after: "apaʃi".to_string(),
            }]
        );
    }
}
