//! In-process engine for tests.
//!
//! Knows one tiny rule file: palatalization of `k` before `i`, the `era1`
//! marker, voicing of intervocalic `p t k`, the `era2` marker and a
//! romanizer writing `ʃ` as `sh`. Responses go through the same decoder as
//! real engine output.
use super::protocol::{parse_response, Changed, EvolveRequest};
use super::Engine;
use crate::error::Result;
use serde_json::json;

pub const CHANGES: &str = "\
Class vowel {a, e, i, o, u}

palatalization:
    k => ʃ / _ i

era1:
    unchanged

intervocalic-voicing:
    {p, t, k} => {b, d, g} / @vowel _ @vowel

era2:
    unchanged

Romanizer:
    ʃ => sh
";

static RULES: [&str; 5] = [
    "palatalization",
    "era1",
    "intervocalic-voicing",
    "era2",
    "Romanizer",
];
const ROMANIZER: &str = "Romanizer";

#[derive(Debug, Default)]
pub struct FakeLexurgy {
    pub requests: Vec<EvolveRequest>,
    pub resets: usize,
    /// When set, every request answers with this engine error message.
    pub fail_with: Option<String>,
}

impl FakeLexurgy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rules applied by a request, in order.
    fn window(request: &EvolveRequest) -> &'static [&'static str] {
        let position = |name: &Option<String>, default: usize| {
            name.as_deref()
                .and_then(|name| RULES.iter().position(|rule| *rule == name))
                .unwrap_or(default)
        };
        let start = position(&request.start_at, 0);
        let end = position(&request.stop_before, RULES.len());
        &RULES[start..end.max(start)]
    }
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

fn apply(rule: &str, word: &str) -> String {
    let chars: Vec<char> = word.chars().collect();
    match rule {
        "palatalization" => chars
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                if c == 'k' && chars.get(i + 1) == Some(&'i') {
                    'ʃ'
                } else {
                    c
                }
            })
            .collect(),
        "intervocalic-voicing" => chars
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let between = i > 0
                    && chars.get(i - 1).copied().is_some_and(is_vowel)
                    && chars.get(i + 1).copied().is_some_and(is_vowel);
                match c {
                    'p' if between => 'b',
                    't' if between => 'd',
                    'k' if between => 'g',
                    other => other,
                }
            })
            .collect(),
        ROMANIZER => word.replace('ʃ', "sh"),
        _ => word.to_string(),
    }
}

impl Engine for FakeLexurgy {
    fn evolve(&mut self, request: &EvolveRequest) -> Result<Changed> {
        self.requests.push(request.clone());
        if let Some(message) = &self.fail_with {
            let response = json!({"type": "error", "message": message, "stackTrace": []});
            return parse_response(&response.to_string(), request);
        }
        let window = Self::window(request);
        let mut words = Vec::new();
        let mut phonetic = Vec::new();
        let mut trace_lines = Vec::new();
        for word in &request.words {
            let traced = request.trace_words.contains(word);
            if traced {
                trace_lines.push(format!("Tracing {word}"));
            }
            let mut current = word.clone();
            let mut sound = word.clone();
            for rule in window {
                let next = apply(rule, &current);
                if traced {
                    trace_lines.push(format!("Applied {rule}: {current} -> {next}"));
                }
                current = next;
                if *rule != ROMANIZER {
                    sound = current.clone();
                }
            }
            words.push(current);
            phonetic.push(sound);
        }
        let response = json!({
            "type": "changed",
            "words": words,
            "intermediates": {"phonetic": phonetic},
            "traceLines": trace_lines,
        });
        parse_response(&response.to_string(), request)
    }

    fn reset(&mut self) {
        self.resets += 1;
    }
}
