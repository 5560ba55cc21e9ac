// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Elaboration semantics: extraction rules and redirect targets.
//!
//! An extractor rule captures, for every occurrence of `search_text`, the
//! following `extract_length` characters (trimmed; empty captures are
//! skipped). The occurrence index makes repeated captures of the same rule
//! in one message distinct.

use serde_json::Value;

/// One parsed extraction rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionRule {
    pub rule_name: String,
    pub search_text: String,
    pub extract_length: usize,
}

/// A single captured value.
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    pub rule_name: String,
    pub value: String,
    pub occurrence_index: i32,
}

/// Parse `config.extraction_rules`; malformed entries are skipped.
pub fn parse_rules(config: &Value) -> Vec<ExtractionRule> {
    let Some(entries) = config.get("extraction_rules").and_then(Value::as_array) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let rule_name = entry.get("rule_name")?.as_str()?.to_string();
            let search_text = entry.get("search_text")?.as_str()?.to_string();
            let extract_length = entry.get("extract_length").map(length_of)?;
            if rule_name.is_empty() || search_text.is_empty() || extract_length == 0 {
                return None;
            }
            Some(ExtractionRule {
                rule_name,
                search_text,
                extract_length,
            })
        })
        .collect()
}

fn length_of(value: &Value) -> usize {
    match value {
        Value::Number(n) => n.as_u64().unwrap_or(0) as usize,
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Apply every rule against the message text.
pub fn apply_rules(rules: &[ExtractionRule], text: &str) -> Vec<Capture> {
    let mut captures = Vec::new();
    for rule in rules {
        for (occurrence, (idx, _)) in text.match_indices(&rule.search_text).enumerate() {
            let start = idx + rule.search_text.len();
            let value: String = text[start..].chars().take(rule.extract_length).collect();
            let value = value.trim().to_string();
            if value.is_empty() {
                continue;
            }
            captures.push(Capture {
                rule_name: rule.rule_name.clone(),
                value,
                occurrence_index: occurrence as i32,
            });
        }
    }
    captures
}

/// The redirect target chat, from `config.target_chat_id` (number or string).
pub fn redirect_target(config: &Value) -> Option<i64> {
    match config.get("target_chat_id")? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rules() -> Vec<ExtractionRule> {
        parse_rules(&json!({
            "extraction_rules": [
                { "rule_name": "contract", "search_text": "CA:", "extract_length": 8 },
                { "rule_name": "ticker", "search_text": "$", "extract_length": 4 }
            ]
        }))
    }

    #[test]
    fn parse_rules_reads_entries() {
        let parsed = rules();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].rule_name, "contract");
        assert_eq!(parsed[0].extract_length, 8);
    }

    #[test]
    fn parse_rules_skips_malformed_entries() {
        let parsed = parse_rules(&json!({
            "extraction_rules": [
                { "rule_name": "ok", "search_text": "x", "extract_length": 2 },
                { "rule_name": "", "search_text": "x", "extract_length": 2 },
                { "rule_name": "no-length", "search_text": "x" },
                { "rule_name": "zero", "search_text": "x", "extract_length": 0 }
            ]
        }));
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].rule_name, "ok");
    }

    #[test]
    fn extract_length_accepts_string_numbers() {
        let parsed = parse_rules(&json!({
            "extraction_rules": [
                { "rule_name": "r", "search_text": "x", "extract_length": "5" }
            ]
        }));
        assert_eq!(parsed[0].extract_length, 5);
    }

    #[test]
    fn apply_rules_captures_every_occurrence() {
        let captures = apply_rules(&rules(), "CA: abc12345 and again CA: def67890");
        let contract: Vec<_> = captures
            .iter()
            .filter(|c| c.rule_name == "contract")
            .collect();
        assert_eq!(contract.len(), 2);
        assert_eq!(contract[0].value, "abc1234");
        assert_eq!(contract[0].occurrence_index, 0);
        assert_eq!(contract[1].value, "def6789");
        assert_eq!(contract[1].occurrence_index, 1);
    }

    #[test]
    fn apply_rules_trims_and_skips_empty() {
        let rule = ExtractionRule {
            rule_name: "tail".into(),
            search_text: "END".into(),
            extract_length: 3,
        };
        // Nothing but whitespace after the match.
        let captures = apply_rules(&[rule], "message END   ");
        assert!(captures.is_empty());
    }

    #[test]
    fn apply_rules_is_utf8_safe() {
        let rule = ExtractionRule {
            rule_name: "emoji".into(),
            search_text: "ticker ".into(),
            extract_length: 2,
        };
        let captures = apply_rules(&[rule], "ticker 🚀🚀🚀");
        assert_eq!(captures[0].value, "🚀🚀");
    }

    #[test]
    fn redirect_target_from_number_or_string() {
        assert_eq!(
            redirect_target(&json!({ "target_chat_id": -1002223334445i64 })),
            Some(-1002223334445)
        );
        assert_eq!(
            redirect_target(&json!({ "target_chat_id": "-100999" })),
            Some(-100999)
        );
        assert_eq!(redirect_target(&json!({})), None);
    }
}
