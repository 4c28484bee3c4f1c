//! Renders standards as human-readable bullet lists for prompts

use serde_json::Value;

use super::entity::{CompanyStandard, StandardKind};

/// Fields rendered first for each kind, in this order
fn leading_fields(kind: StandardKind) -> &'static [&'static str] {
    match kind {
        StandardKind::Voice => &["tone", "personality", "style", "do", "dont", "vocabulary"],
        StandardKind::Platform => &[
            "platform",
            "title_max_length",
            "description_max_length",
            "bullet_points",
            "requirements",
            "forbidden",
        ],
        StandardKind::Image => &["style", "dimensions", "background", "format", "requirements"],
    }
}

/// Formats a standard as a heading followed by one bullet per field
pub fn format_standard(standard: &CompanyStandard) -> String {
    let kind = standard.kind();
    let mut lines = vec![format!("{} ({}):", kind.label(), standard.name())];

    match standard.content() {
        Value::Object(map) => {
            let leading = leading_fields(kind);
            for key in leading {
                if let Some(value) = map.get(*key) {
                    push_field(&mut lines, key, value, 0);
                }
            }

            let mut rest: Vec<&String> = map
                .keys()
                .filter(|k| !leading.contains(&k.as_str()))
                .collect();
            rest.sort();
            for key in rest {
                push_field(&mut lines, key, &map[key.as_str()], 0);
            }
        }
        Value::Null => {}
        other => lines.push(format!("- {}", scalar_text(other))),
    }

    lines.join("\n")
}

/// Informative text used when no stored standard answers a reference
pub fn missing_standard_placeholder(kind: StandardKind, variable: &str) -> String {
    format!("[No {} standard configured for '{}']", kind.label(), variable)
}

fn push_field(lines: &mut Vec<String>, key: &str, value: &Value, depth: usize) {
    let indent = "  ".repeat(depth);
    let label = humanize(key);

    match value {
        Value::Object(map) => {
            lines.push(format!("{}- {}:", indent, label));
            for (child_key, child) in map {
                push_field(lines, child_key, child, depth + 1);
            }
        }
        Value::Array(items) if items.iter().all(is_scalar) => {
            let joined: Vec<String> = items.iter().map(scalar_text).collect();
            lines.push(format!("{}- {}: {}", indent, label, joined.join(", ")));
        }
        Value::Array(items) => {
            lines.push(format!("{}- {}:", indent, label));
            for item in items {
                lines.push(format!("{}  - {}", indent, scalar_text(item)));
            }
        }
        Value::Null => {}
        scalar => lines.push(format!("{}- {}: {}", indent, label, scalar_text(scalar))),
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn humanize(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
