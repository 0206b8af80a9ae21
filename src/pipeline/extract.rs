//! Structured extraction: cleaned text in, canonical field map out.
//!
//! The structuring call is a completion constrained to a single JSON object
//! (schema-driven prompt, JSON output mode, low temperature). Whatever comes
//! back is then reconciled into the canonical shape:
//!
//! 1. parse (direct, then `{...}`-span repair)
//! 2. `null` → empty string
//! 3. alias folding onto canonical names
//! 4. date normalization to `YYYY-MM-DD`
//! 5. amount normalization to numbers (tax-exempt markers → 0)
//! 6. string trimming
//!
//! Failure semantics: *everything* here degrades to an empty map. Recognition
//! success and structuring success are independent outcomes — the caller
//! keeps the raw text and confidence even when this stage produces nothing.

use crate::config::ExtractionConfig;
use crate::engine::{ChatMessage, CompletionOptions, EngineClient};
use crate::pipeline::ocr::call_with_retry;
use crate::prompts::{structuring_system_prompt, structuring_user_prompt};
use crate::schema::{FieldKind, INVOICE_SCHEMA};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Number, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Token budget for the structuring response:
/// `min(6000, max(2000, ceil(len/4) + 2000))`.
///
/// ~4 chars per token is a rough input estimate; the +2000 leaves room for
/// the complete JSON object even on dense documents.
pub fn token_budget(text_len: usize) -> usize {
    let estimated = text_len.div_ceil(4);
    (estimated + 2000).clamp(2000, 6000)
}

/// Run the structuring call and reconcile the response.
///
/// Never returns an error: any failure yields an empty map.
pub async fn extract(
    engine: &Arc<dyn EngineClient>,
    cleaned_text: &str,
    config: &ExtractionConfig,
) -> Map<String, Value> {
    if cleaned_text.trim().is_empty() {
        return Map::new();
    }

    let messages = [
        ChatMessage::system(structuring_system_prompt()),
        ChatMessage::user(structuring_user_prompt(cleaned_text)),
    ];
    let options = CompletionOptions {
        model: config.chat_model.clone(),
        temperature: config.temperature,
        top_p: Some(config.top_p),
        max_tokens: token_budget(cleaned_text.len()),
        json_object: true,
    };

    let response = match call_with_retry(config, || engine.chat(&messages, &options)).await {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "structuring call failed; returning empty fields");
            return Map::new();
        }
    };

    let parsed = parse_structured(&response.content);
    debug!(fields = parsed.len(), "structuring response parsed");
    reconcile(parsed)
}

/// Parse the structuring response, repairing common model quirks.
///
/// Direct JSON parse first; on failure, extract the outermost `{...}` span
/// (models sometimes prepend prose or wrap in fences) and parse that.
/// On total failure: empty map, never an error.
pub fn parse_structured(response: &str) -> Map<String, Value> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(response) {
        return map;
    }

    static RE_OBJECT_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());
    if let Some(span) = RE_OBJECT_SPAN.find(response) {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(span.as_str()) {
            return map;
        }
    }

    warn!(
        len = response.len(),
        "structuring response is not recoverable JSON"
    );
    Map::new()
}

/// Apply the full post-processing sequence to a parsed response.
///
/// After alias folding, only canonical schema fields remain: the model is
/// free to invent keys, the final object is not.
pub fn reconcile(mut data: Map<String, Value>) -> Map<String, Value> {
    nulls_to_empty(&mut data);
    fold_aliases(&mut data);
    data.retain(|key, _| crate::schema::field(key).is_some());
    normalize_values(&mut data);
    data
}

fn nulls_to_empty(data: &mut Map<String, Value>) {
    for value in data.values_mut() {
        match value {
            Value::Null => *value = Value::String(String::new()),
            Value::Array(items) => {
                for item in items.iter_mut() {
                    if let Value::Object(obj) = item {
                        for v in obj.values_mut() {
                            if v.is_null() {
                                *v = Value::String(String::new());
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

/// Fold known alias keys onto canonical field names.
///
/// The alias value is copied only when the canonical field is still empty;
/// the alias key is removed either way, so aliases never survive into the
/// final object.
pub fn fold_aliases(data: &mut Map<String, Value>) {
    for field in INVOICE_SCHEMA {
        for alias in field.aliases {
            let Some(alias_value) = data.remove(*alias) else {
                continue;
            };
            if is_empty_value(data.get(field.name)) && !is_empty_value(Some(&alias_value)) {
                data.insert(field.name.to_string(), alias_value);
            }
        }
    }
}

static RE_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})[-/.年]\s?(\d{1,2})[-/.月]\s?(\d{1,2})日?").unwrap());
static RE_DATE_COMPACT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})(\d{2})(\d{2})\b").unwrap());
static RE_DATE_SHORT_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{2})[-/.](\d{1,2})[-/.](\d{1,2})\b").unwrap());

/// Reduce a value holding a recognizable date shape to `YYYY-MM-DD`;
/// leave anything else as-is.
///
/// The date may be embedded in surrounding text (`开票日期: 2022年07月12日`).
/// Handles `2022-07-12`, `2022/7/12`, `2022.07.12`, `2022年07月12日`,
/// `20220712`, and two-digit years (`22/7/12`, assumed 20YY).
pub fn normalize_date(raw: &str) -> String {
    let trimmed = raw.trim();

    let captures = RE_DATE
        .captures(trimmed)
        .or_else(|| RE_DATE_COMPACT.captures(trimmed));
    if let Some(c) = captures {
        return format!("{}-{:0>2}-{:0>2}", &c[1], &c[2], &c[3]);
    }

    if let Some(c) = RE_DATE_SHORT_YEAR.captures(trimmed) {
        return format!("20{}-{:0>2}-{:0>2}", &c[1], &c[2], &c[3]);
    }

    raw.to_string()
}

/// Markers that mean "no tax charged" rather than a number.
const TAX_EXEMPT_MARKERS: &[&str] = &["免税", "***", "Tax Exempt"];

/// Normalize an amount value to a number.
///
/// Strings are stripped to digits and dots and parsed, defaulting to 0.
/// For `taxAmount`, exemption markers short-circuit to 0 before stripping.
pub fn normalize_amount(field_name: &str, value: &Value) -> Value {
    match value {
        Value::String(s) => {
            if field_name == "taxAmount" && TAX_EXEMPT_MARKERS.iter().any(|m| s.contains(m)) {
                return json_number(0.0);
            }
            let digits: String = s.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
            json_number(digits.parse::<f64>().unwrap_or(0.0))
        }
        Value::Number(_) => value.clone(),
        _ => value.clone(),
    }
}

fn json_number(f: f64) -> Value {
    Number::from_f64(f)
        .map(Value::Number)
        .unwrap_or_else(|| Value::Number(0.into()))
}

/// Normalize dates, amounts, and string whitespace per the schema.
fn normalize_values(data: &mut Map<String, Value>) {
    for field in INVOICE_SCHEMA {
        let Some(value) = data.get(field.name) else {
            continue;
        };
        let normalized = match field.kind {
            FieldKind::Date => match value {
                Value::String(s) if !s.is_empty() => Some(Value::String(normalize_date(s))),
                _ => None,
            },
            FieldKind::Amount => Some(normalize_amount(field.name, value)),
            FieldKind::Text => match value {
                Value::String(s) => Some(Value::String(s.trim().to_string())),
                _ => None,
            },
            FieldKind::Items => None,
        };
        if let Some(v) = normalized {
            data.insert(field.name.to_string(), v);
        }
    }
}
