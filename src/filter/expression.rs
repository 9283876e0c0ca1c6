//! # Filter Expressions
//!
//! Parses the `filter[expression]` syntax into comparison clauses and
//! evaluates them against entry values.
//!
//! ```text
//! {title} LIKE %rust% AND {rating} >= 3 AND {state} IN (draft,published)
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::ModelMeta;

static CLAUSE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\s*(!=|<>|>=|<=|=|>|<|LIKE|IN|IS\s+NOT|IS)\s*(.*)$")
        .expect("valid clause regex")
});
static AND_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s+AND\s+").expect("valid and regex"));

/// Filter operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Pattern match with `%` and `_` wildcards
    Like,
    /// Value in list
    In,
    /// Is null
    Is,
    /// Is not null
    IsNot,
}

impl FilterOperator {
    fn parse(op: &str) -> Option<Self> {
        let normalized: String = op
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase();

        match normalized.as_str() {
            "=" => Some(FilterOperator::Eq),
            "!=" | "<>" => Some(FilterOperator::Neq),
            ">" => Some(FilterOperator::Gt),
            ">=" => Some(FilterOperator::Gte),
            "<" => Some(FilterOperator::Lt),
            "<=" => Some(FilterOperator::Lte),
            "LIKE" => Some(FilterOperator::Like),
            "IN" => Some(FilterOperator::In),
            "IS" => Some(FilterOperator::Is),
            "IS NOT" => Some(FilterOperator::IsNot),
            _ => None,
        }
    }
}

/// A single comparison clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterExpr {
    /// Field to filter on
    pub field: String,

    /// Comparison operator
    pub operator: FilterOperator,

    /// Value to compare against
    pub value: Value,
}

impl FilterExpr {
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOperator::Eq, value)
    }

    /// Check if a flat JSON object of entry values matches this clause
    pub fn matches(&self, doc: &Value) -> bool {
        let field_value = doc.get(&self.field).unwrap_or(&Value::Null);

        match self.operator {
            FilterOperator::Eq => loosely_equal(field_value, &self.value),
            FilterOperator::Neq => !loosely_equal(field_value, &self.value),
            FilterOperator::Gt => compare_json_values(field_value, &self.value) > 0,
            FilterOperator::Gte => compare_json_values(field_value, &self.value) >= 0,
            FilterOperator::Lt => compare_json_values(field_value, &self.value) < 0,
            FilterOperator::Lte => compare_json_values(field_value, &self.value) <= 0,
            FilterOperator::Like => match (field_value.as_str(), self.value.as_str()) {
                (Some(field_str), Some(pattern)) => matches_like_pattern(field_str, pattern),
                _ => false,
            },
            FilterOperator::In => match self.value.as_array() {
                Some(items) => items.iter().any(|item| loosely_equal(field_value, item)),
                None => false,
            },
            FilterOperator::Is => field_value.is_null(),
            FilterOperator::IsNot => !field_value.is_null(),
        }
    }
}

/// Parse an expression into clauses joined by AND
///
/// Every referenced field must be declared on the model.
pub fn parse_expression(input: &str, model: &ModelMeta) -> Result<Vec<FilterExpr>, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("Expression is empty".to_string());
    }

    let mut clauses = Vec::new();
    for part in AND_RE.split(input) {
        let captures = CLAUSE_RE
            .captures(part.trim())
            .ok_or_else(|| format!("Invalid clause: {}", part.trim()))?;

        let field = captures[1].to_string();
        if !model.has_field(&field) {
            return Err(format!("Unknown field in expression: {}", field));
        }

        let operator = FilterOperator::parse(&captures[2])
            .ok_or_else(|| format!("Invalid operator: {}", &captures[2]))?;
        let raw_value = captures[3].trim();

        let value = match operator {
            FilterOperator::Is | FilterOperator::IsNot => {
                if !raw_value.eq_ignore_ascii_case("null") {
                    return Err(format!("IS expects NULL, got: {}", raw_value));
                }
                Value::Null
            }
            FilterOperator::In => {
                let value = parse_filter_value(raw_value);
                if !value.is_array() {
                    return Err(format!("IN expects a list, got: {}", raw_value));
                }
                value
            }
            _ => {
                if raw_value.is_empty() {
                    return Err(format!("Missing value for field: {}", field));
                }
                parse_filter_value(raw_value)
            }
        };

        clauses.push(FilterExpr::new(field, operator, value));
    }

    Ok(clauses)
}

/// Parse a literal (lists, null, booleans, numbers, quoted or bare strings)
pub fn parse_filter_value(value: &str) -> Value {
    if value.starts_with('(') && value.ends_with(')') && value.len() >= 2 {
        let inner = &value[1..value.len() - 1];
        let items = inner
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(parse_filter_value)
            .collect();
        return Value::Array(items);
    }

    for quote in ['\'', '"'] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return Value::String(value[1..value.len() - 1].to_string());
        }
    }

    if value.eq_ignore_ascii_case("null") {
        return Value::Null;
    }
    if value == "true" {
        return Value::Bool(true);
    }
    if value == "false" {
        return Value::Bool(false);
    }

    if let Ok(n) = value.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Ok(n) = value.parse::<f64>() {
        if let Some(num) = serde_json::Number::from_f64(n) {
            return Value::Number(num);
        }
    }

    Value::String(value.to_string())
}

/// Equality that treats `"1"` and `1` as the same value
pub fn loosely_equal(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }

    match (a, b) {
        (Value::Number(_), Value::String(s)) | (Value::String(s), Value::Number(_)) => {
            let number = if a.is_number() { a } else { b };
            number.to_string() == *s
        }
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Bool(flag), Value::String(s)) | (Value::String(s), Value::Bool(flag)) => {
            flag.to_string() == *s
        }
        _ => false,
    }
}

/// Compare two JSON values for ordering
pub fn compare_json_values(a: &Value, b: &Value) -> i32 {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => {
            let a_f = a.as_f64().unwrap_or(0.0);
            let b_f = b.as_f64().unwrap_or(0.0);
            if a_f < b_f {
                -1
            } else if a_f > b_f {
                1
            } else {
                0
            }
        }
        (Value::String(a), Value::String(b)) => a.cmp(b) as i32,
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b) as i32,
        (Value::Null, Value::Null) => 0,
        (Value::Null, _) => -1,
        (_, Value::Null) => 1,
        _ => 0,
    }
}

/// SQL LIKE matching (`%` any sequence, `_` single char)
fn matches_like_pattern(value: &str, pattern: &str) -> bool {
    let value: Vec<char> = value.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    like_match(&value, &pattern)
}

fn like_match(value: &[char], pattern: &[char]) -> bool {
    match pattern.split_first() {
        None => value.is_empty(),
        Some(('%', rest)) => (0..=value.len()).any(|skip| like_match(&value[skip..], rest)),
        Some(('_', rest)) => !value.is_empty() && like_match(&value[1..], rest),
        Some((p, rest)) => value.first() == Some(p) && like_match(&value[1..], rest),
    }
}
