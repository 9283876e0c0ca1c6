//! # Document Query Parser
//!
//! Parses raw JSON:API query parameters into a structured, immutable
//! document query.
//!
//! ```text
//! ?filter[exact][state]=published&fields[posts]=title,author&include=author.company
//!  &sort=-published,title&page[limit]=20&page[offset]=40
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::JsonApiConfig;

/// Invalid query parameter, carrying the offending parameter name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid query parameter '{parameter}': {message}")]
pub struct QueryError {
    pub parameter: String,
    pub message: String,
}

impl QueryError {
    pub fn new(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            parameter: parameter.into(),
            message: message.into(),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// One sort directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub field: String,
    pub direction: Direction,
}

/// Parsed request query
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentQuery {
    filters: BTreeMap<String, Value>,
    sort: Vec<SortField>,
    fields: BTreeMap<String, BTreeSet<String>>,
    include: BTreeSet<String>,
    limit: usize,
    offset: usize,
    parameters: BTreeMap<String, String>,
}

impl DocumentQuery {
    /// Parse raw query parameters, in request order
    pub fn parse(params: &[(String, String)], config: &JsonApiConfig) -> Result<Self, QueryError> {
        let mut query = Self::unfiltered(config);
        let mut limit = None;

        for (key, value) in params {
            match key.as_str() {
                "include" => {
                    query.include.extend(parse_list(value, "include")?);
                }
                "sort" => {
                    query.sort = parse_sort(value)?;
                }
                "page[limit]" => {
                    limit = Some(parse_limit(value, config)?);
                }
                "page[offset]" => {
                    query.offset = value
                        .trim()
                        .parse()
                        .map_err(|_| QueryError::new(key, format!("Invalid offset: {}", value)))?;
                }
                _ if key.starts_with("fields[") => {
                    let resource_type = parse_bracket_key(key, "fields")?
                        .into_iter()
                        .next()
                        .filter(|_| key.ends_with(']'))
                        .ok_or_else(|| QueryError::new(key, "Expected fields[<type>]"))?;
                    let fields = query.fields.entry(resource_type).or_default();
                    fields.extend(value.split(',').map(|f| f.trim().to_string()).filter(|f| !f.is_empty()));
                }
                _ if key.starts_with("filter[") => {
                    let path = parse_bracket_key(key, "filter")?;
                    insert_filter(&mut query.filters, key, &path, value)?;
                }
                _ => {
                    query.parameters.insert(key.clone(), value.clone());
                }
            }
        }

        query.limit = limit.unwrap_or(config.default_limit);

        Ok(query)
    }

    /// A query without any parameters
    pub fn unfiltered(config: &JsonApiConfig) -> Self {
        Self {
            filters: BTreeMap::new(),
            sort: Vec::new(),
            fields: BTreeMap::new(),
            include: BTreeSet::new(),
            limit: config.default_limit,
            offset: 0,
            parameters: BTreeMap::new(),
        }
    }

    /// Filter value by strategy name
    pub fn filter(&self, name: &str) -> Option<&Value> {
        self.filters.get(name)
    }

    pub fn filters(&self) -> &BTreeMap<String, Value> {
        &self.filters
    }

    pub fn sort(&self) -> &[SortField] {
        &self.sort
    }

    pub fn include(&self) -> &BTreeSet<String> {
        &self.include
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Parameters not part of the JSON:API vocabulary
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    /// Boolean switch parameter, set by `1` or `true`
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.parameter(name), Some("1") | Some("true"))
    }

    /// Check the sparse fieldset of a type; no fieldset means all fields
    pub fn is_field_requested(&self, resource_type: &str, field: &str) -> bool {
        match self.fields.get(resource_type) {
            Some(fields) => fields.contains(field),
            None => true,
        }
    }

    /// Check whether a relationship path is requested for inclusion
    ///
    /// A path is included when it is listed itself or is a prefix of a
    /// listed path.
    pub fn is_included(&self, path: &str) -> bool {
        self.include.iter().any(|include| {
            include == path
                || (include.len() > path.len()
                    && include.starts_with(path)
                    && include.as_bytes()[path.len()] == b'.')
        })
    }
}

fn parse_list(value: &str, parameter: &str) -> Result<Vec<String>, QueryError> {
    let items: Vec<String> = value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if items.iter().any(|item| item.split('.').any(str::is_empty)) {
        return Err(QueryError::new(parameter, format!("Invalid path in: {}", value)));
    }

    Ok(items)
}

fn parse_sort(value: &str) -> Result<Vec<SortField>, QueryError> {
    let mut sort = Vec::new();

    for part in value.split(',') {
        let part = part.trim();
        let (field, direction) = match part.strip_prefix('-') {
            Some(field) => (field, Direction::Desc),
            None => (part.strip_prefix('+').unwrap_or(part), Direction::Asc),
        };

        if field.is_empty() {
            return Err(QueryError::new("sort", format!("Invalid sort: {}", value)));
        }

        sort.push(SortField {
            field: field.to_string(),
            direction,
        });
    }

    Ok(sort)
}

/// Parse page[limit]; an explicit "no limit" is rejected
fn parse_limit(value: &str, config: &JsonApiConfig) -> Result<usize, QueryError> {
    let limit: usize = value
        .trim()
        .parse()
        .map_err(|_| QueryError::new("page[limit]", format!("Invalid limit: {}", value)))?;

    if limit == 0 {
        return Err(QueryError::new("page[limit]", "Limit must be greater than 0"));
    }
    if limit > config.max_limit {
        return Err(QueryError::new(
            "page[limit]",
            format!("Limit {} exceeds maximum {}", limit, config.max_limit),
        ));
    }

    Ok(limit)
}

/// Split `prefix[a][b][]` into `["a", "b", ""]`
fn parse_bracket_key(key: &str, prefix: &str) -> Result<Vec<String>, QueryError> {
    let mut rest = &key[prefix.len()..];
    let mut segments = Vec::new();

    while !rest.is_empty() {
        let inner = rest
            .strip_prefix('[')
            .and_then(|r| r.find(']').map(|end| (&r[..end], &r[end + 1..])));

        match inner {
            Some((segment, remaining)) => {
                segments.push(segment.to_string());
                rest = remaining;
            }
            None => return Err(QueryError::new(key, "Malformed parameter name")),
        }
    }

    if segments.first().map_or(true, |s| s.is_empty()) {
        return Err(QueryError::new(key, "Malformed parameter name"));
    }

    Ok(segments)
}

fn insert_filter(
    filters: &mut BTreeMap<String, Value>,
    key: &str,
    path: &[String],
    value: &str,
) -> Result<(), QueryError> {
    let name = path[0].clone();
    let value = Value::String(value.to_string());

    match &path[1..] {
        [] => {
            filters.insert(name, value);
        }
        [field] | [field, _] if !field.is_empty() => {
            let is_list = path.len() == 3;
            if is_list && !path[2].is_empty() {
                return Err(QueryError::new(key, "Malformed parameter name"));
            }

            let entry = filters
                .entry(name)
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }

            if let Value::Object(fields) = entry {
                if is_list {
                    let list = fields
                        .entry(field.clone())
                        .or_insert_with(|| Value::Array(Vec::new()));
                    match list {
                        Value::Array(items) => items.push(value),
                        other => *other = Value::Array(vec![other.clone(), value]),
                    }
                } else {
                    fields.insert(field.clone(), value);
                }
            }
        }
        _ => return Err(QueryError::new(key, "Malformed parameter name")),
    }

    Ok(())
}
