//! Typed filter / sort / projection expressions.
//!
//! Query documents arrive as JSON (`where`, `sort`, `select`) and are turned
//! into these trees up front, so unknown operators are rejected before any
//! store call is made. Evaluation happens in process against [`Document`]s.

use serde_json::{Map, Value};
use std::cmp::Ordering;
use thiserror::Error;

use super::{Document, ID_FIELD};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("unknown operator `{0}`")]
    UnknownOperator(String),

    #[error("operator `{op}` expects {expected}")]
    BadOperand { op: String, expected: &'static str },

    #[error("{0}")]
    Shape(String),
}

/// Predicate over documents. `And(vec![])` matches everything.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Nor(Vec<Filter>),
    Field { path: String, condition: Condition },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Exists(bool),
}

impl Default for Filter {
    fn default() -> Self {
        Filter::And(Vec::new())
    }
}

impl Filter {
    pub fn from_json(value: &Value) -> Result<Self, QueryError> {
        let Value::Object(map) = value else {
            return Err(QueryError::Shape("filter must be a JSON object".to_string()));
        };

        let mut clauses = Vec::new();
        for (key, operand) in map {
            match key.as_str() {
                "$and" => clauses.push(Filter::And(parse_filter_list(key, operand)?)),
                "$or" => clauses.push(Filter::Or(parse_filter_list(key, operand)?)),
                "$nor" => clauses.push(Filter::Nor(parse_filter_list(key, operand)?)),
                op if op.starts_with('$') => return Err(QueryError::UnknownOperator(op.to_string())),
                path => clauses.extend(parse_field(path, operand)?),
            }
        }

        Ok(match clauses.len() {
            1 => clauses.remove(0),
            _ => Filter::And(clauses),
        })
    }

    pub fn field(path: impl Into<String>, condition: Condition) -> Self {
        Filter::Field {
            path: path.into(),
            condition,
        }
    }

    /// Shorthand for `{ path: value }`
    pub fn eq(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(path, Condition::Eq(value.into()))
    }

    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::And(clauses) => clauses.iter().all(|c| c.matches(doc)),
            Filter::Or(clauses) => clauses.iter().any(|c| c.matches(doc)),
            Filter::Nor(clauses) => !clauses.iter().any(|c| c.matches(doc)),
            Filter::Field { path, condition } => condition.matches(lookup(doc, path)),
        }
    }
}

fn parse_filter_list(op: &str, operand: &Value) -> Result<Vec<Filter>, QueryError> {
    match operand {
        Value::Array(items) if !items.is_empty() => items.iter().map(Filter::from_json).collect(),
        _ => Err(QueryError::BadOperand {
            op: op.to_string(),
            expected: "a non-empty array of filters",
        }),
    }
}

fn parse_field(path: &str, operand: &Value) -> Result<Vec<Filter>, QueryError> {
    let operators = match operand {
        Value::Object(map) if map.keys().any(|k| k.starts_with('$')) => map,
        literal => return Ok(vec![Filter::eq(path, literal.clone())]),
    };

    if operators.keys().any(|k| !k.starts_with('$')) {
        return Err(QueryError::Shape(format!(
            "cannot mix operators and fields in condition on `{}`",
            path
        )));
    }

    operators
        .iter()
        .map(|(op, value)| Ok(Filter::field(path, Condition::parse(op, value)?)))
        .collect()
}

impl Condition {
    fn parse(op: &str, value: &Value) -> Result<Self, QueryError> {
        let list = || match value {
            Value::Array(items) => Ok(items.clone()),
            _ => Err(QueryError::BadOperand {
                op: op.to_string(),
                expected: "an array",
            }),
        };

        Ok(match op {
            "$eq" => Condition::Eq(value.clone()),
            "$ne" => Condition::Ne(value.clone()),
            "$gt" => Condition::Gt(value.clone()),
            "$gte" => Condition::Gte(value.clone()),
            "$lt" => Condition::Lt(value.clone()),
            "$lte" => Condition::Lte(value.clone()),
            "$in" => Condition::In(list()?),
            "$nin" => Condition::Nin(list()?),
            "$exists" => match value {
                Value::Bool(flag) => Condition::Exists(*flag),
                Value::Number(n) => Condition::Exists(n.as_f64() != Some(0.0)),
                _ => {
                    return Err(QueryError::BadOperand {
                        op: op.to_string(),
                        expected: "a boolean",
                    })
                }
            },
            other => return Err(QueryError::UnknownOperator(other.to_string())),
        })
    }

    fn matches(&self, field: Option<&Value>) -> bool {
        match self {
            Condition::Eq(expected) => field_equals(field, expected),
            Condition::Ne(expected) => !field_equals(field, expected),
            Condition::Gt(bound) => field_compares(field, bound, |o| o == Ordering::Greater),
            Condition::Gte(bound) => field_compares(field, bound, |o| o != Ordering::Less),
            Condition::Lt(bound) => field_compares(field, bound, |o| o == Ordering::Less),
            Condition::Lte(bound) => field_compares(field, bound, |o| o != Ordering::Greater),
            Condition::In(options) => options.iter().any(|o| field_equals(field, o)),
            Condition::Nin(options) => !options.iter().any(|o| field_equals(field, o)),
            Condition::Exists(expected) => field.is_some() == *expected,
        }
    }
}

/// Resolves a dotted path (`a.b.c`) inside a document.
fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Missing fields equal `null`; array fields match when any element does.
fn field_equals(field: Option<&Value>, expected: &Value) -> bool {
    match field {
        None => expected.is_null(),
        Some(Value::Array(items)) if !expected.is_array() => {
            items.iter().any(|item| values_equal(item, expected))
        }
        Some(value) => values_equal(value, expected),
    }
}

fn field_compares(field: Option<&Value>, bound: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    match field {
        Some(Value::Array(items)) => items
            .iter()
            .any(|item| same_kind_cmp(item, bound).is_some_and(&accept)),
        Some(value) => same_kind_cmp(value, bound).is_some_and(accept),
        None => false,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

/// Range comparison only between values of the same kind.
fn same_kind_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn kind_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

/// Total order used for sorting mixed-type fields.
fn total_cmp(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let by_kind = kind_rank(a).cmp(&kind_rank(b));
    if by_kind != Ordering::Equal {
        return by_kind;
    }
    match (a, b) {
        (Some(Value::Array(xs)), Some(Value::Array(ys))) => xs
            .iter()
            .zip(ys)
            .map(|(x, y)| total_cmp(Some(x), Some(y)))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| xs.len().cmp(&ys.len())),
        (Some(Value::Object(xs)), Some(Value::Object(ys))) => xs
            .iter()
            .zip(ys)
            .map(|((kx, x), (ky, y))| kx.cmp(ky).then_with(|| total_cmp(Some(x), Some(y))))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| xs.len().cmp(&ys.len())),
        (Some(x), Some(y)) => same_kind_cmp(x, y).unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Ordered sort keys; earlier keys take precedence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sort {
    keys: Vec<(String, SortDirection)>,
}

impl Sort {
    pub fn from_json(value: &Value) -> Result<Self, QueryError> {
        let Value::Object(map) = value else {
            return Err(QueryError::Shape("sort must be a JSON object".to_string()));
        };

        let keys = map
            .iter()
            .map(|(path, direction)| Ok((path.clone(), parse_direction(path, direction)?)))
            .collect::<Result<_, QueryError>>()?;
        Ok(Sort { keys })
    }

    pub fn by(path: impl Into<String>, direction: SortDirection) -> Self {
        Sort {
            keys: vec![(path.into(), direction)],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn apply(&self, docs: &mut [Document]) {
        if self.keys.is_empty() {
            return;
        }
        docs.sort_by(|a, b| {
            self.keys
                .iter()
                .map(|(path, direction)| {
                    let order = total_cmp(lookup(a, path), lookup(b, path));
                    match direction {
                        SortDirection::Ascending => order,
                        SortDirection::Descending => order.reverse(),
                    }
                })
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
    }
}

fn parse_direction(path: &str, value: &Value) -> Result<SortDirection, QueryError> {
    match value {
        Value::Number(n) if n.as_f64() == Some(1.0) => Ok(SortDirection::Ascending),
        Value::Number(n) if n.as_f64() == Some(-1.0) => Ok(SortDirection::Descending),
        Value::String(s) => match s.as_str() {
            "asc" | "ascending" => Ok(SortDirection::Ascending),
            "desc" | "descending" => Ok(SortDirection::Descending),
            _ => Err(QueryError::Shape(format!("invalid sort direction for `{}`", path))),
        },
        _ => Err(QueryError::Shape(format!("invalid sort direction for `{}`", path))),
    }
}

/// Field selection. Inclusion always carries `_id` unless it was excluded.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Include { fields: Vec<String>, with_id: bool },
    Exclude(Vec<String>),
}

impl Projection {
    pub fn from_json(value: &Value) -> Result<Self, QueryError> {
        let Value::Object(map) = value else {
            return Err(QueryError::Shape("select must be a JSON object".to_string()));
        };

        let mut included = Vec::new();
        let mut excluded = Vec::new();
        let mut exclude_id = false;
        let mut include_id = false;
        for (path, flag) in map {
            let include = match flag {
                Value::Bool(b) => *b,
                Value::Number(n) if n.as_f64() == Some(1.0) => true,
                Value::Number(n) if n.as_f64() == Some(0.0) => false,
                _ => {
                    return Err(QueryError::Shape(format!(
                        "select value for `{}` must be 0, 1, true or false",
                        path
                    )))
                }
            };
            match (path.as_str(), include) {
                (ID_FIELD, false) => exclude_id = true,
                (ID_FIELD, true) => include_id = true,
                (_, true) => included.push(path.clone()),
                (_, false) => excluded.push(path.clone()),
            }
        }

        if !included.is_empty() && !excluded.is_empty() {
            return Err(QueryError::Shape(
                "select cannot mix inclusion and exclusion".to_string(),
            ));
        }

        if included.is_empty() && excluded.is_empty() && include_id {
            return Ok(Projection::Include {
                fields: Vec::new(),
                with_id: true,
            });
        }

        if included.is_empty() {
            if exclude_id {
                excluded.push(ID_FIELD.to_string());
            }
            Ok(Projection::Exclude(excluded))
        } else {
            Ok(Projection::Include {
                fields: included,
                with_id: !exclude_id,
            })
        }
    }

    pub fn apply(&self, doc: Document) -> Document {
        match self {
            Projection::Include { fields, with_id } => {
                let mut out = Map::new();
                if *with_id {
                    if let Some(id) = doc.get(ID_FIELD) {
                        out.insert(ID_FIELD.to_string(), id.clone());
                    }
                }
                for path in fields {
                    copy_path(&doc, &mut out, path);
                }
                out
            }
            Projection::Exclude(fields) => {
                let mut out = doc;
                for path in fields {
                    remove_path(&mut out, path);
                }
                out
            }
        }
    }
}

fn copy_path(src: &Document, dst: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            if let Some(value) = src.get(path) {
                dst.insert(path.to_string(), value.clone());
            }
        }
        Some((head, rest)) => {
            let Some(Value::Object(inner)) = src.get(head) else {
                return;
            };
            let slot = dst
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(target) = slot {
                copy_path(inner, target, rest);
            }
        }
    }
}

fn remove_path(doc: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            doc.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Value::Object(inner)) = doc.get_mut(head) {
                remove_path(inner, rest);
            }
        }
    }
}

/// A full `find` request: filter, then sort, then skip/limit, then projection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindQuery {
    pub filter: Filter,
    pub sort: Sort,
    pub projection: Option<Projection>,
    pub skip: usize,
    pub limit: Option<usize>,
}

impl FindQuery {
    pub fn execute(&self, docs: Vec<Document>) -> Vec<Document> {
        let mut matched: Vec<Document> = docs
            .into_iter()
            .filter(|doc| self.filter.matches(doc))
            .collect();
        self.sort.apply(&mut matched);

        matched
            .into_iter()
            .skip(self.skip)
            .take(self.limit.unwrap_or(usize::MAX))
            .map(|doc| match &self.projection {
                Some(projection) => projection.apply(doc),
                None => doc,
            })
            .collect()
    }
}
