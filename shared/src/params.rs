//! Query-string and body parsing for the resource handlers.

use serde::de::DeserializeOwned;
use serde_json::Value;
use taskboard_atoms::store::{Filter, FindQuery, Projection, QueryError, Sort};
use taskboard_atoms::{ListRequest, ServiceError};

/// Raw `GET /<collection>` query-string values.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawListParams<'a> {
    pub where_: Option<&'a str>,
    pub sort: Option<&'a str>,
    pub select: Option<&'a str>,
    pub skip: Option<&'a str>,
    pub limit: Option<&'a str>,
    pub count: Option<&'a str>,
}

/// Parses a list request. `default_limit` is `None` for unbounded collections.
pub fn parse_list_params(
    raw: &RawListParams<'_>,
    default_limit: Option<usize>,
) -> Result<ListRequest, ServiceError> {
    let filter = parse_json_param("where", raw.where_, Filter::from_json)?.unwrap_or_default();
    let sort = parse_json_param("sort", raw.sort, Sort::from_json)?.unwrap_or_default();
    let projection = parse_select(raw.select)?;
    let skip = parse_count_param("skip", raw.skip)?.unwrap_or(0);
    let limit = parse_count_param("limit", raw.limit)?.or(default_limit);

    Ok(ListRequest {
        query: FindQuery {
            filter,
            sort,
            projection,
            skip,
            limit,
        },
        count: raw.count == Some("true"),
    })
}

pub fn parse_select(raw: Option<&str>) -> Result<Option<Projection>, ServiceError> {
    parse_json_param("select", raw, Projection::from_json)
}

fn parse_json_param<T>(
    name: &str,
    raw: Option<&str>,
    build: impl Fn(&Value) -> Result<T, QueryError>,
) -> Result<Option<T>, ServiceError> {
    let Some(raw) = raw.filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let value: Value = serde_json::from_str(raw)
        .map_err(|_| ServiceError::MalformedQuery(format!("Invalid JSON in {} parameter", name)))?;
    build(&value)
        .map(Some)
        .map_err(|e| ServiceError::MalformedQuery(format!("Invalid {} parameter: {}", name, e)))
}

fn parse_count_param(name: &str, raw: Option<&str>) -> Result<Option<usize>, ServiceError> {
    let Some(raw) = raw.filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    match raw.trim().parse::<i64>() {
        Ok(n) if n >= 0 => Ok(Some(usize::try_from(n).unwrap_or(usize::MAX))),
        _ => Err(ServiceError::MalformedQuery(format!(
            "Invalid JSON in {} parameter",
            name
        ))),
    }
}

/// Decodes a JSON request body. An empty body decodes as `T::default()` so
/// the required-field check reports it.
pub fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, ServiceError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ServiceError::Validation(format!("Invalid request body: {}", e)))
}
