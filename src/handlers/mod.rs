// Request handlers, one module per resource. Every handler follows the same
// shape: look up, authorize, mutate or query, respond with the JSON envelope.
pub mod auth;
pub mod bootcamps;
pub mod courses;
pub mod reviews;
pub mod system;
pub mod users;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::database::models::{Bootcamp, BootcampSummary};
use crate::error::ApiError;
use crate::filter::{FieldSpec, ListQuery, ListQueryParser, Pagination};
use crate::middleware::{ApiResponse, ListParams};
use crate::state::AppState;

/// Parse advanced-results query parameters for one resource
pub(crate) fn parse_list(
    state: &AppState,
    fields: &'static [FieldSpec],
    params: &ListParams,
) -> Result<ListQuery, ApiError> {
    let parser = ListQueryParser::new(
        fields,
        state.config.api.default_page_size,
        state.config.api.max_page_size,
    );
    Ok(parser.parse(&params.0)?)
}

pub(crate) fn to_json<T: Serialize>(item: &T) -> Result<Value, ApiError> {
    serde_json::to_value(item).map_err(|e| {
        tracing::error!("Failed to serialize record: {}", e);
        ApiError::internal_server_error("Server Error")
    })
}

/// Keep only the selected top-level keys (and `id`); dotted names keep their root object
pub(crate) fn project(value: Value, select: Option<&[&str]>) -> Value {
    let (Some(select), Value::Object(map)) = (select, &value) else {
        return value;
    };
    let keep = |key: &str| {
        key == "id"
            || select
                .iter()
                .any(|s| *s == key || s.split('.').next() == Some(key))
    };
    let projected: Map<String, Value> = map
        .iter()
        .filter(|(k, _)| keep(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    Value::Object(projected)
}

pub(crate) fn list_response(items: Vec<Value>, query: &ListQuery, total: u64) -> ApiResponse<Vec<Value>> {
    let count = items.len();
    let pagination = Pagination::for_page(query.page, query.limit, total);
    ApiResponse::paginated(items, count, pagination, total)
}

/// Summaries of the given bootcamps keyed by id, for populating children
pub(crate) async fn bootcamp_summaries(
    state: &AppState,
    ids: impl IntoIterator<Item = Uuid>,
) -> Result<HashMap<Uuid, BootcampSummary>, ApiError> {
    let mut ids: Vec<Uuid> = ids.into_iter().collect();
    ids.sort();
    ids.dedup();
    let bootcamps: Vec<Bootcamp> = state.store.find_bootcamps(&ids).await?;
    Ok(bootcamps.iter().map(|b| (b.id, b.summary())).collect())
}

/// Replace the `bootcamp` id of a serialized child with the bootcamp summary
pub(crate) fn populate_bootcamp(
    mut value: Value,
    bootcamp_id: Uuid,
    summaries: &HashMap<Uuid, BootcampSummary>,
) -> Value {
    if let (Value::Object(map), Some(summary)) = (&mut value, summaries.get(&bootcamp_id)) {
        if let Ok(summary) = serde_json::to_value(summary) {
            map.insert("bootcamp".to_string(), summary);
        }
    }
    value
}

/// Accepts `"8"` as well as `8` for free-form text fields
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TextOrNumber {
    Text(String),
    Number(serde_json::Number),
}

impl TextOrNumber {
    pub fn into_string(self) -> String {
        match self {
            TextOrNumber::Text(s) => s,
            TextOrNumber::Number(n) => n.to_string(),
        }
    }
}
