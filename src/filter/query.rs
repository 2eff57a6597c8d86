use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::types::{FieldFilter, FieldKind, FieldSpec, FilterOp, FilterValue, ListQuery};

const RESERVED: [&str; 4] = ["select", "sort", "page", "limit"];

/// Parses list query-string parameters ("advanced results") against the
/// filterable fields of one resource.
///
/// `?averageCost[lte]=10000&careers[in]=Business,UI/UX&select=name&sort=-name&page=2&limit=10`
pub struct ListQueryParser {
    fields: &'static [FieldSpec],
    default_limit: u32,
    max_limit: u32,
}

impl ListQueryParser {
    pub fn new(fields: &'static [FieldSpec], default_limit: u32, max_limit: u32) -> Self {
        Self {
            fields,
            default_limit: default_limit.max(1),
            max_limit: max_limit.max(1),
        }
    }

    pub fn parse(&self, params: &HashMap<String, String>) -> Result<ListQuery, FilterError> {
        let mut filters = Vec::new();

        // Deterministic order keeps generated SQL stable
        let mut keys: Vec<&String> = params.keys().collect();
        keys.sort();

        for key in keys {
            if RESERVED.contains(&key.as_str()) {
                continue;
            }
            let (name, op) = Self::split_key(key)?;
            let field = self.field(name)?;
            let raw = &params[key];
            let values = match op {
                FilterOp::In => raw
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| Self::parse_value(field, s))
                    .collect::<Result<Vec<_>, _>>()?,
                _ => vec![Self::parse_value(field, raw)?],
            };
            filters.push(FieldFilter { field, op, values });
        }

        let select = match params.get("select") {
            Some(raw) => Some(self.parse_select(raw)?),
            None => None,
        };

        let sort = match params.get("sort") {
            Some(raw) => FilterOrder::parse(raw, self.fields)?,
            None => FilterOrder::default_for(self.fields),
        };

        let page = match params.get("page") {
            Some(raw) => match raw.parse::<u32>() {
                Ok(p) if p >= 1 => p,
                _ => return Err(FilterError::InvalidPage(raw.clone())),
            },
            None => 1,
        };

        let limit = match params.get("limit") {
            Some(raw) => match raw.parse::<u32>() {
                Ok(l) if l >= 1 => {
                    if l > self.max_limit {
                        tracing::debug!("Limit {} exceeds max {}, capping to max", l, self.max_limit);
                        self.max_limit
                    } else {
                        l
                    }
                }
                _ => return Err(FilterError::InvalidLimit(raw.clone())),
            },
            None => self.default_limit.min(self.max_limit),
        };

        Ok(ListQuery {
            filters,
            select,
            sort,
            page,
            limit,
        })
    }

    fn split_key(key: &str) -> Result<(&str, FilterOp), FilterError> {
        match key.split_once('[') {
            None => Ok((key, FilterOp::Eq)),
            Some((name, rest)) => {
                let op = rest
                    .strip_suffix(']')
                    .ok_or_else(|| FilterError::UnsupportedOperator(key.to_string()))?;
                let op = FilterOp::from_param(op)
                    .ok_or_else(|| FilterError::UnsupportedOperator(op.to_string()))?;
                Ok((name, op))
            }
        }
    }

    fn field(&self, name: &str) -> Result<&'static FieldSpec, FilterError> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| FilterError::UnknownField(name.to_string()))
    }

    fn parse_select(&self, raw: &str) -> Result<Vec<&'static str>, FilterError> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|name| {
                if name == "id" {
                    Ok("id")
                } else {
                    self.field(name).map(|f| f.name)
                }
            })
            .collect()
    }

    fn parse_value(field: &FieldSpec, raw: &str) -> Result<FilterValue, FilterError> {
        let invalid = || FilterError::InvalidValue {
            field: field.name.to_string(),
            value: raw.to_string(),
        };
        match field.kind {
            FieldKind::Text | FieldKind::TextArray => Ok(FilterValue::Text(raw.to_string())),
            FieldKind::Number => match raw.parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(FilterValue::Float(n)),
                _ => Err(invalid()),
            },
            FieldKind::Integer => raw.parse::<i64>().map(FilterValue::Int).map_err(|_| invalid()),
            FieldKind::Boolean => match raw {
                "true" => Ok(FilterValue::Bool(true)),
                "false" => Ok(FilterValue::Bool(false)),
                _ => Err(invalid()),
            },
            FieldKind::Timestamp => {
                if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
                    return Ok(FilterValue::Timestamp(ts.with_timezone(&Utc)));
                }
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|dt| FilterValue::Timestamp(dt.and_utc()))
                    .ok_or_else(invalid)
            }
            FieldKind::Uuid => Uuid::parse_str(raw).map(FilterValue::Uuid).map_err(|_| invalid()),
        }
    }
}
