use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use super::types::{FieldFilter, FieldKind, FilterOp, FilterValue};

/// Resolve a (possibly dotted) wire field name inside a serialized record.
pub fn field_value<'a>(record: &'a Value, name: &str) -> Option<&'a Value> {
    name.split('.').try_fold(record, |current, segment| current.get(segment))
}

pub struct FilterWhere {
    param_values: Vec<FilterValue>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    /// Build a WHERE body (without the keyword) and its bind parameters.
    pub fn generate(
        filters: &[FieldFilter],
        starting_param_index: usize,
    ) -> (String, Vec<FilterValue>) {
        let mut filter_where = Self::new(starting_param_index);
        let conditions: Vec<String> = filters
            .iter()
            .map(|filter| filter_where.build_sql_condition(filter))
            .collect();

        let where_clause = if conditions.is_empty() {
            "1=1".to_string()
        } else {
            conditions.join(" AND ")
        };
        (where_clause, filter_where.param_values)
    }

    fn build_sql_condition(&mut self, filter: &FieldFilter) -> String {
        let quoted_column = format!("\"{}\"", filter.field.column);

        if filter.field.kind == FieldKind::TextArray {
            return match filter.op {
                FilterOp::Eq => {
                    let p = self.param(Self::first(filter));
                    format!("{} = ANY({})", p, quoted_column)
                }
                FilterOp::Ne => {
                    let p = self.param(Self::first(filter));
                    format!("NOT ({} = ANY({}))", p, quoted_column)
                }
                FilterOp::In => {
                    if filter.values.is_empty() {
                        return "1=0".to_string();
                    }
                    let params: Vec<String> =
                        filter.values.iter().map(|v| self.param(v.clone())).collect();
                    format!("{} && ARRAY[{}]::text[]", quoted_column, params.join(", "))
                }
                op => {
                    let p = self.param(Self::first(filter));
                    format!(
                        "EXISTS (SELECT 1 FROM unnest({}) AS element WHERE element {} {})",
                        quoted_column,
                        op.to_sql(),
                        p
                    )
                }
            };
        }

        match filter.op {
            FilterOp::In => {
                if filter.values.is_empty() {
                    return "1=0".to_string();
                }
                let params: Vec<String> = filter.values.iter().map(|v| self.param(v.clone())).collect();
                format!("{} IN ({})", quoted_column, params.join(", "))
            }
            op => {
                let p = self.param(Self::first(filter));
                format!("{} {} {}", quoted_column, op.to_sql(), p)
            }
        }
    }

    fn first(filter: &FieldFilter) -> FilterValue {
        filter
            .values
            .first()
            .cloned()
            .unwrap_or_else(|| FilterValue::Text(String::new()))
    }

    fn param(&mut self, value: FilterValue) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }

    /// In-memory evaluation with the same semantics as the generated SQL.
    pub fn matches(record: &Value, filters: &[FieldFilter]) -> bool {
        filters.iter().all(|f| Self::matches_one(record, f))
    }

    fn matches_one(record: &Value, filter: &FieldFilter) -> bool {
        let candidates: Vec<&Value> = match field_value(record, filter.field.name) {
            Some(Value::Array(items)) => items.iter().collect(),
            Some(Value::Null) | None => vec![],
            Some(v) => vec![v],
        };

        let any = |wanted: &[Ordering]| {
            candidates.iter().any(|c| {
                filter
                    .values
                    .iter()
                    .any(|v| matches!(Self::compare_value(c, v), Some(o) if wanted.contains(&o)))
            })
        };

        match filter.op {
            FilterOp::Eq | FilterOp::In => any(&[Ordering::Equal]),
            FilterOp::Ne => !any(&[Ordering::Equal]),
            FilterOp::Gt => any(&[Ordering::Greater]),
            FilterOp::Gte => any(&[Ordering::Greater, Ordering::Equal]),
            FilterOp::Lt => any(&[Ordering::Less]),
            FilterOp::Lte => any(&[Ordering::Less, Ordering::Equal]),
        }
    }

    /// Order of a stored JSON value relative to a filter operand.
    fn compare_value(actual: &Value, expected: &FilterValue) -> Option<Ordering> {
        match expected {
            FilterValue::Text(s) => actual.as_str().map(|a| a.cmp(s.as_str())),
            FilterValue::Float(f) => actual.as_f64().and_then(|a| a.partial_cmp(f)),
            FilterValue::Int(i) => actual.as_f64().and_then(|a| a.partial_cmp(&(*i as f64))),
            FilterValue::Bool(b) => actual.as_bool().map(|a| a.cmp(b)),
            FilterValue::Timestamp(t) => actual
                .as_str()
                .and_then(|a| DateTime::parse_from_rfc3339(a).ok())
                .map(|a| a.with_timezone(&Utc).cmp(t)),
            FilterValue::Uuid(u) => actual
                .as_str()
                .and_then(|a| Uuid::parse_str(a).ok())
                .map(|a| a.cmp(u)),
        }
    }

    /// Natural order of two stored JSON values of the same field.
    pub fn compare_json(a: &Value, b: &Value) -> Option<Ordering> {
        match (a, b) {
            (Value::Number(l), Value::Number(r)) => l.as_f64()?.partial_cmp(&r.as_f64()?),
            (Value::Bool(l), Value::Bool(r)) => Some(l.cmp(r)),
            (Value::String(l), Value::String(r)) => {
                match (DateTime::parse_from_rfc3339(l), DateTime::parse_from_rfc3339(r)) {
                    (Ok(lt), Ok(rt)) => Some(lt.cmp(&rt)),
                    _ => Some(l.cmp(r)),
                }
            }
            _ => None,
        }
    }
}
