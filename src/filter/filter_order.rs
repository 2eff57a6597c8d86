use std::cmp::Ordering;

use serde_json::Value;

use super::error::FilterError;
use super::filter_where::{field_value, FilterWhere};
use super::types::{FieldSpec, SortDirection, SortKey};

pub struct FilterOrder;

impl FilterOrder {
    /// Parse `name,-createdAt` into sort keys; a leading `-` sorts descending.
    pub fn parse(s: &str, fields: &'static [FieldSpec]) -> Result<Vec<SortKey>, FilterError> {
        let mut out = Vec::new();
        for part in s.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }
            let (name, direction) = match trimmed.strip_prefix('-') {
                Some(rest) => (rest, SortDirection::Desc),
                None => (trimmed, SortDirection::Asc),
            };
            let field = fields
                .iter()
                .find(|f| f.name == name)
                .ok_or_else(|| FilterError::UnknownField(name.to_string()))?;
            out.push(SortKey { field, direction });
        }
        Ok(out)
    }

    /// Newest first when the resource has a creation timestamp.
    pub fn default_for(fields: &'static [FieldSpec]) -> Vec<SortKey> {
        fields
            .iter()
            .find(|f| f.name == "createdAt")
            .map(|field| {
                vec![SortKey {
                    field,
                    direction: SortDirection::Desc,
                }]
            })
            .unwrap_or_default()
    }

    pub fn generate(keys: &[SortKey]) -> String {
        if keys.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = keys
            .iter()
            .map(|k| format!("\"{}\" {} NULLS LAST", k.field.column, k.direction.to_sql()))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }

    /// In-memory equivalent of `generate`: missing values sort last in both directions.
    pub fn compare(a: &Value, b: &Value, keys: &[SortKey]) -> Ordering {
        for key in keys {
            let left = field_value(a, key.field.name).filter(|v| !v.is_null());
            let right = field_value(b, key.field.name).filter(|v| !v.is_null());
            let ordering = match (left, right) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => return Ordering::Greater,
                (Some(_), None) => return Ordering::Less,
                (Some(l), Some(r)) => {
                    let natural = FilterWhere::compare_json(l, r).unwrap_or(Ordering::Equal);
                    match key.direction {
                        SortDirection::Asc => natural,
                        SortDirection::Desc => natural.reverse(),
                    }
                }
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}
