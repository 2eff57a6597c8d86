use serde::Serialize;
use serde_json::Value;

use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{ListQuery, Page, SqlResult};

/// Turns a parsed `ListQuery` into SQL for one table, or applies it to
/// records already in memory.
pub struct Filter<'q> {
    table_name: &'static str,
    query: &'q ListQuery,
}

impl<'q> Filter<'q> {
    pub fn new(table_name: &'static str, query: &'q ListQuery) -> Self {
        Self { table_name, query }
    }

    pub fn to_sql(&self) -> SqlResult {
        let (where_clause, params) = FilterWhere::generate(&self.query.filters, 0);
        let order_clause = FilterOrder::generate(&self.query.sort);
        let limit_clause = format!("LIMIT {} OFFSET {}", self.query.limit, self.query.offset());

        let query = [
            "SELECT *".to_string(),
            format!("FROM \"{}\"", self.table_name),
            format!("WHERE {}", where_clause),
            order_clause,
            limit_clause,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        SqlResult { query, params }
    }

    pub fn to_count_sql(&self) -> SqlResult {
        let (where_clause, params) = FilterWhere::generate(&self.query.filters, 0);
        SqlResult {
            query: format!(
                "SELECT COUNT(*) as count FROM \"{}\" WHERE {}",
                self.table_name, where_clause
            ),
            params,
        }
    }

    /// Filter, sort and page `items` by their serialized form.
    pub fn apply<T: Serialize>(items: Vec<T>, query: &ListQuery) -> Page<T> {
        let mut matched: Vec<(Value, T)> = items
            .into_iter()
            .map(|item| (serde_json::to_value(&item).unwrap_or_default(), item))
            .filter(|(json, _)| FilterWhere::matches(json, &query.filters))
            .collect();

        matched.sort_by(|(a, _), (b, _)| FilterOrder::compare(a, b, &query.sort));

        let total = matched.len() as u64;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let items = matched
            .into_iter()
            .skip(offset)
            .take(query.limit as usize)
            .map(|(_, item)| item)
            .collect();

        Page { items, total }
    }
}
