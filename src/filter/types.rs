use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Storage type of a filterable field, drives parsing of query-string values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Integer,
    Boolean,
    Timestamp,
    Uuid,
    TextArray,
}

/// A field exposed to list filtering and sorting.
///
/// `name` is the camelCase wire name (dotted for nested objects, e.g.
/// `location.state`), `column` the backing SQL column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub column: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn new(name: &'static str, column: &'static str, kind: FieldKind) -> Self {
        Self { name, column, kind }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

impl FilterOp {
    pub fn from_param(op: &str) -> Option<Self> {
        Some(match op {
            "eq" => FilterOp::Eq,
            "ne" => FilterOp::Ne,
            "gt" => FilterOp::Gt,
            "gte" => FilterOp::Gte,
            "lt" => FilterOp::Lt,
            "lte" => FilterOp::Lte,
            "in" => FilterOp::In,
            _ => return None,
        })
    }

    pub fn to_sql(&self) -> &'static str {
        match self {
            FilterOp::Eq | FilterOp::In => "=",
            FilterOp::Ne => "IS DISTINCT FROM",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
        }
    }
}

/// Typed filter operand, parsed from the query string according to `FieldKind`
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Float(f64),
    Int(i64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: &'static FieldSpec,
    pub op: FilterOp,
    pub values: Vec<FilterValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub field: &'static FieldSpec,
    pub direction: SortDirection,
}

/// Parsed "advanced results" query: filters, projection, ordering and paging
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub filters: Vec<FieldFilter>,
    pub select: Option<Vec<&'static str>>,
    pub sort: Vec<SortKey>,
    pub page: u32,
    pub limit: u32,
}

impl ListQuery {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

/// One page of a listing plus the unpaged match count
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRef {
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageRef>,
}

impl Pagination {
    pub fn for_page(page: u32, limit: u32, total: u64) -> Self {
        let start = u64::from(page.saturating_sub(1)) * u64::from(limit);
        let end = u64::from(page) * u64::from(limit);
        Self {
            next: (end < total).then(|| PageRef { page: page + 1, limit }),
            prev: (start > 0).then(|| PageRef { page: page - 1, limit }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<FilterValue>,
}
