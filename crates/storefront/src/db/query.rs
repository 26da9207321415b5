//! Filter / project / order / paginate query description.
//!
//! A [`Query`] is transport-neutral: [`super::PostgrestStore`] turns it into
//! PostgREST URL parameters, [`super::MemoryStore`] evaluates it in process.

use serde_json::Value;

/// Comparison operator for a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Case-insensitive pattern match; `*` matches any run of characters.
    ILike,
    /// Membership in a list of values.
    In,
    /// `IS NULL` / `IS TRUE` / `IS FALSE`.
    Is,
}

impl Op {
    /// PostgREST operator keyword.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::ILike => "ilike",
            Self::In => "in",
            Self::Is => "is",
        }
    }
}

/// A single `column <op> value` predicate. All filters of a query are ANDed.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: Op,
    pub value: Value,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// One sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

/// A read against one named collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    collection: String,
    columns: Option<Vec<String>>,
    filters: Vec<Filter>,
    order: Vec<Order>,
    limit: Option<u32>,
    offset: Option<u32>,
}

impl Query {
    /// Start a query over `collection`, selecting every column.
    #[must_use]
    pub fn from(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            columns: None,
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Project to a comma-separated column list.
    #[must_use]
    pub fn select(mut self, columns: &str) -> Self {
        let cols: Vec<String> = columns
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from)
            .collect();
        self.columns = (!cols.is_empty() && cols != ["*"]).then_some(cols);
        self
    }

    /// Add a predicate.
    #[must_use]
    pub fn filter(mut self, column: &str, op: Op, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            column: column.to_string(),
            op,
            value: value.into(),
        });
        self
    }

    /// `column = value`.
    #[must_use]
    pub fn eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(column, Op::Eq, value)
    }

    /// `column ILIKE pattern` (use `*` as wildcard).
    #[must_use]
    pub fn ilike(self, column: &str, pattern: &str) -> Self {
        self.filter(column, Op::ILike, pattern)
    }

    /// Append a sort key.
    #[must_use]
    pub fn order(mut self, column: &str, direction: Direction) -> Self {
        self.order.push(Order {
            column: column.to_string(),
            direction,
        });
        self
    }

    /// Return at most `limit` rows.
    #[must_use]
    pub const fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first `offset` rows.
    #[must_use]
    pub const fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// 1-based page of `per_page` rows.
    #[must_use]
    pub const fn page(self, page: u32, per_page: u32) -> Self {
        self.limit(per_page)
            .offset(page.saturating_sub(1).saturating_mul(per_page))
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    #[must_use]
    pub fn columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    #[must_use]
    pub fn ordering(&self) -> &[Order] {
        &self.order
    }

    #[must_use]
    pub const fn limit_value(&self) -> Option<u32> {
        self.limit
    }

    #[must_use]
    pub const fn offset_value(&self) -> Option<u32> {
        self.offset
    }

    /// Same filters, no projection, ordering or paging. Used for counts.
    #[must_use]
    pub fn without_paging(&self) -> Self {
        Self {
            collection: self.collection.clone(),
            columns: None,
            filters: self.filters.clone(),
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Encode as PostgREST query parameters (unescaped; the URL builder escapes).
    #[must_use]
    pub fn to_postgrest_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::with_capacity(self.filters.len() + 4);

        let select = self
            .columns
            .as_ref()
            .map_or_else(|| "*".to_string(), |cols| cols.join(","));
        params.push(("select".to_string(), select));

        for filter in &self.filters {
            let value = match filter.op {
                Op::In => {
                    let items: Vec<String> = match &filter.value {
                        Value::Array(values) => values.iter().map(quote_list_item).collect(),
                        other => vec![quote_list_item(other)],
                    };
                    format!("({})", items.join(","))
                }
                _ => scalar(&filter.value),
            };
            params.push((
                filter.column.clone(),
                format!("{}.{value}", filter.op.as_str()),
            ));
        }

        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|o| {
                    let dir = match o.direction {
                        Direction::Asc => "asc",
                        Direction::Desc => "desc",
                    };
                    format!("{}.{dir}", o.column)
                })
                .collect::<Vec<_>>()
                .join(",");
            params.push(("order".to_string(), order));
        }

        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            params.push(("offset".to_string(), offset.to_string()));
        }

        params
    }
}

/// Render a JSON scalar the way PostgREST expects it in a filter.
fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// List items containing reserved characters must be double-quoted.
fn quote_list_item(value: &Value) -> String {
    let raw = scalar(value);
    if raw.contains([',', '(', ')', '"', ' ']) {
        format!("\"{}\"", raw.replace('"', "\\\""))
    } else {
        raw
    }
}
