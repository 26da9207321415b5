//! In-process [`DataStore`] used by tests and local development.
//!
//! Evaluates [`Query`] the way the hosted store does for the operators the
//! storefront uses, and enforces the same unique constraints as the
//! migrations (`admin_users.user_id`, `newsletter_subscribers.email`).

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};

use super::query::{Direction, Filter, Op};
use super::{DataStore, DataStoreError, Query, collections};

/// Unique columns per collection.
const UNIQUE_COLUMNS: &[(&str, &str)] = &[
    (collections::ADMIN_USERS, "user_id"),
    (collections::NEWSLETTER_SUBSCRIBERS, "email"),
];

#[derive(Default)]
struct Table {
    rows: Vec<Value>,
    next_id: i64,
}

/// Mutex-guarded map of collections.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Table>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load rows verbatim, bypassing id assignment and unique constraints.
    pub fn seed(&self, collection: &str, rows: impl IntoIterator<Item = Value>) {
        let mut tables = self.lock();
        let table = tables.entry(collection.to_string()).or_default();
        for row in rows {
            if let Some(id) = row.get("id").and_then(Value::as_i64) {
                table.next_id = table.next_id.max(id);
            }
            table.rows.push(row);
        }
    }

    /// Snapshot of a collection's rows.
    #[must_use]
    pub fn rows(&self, collection: &str) -> Vec<Value> {
        self.lock()
            .get(collection)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    /// Make every subsequent operation fail with [`DataStoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, AtomicOrdering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Table>> {
        // A poisoned lock only means a test panicked mid-write; the data is still usable.
        self.tables
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn check_available(&self) -> Result<(), DataStoreError> {
        if self.unavailable.load(AtomicOrdering::SeqCst) {
            return Err(DataStoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(())
    }

    fn matching(rows: &[Value], query: &Query) -> Vec<Value> {
        rows.iter()
            .filter(|row| query.filters().iter().all(|f| matches_filter(row, f)))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn select(&self, query: &Query) -> Result<Vec<Value>, DataStoreError> {
        self.check_available()?;

        let mut rows = {
            let tables = self.lock();
            tables
                .get(query.collection())
                .map(|t| Self::matching(&t.rows, query))
                .unwrap_or_default()
        };

        if !query.ordering().is_empty() {
            rows.sort_by(|a, b| {
                for key in query.ordering() {
                    let ord = compare_nullable(a.get(&key.column), b.get(&key.column));
                    let ord = match key.direction {
                        Direction::Asc => ord,
                        Direction::Desc => ord.reverse(),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        let offset = query.offset_value().unwrap_or(0) as usize;
        let limit = query.limit_value().map_or(usize::MAX, |l| l as usize);

        let rows = rows
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|row| project(row, query.columns()))
            .collect();

        Ok(rows)
    }

    async fn count(&self, query: &Query) -> Result<u64, DataStoreError> {
        self.check_available()?;

        let tables = self.lock();
        let count = tables
            .get(query.collection())
            .map_or(0, |t| Self::matching(&t.rows, query).len());
        Ok(count as u64)
    }

    async fn insert(&self, collection: &str, row: Value) -> Result<Value, DataStoreError> {
        self.check_available()?;

        let Value::Object(mut object) = row else {
            return Err(DataStoreError::Api {
                status: 400,
                message: "row must be a JSON object".to_string(),
            });
        };

        let mut tables = self.lock();
        let table = tables.entry(collection.to_string()).or_default();

        for (unique_collection, column) in UNIQUE_COLUMNS {
            if *unique_collection != collection {
                continue;
            }
            let Some(value) = object.get(*column) else {
                continue;
            };
            if table.rows.iter().any(|r| r.get(*column) == Some(value)) {
                return Err(DataStoreError::Conflict(format!(
                    "duplicate key value violates unique constraint on {collection}.{column}"
                )));
            }
        }

        table.next_id += 1;
        object
            .entry("id")
            .or_insert_with(|| Value::from(table.next_id));
        object
            .entry("created_at")
            .or_insert_with(|| Value::from(Utc::now().to_rfc3339()));

        let stored = Value::Object(object);
        table.rows.push(stored.clone());
        Ok(stored)
    }
}

fn project(row: Value, columns: Option<&[String]>) -> Value {
    let (Some(columns), Value::Object(object)) = (columns, &row) else {
        return row;
    };
    let projected: Map<String, Value> = columns
        .iter()
        .filter_map(|c| object.get(c).map(|v| (c.clone(), v.clone())))
        .collect();
    Value::Object(projected)
}

fn matches_filter(row: &Value, filter: &Filter) -> bool {
    let field = row.get(&filter.column).unwrap_or(&Value::Null);

    match filter.op {
        Op::Eq => compare(field, &filter.value) == Some(Ordering::Equal),
        Op::Neq => compare(field, &filter.value) != Some(Ordering::Equal),
        Op::Gt => compare(field, &filter.value) == Some(Ordering::Greater),
        Op::Gte => matches!(
            compare(field, &filter.value),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Op::Lt => compare(field, &filter.value) == Some(Ordering::Less),
        Op::Lte => matches!(
            compare(field, &filter.value),
            Some(Ordering::Less | Ordering::Equal)
        ),
        Op::ILike => match (field.as_str(), filter.value.as_str()) {
            (Some(text), Some(pattern)) => ilike(text, pattern),
            _ => false,
        },
        Op::In => match &filter.value {
            Value::Array(values) => values
                .iter()
                .any(|v| compare(field, v) == Some(Ordering::Equal)),
            other => compare(field, other) == Some(Ordering::Equal),
        },
        Op::Is => match &filter.value {
            Value::Null => field.is_null(),
            Value::Bool(b) => field.as_bool() == Some(*b),
            _ => false,
        },
    }
}

/// Compare two JSON scalars; numbers (or numeric strings) compare numerically.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    if a.is_null() || b.is_null() {
        return None;
    }
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => Some(a.to_string().cmp(&b.to_string())),
    }
}

/// Ordering for sorts; nulls sort last in ascending order.
fn compare_nullable(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => compare(x, y).unwrap_or(Ordering::Equal),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Case-insensitive glob match where `*` and `%` match any run of characters.
fn ilike(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.to_lowercase().chars().collect();
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();

    let (mut t, mut p) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '*' || pattern[p] == '%') {
            star = Some((p, t));
            p += 1;
        } else if p < pattern.len() && (pattern[p] == '_' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if let Some((star_p, star_t)) = star {
            p = star_p + 1;
            t = star_t + 1;
            star = Some((star_p, star_t + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|c| *c == '*' || *c == '%')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn catalogue() -> MemoryStore {
        let store = MemoryStore::new();
        store.seed(
            collections::PRODUCTS,
            [
                json!({"id": 1, "name": "Linen Shirt", "price": "89.00", "active": true, "category": "shirts"}),
                json!({"id": 2, "name": "Denim Jacket", "price": "149.00", "active": true, "category": "outerwear"}),
                json!({"id": 3, "name": "Wool Coat", "price": "289.00", "active": false, "category": "outerwear"}),
                json!({"id": 4, "name": "Oxford Shirt", "price": "79.00", "active": true, "category": "shirts"}),
            ],
        );
        store
    }

    #[test]
    fn test_ilike() {
        assert!(ilike("Linen Shirt", "*shirt*"));
        assert!(ilike("Linen Shirt", "linen%"));
        assert!(ilike("Linen Shirt", "l_nen shirt"));
        assert!(!ilike("Linen Shirt", "*coat*"));
        assert!(ilike("", "*"));
    }

    #[tokio::test]
    async fn test_select_filters_orders_and_pages() {
        let store = catalogue();
        let query = Query::from(collections::PRODUCTS)
            .eq("active", true)
            .order("price", Direction::Asc)
            .page(1, 2);

        let rows = store.select(&query).await.unwrap();
        let ids: Vec<i64> = rows.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, [4, 1]);

        assert_eq!(store.count(&query).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_select_projects_columns() {
        let store = catalogue();
        let query = Query::from(collections::PRODUCTS)
            .select("id,name")
            .ilike("name", "*jacket*");

        let rows = store.select(&query).await.unwrap();
        assert_eq!(rows, [json!({"id": 2, "name": "Denim Jacket"})]);
    }

    #[tokio::test]
    async fn test_numeric_comparison_on_string_prices() {
        let store = catalogue();
        let query = Query::from(collections::PRODUCTS).filter("price", Op::Gte, json!(100));
        assert_eq!(store.count(&query).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_enforces_unique() {
        let store = MemoryStore::new();
        let first = store
            .insert(
                collections::NEWSLETTER_SUBSCRIBERS,
                json!({"email": "a@example.com"}),
            )
            .await
            .unwrap();
        assert_eq!(first["id"], json!(1));
        assert!(first.get("created_at").is_some());

        let dup = store
            .insert(
                collections::NEWSLETTER_SUBSCRIBERS,
                json!({"email": "a@example.com"}),
            )
            .await;
        assert!(matches!(dup, Err(DataStoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_unavailable_fails_every_operation() {
        let store = catalogue();
        store.set_unavailable(true);
        let query = Query::from(collections::PRODUCTS);
        assert!(matches!(
            store.select(&query).await,
            Err(DataStoreError::Unavailable(_))
        ));
        assert!(store.count(&query).await.is_err());
    }
}
