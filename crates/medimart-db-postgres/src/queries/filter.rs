//! Translation of [`FindQuery`] into SQL over the `documents` table.
//!
//! The generated SQL keeps the semantics of `medimart_storage::eval`:
//! equality on an array field means membership, a missing field equals
//! `null`, and missing sort keys come last in both directions.

use medimart_core::Collection;
use medimart_storage::{Filter, FindQuery, SortSpec};
use serde_json::{Map, Value};

/// A positional parameter collected while building a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Bind {
    Text(String),
    Path(Vec<String>),
    Json(Value),
    Int(i64),
}

/// Accumulates SQL text and its parameters.
#[derive(Debug, Default)]
pub struct SqlBuilder {
    binds: Vec<Bind>,
}

impl SqlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a parameter and returns its placeholder.
    pub fn push(&mut self, bind: Bind) -> String {
        self.binds.push(bind);
        format!("${}", self.binds.len())
    }

    fn path(&mut self, dotted: &str) -> String {
        let p = self.push(Bind::Path(split_path(dotted)));
        format!("{p}::text[]")
    }

    pub fn into_binds(self) -> Vec<Bind> {
        self.binds
    }
}

fn split_path(dotted: &str) -> Vec<String> {
    dotted.split('.').map(str::to_string).collect()
}

/// Builds `{"a": {"b": value}}` for the path `a.b`.
fn nest(dotted: &str, value: Value) -> Value {
    dotted.rsplit('.').fold(value, |inner, key| {
        let mut obj = Map::new();
        obj.insert(key.to_string(), inner);
        Value::Object(obj)
    })
}

/// Escapes LIKE metacharacters so the needle matches literally.
pub fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn eq_clause(b: &mut SqlBuilder, path: &str, expected: &Value) -> String {
    match expected {
        Value::Null => {
            let p = b.path(path);
            format!("(resource #> {p} IS NULL OR resource #> {p} = 'null'::jsonb)")
        }
        Value::Array(_) | Value::Object(_) => {
            let p = b.path(path);
            let v = b.push(Bind::Json(expected.clone()));
            format!("(resource #> {p} = {v})")
        }
        scalar => {
            let plain = b.push(Bind::Json(nest(path, scalar.clone())));
            let member = b.push(Bind::Json(nest(path, Value::Array(vec![scalar.clone()]))));
            format!("(resource @> {plain} OR resource @> {member})")
        }
    }
}

fn contains_clause(b: &mut SqlBuilder, path: &str, needle: &str) -> String {
    let p = b.path(path);
    let pat = b.push(Bind::Text(like_pattern(needle)));
    format!(
        "(CASE jsonb_typeof(resource #> {p}) \
         WHEN 'string' THEN (resource #>> {p}) ILIKE {pat} \
         WHEN 'array' THEN EXISTS (SELECT 1 FROM jsonb_array_elements(resource #> {p}) e \
         WHERE jsonb_typeof(e) = 'string' AND (e #>> '{{}}') ILIKE {pat}) \
         ELSE false END)"
    )
}

fn filter_clause(b: &mut SqlBuilder, filter: &Filter) -> String {
    match filter {
        Filter::Eq(path, v) => eq_clause(b, path, v),
        Filter::Ne(path, v) => format!("NOT {}", eq_clause(b, path, v)),
        Filter::In(_, values) if values.is_empty() => "FALSE".to_string(),
        Filter::In(path, values) => {
            let parts: Vec<String> = values.iter().map(|v| eq_clause(b, path, v)).collect();
            format!("({})", parts.join(" OR "))
        }
        Filter::Contains(path, needle) => contains_clause(b, path, needle),
        Filter::AnyContains(paths, _) if paths.is_empty() => "FALSE".to_string(),
        Filter::AnyContains(paths, needle) => {
            let parts: Vec<String> = paths.iter().map(|p| contains_clause(b, p, needle)).collect();
            format!("({})", parts.join(" OR "))
        }
    }
}

/// `WHERE` clause restricted to one collection.
pub fn where_clause(b: &mut SqlBuilder, collection: Collection, query: &FindQuery) -> String {
    let c = b.push(Bind::Text(collection.as_str().to_string()));
    let mut clauses = vec![format!("collection = {c}")];
    clauses.extend(query.filters.iter().map(|f| filter_clause(b, f)));
    format!("WHERE {}", clauses.join(" AND "))
}

fn order_clause(b: &mut SqlBuilder, sort: &[SortSpec]) -> String {
    if sort.is_empty() {
        return "ORDER BY created_at, id".to_string();
    }
    let mut keys: Vec<String> = sort
        .iter()
        .map(|s| {
            let p = b.path(&s.field);
            let dir = if s.descending { "DESC" } else { "ASC" };
            format!("NULLIF(resource #> {p}, 'null'::jsonb) {dir} NULLS LAST")
        })
        .collect();
    keys.push("id".to_string());
    format!("ORDER BY {}", keys.join(", "))
}

/// Full `SELECT` for a find.
pub fn select_sql(collection: Collection, query: &FindQuery) -> (String, Vec<Bind>) {
    let mut b = SqlBuilder::new();
    let filter = where_clause(&mut b, collection, query);
    let order = order_clause(&mut b, &query.sort);
    let mut sql = format!(
        "SELECT id, resource, created_at, updated_at FROM documents {filter} {order}"
    );
    if let Some(limit) = query.limit {
        let l = b.push(Bind::Int(i64::try_from(limit).unwrap_or(i64::MAX)));
        sql.push_str(&format!(" LIMIT {l}"));
    }
    if query.offset > 0 {
        let o = b.push(Bind::Int(i64::try_from(query.offset).unwrap_or(i64::MAX)));
        sql.push_str(&format!(" OFFSET {o}"));
    }
    (sql, b.into_binds())
}

pub fn count_sql(collection: Collection, query: &FindQuery) -> (String, Vec<Bind>) {
    let mut b = SqlBuilder::new();
    let filter = where_clause(&mut b, collection, query);
    (format!("SELECT COUNT(*) FROM documents {filter}"), b.into_binds())
}
