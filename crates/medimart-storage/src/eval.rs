//! In-process evaluation of [`FindQuery`] against JSON documents.
//!
//! The memory backend runs queries entirely through these functions. The
//! PostgreSQL backend translates the same query model to SQL and must keep
//! the semantics here.

use std::cmp::Ordering;

use serde_json::Value;

use crate::types::{Filter, FindQuery, SortSpec, StoredDocument};

/// Resolves a dotted path such as `feedback.rating`.
pub fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |v, key| v.get(key))
}

fn contains_ci(haystack: Option<&Value>, needle_lower: &str) -> bool {
    match haystack {
        Some(Value::String(s)) => s.to_lowercase().contains(needle_lower),
        Some(Value::Array(items)) => items
            .iter()
            .any(|v| matches!(v, Value::String(s) if s.to_lowercase().contains(needle_lower))),
        _ => false,
    }
}

fn equals(field: Option<&Value>, expected: &Value) -> bool {
    match field {
        Some(Value::Array(items)) if !expected.is_array() => items.contains(expected),
        Some(v) => v == expected,
        None => expected.is_null(),
    }
}

impl Filter {
    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Filter::Eq(path, expected) => equals(lookup(doc, path), expected),
            Filter::Ne(path, expected) => !equals(lookup(doc, path), expected),
            Filter::In(path, values) => {
                let field = lookup(doc, path);
                values.iter().any(|v| equals(field, v))
            }
            Filter::Contains(path, needle) => {
                contains_ci(lookup(doc, path), &needle.to_lowercase())
            }
            Filter::AnyContains(paths, needle) => {
                let needle = needle.to_lowercase();
                paths.iter().any(|p| contains_ci(lookup(doc, p), &needle))
            }
        }
    }
}

impl FindQuery {
    pub fn matches(&self, doc: &Value) -> bool {
        self.filters.iter().all(|f| f.matches(doc))
    }
}

fn compare_present(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

/// Orders two documents by the sort keys. Missing values sort last in both
/// directions.
pub fn compare(a: &Value, b: &Value, sort: &[SortSpec]) -> Ordering {
    for spec in sort {
        let x = lookup(a, &spec.field).filter(|v| !v.is_null());
        let y = lookup(b, &spec.field).filter(|v| !v.is_null());
        let ord = match (x, y) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(x), Some(y)) => {
                let ord = compare_present(x, y);
                if spec.descending { ord.reverse() } else { ord }
            }
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Filters, sorts and pages a set of documents.
pub fn apply(query: &FindQuery, docs: impl IntoIterator<Item = StoredDocument>) -> Vec<StoredDocument> {
    let mut matched: Vec<StoredDocument> = docs
        .into_iter()
        .filter(|d| query.matches(&d.document))
        .collect();
    if query.sort.is_empty() {
        // Stable default order for backends without one: oldest first.
        matched.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    } else {
        matched.sort_by(|a, b| {
            compare(&a.document, &b.document, &query.sort).then_with(|| a.id.cmp(&b.id))
        });
    }
    let iter = matched.into_iter().skip(query.offset);
    match query.limit {
        Some(limit) => iter.take(limit).collect(),
        None => iter.collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medimart_core::Collection;
    use serde_json::json;
    use time::OffsetDateTime;

    fn stored(id: &str, doc: Value, secs: i64) -> StoredDocument {
        let at = OffsetDateTime::from_unix_timestamp(secs).unwrap();
        StoredDocument {
            id: id.into(),
            collection: Collection::Doctors,
            document: doc,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn dotted_lookup() {
        let doc = json!({"feedback": {"rating": 4}});
        assert_eq!(lookup(&doc, "feedback.rating"), Some(&json!(4)));
        assert_eq!(lookup(&doc, "feedback.comment"), None);
    }

    #[test]
    fn eq_matches_array_membership() {
        let doc = json!({"tags": ["diet", "sleep"]});
        assert!(Filter::Eq("tags".into(), json!("sleep")).matches(&doc));
        assert!(!Filter::Eq("tags".into(), json!("yoga")).matches(&doc));
    }

    #[test]
    fn ne_treats_missing_as_different() {
        let doc = json!({"status": "pending"});
        assert!(Filter::Ne("status".into(), json!("cancelled")).matches(&doc));
        assert!(Filter::Ne("other".into(), json!("cancelled")).matches(&doc));
        assert!(!Filter::Ne("status".into(), json!("pending")).matches(&doc));
    }

    #[test]
    fn contains_is_case_insensitive() {
        let doc = json!({"name": "Dr. Anita Sharma", "specialization": "Cardiology"});
        assert!(Filter::Contains("name".into(), "anita".into()).matches(&doc));
        assert!(
            Filter::AnyContains(vec!["name".into(), "specialization".into()], "CARDIO".into())
                .matches(&doc)
        );
        assert!(!Filter::Contains("name".into(), "rao".into()).matches(&doc));
    }

    #[test]
    fn in_matches_any_value() {
        let doc = json!({"status": "confirmed"});
        assert!(
            Filter::In("status".into(), vec![json!("pending"), json!("confirmed")]).matches(&doc)
        );
    }

    #[test]
    fn sort_and_page() {
        let docs = vec![
            stored("a", json!({"name": "Zed", "fees": 300}), 1),
            stored("b", json!({"name": "Amy", "fees": 500}), 2),
            stored("c", json!({"name": "Kay"}), 3),
        ];
        let q = FindQuery::new().sort_desc("fees");
        let ids: Vec<_> = apply(&q, docs.clone()).into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);

        let q = FindQuery::new().sort_asc("name").offset(1).limit(1);
        let ids: Vec<_> = apply(&q, docs.clone()).into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["c"]);

        let ids: Vec<_> = apply(&FindQuery::new(), docs).into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
