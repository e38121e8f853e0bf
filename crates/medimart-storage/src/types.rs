//! Storage types: stored documents and the query model.

use medimart_core::Collection;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::error::StorageError;

/// A document as held by a backend.
///
/// `document` always carries `id`, `createdAt` and `updatedAt`, so it can be
/// returned to clients as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    pub collection: Collection,
    pub document: Value,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl StoredDocument {
    /// Deserializes the document into a typed model.
    pub fn to_model<T: DeserializeOwned>(&self) -> Result<T, StorageError> {
        T::deserialize(&self.document).map_err(|e| {
            StorageError::serialization(format!(
                "{} {} does not match its model: {e}",
                self.collection.label(),
                self.id
            ))
        })
    }

    pub fn into_model<T: DeserializeOwned>(self) -> Result<T, StorageError> {
        self.to_model()
    }
}

/// A single predicate over a (possibly dotted) field path.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Field equals the value. An array field matches when it contains it.
    Eq(String, Value),
    /// Field is absent or differs from the value.
    Ne(String, Value),
    /// Field equals any of the values.
    In(String, Vec<Value>),
    /// Case-insensitive substring match on a string field.
    Contains(String, String),
    /// Case-insensitive substring match on any of the fields.
    AnyContains(Vec<String>, String),
}

impl Filter {
    pub fn path(&self) -> Option<&str> {
        match self {
            Filter::Eq(p, _) | Filter::Ne(p, _) | Filter::In(p, _) | Filter::Contains(p, _) => {
                Some(p)
            }
            Filter::AnyContains(..) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub descending: bool,
}

/// Conjunctive query against one collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindQuery {
    pub filters: Vec<Filter>,
    pub sort: Vec<SortSpec>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl FindQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(field.into(), value.into()));
        self
    }

    #[must_use]
    pub fn ne(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Ne(field.into(), value.into()));
        self
    }

    #[must_use]
    pub fn one_of<V: Into<Value>>(
        mut self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.filters.push(Filter::In(
            field.into(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    #[must_use]
    pub fn contains(mut self, field: impl Into<String>, needle: impl Into<String>) -> Self {
        self.filters.push(Filter::Contains(field.into(), needle.into()));
        self
    }

    #[must_use]
    pub fn any_contains<S: Into<String>>(
        mut self,
        fields: impl IntoIterator<Item = S>,
        needle: impl Into<String>,
    ) -> Self {
        self.filters.push(Filter::AnyContains(
            fields.into_iter().map(Into::into).collect(),
            needle.into(),
        ));
        self
    }

    /// Adds the filter only when `value` is present.
    #[must_use]
    pub fn eq_opt(self, field: impl Into<String>, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(v) => self.eq(field, v),
            None => self,
        }
    }

    #[must_use]
    pub fn sort_asc(mut self, field: impl Into<String>) -> Self {
        self.sort.push(SortSpec {
            field: field.into(),
            descending: false,
        });
        self
    }

    #[must_use]
    pub fn sort_desc(mut self, field: impl Into<String>) -> Self {
        self.sort.push(SortSpec {
            field: field.into(),
            descending: true,
        });
        self
    }

    /// Newest documents first.
    #[must_use]
    pub fn newest_first(self) -> Self {
        self.sort_desc("createdAt")
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}
