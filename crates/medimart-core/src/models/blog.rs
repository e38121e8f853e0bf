use serde::{Deserialize, Serialize};

use crate::collection::Collection;
use crate::error::Result;
use crate::models::{Meta, impl_document};
use crate::validation;

/// Health article, either written by hand or produced by the blog generator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiBlog {
    #[serde(flatten)]
    pub meta: Meta,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub generated: bool,
}

impl_document!(AiBlog, Collection::Blogs);

impl AiBlog {
    pub fn validate(&self) -> Result<()> {
        validation::require("title", &self.title)?;
        validation::require("content", &self.content)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}
