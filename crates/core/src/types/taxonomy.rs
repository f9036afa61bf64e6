//! Catalog taxonomy: attributes, terms, tags, categories and facets.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::id::{AttributeId, CategoryId, TagId, TermId};

/// A global product attribute (e.g. "Color").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: AttributeId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One allowed value of an attribute (e.g. "Red").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeTerm {
    pub id: TermId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A product tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub count: u64,
}

/// Case folding used wherever names are compared or keyed.
#[must_use]
pub fn fold_case(name: &str) -> String {
    name.to_lowercase()
}

impl Tag {
    /// Case-insensitive match against the tag's name or slug.
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        let name = fold_case(name);
        fold_case(&self.name) == name || fold_case(&self.slug) == name
    }
}

/// A product category. `parent == 0` marks a top-level category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub parent: u64,
    #[serde(default)]
    pub count: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Category {
    #[must_use]
    pub const fn is_top_level(&self) -> bool {
        self.parent == 0
    }
}

/// A filterable attribute and the terms a client can filter it by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facet {
    pub id: AttributeId,
    /// Lowercased attribute name.
    pub name: String,
    pub terms: Vec<FacetTerm>,
}

/// A `(termId, termName)` pair inside a facet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetTerm {
    pub id: TermId,
    pub name: String,
}

impl Facet {
    /// Build a facet from an attribute and its terms.
    #[must_use]
    pub fn from_attribute(attribute: &Attribute, terms: &[AttributeTerm]) -> Self {
        Self {
            id: attribute.id,
            name: fold_case(&attribute.name),
            terms: terms
                .iter()
                .map(|t| FacetTerm {
                    id: t.id,
                    name: t.name.clone(),
                })
                .collect(),
        }
    }
}
