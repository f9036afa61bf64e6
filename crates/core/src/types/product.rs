//! Catalog product records.
//!
//! A [`Product`] keeps the handful of fields the query engine reads as typed
//! values and carries every other upstream field through untouched, so
//! responses look exactly like the upstream documents they came from.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::id::{AttributeId, CategoryId, ProductId, TagId, VariationId};
use super::price::positive_amount;
use super::taxonomy::fold_case;

/// A catalog product as fetched from upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    #[serde(default)]
    pub name: String,
    /// Creation time in the store's local timezone.
    #[serde(default)]
    pub date_created: Option<NaiveDateTime>,
    /// Generic current price.
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub regular_price: String,
    #[serde(default)]
    pub sale_price: String,
    /// Upstream's own on-sale flag. The engine derives sale status from the
    /// prices instead, see [`Product::is_discounted`].
    #[serde(default)]
    pub on_sale: bool,
    #[serde(default)]
    pub attributes: Vec<ProductAttribute>,
    #[serde(default)]
    pub categories: Vec<CategoryRef>,
    #[serde(default)]
    pub tags: Vec<TagRef>,
    #[serde(default)]
    pub variations: Vec<VariationId>,
    /// Remaining upstream fields, re-emitted verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An attribute attached to a product.
///
/// Product-level attributes list their values in `options`; variation-style
/// attributes carry a single `option` string instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductAttribute {
    pub id: AttributeId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A category reference embedded in a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: CategoryId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

/// A tag reference embedded in a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRef {
    pub id: TagId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

impl Product {
    /// The price used for sorting: sale price when positive, else regular
    /// price when positive, else the generic price, else zero.
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        positive_amount(&self.sale_price)
            .or_else(|| positive_amount(&self.regular_price))
            .or_else(|| positive_amount(&self.price))
            .unwrap_or(Decimal::ZERO)
    }

    /// Whether the product is actually discounted: a positive sale price
    /// below the regular price.
    #[must_use]
    pub fn is_discounted(&self) -> bool {
        match (
            positive_amount(&self.sale_price),
            positive_amount(&self.regular_price),
        ) {
            (Some(sale), Some(regular)) => sale < regular,
            _ => false,
        }
    }

    /// Whether the product is listed in the given category.
    #[must_use]
    pub fn in_category(&self, category: CategoryId) -> bool {
        self.categories.iter().any(|c| c.id == category)
    }

    /// Whether the product carries the given tag.
    #[must_use]
    pub fn has_tag(&self, tag: TagId) -> bool {
        self.tags.iter().any(|t| t.id == tag)
    }

    /// Whether the product has attribute `attribute` with a value matching
    /// `term` (case-insensitive).
    #[must_use]
    pub fn matches_attribute(&self, attribute: AttributeId, term: &str) -> bool {
        let term = fold_case(term);
        self.attributes
            .iter()
            .filter(|a| a.id == attribute)
            .any(|a| a.matches_term(&term))
    }
}

impl ProductAttribute {
    /// Match a term already passed through [`fold_case`].
    ///
    /// List options must equal the term; a single-string option matches by
    /// substring containment.
    #[must_use]
    pub fn matches_term(&self, folded_term: &str) -> bool {
        if self
            .options
            .iter()
            .any(|o| fold_case(o) == folded_term)
        {
            return true;
        }
        self.option
            .as_ref()
            .is_some_and(|o| fold_case(o).contains(folded_term))
    }
}
