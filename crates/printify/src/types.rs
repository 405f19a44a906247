//! Response shapes for the Printify endpoints this client uses.
//!
//! Only the fields the workspace reads are typed. Unknown fields are
//! ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Shop {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub sales_channel: Option<String>,
}

/// A catalog product template, e.g. a t-shirt or mug.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Blueprint {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PrintProvider {
    pub id: u64,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Variant {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub options: Value,
}

/// Variants one provider offers for a blueprint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProviderVariants {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub variants: Vec<Variant>,
}

/// First provider with at least one variant, and that variant.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderVariant {
    pub provider_id: u64,
    pub variant: Variant,
}

/// Image position. Printify sends either a camera name such as
/// `"front"` or a number. Numbers sort before names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImagePosition {
    Index(i64),
    Name(String),
}

impl Default for ImagePosition {
    fn default() -> Self {
        Self::Index(0)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProductImage {
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub position: ImagePosition,
    #[serde(default)]
    pub variant_ids: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub images: Vec<ProductImage>,
}

/// Page wrapper returned by the shop product listing.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ProductPage {
    #[serde(default)]
    pub data: Vec<Product>,
}

/// A rendered product mockup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mockup {
    pub url: String,
    pub is_default: bool,
    pub position: ImagePosition,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct UploadedImage {
    pub id: String,
}
