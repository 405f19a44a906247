//! HTTP client for the Printify REST endpoints.
//!
//! Every call is authenticated with `Authorization: Bearer <token>` and
//! bounded by the configured request timeout.

use amp_core::text::{contains_ignore_case, truncate_body};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::config::PrintifyConfig;
use crate::error::PrintifyError;
use crate::types::{
    Blueprint, Mockup, PrintProvider, Product, ProductPage, ProviderVariant, ProviderVariants,
    Shop, UploadedImage,
};

/// Largest page size the product listing accepts.
pub const MAX_PAGE_SIZE: u32 = 50;

/// HTTP client for one Printify account.
pub struct PrintifyApi {
    client: reqwest::Client,
    config: PrintifyConfig,
}

impl PrintifyApi {
    pub fn new(config: PrintifyConfig) -> Result<Self, PrintifyError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    /// Reuse an existing [`reqwest::Client`]. Its own timeout settings
    /// are replaced per request by the configured one.
    pub fn with_client(client: reqwest::Client, config: PrintifyConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &PrintifyConfig {
        &self.config
    }

    // ---- catalog ----

    /// `GET /shops.json`
    pub async fn get_shops(&self) -> Result<Vec<Shop>, PrintifyError> {
        self.get("shops.json", &[]).await
    }

    /// `GET /catalog/blueprints.json`
    pub async fn get_blueprints(&self) -> Result<Vec<Blueprint>, PrintifyError> {
        self.get("catalog/blueprints.json", &[]).await
    }

    /// Id of the first blueprint whose title contains `product_type`,
    /// ignoring case.
    pub async fn find_blueprint(&self, product_type: &str) -> Result<u64, PrintifyError> {
        self.get_blueprints()
            .await?
            .into_iter()
            .find(|bp| contains_ignore_case(&bp.title, product_type))
            .map(|bp| bp.id)
            .ok_or_else(|| PrintifyError::NotFound(format!("blueprint for '{product_type}'")))
    }

    pub async fn get_print_providers(
        &self,
        blueprint_id: u64,
    ) -> Result<Vec<PrintProvider>, PrintifyError> {
        self.get(
            &format!("catalog/blueprints/{blueprint_id}/print_providers.json"),
            &[],
        )
        .await
    }

    pub async fn get_variants(
        &self,
        blueprint_id: u64,
        provider_id: u64,
    ) -> Result<ProviderVariants, PrintifyError> {
        self.get(
            &format!(
                "catalog/blueprints/{blueprint_id}/print_providers/{provider_id}/variants.json"
            ),
            &[],
        )
        .await
    }

    /// Walk the blueprint's providers in order and return the first one
    /// offering any variant, together with its first variant.
    pub async fn get_provider_and_variant(
        &self,
        blueprint_id: u64,
    ) -> Result<ProviderVariant, PrintifyError> {
        for provider in self.get_print_providers(blueprint_id).await? {
            let variants = self.get_variants(blueprint_id, provider.id).await?;
            if let Some(variant) = variants.variants.into_iter().next() {
                tracing::debug!(
                    blueprint_id,
                    provider_id = provider.id,
                    variant_id = variant.id,
                    "Selected print provider",
                );
                return Ok(ProviderVariant {
                    provider_id: provider.id,
                    variant,
                });
            }
        }
        Err(PrintifyError::NotFound(format!(
            "provider or variant for blueprint {blueprint_id}"
        )))
    }

    // ---- products ----

    /// `POST /shops/{shop_id}/products.json` with a full product body.
    pub async fn create_product(
        &self,
        shop_id: u64,
        product: &Value,
    ) -> Result<Product, PrintifyError> {
        let created: Product = self
            .post(&format!("shops/{shop_id}/products.json"), product)
            .await?;
        tracing::info!(shop_id, product_id = %created.id, "Printify product created");
        Ok(created)
    }

    /// Publish a product with its title, description, images, variants
    /// and tags.
    pub async fn publish_product(
        &self,
        shop_id: u64,
        product_id: &str,
    ) -> Result<Value, PrintifyError> {
        let body = json!({
            "title": true,
            "description": true,
            "images": true,
            "variants": true,
            "tags": true,
        });
        let response = self
            .post(
                &format!("shops/{shop_id}/products/{product_id}/publish.json"),
                &body,
            )
            .await?;
        tracing::info!(shop_id, product_id, "Printify product published");
        Ok(response)
    }

    /// One page of a shop's products. `limit` is capped at
    /// [`MAX_PAGE_SIZE`].
    pub async fn get_shop_products(
        &self,
        shop_id: u64,
        limit: u32,
        page: u32,
    ) -> Result<Vec<Product>, PrintifyError> {
        let query = [
            ("limit", limit.min(MAX_PAGE_SIZE).to_string()),
            ("page", page.max(1).to_string()),
        ];
        let page: ProductPage = self
            .get(&format!("shops/{shop_id}/products.json"), &query)
            .await?;
        Ok(page.data)
    }

    pub async fn get_product(&self, shop_id: u64, product_id: &str) -> Result<Product, PrintifyError> {
        self.get(&format!("shops/{shop_id}/products/{product_id}.json"), &[])
            .await
    }

    /// Every mockup image of a product, sorted by position. Images
    /// without a source URL are skipped.
    pub async fn get_product_mockups(
        &self,
        shop_id: u64,
        product_id: &str,
    ) -> Result<Vec<Mockup>, PrintifyError> {
        let product = self.get_product(shop_id, product_id).await?;
        let mut mockups: Vec<Mockup> = product
            .images
            .into_iter()
            .filter(|img| !img.src.is_empty())
            .map(|img| Mockup {
                url: img.src,
                is_default: img.is_default,
                position: img.position,
            })
            .collect();
        mockups.sort_by(|a, b| a.position.cmp(&b.position));
        Ok(mockups)
    }

    /// URL of the product's main mockup, the first image Printify lists.
    pub async fn get_product_mockup(
        &self,
        shop_id: u64,
        product_id: &str,
    ) -> Result<Option<String>, PrintifyError> {
        let product = self.get_product(shop_id, product_id).await?;
        Ok(product
            .images
            .into_iter()
            .map(|img| img.src)
            .find(|src| !src.is_empty()))
    }

    // ---- uploads ----

    /// Upload raw image bytes and return the upload id.
    pub async fn upload_image(&self, bytes: &[u8], file_name: &str) -> Result<String, PrintifyError> {
        let body = json!({
            "file_name": file_name,
            "contents": BASE64.encode(bytes),
        });
        let uploaded: UploadedImage = self.post("uploads/images.json", &body).await?;
        tracing::info!(file_name, upload_id = %uploaded.id, size = bytes.len(), "Image uploaded to Printify");
        Ok(uploaded.id)
    }

    // ---- private helpers ----

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.config.base_url, endpoint.trim_start_matches('/'))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, PrintifyError> {
        let response = self
            .client
            .get(self.url(endpoint))
            .bearer_auth(&self.config.api_token)
            .timeout(self.config.request_timeout)
            .query(query)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &Value,
    ) -> Result<T, PrintifyError> {
        let response = self
            .client
            .post(self.url(endpoint))
            .bearer_auth(&self.config.api_token)
            .timeout(self.config.request_timeout)
            .json(body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Return the response unchanged on success, or an
    /// [`PrintifyError::Api`] with the status and truncated body.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, PrintifyError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(PrintifyError::Api {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }
        Ok(response)
    }

    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, PrintifyError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}
