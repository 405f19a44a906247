//! Printify client tests against a mock HTTP server.

use amp_printify::types::ImagePosition;
use amp_printify::{PrintifyApi, PrintifyConfig, PrintifyError};
use assert_matches::assert_matches;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api(server: &MockServer) -> PrintifyApi {
    PrintifyApi::new(PrintifyConfig::new("pf_test").with_base_url(server.uri())).unwrap()
}

// ---------------------------------------------------------------------------
// Test: catalog lookups
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shops_are_fetched_with_bearer_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/shops.json"))
        .and(header("Authorization", "Bearer pf_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 42, "title": "Main store", "sales_channel": "etsy"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let shops = api(&server).get_shops().await.unwrap();
    assert_eq!(shops.len(), 1);
    assert_eq!(shops[0].id, 42);
    assert_eq!(shops[0].sales_channel.as_deref(), Some("etsy"));
}

#[tokio::test]
async fn find_blueprint_matches_title_ignoring_case() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/catalog/blueprints.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 5, "title": "Unisex Heavy Cotton Tee"},
            {"id": 68, "title": "Mug 11oz"},
        ])))
        .mount(&server)
        .await;

    let api = api(&server);
    assert_eq!(api.find_blueprint("MUG").await.unwrap(), 68);
    assert_matches!(
        api.find_blueprint("poster").await,
        Err(PrintifyError::NotFound(what)) if what.contains("poster")
    );
}

#[tokio::test]
async fn provider_and_variant_skips_providers_without_variants() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/catalog/blueprints/68/print_providers.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "title": "Empty Prints"},
            {"id": 2, "title": "Good Prints"},
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/catalog/blueprints/68/print_providers/1/variants.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": 1, "variants": []})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/catalog/blueprints/68/print_providers/2/variants.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 2,
            "title": "Good Prints",
            "variants": [
                {"id": 33719, "title": "11oz", "options": {"size": "11oz"}},
                {"id": 33720, "title": "15oz"},
            ]
        })))
        .mount(&server)
        .await;

    let chosen = api(&server).get_provider_and_variant(68).await.unwrap();
    assert_eq!(chosen.provider_id, 2);
    assert_eq!(chosen.variant.id, 33719);
    assert_eq!(chosen.variant.options["size"], "11oz");
}

#[tokio::test]
async fn no_provider_with_variants_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/catalog/blueprints/9/print_providers.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    assert_matches!(
        api(&server).get_provider_and_variant(9).await,
        Err(PrintifyError::NotFound(_))
    );
}

// ---------------------------------------------------------------------------
// Test: products
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_then_publish_product() {
    let server = MockServer::start().await;
    let product = json!({
        "title": "Sunset mug",
        "blueprint_id": 68,
        "print_provider_id": 2,
        "variants": [{"id": 33719, "price": 1499, "is_enabled": true}],
    });
    Mock::given(method("POST"))
        .and(path("/shops/42/products.json"))
        .and(body_json(&product))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "prod-1",
            "title": "Sunset mug",
            "tags": ["mug"],
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/shops/42/products/prod-1/publish.json"))
        .and(body_json(json!({
            "title": true,
            "description": true,
            "images": true,
            "variants": true,
            "tags": true,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let api = api(&server);
    let created = api.create_product(42, &product).await.unwrap();
    assert_eq!(created.id, "prod-1");
    assert_eq!(created.tags, vec!["mug"]);
    api.publish_product(42, &created.id).await.unwrap();
}

#[tokio::test]
async fn shop_products_cap_page_size() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/shops/42/products.json"))
        .and(query_param("limit", "50"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "current_page": 2,
            "data": [{"id": "a"}, {"id": "b"}],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let products = api(&server).get_shop_products(42, 500, 2).await.unwrap();
    let ids: Vec<&str> = products.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[tokio::test]
async fn mockups_are_sorted_and_skip_empty_sources() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/shops/42/products/prod-1.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "prod-1",
            "images": [
                {"src": "http://img/3.png", "position": 3},
                {"src": "", "position": 0},
                {"src": "http://img/1.png", "position": 1, "is_default": true},
            ]
        })))
        .mount(&server)
        .await;

    let api = api(&server);
    let mockups = api.get_product_mockups(42, "prod-1").await.unwrap();
    let urls: Vec<&str> = mockups.iter().map(|m| m.url.as_str()).collect();
    assert_eq!(urls, vec!["http://img/1.png", "http://img/3.png"]);
    assert!(mockups[0].is_default);
    assert_eq!(mockups[1].position, ImagePosition::Index(3));

    assert_eq!(
        api.get_product_mockup(42, "prod-1").await.unwrap().as_deref(),
        Some("http://img/3.png")
    );
}

// ---------------------------------------------------------------------------
// Test: uploads and errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upload_sends_base64_contents() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/uploads/images.json"))
        .and(body_json(json!({"file_name": "art.png", "contents": "aGVsbG8="})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "up-9",
            "file_name": "art.png",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let id = api(&server).upload_image(b"hello", "art.png").await.unwrap();
    assert_eq!(id, "up-9");
}

#[tokio::test]
async fn api_errors_carry_status_and_truncated_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/shops.json"))
        .respond_with(ResponseTemplate::new(401).set_body_string("x".repeat(500)))
        .mount(&server)
        .await;

    assert_matches!(
        api(&server).get_shops().await,
        Err(PrintifyError::Api { status: 401, body }) if body.len() == 200
    );
}

#[tokio::test]
async fn malformed_json_is_a_request_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/shops.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    assert_matches!(api(&server).get_shops().await, Err(PrintifyError::Request(_)));
}
