//! Storefront backend API client

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use crate::domain::aggregates::{OrderRequest, Product};

pub const PRODUCT_LIST_PATH: &str = "api/productlist";
pub const SEND_ORDER_PATH: &str = "api/send-order-email";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {status} from {url}")]
    Status { status: StatusCode, url: String },
    #[error("invalid endpoint url: {0}")]
    Url(#[from] url::ParseError),
}

/// The two backend calls the storefront makes.
#[allow(async_fn_in_trait)]
pub trait StorefrontApi {
    async fn fetch_products(&self) -> Result<Vec<Product>, ApiError>;
    async fn submit_order(&self, order: &OrderRequest, reference: Uuid) -> Result<(), ApiError>;
}

/// `StorefrontApi` over HTTP.
#[derive(Clone, Debug)]
pub struct HttpApi {
    client: reqwest::Client,
    products_url: Url,
    orders_url: Url,
}

impl HttpApi {
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Self::with_client(client, base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &Url) -> Result<Self, ApiError> {
        let mut base = base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { client, products_url: base.join(PRODUCT_LIST_PATH)?, orders_url: base.join(SEND_ORDER_PATH)? })
    }

    pub fn products_url(&self) -> &Url { &self.products_url }
    pub fn orders_url(&self) -> &Url { &self.orders_url }
}

fn ensure_success(status: StatusCode, url: &Url) -> Result<(), ApiError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(ApiError::Status { status, url: url.to_string() })
    }
}

impl StorefrontApi for HttpApi {
    async fn fetch_products(&self) -> Result<Vec<Product>, ApiError> {
        debug!(url = %self.products_url, "fetching product list");
        let response = self.client.get(self.products_url.clone()).send().await?;
        ensure_success(response.status(), &self.products_url)?;
        Ok(response.json::<Vec<Product>>().await?)
    }

    async fn submit_order(&self, order: &OrderRequest, reference: Uuid) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.orders_url.clone())
            .header(REQUEST_ID_HEADER, reference.to_string())
            .json(order)
            .send()
            .await?;
        ensure_success(response.status(), &self.orders_url)?;
        info!(%reference, items = order.items.len(), "order accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_urls() {
        let api = HttpApi::with_client(reqwest::Client::new(), &Url::parse("http://localhost:5000").unwrap()).unwrap();
        assert_eq!(api.products_url().as_str(), "http://localhost:5000/api/productlist");
        assert_eq!(api.orders_url().as_str(), "http://localhost:5000/api/send-order-email");
    }

    #[test]
    fn test_endpoint_urls_keep_base_path() {
        let api = HttpApi::with_client(reqwest::Client::new(), &Url::parse("https://shop.example.com/store").unwrap()).unwrap();
        assert_eq!(api.products_url().as_str(), "https://shop.example.com/store/api/productlist");
    }
}
