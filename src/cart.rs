//! Cart lookup
//!
//! `GET /api/cart?user_id=<id>` returns the user's order lines, or the bare
//! JSON string `"Fail to get orders!"` when the backend has nothing to show.

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

const CART_PATH: &str = "/api/cart";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Degraded reply of the cart endpoint, sent with a success status
pub const ORDERS_UNAVAILABLE: &str = "Fail to get orders!";

#[derive(Debug, Error)]
pub enum CartError {
    #[error("{detail}")]
    Http { status: u16, detail: String },
    #[error("Server could not load the orders")]
    OrdersUnavailable,
    #[error("Unexpected cart data format")]
    UnexpectedShape,
    #[error("Cart request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// One row of the cart as returned by the backend
#[derive(Debug, Deserialize)]
struct CartItem {
    id: Option<i64>,
    product_name: Option<String>,
    quantity: Option<i64>,
    price: Option<Value>,
    total_amount: Option<Value>,
}

/// A cart row ready for display
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    /// 1-based row number
    pub position: usize,
    pub id: Option<i64>,
    pub name: String,
    pub quantity: Option<i64>,
    pub unit_price: Option<f64>,
}

impl CartLine {
    fn from_item(position: usize, item: CartItem) -> Self {
        let name = item
            .product_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| {
                let id = item.id.map_or_else(|| position.to_string(), |id| id.to_string());
                format!("Product {id}")
            });
        let unit_price = item
            .price
            .as_ref()
            .and_then(Value::as_f64)
            .or_else(|| item.total_amount.as_ref().and_then(Value::as_f64));

        Self {
            position,
            id: item.id,
            name,
            quantity: item.quantity,
            unit_price,
        }
    }

    /// Unit price in đồng, or `N/A` when the backend sent none
    pub fn display_price(&self) -> String {
        self.unit_price.map_or_else(|| "N/A".to_string(), format_vnd)
    }
}

pub struct CartClient {
    client: Client,
    endpoint: String,
}

impl CartClient {
    pub fn new(base_url: &str) -> Result<Self, CartError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}{CART_PATH}", base_url.trim_end_matches('/')),
        })
    }

    pub async fn fetch(&self, user_id: u64) -> Result<Vec<CartLine>, CartError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("user_id", user_id)])
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        tracing::debug!(user_id, status, "Cart response received");
        parse_cart_response(status, &body)
    }
}

/// Interpret a cart response
pub fn parse_cart_response(status: u16, body: &str) -> Result<Vec<CartLine>, CartError> {
    // The marker may come JSON-quoted or as a bare text body
    if body.trim() == ORDERS_UNAVAILABLE {
        tracing::warn!(status, "Cart endpoint returned the orders-unavailable marker");
        return Err(CartError::OrdersUnavailable);
    }

    let value: Option<Value> = serde_json::from_str(body).ok();

    if !(200..300).contains(&status) {
        let detail = match &value {
            Some(Value::String(s)) if s == ORDERS_UNAVAILABLE => {
                return Err(CartError::OrdersUnavailable)
            }
            Some(Value::Object(map)) => map.get("detail").and_then(Value::as_str).map(str::to_string),
            _ => None,
        };
        return Err(CartError::Http {
            status,
            detail: detail.unwrap_or_else(|| format!("HTTP error! status: {status}")),
        });
    }

    match value {
        Some(Value::Array(rows)) => {
            let items: Vec<CartItem> = serde_json::from_value(Value::Array(rows)).map_err(|e| {
                tracing::warn!(error = %e, "Cart rows have an unexpected shape");
                CartError::UnexpectedShape
            })?;
            Ok(items
                .into_iter()
                .enumerate()
                .map(|(index, item)| CartLine::from_item(index + 1, item))
                .collect())
        }
        Some(Value::String(s)) if s == ORDERS_UNAVAILABLE => {
            tracing::warn!("Cart endpoint returned the orders-unavailable marker");
            Err(CartError::OrdersUnavailable)
        }
        _ => Err(CartError::UnexpectedShape),
    }
}

/// Format an amount in Vietnamese đồng, e.g. `1.234.000 ₫`
#[allow(clippy::cast_possible_truncation)]
pub fn format_vnd(amount: f64) -> String {
    let rounded = amount.round() as i64;
    let digits = rounded.unsigned_abs().to_string();

    let mut out = String::with_capacity(digits.len() + 6);
    if rounded < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out.push_str(" ₫");
    out
}
