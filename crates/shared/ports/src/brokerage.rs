use async_trait::async_trait;
use bastion_core::{AccountSnapshot, OrderRequest, OrderStatus, Price, Quantity};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::BrokerResult;

/// Brokerage answer to an order submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitAck {
    pub success: bool,
    pub order_id: Option<String>,
    pub message: Option<String>,
    pub error_code: Option<String>,
}

/// Cumulative execution figures for one order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillDetails {
    pub filled_quantity: Quantity,
    pub avg_fill_price: Price,
    pub commission: Decimal,
}

/// Remote brokerage trading API
///
/// Only the fields the core consumes are modelled. Transport, auth and
/// session handling belong to the implementation.
#[async_trait]
pub trait BrokerageApi: Send + Sync {
    /// Send an order. Side, type, quantity, price, time-in-force and the
    /// client correlation id are taken from the request.
    async fn submit_order(&self, request: &OrderRequest) -> BrokerResult<SubmitAck>;

    /// Authoritative current status of an order
    async fn get_order_status(&self, order_id: &str) -> BrokerResult<OrderStatus>;

    /// Returns whether the brokerage accepted the cancel request
    async fn cancel_order(&self, order_id: &str) -> BrokerResult<bool>;

    async fn get_fill_details(&self, order_id: &str) -> BrokerResult<FillDetails>;

    async fn get_account_info(&self) -> BrokerResult<AccountSnapshot>;
}
