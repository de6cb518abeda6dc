use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{OrderStatus, OrderType, Side, TimeInForce};
use crate::values::{Price, Quantity, Symbol};

/// Brokerage-assigned order identifier
pub type OrderId = String;

/// An order as the caller asks for it, before the brokerage has seen it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Quantity,
    /// Required for Limit and StopLimit orders
    pub price: Option<Price>,
    pub time_in_force: TimeInForce,
    /// Correlation id echoed back by the brokerage
    pub client_order_id: String,
}

impl OrderRequest {
    pub fn market(symbol: impl Into<Symbol>, side: Side, quantity: Quantity) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Market,
            quantity,
            price: None,
            time_in_force: TimeInForce::Day,
            client_order_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn limit(symbol: impl Into<Symbol>, side: Side, quantity: Quantity, price: Price) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Limit,
            quantity,
            price: Some(price),
            time_in_force: TimeInForce::Day,
            client_order_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_time_in_force(mut self, time_in_force: TimeInForce) -> Self {
        self.time_in_force = time_in_force;
        self
    }

    pub fn with_client_order_id(mut self, client_order_id: impl Into<String>) -> Self {
        self.client_order_id = client_order_id.into();
        self
    }

    /// Local sanity checks that need no network round trip
    pub fn validate(&self) -> Result<(), RequestInvalid> {
        if self.symbol.trim().is_empty() {
            return Err(RequestInvalid::EmptySymbol);
        }
        if self.quantity <= 0 {
            return Err(RequestInvalid::NonPositiveQuantity(self.quantity));
        }
        match self.price {
            Some(price) if price <= Decimal::ZERO => Err(RequestInvalid::NonPositivePrice(price)),
            None if self.order_type.requires_price() => {
                Err(RequestInvalid::MissingPrice(self.order_type))
            }
            _ => Ok(()),
        }
    }
}

/// Why an [`OrderRequest`] failed local validation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RequestInvalid {
    #[error("symbol is empty")]
    EmptySymbol,

    #[error("quantity must be positive, got {0}")]
    NonPositiveQuantity(Quantity),

    #[error("price must be positive, got {0}")]
    NonPositivePrice(Price),

    #[error("{0:?} order requires a limit price")]
    MissingPrice(OrderType),
}

/// Illegal lifecycle edge; the order is left unchanged
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal order transition {from} -> {to}")]
pub struct TransitionError {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

/// Locally tracked order. Only status and fill fields change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub client_order_id: String,
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Quantity,
    pub limit_price: Option<Price>,
    pub time_in_force: TimeInForce,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Cumulative executed shares
    pub filled_quantity: Quantity,
    /// Average price across all executed shares
    pub avg_fill_price: Option<Price>,
    /// Cumulative commission reported by the brokerage
    pub commission: Decimal,
}

impl Order {
    /// Create the local `Pending` record for an accepted request
    pub fn from_request(id: impl Into<OrderId>, request: &OrderRequest, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            client_order_id: request.client_order_id.clone(),
            symbol: request.symbol.clone(),
            side: request.side,
            order_type: request.order_type,
            quantity: request.quantity,
            limit_price: request.price,
            time_in_force: request.time_in_force,
            status: OrderStatus::Pending,
            created_at: timestamp,
            updated_at: timestamp,
            filled_quantity: 0,
            avg_fill_price: None,
            commission: Decimal::ZERO,
        }
    }

    /// Move to `next` if the lifecycle allows it.
    ///
    /// Returns `Ok(false)` when already in `next`.
    pub fn transition(&mut self, next: OrderStatus, at: DateTime<Utc>) -> Result<bool, TransitionError> {
        if self.status == next {
            return Ok(false);
        }
        if !self.status.can_transition_to(next) {
            return Err(TransitionError {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = at;
        Ok(true)
    }

    /// Record cumulative fill figures. Stale (smaller) reports are ignored.
    ///
    /// Returns the newly executed shares.
    pub fn record_fill(
        &mut self,
        cumulative_quantity: Quantity,
        avg_fill_price: Price,
        cumulative_commission: Decimal,
        at: DateTime<Utc>,
    ) -> Quantity {
        if cumulative_quantity <= self.filled_quantity {
            return 0;
        }
        let delta = cumulative_quantity - self.filled_quantity;
        self.filled_quantity = cumulative_quantity;
        self.avg_fill_price = Some(avg_fill_price);
        self.commission = cumulative_commission;
        self.updated_at = at;
        delta
    }

    /// Returns remaining quantity to be filled
    pub fn remaining_quantity(&self) -> Quantity {
        (self.quantity - self.filled_quantity).max(0)
    }

    /// Returns true if the order is completely filled
    pub fn is_filled(&self) -> bool {
        self.filled_quantity >= self.quantity
    }
}
