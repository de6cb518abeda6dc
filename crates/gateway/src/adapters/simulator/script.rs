use bastion_core::{OrderStatus, Quantity};
use rust_decimal::Decimal;

use crate::messages::order::{FillDetailsResponse, OrderStatusResponse};

/// One scripted brokerage answer to a status query.
///
/// Fill figures are cumulative for the order, as the brokerage reports them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptStep {
    pub status: String,
    pub filled_quantity: Quantity,
    pub avg_fill_price: Decimal,
    pub commission: Decimal,
}

impl ScriptStep {
    pub fn new(status: OrderStatus, filled_quantity: Quantity, avg_fill_price: Decimal) -> Self {
        Self {
            status: status.as_str().to_string(),
            filled_quantity,
            avg_fill_price,
            commission: Decimal::ZERO,
        }
    }

    pub fn pending() -> Self {
        Self::new(OrderStatus::Pending, 0, Decimal::ZERO)
    }

    pub fn partial(filled_quantity: Quantity, avg_fill_price: Decimal) -> Self {
        Self::new(OrderStatus::PartiallyFilled, filled_quantity, avg_fill_price)
    }

    pub fn filled(filled_quantity: Quantity, avg_fill_price: Decimal) -> Self {
        Self::new(OrderStatus::Filled, filled_quantity, avg_fill_price)
    }

    pub fn cancelled(filled_quantity: Quantity, avg_fill_price: Decimal) -> Self {
        Self::new(OrderStatus::Cancelled, filled_quantity, avg_fill_price)
    }

    pub fn rejected() -> Self {
        Self::new(OrderStatus::Rejected, 0, Decimal::ZERO)
    }

    /// Raw status string, for exercising unknown wire values
    pub fn raw(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            filled_quantity: 0,
            avg_fill_price: Decimal::ZERO,
            commission: Decimal::ZERO,
        }
    }

    pub fn with_commission(mut self, commission: Decimal) -> Self {
        self.commission = commission;
        self
    }

    pub(crate) fn is_terminal(&self) -> bool {
        self.status
            .parse::<OrderStatus>()
            .map(|s| s.is_terminal())
            .unwrap_or(false)
    }

    pub(crate) fn status_response(&self, order_id: &str) -> OrderStatusResponse {
        OrderStatusResponse {
            order_id: order_id.to_string(),
            status: self.status.clone(),
        }
    }

    pub(crate) fn fill_response(&self) -> FillDetailsResponse {
        FillDetailsResponse {
            filled_quantity: self.filled_quantity,
            avg_fill_price: self.avg_fill_price,
            commission: self.commission,
        }
    }
}
