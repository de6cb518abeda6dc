//! Order message types

use bastion_core::{OrderRequest, OrderStatus, OrderType, Side, TimeInForce};
use bastion_ports::{FillDetails, SubmitAck};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Order submission payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOrderWire {
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    pub time_in_force: TimeInForce,
    pub client_order_id: String,
}

impl From<&OrderRequest> for SubmitOrderWire {
    fn from(request: &OrderRequest) -> Self {
        Self {
            symbol: request.symbol.clone(),
            side: request.side,
            order_type: request.order_type,
            quantity: request.quantity,
            price: request.price,
            time_in_force: request.time_in_force,
            client_order_id: request.client_order_id.clone(),
        }
    }
}

/// Response to an order submission
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOrderResponse {
    pub success: bool,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
}

impl From<SubmitOrderResponse> for SubmitAck {
    fn from(r: SubmitOrderResponse) -> Self {
        SubmitAck {
            success: r.success,
            order_id: r.order_id,
            message: r.message,
            error_code: r.error_code,
        }
    }
}

/// Response to a status query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusResponse {
    pub order_id: String,
    pub status: String,
}

impl TryFrom<OrderStatusResponse> for OrderStatus {
    type Error = GatewayError;

    fn try_from(r: OrderStatusResponse) -> Result<Self, Self::Error> {
        r.status
            .parse()
            .map_err(|e: bastion_core::UnknownStatus| GatewayError::Conversion(e.to_string()))
    }
}

/// Response to a fill details query
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillDetailsResponse {
    pub filled_quantity: i64,
    pub avg_fill_price: Decimal,
    #[serde(default)]
    pub commission: Decimal,
}

impl TryFrom<FillDetailsResponse> for FillDetails {
    type Error = GatewayError;

    fn try_from(r: FillDetailsResponse) -> Result<Self, Self::Error> {
        if r.filled_quantity < 0 {
            return Err(GatewayError::Conversion(format!(
                "negative filled quantity {}",
                r.filled_quantity
            )));
        }
        if r.filled_quantity > 0 && r.avg_fill_price <= Decimal::ZERO {
            return Err(GatewayError::Conversion(format!(
                "non-positive fill price {}",
                r.avg_fill_price
            )));
        }
        Ok(FillDetails {
            filled_quantity: r.filled_quantity,
            avg_fill_price: r.avg_fill_price,
            commission: r.commission,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_submit_wire_shape() {
        let request = OrderRequest::limit("AAPL", Side::Buy, 10, dec!(150.25))
            .with_time_in_force(TimeInForce::Ioc)
            .with_client_order_id("c-1");
        let json = serde_json::to_value(SubmitOrderWire::from(&request)).unwrap();

        assert_eq!(json["orderType"], "limit");
        assert_eq!(json["timeInForce"], "IOC");
        assert_eq!(json["clientOrderId"], "c-1");
        assert_eq!(json["side"], "buy");
    }

    #[test]
    fn test_status_parse() {
        let raw = r#"{"orderId":"o-1","status":"partially_filled"}"#;
        let resp: OrderStatusResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(OrderStatus::try_from(resp).unwrap(), OrderStatus::PartiallyFilled);

        let bad = OrderStatusResponse {
            order_id: "o-1".into(),
            status: "suspended".into(),
        };
        assert!(OrderStatus::try_from(bad).is_err());
    }

    #[test]
    fn test_fill_details_guard() {
        let raw = r#"{"filledQuantity":50,"avgFillPrice":"101.5"}"#;
        let resp: FillDetailsResponse = serde_json::from_str(raw).unwrap();
        let details = FillDetails::try_from(resp).unwrap();
        assert_eq!(details.filled_quantity, 50);
        assert_eq!(details.commission, Decimal::ZERO);

        let broken = FillDetailsResponse {
            filled_quantity: 5,
            avg_fill_price: Decimal::ZERO,
            commission: Decimal::ZERO,
        };
        assert!(FillDetails::try_from(broken).is_err());
    }
}
