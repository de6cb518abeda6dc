mod account;
mod alert;
mod bar;
mod order;
mod order_status;
mod order_type;
mod position;
mod side;
mod time_in_force;
mod trade;

pub use account::{AccountSnapshot, AccountStatus};
pub use alert::{AlertSeverity, AlertType, RiskAction, RiskAlert};
pub use bar::{Bar, Timeframe};
pub use order::{Order, OrderId, OrderRequest, RequestInvalid, TransitionError};
pub use order_status::{OrderStatus, UnknownStatus};
pub use order_type::OrderType;
pub use position::{FillEffect, Position};
pub use side::Side;
pub use time_in_force::TimeInForce;
pub use trade::{Fill, Trade, TradeId};
