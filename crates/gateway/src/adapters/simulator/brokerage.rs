use async_trait::async_trait;
use bastion_core::{AccountSnapshot, OrderRequest, OrderStatus, OrderType, Side};
use bastion_ports::{BrokerError, BrokerResult, BrokerageApi, Clock, FillDetails, SubmitAck};
use dashmap::DashMap;
use log::{debug, info, warn};
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};

use super::script::ScriptStep;
use crate::messages::account::AccountInfoResponse;
use crate::messages::order::{SubmitOrderResponse, SubmitOrderWire};

struct SimOrder {
    request: OrderRequest,
    current: ScriptStep,
    script: VecDeque<ScriptStep>,
    status_queries: u32,
}

/// In-process paper brokerage
///
/// Without a script, market orders fill immediately at the configured mark
/// price and limit orders fill when marketable. Scripts queued per symbol
/// replace that behaviour for the next submission in that symbol, one step
/// consumed per status query (the last step sticks).
pub struct SimulatedBrokerage {
    clock: Arc<dyn Clock>,
    orders: DashMap<String, SimOrder>,
    scripts: DashMap<String, VecDeque<Vec<ScriptStep>>>,
    rejections: DashMap<String, (String, String)>,
    prices: DashMap<String, Decimal>,
    account: RwLock<AccountInfoResponse>,
    submitted: RwLock<Vec<OrderRequest>>,
    next_submit_error: Mutex<Option<BrokerError>>,
    commission_per_share: Decimal,
    next_id: AtomicU64,
    online: AtomicBool,
}

impl SimulatedBrokerage {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            orders: DashMap::new(),
            scripts: DashMap::new(),
            rejections: DashMap::new(),
            prices: DashMap::new(),
            account: RwLock::new(AccountInfoResponse::default()),
            submitted: RwLock::new(Vec::new()),
            next_submit_error: Mutex::new(None),
            commission_per_share: Decimal::ZERO,
            next_id: AtomicU64::new(1),
            online: AtomicBool::new(true),
        }
    }

    pub fn with_commission_per_share(mut self, commission: Decimal) -> Self {
        self.commission_per_share = commission;
        self
    }

    /// Mark price used to fill unscripted orders
    pub fn set_price(&self, symbol: &str, price: Decimal) {
        self.prices.insert(symbol.to_string(), price);
    }

    pub async fn set_account(&self, snapshot: &AccountSnapshot) {
        *self.account.write().await = AccountInfoResponse::from(snapshot);
    }

    /// Script the status sequence of the next order submitted for `symbol`
    pub fn queue_script(&self, symbol: &str, steps: Vec<ScriptStep>) {
        self.scripts
            .entry(symbol.to_string())
            .or_default()
            .push_back(steps);
    }

    /// Refuse the next submission for `symbol` with a brokerage error code
    pub fn queue_rejection(&self, symbol: &str, code: &str, message: &str) {
        self.rejections
            .insert(symbol.to_string(), (code.to_string(), message.to_string()));
    }

    /// Fail the next submission at the transport level
    pub async fn fail_next_submit(&self, error: BrokerError) {
        *self.next_submit_error.lock().await = Some(error);
    }

    /// While offline every call fails with a network error
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Every request that reached the brokerage, in submission order
    pub async fn submitted(&self) -> Vec<OrderRequest> {
        self.submitted.read().await.clone()
    }

    pub fn status_queries(&self, order_id: &str) -> u32 {
        self.orders
            .get(order_id)
            .map(|o| o.status_queries)
            .unwrap_or(0)
    }

    fn ensure_online(&self) -> BrokerResult<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BrokerError::Network("simulated brokerage offline".to_string()))
        }
    }

    fn default_script(&self, request: &OrderRequest) -> VecDeque<ScriptStep> {
        let mark = self.prices.get(&request.symbol).map(|p| *p);
        let fill_price = match (request.order_type, request.price, mark) {
            (OrderType::Market, _, Some(mark)) => Some(mark),
            (OrderType::Limit, Some(limit), Some(mark)) => match request.side {
                Side::Buy if limit >= mark => Some(mark),
                Side::Sell if limit <= mark => Some(mark),
                _ => None,
            },
            _ => None,
        };

        let step = match fill_price {
            Some(price) => ScriptStep::filled(request.quantity, price)
                .with_commission(self.commission_per_share * Decimal::from(request.quantity)),
            None => ScriptStep::pending(),
        };
        VecDeque::from([step])
    }
}

#[async_trait]
impl BrokerageApi for SimulatedBrokerage {
    async fn submit_order(&self, request: &OrderRequest) -> BrokerResult<SubmitAck> {
        self.ensure_online()?;
        if let Some(error) = self.next_submit_error.lock().await.take() {
            warn!("[SIM] Injected submit failure: {}", error);
            return Err(error);
        }

        let wire = SubmitOrderWire::from(request);
        debug!(
            "[SIM] submit {}",
            serde_json::to_string(&wire).map_err(crate::GatewayError::from)?
        );

        if let Some((_, (code, message))) = self.rejections.remove(&request.symbol) {
            info!("[SIM] Rejecting {} {}: {}", wire.side, wire.symbol, message);
            return Ok(SubmitOrderResponse {
                success: false,
                order_id: None,
                message: Some(message),
                error_code: Some(code),
            }
            .into());
        }

        let order_id = format!("SIM-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut script = self
            .scripts
            .get_mut(&request.symbol)
            .and_then(|mut queued| queued.pop_front())
            .map(VecDeque::from)
            .unwrap_or_else(|| self.default_script(request));
        let current = script.pop_front().unwrap_or_else(ScriptStep::pending);

        self.orders.insert(
            order_id.clone(),
            SimOrder {
                request: request.clone(),
                current,
                script,
                status_queries: 0,
            },
        );
        self.submitted.write().await.push(request.clone());

        info!(
            "[SIM] Accepted {} {} {} x{} as {}",
            request.client_order_id, request.side, request.symbol, request.quantity, order_id
        );
        Ok(SubmitOrderResponse {
            success: true,
            order_id: Some(order_id),
            message: None,
            error_code: None,
        }
        .into())
    }

    async fn get_order_status(&self, order_id: &str) -> BrokerResult<OrderStatus> {
        self.ensure_online()?;
        let mut order = self
            .orders
            .get_mut(order_id)
            .ok_or_else(|| BrokerError::UnknownOrder(order_id.to_string()))?;

        order.status_queries += 1;
        // The first query observes the step installed at submission
        if order.status_queries > 1 {
            if let Some(next) = order.script.pop_front() {
                order.current = next;
            }
        }

        let response = order.current.status_response(order_id);
        Ok(OrderStatus::try_from(response)?)
    }

    async fn cancel_order(&self, order_id: &str) -> BrokerResult<bool> {
        self.ensure_online()?;
        let mut order = self
            .orders
            .get_mut(order_id)
            .ok_or_else(|| BrokerError::UnknownOrder(order_id.to_string()))?;

        if order.current.is_terminal() {
            return Ok(false);
        }
        // A scripted terminal step already happened at the venue; it wins the race
        if order.script.front().is_some_and(ScriptStep::is_terminal) {
            if let Some(next) = order.script.pop_front() {
                order.current = next;
            }
            return Ok(false);
        }

        let filled = order.current.filled_quantity;
        let price = order.current.avg_fill_price;
        let commission = order.current.commission;
        order.current = ScriptStep::cancelled(filled, price).with_commission(commission);
        order.script.clear();
        info!(
            "[SIM] Cancelled {} ({} {} filled {}/{})",
            order_id, order.request.side, order.request.symbol, filled, order.request.quantity
        );
        Ok(true)
    }

    async fn get_fill_details(&self, order_id: &str) -> BrokerResult<FillDetails> {
        self.ensure_online()?;
        let order = self
            .orders
            .get(order_id)
            .ok_or_else(|| BrokerError::UnknownOrder(order_id.to_string()))?;
        Ok(FillDetails::try_from(order.current.fill_response())?)
    }

    async fn get_account_info(&self) -> BrokerResult<AccountSnapshot> {
        self.ensure_online()?;
        let info = self.account.read().await.clone();
        Ok(info.into_snapshot(self.clock.now()))
    }
}
