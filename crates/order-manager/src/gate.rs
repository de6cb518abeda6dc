//! Trading gate
//!
//! Shared account status. The risk monitor writes it; the lifecycle manager
//! consults it before any order leaves the process.

use bastion_core::{AccountStatus, OrderRequest, Side};
use tokio::sync::watch;

use crate::error::{Error, Result};

pub struct TradingGate {
    status: watch::Sender<AccountStatus>,
}

impl TradingGate {
    pub fn new() -> Self {
        let (status, _) = watch::channel(AccountStatus::Normal);
        Self { status }
    }

    pub fn status(&self) -> AccountStatus {
        *self.status.borrow()
    }

    /// Set the status, returning the previous one
    pub fn set_status(&self, status: AccountStatus) -> AccountStatus {
        self.status.send_replace(status)
    }

    /// Receive every status change
    pub fn subscribe(&self) -> watch::Receiver<AccountStatus> {
        self.status.subscribe()
    }

    /// Veto orders that would add exposure while trading is halted.
    /// Positions are long-only, so every sell reduces exposure.
    pub fn check(&self, request: &OrderRequest) -> Result<()> {
        let status = self.status();
        if request.side == Side::Buy && !status.allows_new_exposure() {
            return Err(Error::RiskRejected {
                symbol: request.symbol.clone(),
                reason: format!("account status {status:?} refuses new exposure"),
            });
        }
        Ok(())
    }
}

impl Default for TradingGate {
    fn default() -> Self {
        Self::new()
    }
}
