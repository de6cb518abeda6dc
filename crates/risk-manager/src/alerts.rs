//! Active alert book
//!
//! An alert is identified by `(type, message)`. Raising an alert that is
//! already active is a no-op; alerts leave the book when they are older
//! than the TTL.

use bastion_core::{AlertSeverity, AlertType, RiskAlert, Timestamp};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

pub struct AlertBook {
    active: DashMap<(AlertType, String), RiskAlert>,
    ttl: chrono::Duration,
}

impl AlertBook {
    pub fn new(ttl: chrono::Duration) -> Self {
        Self {
            active: DashMap::new(),
            ttl,
        }
    }

    /// Insert the alert unless an identical one is active.
    /// Returns `true` when the alert is new.
    pub fn raise(&self, alert: RiskAlert) -> bool {
        let key = (alert.alert_type, alert.message.clone());
        match self.active.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(alert);
                true
            }
        }
    }

    /// Drop alerts raised before `now - ttl`. Returns how many were dropped.
    pub fn purge_expired(&self, now: Timestamp) -> usize {
        let cutoff = now - self.ttl;
        let before = self.active.len();
        self.active.retain(|_, alert| alert.timestamp >= cutoff);
        before - self.active.len()
    }

    /// Active alerts, most severe first, then oldest first
    pub fn active(&self) -> Vec<RiskAlert> {
        let mut alerts: Vec<RiskAlert> = self.active.iter().map(|a| a.value().clone()).collect();
        alerts.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then(a.timestamp.cmp(&b.timestamp))
        });
        alerts
    }

    pub fn highest_severity(&self) -> Option<AlertSeverity> {
        self.active.iter().map(|a| a.severity).max()
    }

    pub fn contains(&self, alert_type: AlertType, message: &str) -> bool {
        self.active.contains_key(&(alert_type, message.to_string()))
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
