//! Fulfillment phases and events
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FulfillmentPhase { Received, StockUpdating, CartClearing, SnapshotWriting, NotifyDispatching, Done }

impl FulfillmentPhase {
    pub fn next(self) -> Self {
        match self {
            Self::Received => Self::StockUpdating,
            Self::StockUpdating => Self::CartClearing,
            Self::CartClearing => Self::SnapshotWriting,
            Self::SnapshotWriting => Self::NotifyDispatching,
            Self::NotifyDispatching | Self::Done => Self::Done,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseTransition { pub phase: FulfillmentPhase, pub at: DateTime<Utc> }

/// Forward-only record of the phases one invocation went through.
#[derive(Clone, Debug, Serialize)]
pub struct PhaseLog { current: FulfillmentPhase, transitions: Vec<PhaseTransition> }

impl PhaseLog {
    pub fn start() -> Self {
        Self { current: FulfillmentPhase::Received, transitions: vec![PhaseTransition { phase: FulfillmentPhase::Received, at: Utc::now() }] }
    }

    pub fn current(&self) -> FulfillmentPhase { self.current }

    pub fn advance(&mut self) -> FulfillmentPhase {
        let next = self.current.next();
        if next != self.current {
            self.current = next;
            self.transitions.push(PhaseTransition { phase: next, at: Utc::now() });
        }
        next
    }

    pub fn into_transitions(self) -> Vec<PhaseTransition> { self.transitions }
}

/// Published once per invocation for downstream consumers.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FulfillmentEvent {
    #[serde(rename_all = "camelCase")]
    Completed { order_id: String, merchant_txn_id: String, stock_failures: usize, snapshot_written: bool, notified: bool },
}

impl FulfillmentEvent {
    pub fn subject(&self) -> &'static str {
        match self { Self::Completed { .. } => "fulfillment.completed" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phases_only_move_forward() {
        let mut log = PhaseLog::start();
        let mut seen = vec![log.current()];
        while log.current() != FulfillmentPhase::Done { seen.push(log.advance()); }
        assert_eq!(log.advance(), FulfillmentPhase::Done);
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(log.into_transitions().len(), 6);
    }
}
