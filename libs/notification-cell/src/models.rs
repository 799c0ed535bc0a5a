use shared_models::{DeliveryFailure, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed(DeliveryFailure),
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered)
    }

    pub fn failure(&self) -> Option<&DeliveryFailure> {
        match self {
            DeliveryOutcome::Delivered => None,
            DeliveryOutcome::Failed(failure) => Some(failure),
        }
    }
}

impl From<Result<(), DeliveryFailure>> for DeliveryOutcome {
    fn from(result: Result<(), DeliveryFailure>) -> Self {
        match result {
            Ok(()) => DeliveryOutcome::Delivered,
            Err(failure) => DeliveryOutcome::Failed(failure),
        }
    }
}

/// Counts always satisfy `success + failure == recipients`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub success: usize,
    pub failure: usize,
    pub failed_recipients: Vec<UserId>,
}

impl BroadcastReport {
    pub fn record(&mut self, recipient: UserId, outcome: &DeliveryOutcome) {
        if outcome.is_delivered() {
            self.success += 1;
        } else {
            self.failure += 1;
            self.failed_recipients.push(recipient);
        }
    }

    pub fn total(&self) -> usize {
        self.success + self.failure
    }
}
