// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use shared_models::{Booking, BookingStatus, BookingTransition, SlotEffect};

use crate::models::BookingError;

#[derive(Debug, Default, Clone, Copy)]
pub struct BookingLifecycleService;

impl BookingLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: BookingStatus,
        new_status: BookingStatus,
    ) -> Result<(), BookingError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if self.get_valid_transitions(current_status).contains(&new_status) {
            return Ok(());
        }

        warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
        Err(self.conflict_for(current_status, new_status))
    }

    pub fn get_valid_transitions(&self, current_status: BookingStatus) -> Vec<BookingStatus> {
        match current_status {
            BookingStatus::Pending => vec![BookingStatus::Approved, BookingStatus::Rejected],
            BookingStatus::Approved => vec![BookingStatus::Cancelled],
            BookingStatus::Rejected | BookingStatus::Cancelled => vec![],
        }
    }

    /// Specific error for an illegal move, so double taps read as
    /// "already decided" rather than a generic failure.
    pub fn conflict_for(&self, current_status: BookingStatus, new_status: BookingStatus) -> BookingError {
        match (current_status, new_status) {
            (BookingStatus::Cancelled, BookingStatus::Cancelled) => BookingError::AlreadyCancelled,
            (status, BookingStatus::Approved | BookingStatus::Rejected) if status != BookingStatus::Pending => {
                BookingError::AlreadyDecided { status }
            }
            (from, to) => BookingError::InvalidStatusTransition { from, to },
        }
    }

    /// The compare-and-set the store applies for `booking -> new_status`.
    pub fn plan_transition(
        &self,
        booking: &Booking,
        new_status: BookingStatus,
    ) -> Result<BookingTransition, BookingError> {
        self.validate_status_transition(booking.status, new_status)?;

        let slot_effect = match new_status {
            BookingStatus::Approved => SlotEffect::Hold,
            BookingStatus::Cancelled => SlotEffect::Release,
            BookingStatus::Pending | BookingStatus::Rejected => SlotEffect::None,
        };

        Ok(BookingTransition {
            booking_id: booking.id,
            from: booking.status,
            to: new_status,
            confirmed: new_status == BookingStatus::Approved,
            slot_effect,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn only_three_moves_are_legal() {
        let lifecycle = BookingLifecycleService::new();
        let all = [
            BookingStatus::Pending,
            BookingStatus::Approved,
            BookingStatus::Rejected,
            BookingStatus::Cancelled,
        ];
        let legal: Vec<(BookingStatus, BookingStatus)> = all
            .iter()
            .flat_map(|from| all.iter().map(move |to| (*from, *to)))
            .filter(|(from, to)| lifecycle.validate_status_transition(*from, *to).is_ok())
            .collect();

        assert_eq!(
            legal,
            vec![
                (BookingStatus::Pending, BookingStatus::Approved),
                (BookingStatus::Pending, BookingStatus::Rejected),
                (BookingStatus::Approved, BookingStatus::Cancelled),
            ]
        );
    }

    #[test]
    fn conflicts_name_the_cause() {
        let lifecycle = BookingLifecycleService::new();
        assert_matches!(
            lifecycle.conflict_for(BookingStatus::Rejected, BookingStatus::Approved),
            BookingError::AlreadyDecided { status: BookingStatus::Rejected }
        );
        assert_matches!(
            lifecycle.conflict_for(BookingStatus::Cancelled, BookingStatus::Cancelled),
            BookingError::AlreadyCancelled
        );
        assert_matches!(
            lifecycle.conflict_for(BookingStatus::Pending, BookingStatus::Cancelled),
            BookingError::InvalidStatusTransition { .. }
        );
    }
}
