use std::sync::Arc;

use tracing::debug;

use crate::models::{AppointmentStatus, SlotRequest};
use crate::repositories::{RepositoryError, SlotLedger};
use crate::services::clock::Clock;

/// Why a booking or update did not go through.
///
/// The first three are validator rejections; the human is asked to pick
/// another slot. Nothing here is retried automatically.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Appointments cannot be booked in the past")]
    PastDate,
    #[error("The selected time slot is not offered")]
    InvalidSlot,
    #[error("The selected time slot is already booked")]
    SlotTaken,
    #[error("{0}")]
    Validation(String),
    #[error("Appointment not found")]
    NotFound,
    #[error("Cannot change an appointment from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },
    #[error("Only confirmed appointments can be edited")]
    NotEditable,
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl BookingError {
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            BookingError::PastDate | BookingError::InvalidSlot | BookingError::SlotTaken
        )
    }

    /// Text shown to the user. Storage details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            BookingError::Storage(_) => {
                "We could not process your booking. Please try again.".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<RepositoryError> for BookingError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Database(e) => BookingError::Storage(e),
            RepositoryError::NotFound => BookingError::NotFound,
            RepositoryError::AlreadyExists => BookingError::SlotTaken,
        }
    }
}

/// Guards bookings and updates against past, unknown, and occupied slots.
///
/// Read-only: run it on the transaction that performs the write.
#[derive(Clone)]
pub struct BookingValidator {
    clock: Arc<dyn Clock>,
}

impl BookingValidator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Checks, in order: date not before today, slot offered and open, slot
    /// free. The slot's time of day is not compared with the clock.
    pub async fn validate<L>(&self, ledger: &mut L, request: &SlotRequest) -> Result<(), BookingError>
    where
        L: SlotLedger + ?Sized,
    {
        if request.date < self.clock.today() {
            debug!(user_id = request.acting_user_id, date = %request.date, "rejected: past date");
            return Err(BookingError::PastDate);
        }

        if !ledger.is_slot_open(request.date, request.time).await? {
            debug!(user_id = request.acting_user_id, date = %request.date, time = %request.time, "rejected: invalid slot");
            return Err(BookingError::InvalidSlot);
        }

        if ledger
            .is_slot_taken(request.date, request.time, request.replacing)
            .await?
        {
            debug!(user_id = request.acting_user_id, date = %request.date, time = %request.time, "rejected: slot taken");
            return Err(BookingError::SlotTaken);
        }

        Ok(())
    }
}
