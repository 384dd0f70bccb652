use chrono::{NaiveDate, NaiveTime};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::models::{
    slot::{parse_date, parse_time},
    Appointment, AppointmentStatus, ClinicService, Receipt, SlotRequest,
};
use crate::repositories::{appointment_repository as store, is_unique_violation};
use crate::services::booking_validator::{BookingError, BookingValidator};

const MAX_PET_NAME_LEN: usize = 100;

/// Validated booking input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentRequest {
    pub pet_name: String,
    pub service: ClinicService,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl AppointmentRequest {
    /// Parses raw form values. All four fields are required.
    pub fn parse(
        pet_name: &str,
        service: &str,
        date: &str,
        time: &str,
    ) -> Result<Self, BookingError> {
        let pet_name = pet_name.trim();
        if pet_name.is_empty()
            || service.trim().is_empty()
            || date.trim().is_empty()
            || time.trim().is_empty()
        {
            return Err(BookingError::Validation("All fields are required".to_string()));
        }
        if pet_name.chars().count() > MAX_PET_NAME_LEN {
            return Err(BookingError::Validation(format!(
                "Pet name must be at most {MAX_PET_NAME_LEN} characters"
            )));
        }

        let service = service.parse::<ClinicService>().map_err(|_| {
            BookingError::Validation("Please choose a service from the list".to_string())
        })?;
        let date = parse_date(date).map_err(|_| BookingError::InvalidSlot)?;
        let time = parse_time(time).map_err(|_| BookingError::InvalidSlot)?;

        Ok(Self {
            pet_name: pet_name.to_string(),
            service,
            date,
            time,
        })
    }
}

fn slot_conflict(err: sqlx::Error) -> BookingError {
    if is_unique_violation(&err) {
        BookingError::SlotTaken
    } else {
        BookingError::Storage(err)
    }
}

/// Booking, editing, and cancelling appointments.
///
/// Each write runs in one transaction whose first statement claims the
/// write lock; reads and validation follow, then the row is written. The partial unique index on
/// active (date, time) backs this up; a violation surfaces as `SlotTaken`.
pub struct AppointmentService {
    pool: SqlitePool,
    validator: BookingValidator,
}

impl AppointmentService {
    pub fn new(pool: SqlitePool, validator: BookingValidator) -> Self {
        Self { pool, validator }
    }

    pub async fn book(
        &self,
        user_id: i64,
        request: AppointmentRequest,
    ) -> Result<Appointment, BookingError> {
        let mut tx = self.pool.begin().await?;

        store::claim_write_lock(&mut tx, request.date, request.time).await?;
        let slot = SlotRequest::new(request.date, request.time, user_id);
        if let Err(err) = self.validator.validate(&mut *tx, &slot).await {
            warn!(user_id, date = %request.date, time = %request.time, "booking rejected: {}", err);
            return Err(err);
        }

        let id = store::insert(
            &mut tx,
            user_id,
            &request.pet_name,
            request.service,
            request.date,
            request.time,
        )
        .await
        .map_err(slot_conflict)?;

        let appointment = store::find_by_id(&mut tx, id)
            .await?
            .ok_or(BookingError::NotFound)?;
        tx.commit().await?;

        info!(
            user_id,
            appointment_id = id,
            date = %request.date,
            time = %request.time,
            "appointment booked"
        );
        Ok(appointment)
    }

    /// Changes pet, service, and slot of a confirmed appointment.
    pub async fn update(
        &self,
        user_id: i64,
        appointment_id: i64,
        request: AppointmentRequest,
    ) -> Result<Appointment, BookingError> {
        let mut tx = self.pool.begin().await?;

        store::claim_write_lock(&mut tx, request.date, request.time).await?;
        let current = store::find_for_user(&mut tx, user_id, appointment_id)
            .await?
            .ok_or(BookingError::NotFound)?;
        if !current.is_confirmed() {
            return Err(BookingError::NotEditable);
        }

        let slot = SlotRequest::new(request.date, request.time, user_id).replacing(appointment_id);
        if let Err(err) = self.validator.validate(&mut *tx, &slot).await {
            warn!(user_id, appointment_id, "update rejected: {}", err);
            return Err(err);
        }

        let updated = store::update_details(
            &mut tx,
            user_id,
            appointment_id,
            &request.pet_name,
            request.service,
            request.date,
            request.time,
        )
        .await
        .map_err(slot_conflict)?;
        if updated == 0 {
            return Err(BookingError::NotFound);
        }

        let appointment = store::find_by_id(&mut tx, appointment_id)
            .await?
            .ok_or(BookingError::NotFound)?;
        tx.commit().await?;

        info!(user_id, appointment_id, "appointment updated");
        Ok(appointment)
    }

    /// Owner-initiated cancellation. Frees the slot.
    pub async fn cancel(&self, user_id: i64, appointment_id: i64) -> Result<(), BookingError> {
        let mut tx = self.pool.begin().await?;
        store::claim_appointment_lock(&mut tx, appointment_id).await?;
        let current = store::find_for_user(&mut tx, user_id, appointment_id)
            .await?
            .ok_or(BookingError::NotFound)?;

        self.transition(&mut tx, &current, AppointmentStatus::Cancelled)
            .await?;
        tx.commit().await?;

        info!(user_id, appointment_id, "appointment cancelled");
        Ok(())
    }

    /// Clinic-side: the visit took place.
    pub async fn complete(&self, appointment_id: i64) -> Result<(), BookingError> {
        let mut tx = self.pool.begin().await?;
        store::claim_appointment_lock(&mut tx, appointment_id).await?;
        let current = store::find_by_id(&mut tx, appointment_id)
            .await?
            .ok_or(BookingError::NotFound)?;

        self.transition(&mut tx, &current, AppointmentStatus::Completed)
            .await?;
        tx.commit().await?;

        info!(appointment_id, "appointment completed");
        Ok(())
    }

    async fn transition(
        &self,
        conn: &mut sqlx::SqliteConnection,
        current: &Appointment,
        next: AppointmentStatus,
    ) -> Result<(), BookingError> {
        if !current.status.can_transition_to(next) {
            return Err(BookingError::InvalidTransition {
                from: current.status,
                to: next,
            });
        }
        store::set_status(conn, current.id, next).await?;
        Ok(())
    }

    pub async fn delete(&self, user_id: i64, appointment_id: i64) -> Result<(), BookingError> {
        let mut conn = self.pool.acquire().await?;
        store::delete_for_user(&mut conn, user_id, appointment_id).await?;

        info!(user_id, appointment_id, "appointment deleted");
        Ok(())
    }

    pub async fn find_for_user(
        &self,
        user_id: i64,
        appointment_id: i64,
    ) -> Result<Appointment, BookingError> {
        let mut conn = self.pool.acquire().await?;
        store::find_for_user(&mut conn, user_id, appointment_id)
            .await?
            .ok_or(BookingError::NotFound)
    }

    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<Appointment>, BookingError> {
        let mut conn = self.pool.acquire().await?;
        Ok(store::list_for_user(&mut conn, user_id).await?)
    }

    pub async fn receipt(
        &self,
        user_id: i64,
        appointment_id: i64,
    ) -> Result<Receipt, BookingError> {
        let mut conn = self.pool.acquire().await?;
        store::receipt_for_user(&mut conn, user_id, appointment_id)
            .await?
            .ok_or(BookingError::NotFound)
    }
}
