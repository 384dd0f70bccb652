use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use sqlx::{FromRow, SqlitePool};

use super::{RepositoryError, RepositoryResult};
use crate::models::slot::{format_date, format_time, AvailableSlot, AvailableSlotRow};

/// A slot together with whether an active appointment already holds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotOccupancy {
    pub slot: AvailableSlot,
    pub taken: bool,
}

#[derive(Debug, FromRow)]
struct SlotOccupancyRow {
    #[sqlx(flatten)]
    slot: AvailableSlotRow,
    taken: bool,
}

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait SlotRepository: Send + Sync {
    /// Creates the slot, or resets its availability flag if it already exists.
    async fn upsert_slot(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        is_available: bool,
    ) -> RepositoryResult<AvailableSlot>;
    async fn set_availability(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        is_available: bool,
    ) -> RepositoryResult<()>;
    async fn list_for_date(&self, date: NaiveDate) -> RepositoryResult<Vec<AvailableSlot>>;
    /// Slots in `[from, to]`, ordered by date then time.
    async fn occupancy_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepositoryResult<Vec<SlotOccupancy>>;
}

pub struct SqliteSlotRepository {
    pool: SqlitePool,
}

impl SqliteSlotRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SlotRepository for SqliteSlotRepository {
    async fn upsert_slot(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        is_available: bool,
    ) -> RepositoryResult<AvailableSlot> {
        let row = sqlx::query_as::<_, AvailableSlotRow>(
            r#"
            INSERT INTO available_slots (slot_date, slot_time, is_available)
            VALUES (?, ?, ?)
            ON CONFLICT (slot_date, slot_time) DO UPDATE SET is_available = excluded.is_available
            RETURNING id, slot_date, slot_time, is_available
            "#,
        )
        .bind(format_date(date))
        .bind(format_time(time))
        .bind(is_available)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_into()?)
    }

    async fn set_availability(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        is_available: bool,
    ) -> RepositoryResult<()> {
        let result = sqlx::query(
            "UPDATE available_slots SET is_available = ? WHERE slot_date = ? AND slot_time = ?",
        )
        .bind(is_available)
        .bind(format_date(date))
        .bind(format_time(time))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn list_for_date(&self, date: NaiveDate) -> RepositoryResult<Vec<AvailableSlot>> {
        let rows = sqlx::query_as::<_, AvailableSlotRow>(
            r#"
            SELECT id, slot_date, slot_time, is_available
            FROM available_slots
            WHERE slot_date = ?
            ORDER BY slot_time
            "#,
        )
        .bind(format_date(date))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| AvailableSlot::try_from(row).map_err(RepositoryError::from))
            .collect()
    }

    async fn occupancy_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepositoryResult<Vec<SlotOccupancy>> {
        let rows = sqlx::query_as::<_, SlotOccupancyRow>(
            r#"
            SELECT
                s.id,
                s.slot_date,
                s.slot_time,
                s.is_available,
                EXISTS (
                    SELECT 1 FROM appointments a
                    WHERE a.appointment_date = s.slot_date
                      AND a.appointment_time = s.slot_time
                      AND a.status <> 'cancelled'
                ) AS taken
            FROM available_slots s
            WHERE s.slot_date BETWEEN ? AND ?
            ORDER BY s.slot_date, s.slot_time
            "#,
        )
        .bind(format_date(from))
        .bind(format_date(to))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> RepositoryResult<SlotOccupancy> {
                Ok(SlotOccupancy {
                    slot: row.slot.try_into()?,
                    taken: row.taken,
                })
            })
            .collect()
    }
}
