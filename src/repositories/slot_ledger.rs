//! The two reads the booking validator needs from the store.
//!
//! Implemented for `SqliteConnection` so the validator can run on the same
//! transaction that performs the booking write.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use sqlx::SqliteConnection;

use crate::models::slot::{format_date, format_time};

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait SlotLedger: Send {
    /// A slot row exists for (date, time) and is flagged available.
    async fn is_slot_open(&mut self, date: NaiveDate, time: NaiveTime)
        -> Result<bool, sqlx::Error>;

    /// An active appointment other than `excluding` holds (date, time).
    async fn is_slot_taken(
        &mut self,
        date: NaiveDate,
        time: NaiveTime,
        excluding: Option<i64>,
    ) -> Result<bool, sqlx::Error>;
}

#[async_trait]
impl SlotLedger for SqliteConnection {
    async fn is_slot_open(
        &mut self,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM available_slots
            WHERE slot_date = ? AND slot_time = ? AND is_available = 1
            "#,
        )
        .bind(format_date(date))
        .bind(format_time(time))
        .fetch_one(&mut *self)
        .await?;

        Ok(count > 0)
    }

    async fn is_slot_taken(
        &mut self,
        date: NaiveDate,
        time: NaiveTime,
        excluding: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM appointments
            WHERE appointment_date = ?
              AND appointment_time = ?
              AND status <> 'cancelled'
              AND (? IS NULL OR id <> ?)
            "#,
        )
        .bind(format_date(date))
        .bind(format_time(time))
        .bind(excluding)
        .bind(excluding)
        .fetch_one(&mut *self)
        .await?;

        Ok(count > 0)
    }
}
