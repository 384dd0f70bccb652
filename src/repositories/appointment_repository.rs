//! Appointment queries.
//!
//! Every function works on a plain connection so the booking flow can run
//! the validator and the write on the same transaction. Queries issued on
//! behalf of a user are scoped by `user_id`.

use chrono::{NaiveDate, NaiveTime};
use sqlx::SqliteConnection;

use super::{RepositoryError, RepositoryResult};
use crate::models::{
    appointment::{AppointmentRow, ReceiptRow},
    slot::{format_date, format_time},
    Appointment, AppointmentStatus, ClinicService, Receipt,
};

const SELECT_APPOINTMENT: &str = r#"
    SELECT id, user_id, pet_name, service, appointment_date, appointment_time, status, created_at
    FROM appointments
"#;

/// Takes SQLite's write lock for the current transaction.
///
/// The statement touches at most the requested slot row and leaves it
/// unchanged. Issued before the validator reads so concurrent bookings queue
/// on the lock instead of failing the read-to-write upgrade.
pub async fn claim_write_lock(
    conn: &mut SqliteConnection,
    date: NaiveDate,
    time: NaiveTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE available_slots SET is_available = is_available WHERE slot_date = ? AND slot_time = ?",
    )
    .bind(format_date(date))
    .bind(format_time(time))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Write-lock claim for status changes, keyed on the appointment row.
pub async fn claim_appointment_lock(
    conn: &mut SqliteConnection,
    appointment_id: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE appointments SET status = status WHERE id = ?")
        .bind(appointment_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub async fn insert(
    conn: &mut SqliteConnection,
    user_id: i64,
    pet_name: &str,
    service: ClinicService,
    date: NaiveDate,
    time: NaiveTime,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO appointments
            (user_id, pet_name, service, appointment_date, appointment_time, status)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(pet_name)
    .bind(service.label())
    .bind(format_date(date))
    .bind(format_time(time))
    .bind(AppointmentStatus::Confirmed.as_str())
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update_details(
    conn: &mut SqliteConnection,
    user_id: i64,
    appointment_id: i64,
    pet_name: &str,
    service: ClinicService,
    date: NaiveDate,
    time: NaiveTime,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE appointments
        SET pet_name = ?, service = ?, appointment_date = ?, appointment_time = ?
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(pet_name)
    .bind(service.label())
    .bind(format_date(date))
    .bind(format_time(time))
    .bind(appointment_id)
    .bind(user_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

pub async fn set_status(
    conn: &mut SqliteConnection,
    appointment_id: i64,
    status: AppointmentStatus,
) -> RepositoryResult<()> {
    let result = sqlx::query("UPDATE appointments SET status = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(appointment_id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }

    Ok(())
}

pub async fn delete_for_user(
    conn: &mut SqliteConnection,
    user_id: i64,
    appointment_id: i64,
) -> RepositoryResult<()> {
    let result = sqlx::query("DELETE FROM appointments WHERE id = ? AND user_id = ?")
        .bind(appointment_id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }

    Ok(())
}

pub async fn find_by_id(
    conn: &mut SqliteConnection,
    appointment_id: i64,
) -> RepositoryResult<Option<Appointment>> {
    let row = sqlx::query_as::<_, AppointmentRow>(&format!("{SELECT_APPOINTMENT} WHERE id = ?"))
        .bind(appointment_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.map(Appointment::try_from).transpose()?)
}

pub async fn find_for_user(
    conn: &mut SqliteConnection,
    user_id: i64,
    appointment_id: i64,
) -> RepositoryResult<Option<Appointment>> {
    let row = sqlx::query_as::<_, AppointmentRow>(&format!(
        "{SELECT_APPOINTMENT} WHERE id = ? AND user_id = ?"
    ))
    .bind(appointment_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Appointment::try_from).transpose()?)
}

/// Newest appointment first.
pub async fn list_for_user(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> RepositoryResult<Vec<Appointment>> {
    let rows = sqlx::query_as::<_, AppointmentRow>(&format!(
        "{SELECT_APPOINTMENT} WHERE user_id = ? \
         ORDER BY appointment_date DESC, appointment_time DESC"
    ))
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|row| Appointment::try_from(row).map_err(RepositoryError::from))
        .collect()
}

pub async fn receipt_for_user(
    conn: &mut SqliteConnection,
    user_id: i64,
    appointment_id: i64,
) -> RepositoryResult<Option<Receipt>> {
    let row = sqlx::query_as::<_, ReceiptRow>(
        r#"
        SELECT
            a.id, a.user_id, a.pet_name, a.service, a.appointment_date,
            a.appointment_time, a.status, a.created_at,
            u.name AS owner_name, u.email AS owner_email, u.phone AS owner_phone
        FROM appointments a
        JOIN users u ON a.user_id = u.id
        WHERE a.id = ? AND a.user_id = ?
        "#,
    )
    .bind(appointment_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Receipt::try_from).transpose()?)
}
