use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime};
use clinic_booking::{
    models::{slot::format_date, SlotRequest},
    services::{BookingError, BookingValidator, FixedClock},
    test_utils::test_helpers,
};
use sqlx::SqlitePool;

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

fn validator_at(today: NaiveDate) -> BookingValidator {
    BookingValidator::new(test_helpers::fixed_clock(today))
}

async fn insert_appointment(
    pool: &SqlitePool,
    user_id: i64,
    date: NaiveDate,
    time: NaiveTime,
    status: &str,
) -> i64 {
    sqlx::query(
        r#"
        INSERT INTO appointments
            (user_id, pet_name, service, appointment_date, appointment_time, status)
        VALUES (?, 'Luna', 'Vaccination', ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(format_date(date))
    .bind(time.format("%H:%M").to_string())
    .bind(status)
    .execute(pool)
    .await
    .unwrap()
    .last_insert_rowid()
}

async fn validate(
    pool: &SqlitePool,
    validator: &BookingValidator,
    request: &SlotRequest,
) -> Result<(), BookingError> {
    let mut conn = pool.acquire().await.unwrap();
    validator.validate(&mut *conn, request).await
}

#[tokio::test]
async fn test_open_free_slot_is_accepted_then_taken_after_insert() {
    let pool = test_helpers::create_test_db().await.unwrap();
    let user_id = test_helpers::insert_test_user(&pool, "Ana", "ana@example.com", "secret123")
        .await
        .unwrap();
    let day = date(2025, 6, 10);
    test_helpers::insert_slot(&pool, day, time(9, 0), true)
        .await
        .unwrap();

    let validator = validator_at(date(2025, 6, 9));
    let request = SlotRequest::new(day, time(9, 0), user_id);

    validate(&pool, &validator, &request).await.unwrap();

    insert_appointment(&pool, user_id, day, time(9, 0), "confirmed").await;

    let result = validate(&pool, &validator, &request).await;
    assert!(matches!(result, Err(BookingError::SlotTaken)));
}

#[tokio::test]
async fn test_yesterday_is_past_regardless_of_slot_state() {
    let pool = test_helpers::create_test_db().await.unwrap();
    let today = date(2025, 6, 10);
    let yesterday = today - Duration::days(1);

    // Open and free, closed, and missing: all three are PastDate.
    test_helpers::insert_slot(&pool, yesterday, time(9, 0), true)
        .await
        .unwrap();
    test_helpers::insert_slot(&pool, yesterday, time(10, 0), false)
        .await
        .unwrap();

    let validator = validator_at(today);
    for hour in [9, 10, 11] {
        let result = validate(&pool, &validator, &SlotRequest::new(yesterday, time(hour, 0), 1)).await;
        assert!(
            matches!(result, Err(BookingError::PastDate)),
            "{hour}:00 yesterday should be PastDate"
        );
    }
}

#[tokio::test]
async fn test_every_earlier_day_is_past() {
    let pool = test_helpers::create_test_db().await.unwrap();
    let today = date(2025, 6, 10);
    let validator = validator_at(today);

    for days_back in [1, 2, 7, 30, 365] {
        let day = today - Duration::days(days_back);
        test_helpers::insert_slot(&pool, day, time(12, 0), true)
            .await
            .unwrap();
        let result = validate(&pool, &validator, &SlotRequest::new(day, time(12, 0), 1)).await;
        assert!(matches!(result, Err(BookingError::PastDate)));
    }
}

#[tokio::test]
async fn test_today_is_bookable_regardless_of_clock_time() {
    let pool = test_helpers::create_test_db().await.unwrap();
    let today = date(2025, 6, 10);
    test_helpers::insert_slot(&pool, today, time(7, 0), true)
        .await
        .unwrap();
    test_helpers::insert_slot(&pool, today, time(9, 0), true)
        .await
        .unwrap();

    let validator = BookingValidator::new(Arc::new(FixedClock(today.and_time(time(8, 30)))));

    // Only the date is compared with the clock.
    validate(&pool, &validator, &SlotRequest::new(today, time(7, 0), 1))
        .await
        .unwrap();
    validate(&pool, &validator, &SlotRequest::new(today, time(9, 0), 1))
        .await
        .unwrap();

    let late = BookingValidator::new(Arc::new(FixedClock(today.and_time(time(23, 59)))));
    validate(&pool, &late, &SlotRequest::new(today, time(7, 0), 1))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unknown_or_closed_slot_is_invalid() {
    let pool = test_helpers::create_test_db().await.unwrap();
    let day = date(2025, 6, 10);
    test_helpers::insert_slot(&pool, day, time(10, 0), false)
        .await
        .unwrap();

    let validator = validator_at(date(2025, 6, 1));

    for hour in [8, 10, 13] {
        let result = validate(&pool, &validator, &SlotRequest::new(day, time(hour, 0), 1)).await;
        assert!(
            matches!(result, Err(BookingError::InvalidSlot)),
            "{hour}:00 is not an open slot"
        );
    }

    // Off-grid minute on an hour that is offered elsewhere.
    test_helpers::insert_slot(&pool, day, time(11, 0), true)
        .await
        .unwrap();
    let result = validate(&pool, &validator, &SlotRequest::new(day, time(11, 30), 1)).await;
    assert!(matches!(result, Err(BookingError::InvalidSlot)));
}

#[tokio::test]
async fn test_slot_taken_by_any_user() {
    let pool = test_helpers::create_test_db().await.unwrap();
    let ana = test_helpers::insert_test_user(&pool, "Ana", "ana@example.com", "secret123")
        .await
        .unwrap();
    let luis = test_helpers::insert_test_user(&pool, "Luis", "luis@example.com", "secret123")
        .await
        .unwrap();
    let day = date(2025, 6, 10);
    test_helpers::insert_slot(&pool, day, time(9, 0), true)
        .await
        .unwrap();
    insert_appointment(&pool, ana, day, time(9, 0), "confirmed").await;

    let validator = validator_at(date(2025, 6, 1));

    for user in [ana, luis] {
        let result = validate(&pool, &validator, &SlotRequest::new(day, time(9, 0), user)).await;
        assert!(matches!(result, Err(BookingError::SlotTaken)));
    }
}

#[tokio::test]
async fn test_completed_appointment_still_holds_slot() {
    let pool = test_helpers::create_test_db().await.unwrap();
    let user_id = test_helpers::insert_test_user(&pool, "Ana", "ana@example.com", "secret123")
        .await
        .unwrap();
    let day = date(2025, 6, 10);
    test_helpers::insert_slot(&pool, day, time(9, 0), true)
        .await
        .unwrap();
    insert_appointment(&pool, user_id, day, time(9, 0), "completed").await;

    let validator = validator_at(date(2025, 6, 1));
    let result = validate(&pool, &validator, &SlotRequest::new(day, time(9, 0), user_id)).await;
    assert!(matches!(result, Err(BookingError::SlotTaken)));
}

#[tokio::test]
async fn test_cancelled_appointment_frees_slot() {
    let pool = test_helpers::create_test_db().await.unwrap();
    let user_id = test_helpers::insert_test_user(&pool, "Ana", "ana@example.com", "secret123")
        .await
        .unwrap();
    let day = date(2025, 6, 10);
    test_helpers::insert_slot(&pool, day, time(9, 0), true)
        .await
        .unwrap();
    insert_appointment(&pool, user_id, day, time(9, 0), "cancelled").await;

    let validator = validator_at(date(2025, 6, 1));
    validate(&pool, &validator, &SlotRequest::new(day, time(9, 0), user_id))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_update_excludes_own_appointment() {
    let pool = test_helpers::create_test_db().await.unwrap();
    let user_id = test_helpers::insert_test_user(&pool, "Ana", "ana@example.com", "secret123")
        .await
        .unwrap();
    let day = date(2025, 6, 10);
    test_helpers::insert_slot(&pool, day, time(9, 0), true)
        .await
        .unwrap();
    let own = insert_appointment(&pool, user_id, day, time(9, 0), "confirmed").await;

    let validator = validator_at(date(2025, 6, 1));

    let keep_slot = SlotRequest::new(day, time(9, 0), user_id).replacing(own);
    validate(&pool, &validator, &keep_slot).await.unwrap();

    let as_other = SlotRequest::new(day, time(9, 0), user_id).replacing(own + 1);
    assert!(matches!(
        validate(&pool, &validator, &as_other).await,
        Err(BookingError::SlotTaken)
    ));
}

#[tokio::test]
async fn test_validate_is_idempotent() {
    let pool = test_helpers::create_test_db().await.unwrap();
    let user_id = test_helpers::insert_test_user(&pool, "Ana", "ana@example.com", "secret123")
        .await
        .unwrap();
    let day = date(2025, 6, 10);
    test_helpers::insert_slot(&pool, day, time(9, 0), true)
        .await
        .unwrap();
    test_helpers::insert_slot(&pool, day, time(10, 0), true)
        .await
        .unwrap();
    insert_appointment(&pool, user_id, day, time(10, 0), "confirmed").await;

    let validator = validator_at(date(2025, 6, 1));

    for request in [
        SlotRequest::new(day, time(9, 0), user_id),
        SlotRequest::new(day, time(10, 0), user_id),
        SlotRequest::new(day, time(11, 0), user_id),
        SlotRequest::new(date(2025, 5, 1), time(9, 0), user_id),
    ] {
        let first = validate(&pool, &validator, &request).await.map_err(|e| e.to_string());
        for _ in 0..3 {
            let again = validate(&pool, &validator, &request).await.map_err(|e| e.to_string());
            assert_eq!(first, again);
        }
    }
}

#[tokio::test]
async fn test_validate_does_not_write() {
    let pool = test_helpers::create_test_db().await.unwrap();
    let day = date(2025, 6, 10);
    test_helpers::insert_slot(&pool, day, time(9, 0), true)
        .await
        .unwrap();

    let validator = validator_at(date(2025, 6, 1));
    validate(&pool, &validator, &SlotRequest::new(day, time(9, 0), 1))
        .await
        .unwrap();

    let appointments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM appointments")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(appointments, 0);
}
