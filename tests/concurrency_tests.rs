use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use clinic_booking::{
    models::{AppointmentStatus, ClinicService},
    services::{AppointmentRequest, AppointmentService, BookingError, BookingValidator},
    test_utils::test_helpers,
};
use sqlx::SqlitePool;
use tokio::sync::Barrier;

const CONTENDERS: usize = 8;

fn slot_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
}

fn slot_time() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_simultaneous_bookings_have_exactly_one_winner() {
    let (pool, _db_file) = test_helpers::create_test_db_file(CONTENDERS as u32)
        .await
        .unwrap();
    test_helpers::insert_slot(&pool, slot_date(), slot_time(), true)
        .await
        .unwrap();

    let mut owners = Vec::with_capacity(CONTENDERS);
    for i in 0..CONTENDERS {
        let id = test_helpers::insert_test_user(
            &pool,
            &format!("Owner {i}"),
            &format!("owner{i}@example.com"),
            "secret123",
        )
        .await
        .unwrap();
        owners.push(id);
    }

    let validator = BookingValidator::new(test_helpers::fixed_clock(
        NaiveDate::from_ymd_opt(2025, 6, 9).unwrap(),
    ));
    let service = Arc::new(AppointmentService::new(pool.clone(), validator));
    let barrier = Arc::new(Barrier::new(CONTENDERS));

    let handles: Vec<_> = owners
        .into_iter()
        .map(|owner| {
            let service = service.clone();
            let barrier = barrier.clone();
            tokio::spawn(async move {
                barrier.wait().await;
                service
                    .book(
                        owner,
                        AppointmentRequest {
                            pet_name: format!("Pet of {owner}"),
                            service: ClinicService::GeneralConsultation,
                            date: slot_date(),
                            time: slot_time(),
                        },
                    )
                    .await
            })
        })
        .collect();

    let mut booked = 0;
    let mut taken = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => booked += 1,
            Err(BookingError::SlotTaken) => taken += 1,
            Err(other) => panic!("unexpected booking error: {other:?}"),
        }
    }

    assert_eq!(booked, 1);
    assert_eq!(taken, CONTENDERS - 1);

    let active: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM appointments WHERE appointment_date = '2025-06-10' AND appointment_time = '09:00'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(active, 1);
}

fn request(pet_name: String, date: NaiveDate, time: NaiveTime) -> AppointmentRequest {
    AppointmentRequest {
        pet_name,
        service: ClinicService::Vaccination,
        date,
        time,
    }
}

/// One owner per contender, each holding a confirmed appointment on its own
/// slot the day after `slot_date()`.
async fn owners_with_appointments(
    pool: &SqlitePool,
    service: &AppointmentService,
) -> Vec<(i64, i64)> {
    let own_day = NaiveDate::from_ymd_opt(2025, 6, 11).unwrap();
    let mut held = Vec::with_capacity(CONTENDERS);
    for i in 0..CONTENDERS {
        let owner = test_helpers::insert_test_user(
            pool,
            &format!("Owner {i}"),
            &format!("owner{i}@example.com"),
            "secret123",
        )
        .await
        .unwrap();
        let own_time = NaiveTime::from_hms_opt(9 + i as u32, 0, 0).unwrap();
        test_helpers::insert_slot(pool, own_day, own_time, true)
            .await
            .unwrap();
        let appointment = service
            .book(owner, request(format!("Pet of {owner}"), own_day, own_time))
            .await
            .unwrap();
        held.push((owner, appointment.id));
    }
    held
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_simultaneous_moves_onto_one_slot_have_exactly_one_winner() {
    let (pool, _db_file) = test_helpers::create_test_db_file(CONTENDERS as u32)
        .await
        .unwrap();
    let target_time = NaiveTime::from_hms_opt(7, 0, 0).unwrap();
    test_helpers::insert_slot(&pool, slot_date(), target_time, true)
        .await
        .unwrap();

    let validator = BookingValidator::new(test_helpers::fixed_clock(
        NaiveDate::from_ymd_opt(2025, 6, 9).unwrap(),
    ));
    let service = Arc::new(AppointmentService::new(pool.clone(), validator));
    let held = owners_with_appointments(&pool, &service).await;
    let barrier = Arc::new(Barrier::new(CONTENDERS));

    let handles: Vec<_> = held
        .into_iter()
        .map(|(owner, appointment_id)| {
            let service = service.clone();
            let barrier = barrier.clone();
            tokio::spawn(async move {
                barrier.wait().await;
                service
                    .update(
                        owner,
                        appointment_id,
                        request(format!("Pet of {owner}"), slot_date(), target_time),
                    )
                    .await
            })
        })
        .collect();

    let mut moved = 0;
    let mut taken = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => moved += 1,
            Err(BookingError::SlotTaken) => taken += 1,
            Err(other) => panic!("unexpected update error: {other:?}"),
        }
    }

    assert_eq!(moved, 1);
    assert_eq!(taken, CONTENDERS - 1);

    let on_target: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM appointments WHERE appointment_date = '2025-06-10' AND appointment_time = '07:00'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(on_target, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_cancel_and_complete_apply_exactly_one_transition() {
    let (pool, _db_file) = test_helpers::create_test_db_file(CONTENDERS as u32)
        .await
        .unwrap();
    let validator = BookingValidator::new(test_helpers::fixed_clock(
        NaiveDate::from_ymd_opt(2025, 6, 9).unwrap(),
    ));
    let service = Arc::new(AppointmentService::new(pool.clone(), validator));
    let held = owners_with_appointments(&pool, &service).await;
    let barrier = Arc::new(Barrier::new(CONTENDERS * 2));

    let mut handles = Vec::with_capacity(CONTENDERS * 2);
    for (owner, appointment_id) in held.iter().copied() {
        let (cancel_service, cancel_barrier) = (service.clone(), barrier.clone());
        handles.push(tokio::spawn(async move {
            cancel_barrier.wait().await;
            cancel_service.cancel(owner, appointment_id).await
        }));
        let (complete_service, complete_barrier) = (service.clone(), barrier.clone());
        handles.push(tokio::spawn(async move {
            complete_barrier.wait().await;
            complete_service.complete(appointment_id).await
        }));
    }

    let mut applied = 0;
    let mut refused = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => applied += 1,
            Err(BookingError::InvalidTransition { .. }) => refused += 1,
            Err(other) => panic!("unexpected transition error: {other:?}"),
        }
    }

    assert_eq!(applied, CONTENDERS);
    assert_eq!(refused, CONTENDERS);

    for (owner, appointment_id) in held {
        let status = service
            .find_for_user(owner, appointment_id)
            .await
            .unwrap()
            .status;
        assert_ne!(status, AppointmentStatus::Confirmed);
    }
}

#[tokio::test]
async fn test_unique_index_rejects_second_active_row() {
    let pool = test_helpers::create_test_db().await.unwrap();
    let owner = test_helpers::insert_test_user(&pool, "Ana", "ana@example.com", "secret123")
        .await
        .unwrap();

    let insert = |status: &'static str| {
        sqlx::query(
            r#"
            INSERT INTO appointments
                (user_id, pet_name, service, appointment_date, appointment_time, status)
            VALUES (?, 'Luna', 'Vaccination', '2025-06-10', '09:00', ?)
            "#,
        )
        .bind(owner)
        .bind(status)
        .execute(&pool)
    };

    insert("cancelled").await.unwrap();
    insert("cancelled").await.unwrap();
    insert("confirmed").await.unwrap();

    let err = insert("confirmed").await.unwrap_err();
    match err {
        sqlx::Error::Database(db) => assert!(db.is_unique_violation()),
        other => panic!("expected unique violation, got {other:?}"),
    }
}
