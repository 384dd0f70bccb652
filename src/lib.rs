pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;

// Make test_utils available for both unit tests and integration tests
pub mod test_utils;

use std::sync::Arc;

use repositories::{SqliteSlotRepository, SqliteUserRepository};
use services::{
    AppointmentService, AuthService, BookingValidator, CalendarService, Clock, UserService,
};

#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub auth_service: Arc<AuthService>,
    pub appointment_service: Arc<AppointmentService>,
    pub calendar_service: Arc<CalendarService>,
    pub calendar_days: u32,
    pub clock: Arc<dyn Clock>,
    pub pool: sqlx::SqlitePool,
}

impl AppState {
    /// Wires repositories and services over one pool and one clock.
    pub fn new(pool: sqlx::SqlitePool, clock: Arc<dyn Clock>, calendar_days: u32) -> Self {
        let user_repository = Arc::new(SqliteUserRepository::new(pool.clone()));
        let slot_repository = Arc::new(SqliteSlotRepository::new(pool.clone()));

        let validator = BookingValidator::new(clock.clone());

        Self {
            user_service: Arc::new(UserService::new(user_repository.clone())),
            auth_service: Arc::new(AuthService::new(user_repository)),
            appointment_service: Arc::new(AppointmentService::new(pool.clone(), validator)),
            calendar_service: Arc::new(CalendarService::new(slot_repository, clock.clone())),
            calendar_days,
            clock,
            pool,
        }
    }
}
