pub mod appointment_service;
pub mod auth_service;
pub mod booking_validator;
pub mod calendar_service;
pub mod clock;
pub mod user_service;

pub use appointment_service::{AppointmentRequest, AppointmentService};
pub use auth_service::AuthService;
pub use booking_validator::{BookingError, BookingValidator};
pub use calendar_service::CalendarService;
pub use clock::{Clock, FixedClock, SystemClock};
pub use user_service::UserService;
