pub mod appointment;
pub mod slot;
pub mod user;

pub use appointment::{Appointment, AppointmentStatus, ClinicService, Receipt};
pub use slot::{AvailableSlot, CalendarDay, SlotRequest, SlotView};
pub use user::User;
