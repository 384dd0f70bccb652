use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::FromRow;
use std::{fmt, str::FromStr};

use super::slot::{display_date, format_date, format_time, parse_date, parse_time};

#[derive(Debug, thiserror::Error)]
#[error("Unknown {kind}: {value}")]
pub struct ParseLabelError {
    kind: &'static str,
    value: String,
}

/// Lifecycle of an appointment.
///
/// Only `Confirmed` has outgoing transitions: the owner may cancel it and
/// the clinic may mark it completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Confirmed,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AppointmentStatus::Confirmed => "Confirmed",
            AppointmentStatus::Cancelled => "Cancelled",
            AppointmentStatus::Completed => "Completed",
        }
    }

    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        matches!(
            (self, next),
            (AppointmentStatus::Confirmed, AppointmentStatus::Cancelled)
                | (AppointmentStatus::Confirmed, AppointmentStatus::Completed)
        )
    }

    /// Whether the appointment still holds its slot.
    pub fn occupies_slot(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = ParseLabelError;

    // Older rows were written with Spanish labels in mixed case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "confirmed" | "confirmada" => Ok(AppointmentStatus::Confirmed),
            "cancelled" | "canceled" | "cancelada" => Ok(AppointmentStatus::Cancelled),
            "completed" | "completada" => Ok(AppointmentStatus::Completed),
            _ => Err(ParseLabelError {
                kind: "appointment status",
                value: s.to_string(),
            }),
        }
    }
}

/// Services offered at the clinic. Stored by label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClinicService {
    GeneralConsultation,
    Vaccination,
    Deworming,
    MinorSurgery,
    Emergency,
    WeightControl,
    DentalCleaning,
}

impl ClinicService {
    pub const ALL: [ClinicService; 7] = [
        ClinicService::GeneralConsultation,
        ClinicService::Vaccination,
        ClinicService::Deworming,
        ClinicService::MinorSurgery,
        ClinicService::Emergency,
        ClinicService::WeightControl,
        ClinicService::DentalCleaning,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ClinicService::GeneralConsultation => "General consultation",
            ClinicService::Vaccination => "Vaccination",
            ClinicService::Deworming => "Deworming",
            ClinicService::MinorSurgery => "Minor surgery",
            ClinicService::Emergency => "Emergency",
            ClinicService::WeightControl => "Weight control",
            ClinicService::DentalCleaning => "Dental cleaning",
        }
    }
}

impl fmt::Display for ClinicService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ClinicService {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|service| service.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ParseLabelError {
                kind: "service",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Appointment {
    pub id: i64,
    pub user_id: i64,
    pub pet_name: String,
    pub service: ClinicService,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: AppointmentStatus,
    pub created_at: String,
}

impl Appointment {
    pub fn date_value(&self) -> String {
        format_date(self.date)
    }

    pub fn date_label(&self) -> String {
        display_date(self.date)
    }

    pub fn time_label(&self) -> String {
        format_time(self.time)
    }

    pub fn service_label(&self) -> &'static str {
        self.service.label()
    }

    pub fn status_label(&self) -> &'static str {
        self.status.label()
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == AppointmentStatus::Confirmed
    }

    /// Receipt number, zero padded to four digits.
    pub fn number(&self) -> String {
        format!("#{:04}", self.id)
    }

    /// Short code printed on the receipt so staff can match it at the desk.
    pub fn reference_code(&self) -> String {
        let seed = format!(
            "Appointment #{} - {} {}",
            self.id,
            self.date_label(),
            self.time_label()
        );
        let digest = Sha256::digest(seed.as_bytes());
        hex::encode(digest)[..8].to_uppercase()
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct AppointmentRow {
    pub id: i64,
    pub user_id: i64,
    pub pet_name: String,
    pub service: String,
    pub appointment_date: String,
    pub appointment_time: String,
    pub status: String,
    pub created_at: String,
}

fn decode<E>(err: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Decode(Box::new(err))
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = sqlx::Error;

    fn try_from(row: AppointmentRow) -> Result<Self, Self::Error> {
        Ok(Appointment {
            id: row.id,
            user_id: row.user_id,
            pet_name: row.pet_name,
            service: row.service.parse().map_err(decode)?,
            date: parse_date(&row.appointment_date).map_err(decode)?,
            time: parse_time(&row.appointment_time).map_err(decode)?,
            status: row.status.parse().map_err(decode)?,
            created_at: row.created_at,
        })
    }
}

/// Everything the printable receipt shows.
#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    pub appointment: Appointment,
    pub owner_name: String,
    pub owner_email: String,
    pub owner_phone: Option<String>,
}

impl Receipt {
    pub fn number(&self) -> String {
        self.appointment.number()
    }

    pub fn reference_code(&self) -> String {
        self.appointment.reference_code()
    }

    pub fn owner_phone_or_empty(&self) -> &str {
        self.owner_phone.as_deref().unwrap_or("")
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct ReceiptRow {
    #[sqlx(flatten)]
    pub appointment: AppointmentRow,
    pub owner_name: String,
    pub owner_email: String,
    pub owner_phone: Option<String>,
}

impl TryFrom<ReceiptRow> for Receipt {
    type Error = sqlx::Error;

    fn try_from(row: ReceiptRow) -> Result<Self, Self::Error> {
        Ok(Receipt {
            appointment: row.appointment.try_into()?,
            owner_name: row.owner_name,
            owner_email: row.owner_email,
            owner_phone: row.owner_phone,
        })
    }
}
