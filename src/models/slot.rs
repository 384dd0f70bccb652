use chrono::{Datelike, NaiveDate, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Storage format for slot and appointment dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Storage format for slot and appointment times (minute precision).
pub const TIME_FORMAT: &str = "%H:%M";

const DISPLAY_DATE_FORMAT: &str = "%d/%m/%Y";

pub fn parse_date(value: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
}

/// Accepts `HH:MM` and `HH:MM:SS`; seconds are dropped.
pub fn parse_time(value: &str) -> Result<NaiveTime, chrono::ParseError> {
    let value = value.trim();
    let time = NaiveTime::parse_from_str(value, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))?;
    Ok(time.with_second(0).unwrap_or(time))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

pub fn display_date(date: NaiveDate) -> String {
    date.format(DISPLAY_DATE_FORMAT).to_string()
}

pub fn weekday_name(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// A clinic-defined bookable window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableSlot {
    pub id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub is_available: bool,
}

impl AvailableSlot {
    pub fn date_label(&self) -> String {
        format_date(self.date)
    }

    pub fn time_label(&self) -> String {
        format_time(self.time)
    }
}

/// Raw `available_slots` row; dates and times are stored as text.
#[derive(Debug, FromRow)]
pub(crate) struct AvailableSlotRow {
    pub id: i64,
    pub slot_date: String,
    pub slot_time: String,
    pub is_available: bool,
}

impl TryFrom<AvailableSlotRow> for AvailableSlot {
    type Error = sqlx::Error;

    fn try_from(row: AvailableSlotRow) -> Result<Self, Self::Error> {
        Ok(AvailableSlot {
            id: row.id,
            date: parse_date(&row.slot_date).map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            time: parse_time(&row.slot_time).map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            is_available: row.is_available,
        })
    }
}

/// Input to the booking validator.
///
/// `acting_user_id` comes from the authenticated session and is trusted as
/// given. `replacing` names the appointment being moved during an update so
/// it does not count as occupying its own slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRequest {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub acting_user_id: i64,
    pub replacing: Option<i64>,
}

impl SlotRequest {
    pub fn new(date: NaiveDate, time: NaiveTime, acting_user_id: i64) -> Self {
        Self {
            date,
            time,
            acting_user_id,
            replacing: None,
        }
    }

    pub fn replacing(mut self, appointment_id: i64) -> Self {
        self.replacing = Some(appointment_id);
        self
    }
}

/// One time entry of a calendar day.
#[derive(Debug, Clone, Serialize)]
pub struct SlotView {
    pub time: String,
    pub available: bool,
}

/// One day of the booking calendar.
#[derive(Debug, Clone, Serialize)]
pub struct CalendarDay {
    pub date: String,
    pub label: String,
    pub weekday: String,
    pub slots: Vec<SlotView>,
}

impl CalendarDay {
    pub fn has_free_slots(&self) -> bool {
        self.slots.iter().any(|slot| slot.available)
    }
}
