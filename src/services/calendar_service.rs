use std::sync::Arc;

use chrono::Duration;

use crate::models::{
    slot::{display_date, format_date, format_time, weekday_name},
    CalendarDay, SlotView,
};
use crate::repositories::{RepositoryResult, SlotRepository};
use crate::services::clock::Clock;

pub const DEFAULT_CALENDAR_DAYS: u32 = 7;

/// Builds the booking calendar shown on the dashboard.
pub struct CalendarService {
    slots: Arc<dyn SlotRepository>,
    clock: Arc<dyn Clock>,
}

impl CalendarService {
    pub fn new(slots: Arc<dyn SlotRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { slots, clock }
    }

    /// `days` consecutive days starting today, every day present even when
    /// the clinic has no slots on it.
    pub async fn build(&self, days: u32) -> RepositoryResult<Vec<CalendarDay>> {
        let days = days.max(1);
        let now = self.clock.now();
        let first = now.date();
        let last = first + Duration::days(i64::from(days) - 1);

        let occupancy = self.slots.occupancy_between(first, last).await?;

        let calendar = (0..i64::from(days))
            .map(|offset| {
                let date = first + Duration::days(offset);
                let slots = occupancy
                    .iter()
                    .filter(|entry| entry.slot.date == date)
                    .map(|entry| SlotView {
                        time: format_time(entry.slot.time),
                        available: entry.slot.is_available
                            && !entry.taken
                            && date.and_time(entry.slot.time) >= now,
                    })
                    .collect();

                CalendarDay {
                    date: format_date(date),
                    label: display_date(date),
                    weekday: weekday_name(date).to_string(),
                    slots,
                }
            })
            .collect();

        Ok(calendar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AvailableSlot;
    use crate::repositories::slot_repository::{MockSlotRepository, SlotOccupancy};
    use crate::services::clock::FixedClock;
    use chrono::{NaiveDate, NaiveTime};
    use mockall::predicate::*;

    fn occupancy(id: i64, date: NaiveDate, hour: u32, open: bool, taken: bool) -> SlotOccupancy {
        SlotOccupancy {
            slot: AvailableSlot {
                id,
                date,
                time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
                is_available: open,
            },
            taken,
        }
    }

    #[tokio::test]
    async fn test_build_marks_availability() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let tomorrow = today + Duration::days(1);
        let now = today.and_hms_opt(10, 30, 0).unwrap();

        let rows = vec![
            occupancy(1, today, 9, true, false),
            occupancy(2, today, 11, true, false),
            occupancy(3, tomorrow, 9, true, true),
            occupancy(4, tomorrow, 10, false, false),
            occupancy(5, tomorrow, 11, true, false),
        ];

        let mut repo = MockSlotRepository::new();
        repo.expect_occupancy_between()
            .with(eq(today), eq(today + Duration::days(2)))
            .times(1)
            .returning(move |_, _| {
                let rows = rows.clone();
                Box::pin(async move { Ok(rows) })
            });

        let service = CalendarService::new(Arc::new(repo), Arc::new(FixedClock(now)));
        let calendar = service.build(3).await.unwrap();

        assert_eq!(calendar.len(), 3);
        assert_eq!(calendar[0].date, "2025-06-10");
        assert_eq!(calendar[0].label, "10/06/2025");
        assert_eq!(calendar[0].weekday, "Tuesday");

        let today_slots: Vec<(&str, bool)> = calendar[0]
            .slots
            .iter()
            .map(|s| (s.time.as_str(), s.available))
            .collect();
        assert_eq!(today_slots, vec![("09:00", false), ("11:00", true)]);

        let tomorrow_slots: Vec<bool> = calendar[1].slots.iter().map(|s| s.available).collect();
        assert_eq!(tomorrow_slots, vec![false, false, true]);

        assert!(calendar[2].slots.is_empty());
        assert!(!calendar[2].has_free_slots());
    }
}
