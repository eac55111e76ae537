// libs/booking-cell/src/services/slots.rs
use chrono::{NaiveTime, Timelike};

use crate::models::{DayOfWeek, GeneratedSlot, ScheduleError};

/// Fixed slot granularity. Every published slot is exactly this long and
/// every slot boundary lies on this grid.
pub const SLOT_MINUTES: u32 = 30;

/// A time is a valid slot boundary when it sits on the half-hour grid.
pub fn is_valid_time_slot(time: NaiveTime) -> bool {
    time.minute() % SLOT_MINUTES == 0
}

/// Split `[start_time, end_time]` on `day_of_week` into discrete 30-minute
/// slot descriptors, ascending and contiguous. Only windows fully contained
/// in the range are emitted, so a trailing partial interval is dropped and
/// `start_time == end_time` yields nothing.
///
/// Arithmetic is over minutes since midnight; no calendar date is involved
/// since only the weekday and time of day are meaningful to a recurring slot.
pub fn generate_slots(
    day_of_week: &str,
    start_time: NaiveTime,
    end_time: NaiveTime,
) -> Result<Vec<GeneratedSlot>, ScheduleError> {
    let day: DayOfWeek = day_of_week.parse()?;

    let start = minutes_from_midnight(start_time);
    let end = minutes_from_midnight(end_time);

    let mut slots = Vec::new();
    let mut cursor = start;

    while cursor + SLOT_MINUTES <= end {
        slots.push(GeneratedSlot {
            day_of_week: day,
            start_time: time_at_minutes(cursor),
            end_time: time_at_minutes(cursor + SLOT_MINUTES),
        });
        cursor += SLOT_MINUTES;
    }

    Ok(slots)
}

fn minutes_from_midnight(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

fn time_at_minutes(minutes: u32) -> NaiveTime {
    // minutes stays within a single day: the walk starts from a NaiveTime
    // and never crosses midnight.
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
        .unwrap_or(NaiveTime::MIN)
}
