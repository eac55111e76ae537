// libs/booking-cell/src/services/conflict.rs
use chrono::NaiveTime;
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{DayOfWeek, ScheduleError};

/// Detects overlap between a requested availability range and the slots
/// already persisted for the same professional and day.
pub struct ConflictService {
    supabase: Arc<SupabaseClient>,
}

impl ConflictService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// True when any persisted slot for `professional_id` on `day_of_week`
    /// overlaps `[start_time, end_time]`.
    ///
    /// Boundary semantics are closed-interval containment, checked as three
    /// disjunctive clauses: candidate start inside an existing slot,
    /// candidate end inside an existing slot, or the candidate fully
    /// containing an existing slot. Touching endpoints count as containment.
    pub async fn has_conflict(
        &self,
        professional_id: Uuid,
        day_of_week: DayOfWeek,
        start_time: NaiveTime,
        end_time: NaiveTime,
        auth_token: &str,
    ) -> Result<bool, ScheduleError> {
        debug!(
            "Checking slot conflicts for professional {} on {} from {} to {}",
            professional_id, day_of_week, start_time, end_time
        );

        let path = format!(
            "/rest/v1/slots?professional_id=eq.{}&day_of_week=eq.{}&order=start_time.asc",
            professional_id, day_of_week
        );

        let existing: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| ScheduleError::Database(e.to_string()))?;

        for slot in existing {
            let slot_start = parse_slot_time(&slot, "start_time")?;
            let slot_end = parse_slot_time(&slot, "end_time")?;

            let start_within = slot_start <= start_time && start_time <= slot_end;
            let end_within = slot_start <= end_time && end_time <= slot_end;
            let contains_slot = start_time <= slot_start && end_time >= slot_end;

            if start_within || end_within || contains_slot {
                warn!(
                    "Conflict detected for professional {}: requested {}-{} overlaps {}-{}",
                    professional_id, start_time, end_time, slot_start, slot_end
                );
                return Ok(true);
            }
        }

        Ok(false)
    }
}

fn parse_slot_time(row: &Value, field: &str) -> Result<NaiveTime, ScheduleError> {
    let raw = row[field]
        .as_str()
        .ok_or_else(|| ScheduleError::Database(format!("slot row missing {}", field)))?;

    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|e| ScheduleError::Database(format!("bad {} in slot row: {}", field, e)))
}
