// libs/booking-cell/src/services/availability.rs
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    CreateAvailabilityRequest, DayOfWeek, ScheduleError, Slot, SlotFilters,
};
use crate::services::conflict::ConflictService;
use crate::services::slots::{generate_slots, is_valid_time_slot};

/// Create/read/update/delete of published slots, with ownership checks and
/// booked-slot immutability.
pub struct AvailabilityService {
    supabase: Arc<SupabaseClient>,
    conflict: ConflictService,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        Self {
            conflict: ConflictService::new(supabase.clone()),
            supabase,
        }
    }

    /// Publish availability for a professional: expand the requested range
    /// into discrete 30-minute slots and persist them as one batch. Any
    /// overlap with an existing slot rejects the whole request, so a batch
    /// is never partially inserted.
    pub async fn create_availability(
        &self,
        professional_id: Uuid,
        request: CreateAvailabilityRequest,
        auth_token: &str,
    ) -> Result<Vec<Slot>, ScheduleError> {
        debug!("Creating availability for professional: {}", professional_id);

        // Ownership: the requesting identity must resolve to a known professional.
        if !self.professional_exists(professional_id, auth_token).await? {
            return Err(ScheduleError::Unauthorized);
        }

        if !is_valid_time_slot(request.start_time) || !is_valid_time_slot(request.end_time) {
            return Err(ScheduleError::InvalidGranularity);
        }

        let generated = generate_slots(&request.day_of_week, request.start_time, request.end_time)?;

        if generated.is_empty() {
            return Err(ScheduleError::NoSlotsGenerated);
        }

        let day_of_week = generated[0].day_of_week;

        // Conflicts are checked against the raw requested range, not per slot.
        if self.conflict.has_conflict(
            professional_id,
            day_of_week,
            request.start_time,
            request.end_time,
            auth_token,
        ).await? {
            return Err(ScheduleError::Conflict);
        }

        let now = Utc::now().to_rfc3339();
        let rows: Vec<Value> = generated.iter().map(|slot| {
            json!({
                "professional_id": professional_id,
                "day_of_week": slot.day_of_week.to_string(),
                "start_time": slot.start_time.format("%H:%M:%S").to_string(),
                "end_time": slot.end_time.format("%H:%M:%S").to_string(),
                "is_booked": false,
                "created_at": now,
                "updated_at": now
            })
        }).collect();

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/slots",
            Some(auth_token),
            Some(Value::Array(rows)),
            Some(headers),
        ).await.map_err(|e| ScheduleError::Database(e.to_string()))?;

        if result.is_empty() {
            return Err(ScheduleError::Database("failed to create slots".to_string()));
        }

        let created: Vec<Slot> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Slot>, _>>()
            .map_err(|e| ScheduleError::Database(format!("failed to parse slots: {}", e)))?;

        debug!("Created {} slots for professional {}", created.len(), professional_id);
        Ok(created)
    }

    /// List slots with optional, independently combinable filters, ordered
    /// by day of week then start time. An empty result is a valid outcome.
    pub async fn list_slots(
        &self,
        filters: &SlotFilters,
        auth_token: &str,
    ) -> Result<Vec<Slot>, ScheduleError> {
        let mut query_parts = Vec::new();

        if let Some(start_time) = filters.start_time {
            query_parts.push(format!("start_time=gte.{}", start_time.format("%H:%M:%S")));
        }
        if let Some(end_time) = filters.end_time {
            query_parts.push(format!("end_time=lte.{}", end_time.format("%H:%M:%S")));
        }
        if let Some(ref day) = filters.day_of_week {
            // Filters match by the normalized literal; an unrecognized day
            // simply matches nothing rather than failing the listing.
            query_parts.push(format!("day_of_week=eq.{}", day.to_uppercase()));
        }
        if let Some(is_booked) = filters.is_booked {
            query_parts.push(format!("is_booked=eq.{}", is_booked));
        }

        query_parts.push("order=day_of_week.asc,start_time.asc".to_string());

        let path = format!("/rest/v1/slots?{}", query_parts.join("&"));
        self.fetch_slots(&path, auth_token).await
    }

    pub async fn get_slot(
        &self,
        slot_id: Uuid,
        auth_token: &str,
    ) -> Result<Slot, ScheduleError> {
        let path = format!("/rest/v1/slots?id=eq.{}", slot_id);
        let slots = self.fetch_slots(&path, auth_token).await?;

        slots.into_iter().next().ok_or(ScheduleError::NotFound)
    }

    /// A professional's unbooked slots, most recently published first.
    pub async fn get_slots_by_professional(
        &self,
        professional_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Slot>, ScheduleError> {
        let path = format!(
            "/rest/v1/slots?professional_id=eq.{}&is_booked=eq.false&order=created_at.desc,day_of_week.asc,start_time.asc",
            professional_id
        );
        self.fetch_slots(&path, auth_token).await
    }

    /// Move an unbooked slot to another weekday. Only the day-of-week field
    /// is mutable; a booked slot rejects the update outright.
    pub async fn update_availability(
        &self,
        slot_id: Uuid,
        new_day_of_week: &str,
        professional_id: Uuid,
        auth_token: &str,
    ) -> Result<Slot, ScheduleError> {
        debug!("Updating availability: {}", slot_id);

        let slot = self.get_slot(slot_id, auth_token).await?;

        if slot.professional_id != professional_id {
            warn!(
                "Professional {} attempted to update slot {} owned by {}",
                professional_id, slot_id, slot.professional_id
            );
            return Err(ScheduleError::Unauthorized);
        }

        if slot.is_booked {
            return Err(ScheduleError::BookedImmutable);
        }

        let day: DayOfWeek = new_day_of_week.parse()?;

        let update_data = json!({
            "day_of_week": day.to_string(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let path = format!("/rest/v1/slots?id=eq.{}", slot_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(update_data),
            Some(headers),
        ).await.map_err(|e| ScheduleError::Database(e.to_string()))?;

        let updated = result.into_iter().next().ok_or(ScheduleError::NotFound)?;

        serde_json::from_value(updated)
            .map_err(|e| ScheduleError::Database(format!("failed to parse slot: {}", e)))
    }

    /// Remove a slot after the same existence/ownership checks as update.
    /// Booked slots are deletable; only updates are restricted.
    pub async fn delete_availability(
        &self,
        slot_id: Uuid,
        professional_id: Uuid,
        auth_token: &str,
    ) -> Result<(), ScheduleError> {
        debug!("Deleting availability: {}", slot_id);

        let slot = self.get_slot(slot_id, auth_token).await?;

        if slot.professional_id != professional_id {
            warn!(
                "Professional {} attempted to delete slot {} owned by {}",
                professional_id, slot_id, slot.professional_id
            );
            return Err(ScheduleError::Unauthorized);
        }

        let path = format!("/rest/v1/slots?id=eq.{}", slot_id);
        let _: Vec<Value> = self.supabase.request(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| ScheduleError::Database(e.to_string()))?;

        Ok(())
    }

    // Private helper methods

    async fn professional_exists(
        &self,
        professional_id: Uuid,
        auth_token: &str,
    ) -> Result<bool, ScheduleError> {
        let path = format!("/rest/v1/professionals?id=eq.{}", professional_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| ScheduleError::Database(e.to_string()))?;

        Ok(!result.is_empty())
    }

    async fn fetch_slots(&self, path: &str, auth_token: &str) -> Result<Vec<Slot>, ScheduleError> {
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            path,
            Some(auth_token),
            None,
        ).await.map_err(|e| ScheduleError::Database(e.to_string()))?;

        result.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Slot>, _>>()
            .map_err(|e| ScheduleError::Database(format!("failed to parse slots: {}", e)))
    }
}
