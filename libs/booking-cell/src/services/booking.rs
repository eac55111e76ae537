// libs/booking-cell/src/services/booking.rs
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{BookSessionResponse, Booking, ScheduleError, Slot, User};

/// Books a one-hour session: claims the target slot and its chronological
/// successor, and records the booking.
pub struct BookingService {
    supabase: Arc<SupabaseClient>,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    /// Reserve `slot_id` for `user_id`.
    ///
    /// The slot is claimed with a guarded conditional update
    /// (`id=eq.{slot}&is_booked=eq.false`): two concurrent callers can both
    /// read the slot as free, but only the one whose update matches a row
    /// wins; the loser gets `AlreadyBooked` and no booking record is
    /// created. The booking row is only inserted after the claim succeeds.
    ///
    /// A session spans one hour, so the slot starting exactly where this one
    /// ends (same professional, same day) is claimed as well when it exists
    /// and is still free.
    pub async fn book_session(
        &self,
        slot_id: Uuid,
        user_id: Uuid,
        auth_token: &str,
    ) -> Result<BookSessionResponse, ScheduleError> {
        debug!("Booking slot {} for user {}", slot_id, user_id);

        if self.fetch_user(user_id, auth_token).await?.is_none() {
            return Err(ScheduleError::Unauthorized);
        }

        let slot = self.fetch_slot(slot_id, auth_token).await?
            .ok_or(ScheduleError::SlotNotFound)?;

        if slot.is_booked {
            return Err(ScheduleError::AlreadyBooked);
        }

        if !self.claim_slot(slot_id, auth_token).await? {
            warn!("Lost booking race for slot {}", slot_id);
            return Err(ScheduleError::AlreadyBooked);
        }

        let booking = self.create_booking(user_id, slot_id, auth_token).await?;

        self.claim_successor_slot(&slot, auth_token).await?;

        // Fetched again after booking for the response payload.
        let user = self.fetch_user(user_id, auth_token).await?
            .ok_or(ScheduleError::Unauthorized)?;

        debug!("Booked slot {} for user {} (booking {})", slot_id, user_id, booking.id);
        Ok(BookSessionResponse { booking, user })
    }

    // Private helper methods

    async fn fetch_user(
        &self,
        user_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<User>, ScheduleError> {
        let path = format!("/rest/v1/users?id=eq.{}", user_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| ScheduleError::Database(e.to_string()))?;

        match result.into_iter().next() {
            Some(row) => serde_json::from_value(row)
                .map(Some)
                .map_err(|e| ScheduleError::Database(format!("failed to parse user: {}", e))),
            None => Ok(None),
        }
    }

    async fn fetch_slot(
        &self,
        slot_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<Slot>, ScheduleError> {
        let path = format!("/rest/v1/slots?id=eq.{}", slot_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| ScheduleError::Database(e.to_string()))?;

        match result.into_iter().next() {
            Some(row) => serde_json::from_value(row)
                .map(Some)
                .map_err(|e| ScheduleError::Database(format!("failed to parse slot: {}", e))),
            None => Ok(None),
        }
    }

    /// Conditional flip of `is_booked`. Returns false when no row matched,
    /// meaning a concurrent caller already holds the slot.
    async fn claim_slot(&self, slot_id: Uuid, auth_token: &str) -> Result<bool, ScheduleError> {
        let path = format!("/rest/v1/slots?id=eq.{}&is_booked=eq.false", slot_id);

        let update_data = json!({
            "is_booked": true,
            "updated_at": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(update_data),
            Some(headers),
        ).await.map_err(|e| ScheduleError::Database(e.to_string()))?;

        Ok(!result.is_empty())
    }

    async fn create_booking(
        &self,
        user_id: Uuid,
        slot_id: Uuid,
        auth_token: &str,
    ) -> Result<Booking, ScheduleError> {
        let booking_data = json!({
            "user_id": user_id,
            "slot_id": slot_id,
            "created_at": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/bookings",
            Some(auth_token),
            Some(booking_data),
            Some(headers),
        ).await.map_err(|e| ScheduleError::Database(e.to_string()))?;

        let row = result.into_iter().next()
            .ok_or_else(|| ScheduleError::Database("failed to create booking".to_string()))?;

        serde_json::from_value(row)
            .map_err(|e| ScheduleError::Database(format!("failed to parse booking: {}", e)))
    }

    /// Claim the slot that starts exactly where the booked one ends, for the
    /// same professional on the same day. Absence of a successor, or a
    /// successor already taken, is not an error.
    async fn claim_successor_slot(&self, slot: &Slot, auth_token: &str) -> Result<(), ScheduleError> {
        let path = format!(
            "/rest/v1/slots?professional_id=eq.{}&day_of_week=eq.{}&start_time=eq.{}&is_booked=eq.false",
            slot.professional_id,
            slot.day_of_week,
            slot.end_time.format("%H:%M:%S")
        );

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| ScheduleError::Database(e.to_string()))?;

        let Some(row) = result.into_iter().next() else {
            debug!("No successor slot after {} on {}", slot.end_time, slot.day_of_week);
            return Ok(());
        };

        let successor: Slot = serde_json::from_value(row)
            .map_err(|e| ScheduleError::Database(format!("failed to parse slot: {}", e)))?;

        if !self.claim_slot(successor.id, auth_token).await? {
            debug!("Successor slot {} was claimed concurrently", successor.id);
        }

        Ok(())
    }
}
