use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
        }
    }

    pub fn with_url(url: &str) -> AppConfig {
        let mut config = Self::default();
        config.supabase_url = url.to_string();
        config.to_app_config()
    }
}

/// Canned PostgREST row payloads for wiremock-backed service tests.
pub struct MockSupabaseRows;

impl MockSupabaseRows {
    pub fn slot_row(
        id: Uuid,
        professional_id: Uuid,
        day_of_week: &str,
        start_time: &str,
        end_time: &str,
        is_booked: bool,
    ) -> Value {
        json!({
            "id": id,
            "professional_id": professional_id,
            "day_of_week": day_of_week,
            "start_time": start_time,
            "end_time": end_time,
            "is_booked": is_booked,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        })
    }

    pub fn professional_row(id: Uuid, email: &str, full_name: &str) -> Value {
        json!({
            "id": id,
            "full_name": full_name,
            "email": email,
            "created_at": Utc::now().to_rfc3339()
        })
    }

    pub fn user_row(id: Uuid, email: &str, full_name: &str) -> Value {
        json!({
            "id": id,
            "full_name": full_name,
            "email": email,
            "created_at": Utc::now().to_rfc3339()
        })
    }

    pub fn booking_row(id: Uuid, user_id: Uuid, slot_id: Uuid) -> Value {
        json!({
            "id": id,
            "user_id": user_id,
            "slot_id": slot_id,
            "created_at": Utc::now().to_rfc3339()
        })
    }
}
