use chrono::{FixedOffset, NaiveTime};
use meditin_core::domain::value_objects::enums::practice_categories::PracticeCategory;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub backend_server: BackendServer,
    pub database: Database,
    pub supabase: Supabase,
    pub paystack: Paystack,
    pub booking: Booking,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct Supabase {
    pub jwt_secret: String,
}

#[derive(Debug, Clone)]
pub struct Paystack {
    pub secret_key: String,
    pub callback_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Booking {
    pub min_lead_days: i64,
    pub early_bird_days: i64,
    pub discount_percent: i64,
    pub window_start: NaiveTime,
    pub window_end: NaiveTime,
    pub time_zone: FixedOffset,
    /// Categories routed to the waiting list at checkout.
    pub waitlisted_categories: Vec<PracticeCategory>,
}
