use anyhow::{Context, Result, bail};
use chrono::{DateTime, FixedOffset, NaiveTime};
use meditin_core::domain::value_objects::enums::practice_categories::PracticeCategory;

use super::config_model::{
    BackendServer, Booking, Database, DotEnvyConfig, Paystack, Supabase,
};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let backend_server = BackendServer {
        port: required("SERVER_PORT_BACKEND")?
            .parse()
            .context("SERVER_PORT_BACKEND is invalid")?,
        body_limit: required("SERVER_BODY_LIMIT")?
            .parse()
            .context("SERVER_BODY_LIMIT is invalid")?,
        timeout: required("SERVER_TIMEOUT")?
            .parse()
            .context("SERVER_TIMEOUT is invalid")?,
    };

    let database = Database {
        url: required("DATABASE_URL")?,
    };

    let supabase = Supabase {
        jwt_secret: get_supabase_jwt_secret()?,
    };

    let paystack = Paystack {
        secret_key: required("PAYSTACK_SECRET_KEY")?,
        callback_url: std::env::var("PAYSTACK_CALLBACK_URL")
            .ok()
            .filter(|v| !v.trim().is_empty()),
    };

    Ok(DotEnvyConfig {
        backend_server,
        database,
        supabase,
        paystack,
        booking: load_booking()?,
    })
}

pub fn get_supabase_jwt_secret() -> Result<String> {
    dotenvy::dotenv().ok();
    required("SUPABASE_JWT_SECRET")
}

fn load_booking() -> Result<Booking> {
    let booking = Booking {
        min_lead_days: parse_or("BOOKING_MIN_LEAD_DAYS", 4)?,
        early_bird_days: parse_or("BOOKING_EARLY_BIRD_DAYS", 4)?,
        discount_percent: parse_or("BOOKING_DISCOUNT_PERCENT", 15)?,
        window_start: time_or("BOOKING_WINDOW_START", "08:00")?,
        window_end: time_or("BOOKING_WINDOW_END", "20:00")?,
        time_zone: parse_utc_offset(
            &std::env::var("BOOKING_UTC_OFFSET").unwrap_or_else(|_| "+01:00".to_string()),
        )
        .context("BOOKING_UTC_OFFSET is invalid")?,
        waitlisted_categories: parse_categories(
            &std::env::var("BOOKING_WAITLISTED_CATEGORIES")
                .unwrap_or_else(|_| "INTERVIEW".to_string()),
        )?,
    };

    if !(0..=100).contains(&booking.discount_percent) {
        bail!("BOOKING_DISCOUNT_PERCENT must be between 0 and 100");
    }
    if booking.window_start >= booking.window_end {
        bail!("BOOKING_WINDOW_START must be earlier than BOOKING_WINDOW_END");
    }

    Ok(booking)
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{key} is invalid"))
}

fn parse_or(key: &str, default: i64) -> Result<i64> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} is invalid")),
        _ => Ok(default),
    }
}

fn time_or(key: &str, default: &str) -> Result<NaiveTime> {
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").with_context(|| format!("{key} is invalid"))
}

/// `+01:00` or `+0100`.
pub(crate) fn parse_utc_offset(raw: &str) -> Result<FixedOffset> {
    let stamp = format!("2000-01-01T00:00:00{}", raw.trim());
    let parsed = DateTime::parse_from_str(&stamp, "%Y-%m-%dT%H:%M:%S%z")?;
    Ok(*parsed.offset())
}

/// Comma separated list, e.g. `INTERVIEW,EXAM`. An empty value disables waitlisting.
pub(crate) fn parse_categories(raw: &str) -> Result<Vec<PracticeCategory>> {
    raw.split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| {
            PracticeCategory::from_str(v)
                .with_context(|| format!("BOOKING_WAITLISTED_CATEGORIES has unknown category {v}"))
        })
        .collect()
}
