use anyhow::{Result, anyhow};
use meditin_core::domain::value_objects::sessions::SessionDto;

pub const EXPORT_HEADERS: [&str; 9] = [
    "FullName",
    "Email",
    "Institution",
    "Sector",
    "Field",
    "Nature",
    "Date",
    "Time",
    "Paid",
];

/// A CSV download of admin search results.
#[derive(Debug, Clone)]
pub struct BookingExport {
    pub filename: String,
    pub body: Vec<u8>,
    pub rows: usize,
}

/// One row per session. The header row is written even when there are no sessions.
pub fn sessions_to_csv(sessions: &[SessionDto]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(EXPORT_HEADERS)?;

    for session in sessions {
        let date = session.scheduled_date.format("%Y-%m-%d").to_string();
        let time = session.scheduled_time.format("%H:%M").to_string();
        writer.write_record([
            session.full_name.as_str(),
            session.contact_email.as_str(),
            session.institution.as_deref().unwrap_or_default(),
            session.field.as_str(),
            session.custom_field.as_deref().unwrap_or_default(),
            session.purpose.as_str(),
            date.as_str(),
            time.as_str(),
            if session.paid { "YES" } else { "NO" },
        ])?;
    }

    writer
        .into_inner()
        .map_err(|err| anyhow!("failed to flush booking export: {}", err.error()))
}
