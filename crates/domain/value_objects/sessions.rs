use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::sessions::SessionEntity;
use crate::domain::value_objects::settlements::SettlementDto;
use crate::domain::value_objects::enums::{purposes::Purpose, session_statuses::SessionStatus};

/// Field value that requires the candidate to type their own field name.
pub const OTHER_FIELD: &str = "Other Professional Fields";

/// Raw booking form as submitted. Parsed and validated by the booking use case.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateSessionModel {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub contact_email: String,
    #[serde(default)]
    pub institution: Option<String>,
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub custom_field: Option<String>,
    #[serde(default)]
    pub purpose: String,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub scheduled_date: String,
    /// `HH:MM` local time
    #[serde(default)]
    pub scheduled_time: String,
    #[serde(default)]
    pub profile: SessionProfile,
}

/// Optional self-description used to tailor the session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionProfile {
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub strengths: Option<String>,
    #[serde(default)]
    pub weaknesses: Option<String>,
    #[serde(default)]
    pub goals: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionSearchFilter {
    #[serde(default, rename = "q")]
    pub term: Option<String>,
    #[serde(default)]
    pub status: Option<SessionStatus>,
    #[serde(default)]
    pub limit: Option<i64>,
}

impl SessionSearchFilter {
    pub fn matches(&self, session: &SessionEntity) -> bool {
        if let Some(status) = self.status {
            if session.status != status {
                return false;
            }
        }

        match self.term.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            Some(term) => {
                let term = term.to_lowercase();
                session.full_name.to_lowercase().contains(&term)
                    || session.contact_email.to_lowercase().contains(&term)
                    || session.field.to_lowercase().contains(&term)
            }
            None => true,
        }
    }
}

/// Headline numbers for the admin console.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct BookingStats {
    pub total: i64,
    pub paid: i64,
    pub pending: i64,
    /// Whole percent of sessions that are paid, rounded half-up. Zero when there are none.
    pub paid_conversion_percent: i64,
}

impl BookingStats {
    pub fn from_counts(total: i64, paid: i64) -> Self {
        let paid_conversion_percent = if total > 0 {
            (paid * 200 + total) / (total * 2)
        } else {
            0
        };

        Self {
            total,
            paid,
            pending: total - paid,
            paid_conversion_percent,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionDto {
    pub id: Uuid,
    pub full_name: String,
    pub contact_email: String,
    pub institution: Option<String>,
    pub field: String,
    pub custom_field: Option<String>,
    pub purpose: Purpose,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    pub profile: SessionProfile,
    pub selected_plan_id: Option<String>,
    pub status: SessionStatus,
    pub paid: bool,
    pub committed_charge: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl From<SessionEntity> for SessionDto {
    fn from(value: SessionEntity) -> Self {
        Self {
            id: value.id,
            full_name: value.full_name,
            contact_email: value.contact_email,
            institution: value.institution,
            field: value.field,
            custom_field: value.custom_field,
            purpose: value.purpose,
            scheduled_date: value.scheduled_date,
            scheduled_time: value.scheduled_time,
            profile: value.profile,
            selected_plan_id: value.selected_plan_id,
            status: value.status,
            paid: value.paid,
            committed_charge: value.committed_charge,
            created_at: value.created_at,
        }
    }
}

/// A session together with every charge recorded against it.
#[derive(Debug, Clone, Serialize)]
pub struct SessionDetailDto {
    #[serde(flatten)]
    pub session: SessionDto,
    pub settlements: Vec<SettlementDto>,
}
