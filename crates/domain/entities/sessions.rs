use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::value_objects::{
        enums::{
            practice_categories::PracticeCategory, purposes::Purpose,
            session_statuses::SessionStatus,
        },
        sessions::{OTHER_FIELD, SessionProfile},
    },
    infra::db::postgres::schema::practice_sessions,
};

/// One booking request, tracked from creation to a terminal state.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEntity {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub contact_email: String,
    pub full_name: String,
    pub institution: Option<String>,
    pub field: String,
    pub custom_field: Option<String>,
    pub purpose: Purpose,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    /// Days between creation and the session date, frozen at creation.
    pub lead_time_days: i32,
    pub profile: SessionProfile,
    pub selected_plan_id: Option<String>,
    pub status: SessionStatus,
    pub paid: bool,
    /// Discounted amount promised when the session was waitlisted.
    pub committed_charge: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionEntity {
    pub fn category(&self) -> PracticeCategory {
        self.purpose.category()
    }

    pub fn is_profile_complete(&self) -> bool {
        let filled = |value: &str| !value.trim().is_empty();

        let custom_field_ok = self.field != OTHER_FIELD
            || self.custom_field.as_deref().is_some_and(filled);

        filled(&self.full_name) && filled(&self.contact_email) && filled(&self.field) && custom_field_ok
    }
}

/// Raw row used for Diesel queries. Enum columns stay as text and are parsed into the entity.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = practice_sessions)]
pub struct SessionRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub contact_email: String,
    pub full_name: String,
    pub institution: Option<String>,
    pub field: String,
    pub custom_field: Option<String>,
    pub purpose: String,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    pub lead_time_days: i32,
    pub bio: Option<String>,
    pub strengths: Option<String>,
    pub weaknesses: Option<String>,
    pub goals: Option<String>,
    pub selected_plan_id: Option<String>,
    pub status: String,
    pub paid: bool,
    pub committed_charge: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SessionRow> for SessionEntity {
    type Error = anyhow::Error;

    fn try_from(value: SessionRow) -> Result<Self> {
        let purpose = Purpose::from_str(&value.purpose)
            .ok_or_else(|| anyhow!("unknown purpose `{}` on session {}", value.purpose, value.id))?;
        let status = SessionStatus::from_str(&value.status)
            .ok_or_else(|| anyhow!("unknown status `{}` on session {}", value.status, value.id))?;

        Ok(Self {
            id: value.id,
            owner_id: value.owner_id,
            contact_email: value.contact_email,
            full_name: value.full_name,
            institution: value.institution,
            field: value.field,
            custom_field: value.custom_field,
            purpose,
            scheduled_date: value.scheduled_date,
            scheduled_time: value.scheduled_time,
            lead_time_days: value.lead_time_days,
            profile: SessionProfile {
                bio: value.bio,
                strengths: value.strengths,
                weaknesses: value.weaknesses,
                goals: value.goals,
            },
            selected_plan_id: value.selected_plan_id,
            status,
            paid: value.paid,
            committed_charge: value.committed_charge,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = practice_sessions)]
pub struct InsertSessionEntity {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub contact_email: String,
    pub full_name: String,
    pub institution: Option<String>,
    pub field: String,
    pub custom_field: Option<String>,
    pub purpose: String,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    pub lead_time_days: i32,
    pub bio: Option<String>,
    pub strengths: Option<String>,
    pub weaknesses: Option<String>,
    pub goals: Option<String>,
    pub selected_plan_id: Option<String>,
    pub status: String,
    pub paid: bool,
    pub committed_charge: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&SessionEntity> for InsertSessionEntity {
    fn from(value: &SessionEntity) -> Self {
        Self {
            id: value.id,
            owner_id: value.owner_id,
            contact_email: value.contact_email.clone(),
            full_name: value.full_name.clone(),
            institution: value.institution.clone(),
            field: value.field.clone(),
            custom_field: value.custom_field.clone(),
            purpose: value.purpose.to_string(),
            scheduled_date: value.scheduled_date,
            scheduled_time: value.scheduled_time,
            lead_time_days: value.lead_time_days,
            bio: value.profile.bio.clone(),
            strengths: value.profile.strengths.clone(),
            weaknesses: value.profile.weaknesses.clone(),
            goals: value.profile.goals.clone(),
            selected_plan_id: value.selected_plan_id.clone(),
            status: value.status.to_string(),
            paid: value.paid,
            committed_charge: value.committed_charge,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}
