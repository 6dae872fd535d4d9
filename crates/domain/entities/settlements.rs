use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::settlements;

/// Proof that one gateway charge succeeded. Append-only; `gateway_reference` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = settlements)]
pub struct SettlementEntity {
    pub id: Uuid,
    pub session_id: Uuid,
    pub plan_id: String,
    pub amount_charged: i64,
    pub gateway_reference: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Insertable)]
#[diesel(table_name = settlements)]
pub struct InsertSettlementEntity {
    pub id: Uuid,
    pub session_id: Uuid,
    pub plan_id: String,
    pub amount_charged: i64,
    pub gateway_reference: String,
    pub created_at: DateTime<Utc>,
}

impl From<InsertSettlementEntity> for SettlementEntity {
    fn from(value: InsertSettlementEntity) -> Self {
        Self {
            id: value.id,
            session_id: value.session_id,
            plan_id: value.plan_id,
            amount_charged: value.amount_charged,
            gateway_reference: value.gateway_reference,
            created_at: value.created_at,
        }
    }
}
