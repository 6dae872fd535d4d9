use serde::Serialize;

use crate::domain::entities::{sessions::SessionEntity, settlements::SettlementEntity};
use crate::domain::value_objects::enums::session_statuses::SessionStatus;

/// Result of the atomic insert-if-reference-absent settlement write.
#[derive(Debug, Clone, PartialEq)]
pub enum SettlementOutcome {
    /// First time this reference was seen; the session moved to `SCHEDULED`.
    Settled {
        session: SessionEntity,
        settlement: SettlementEntity,
    },
    /// The reference was already recorded; nothing was written.
    Duplicate { settlement: SettlementEntity },
    /// The charge was recorded but the session was not in a payable state.
    Unapplied {
        settlement: SettlementEntity,
        status: SessionStatus,
    },
}

impl SettlementOutcome {
    pub fn settlement(&self) -> &SettlementEntity {
        match self {
            SettlementOutcome::Settled { settlement, .. }
            | SettlementOutcome::Duplicate { settlement }
            | SettlementOutcome::Unapplied { settlement, .. } => settlement,
        }
    }

    pub fn kind(&self) -> SettlementKind {
        match self {
            SettlementOutcome::Settled { .. } => SettlementKind::Settled,
            SettlementOutcome::Duplicate { .. } => SettlementKind::Duplicate,
            SettlementOutcome::Unapplied { .. } => SettlementKind::Unapplied,
        }
    }

    pub fn into_receipt(self, session_status: SessionStatus) -> SettlementReceipt {
        let kind = self.kind();
        let settlement = match self {
            SettlementOutcome::Settled { settlement, .. }
            | SettlementOutcome::Duplicate { settlement }
            | SettlementOutcome::Unapplied { settlement, .. } => settlement,
        };

        SettlementReceipt {
            kind,
            session_status,
            settlement: settlement.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SettlementDto {
    pub session_id: uuid::Uuid,
    pub plan_id: String,
    pub amount_charged: i64,
    pub gateway_reference: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<SettlementEntity> for SettlementDto {
    fn from(value: SettlementEntity) -> Self {
        Self {
            session_id: value.session_id,
            plan_id: value.plan_id,
            amount_charged: value.amount_charged,
            gateway_reference: value.gateway_reference,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SettlementKind {
    Settled,
    Duplicate,
    Unapplied,
}

/// What a success callback did, as reported back to the caller.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SettlementReceipt {
    pub kind: SettlementKind,
    pub session_status: SessionStatus,
    pub settlement: SettlementDto,
}
