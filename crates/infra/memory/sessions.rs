use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{
    entities::{
        sessions::SessionEntity,
        settlements::{InsertSettlementEntity, SettlementEntity},
    },
    repositories::sessions::SessionRepository,
    value_objects::{
        enums::session_statuses::{SessionStatus, SessionTransition},
        sessions::{BookingStats, SessionProfile, SessionSearchFilter},
        settlements::SettlementOutcome,
    },
};

#[derive(Default)]
struct MemoryState {
    sessions: HashMap<Uuid, SessionEntity>,
    settlements: HashMap<String, SettlementEntity>,
}

/// Process-local store for local runs and tests. A single lock covers every write,
/// which makes each repository call atomic.
#[derive(Default)]
pub struct SessionMemory {
    state: Mutex<MemoryState>,
}

impl SessionMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn settlement_count(&self) -> usize {
        self.state.lock().await.settlements.len()
    }
}

fn newest_first(mut sessions: Vec<SessionEntity>) -> Vec<SessionEntity> {
    sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    sessions
}

#[async_trait]
impl SessionRepository for SessionMemory {
    async fn create_session(&self, session: SessionEntity) -> Result<SessionEntity> {
        let mut state = self.state.lock().await;
        if state.sessions.contains_key(&session.id) {
            bail!("session {} already exists", session.id);
        }
        state.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn find_session(&self, session_id: Uuid) -> Result<Option<SessionEntity>> {
        Ok(self.state.lock().await.sessions.get(&session_id).cloned())
    }

    async fn list_sessions_by_owner(&self, owner_id: Uuid) -> Result<Vec<SessionEntity>> {
        let state = self.state.lock().await;
        let owned = state
            .sessions
            .values()
            .filter(|s| s.owner_id == owner_id)
            .cloned()
            .collect();
        Ok(newest_first(owned))
    }

    async fn search_sessions(&self, filter: SessionSearchFilter) -> Result<Vec<SessionEntity>> {
        let state = self.state.lock().await;
        let matching = state
            .sessions
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        let mut sessions = newest_first(matching);
        if let Some(limit) = filter.limit.and_then(|l| usize::try_from(l).ok()) {
            sessions.truncate(limit);
        }
        Ok(sessions)
    }

    async fn session_stats(&self) -> Result<BookingStats> {
        let state = self.state.lock().await;
        let total = state.sessions.len() as i64;
        let paid = state.sessions.values().filter(|s| s.paid).count() as i64;
        Ok(BookingStats::from_counts(total, paid))
    }

    async fn assign_plan(
        &self,
        session_id: Uuid,
        plan_id: String,
    ) -> Result<Option<SessionEntity>> {
        let mut state = self.state.lock().await;
        let Some(session) = state.sessions.get_mut(&session_id) else {
            return Ok(None);
        };
        if session.status != SessionStatus::PendingPayment {
            return Ok(None);
        }
        session.selected_plan_id = Some(plan_id);
        session.updated_at = Utc::now();
        Ok(Some(session.clone()))
    }

    async fn update_profile(
        &self,
        session_id: Uuid,
        profile: SessionProfile,
    ) -> Result<Option<SessionEntity>> {
        let mut state = self.state.lock().await;
        Ok(state.sessions.get_mut(&session_id).map(|session| {
            session.profile = profile;
            session.updated_at = Utc::now();
            session.clone()
        }))
    }

    async fn move_to_waiting_list(
        &self,
        session_id: Uuid,
        committed_charge: i64,
    ) -> Result<Option<SessionEntity>> {
        let mut state = self.state.lock().await;
        let Some(session) = state.sessions.get_mut(&session_id) else {
            return Ok(None);
        };
        let Ok(next) = session.status.apply(SessionTransition::Waitlist) else {
            return Ok(None);
        };
        session.status = next;
        session.paid = false;
        session.committed_charge = Some(committed_charge);
        session.updated_at = Utc::now();
        Ok(Some(session.clone()))
    }

    async fn transition_status(
        &self,
        session_id: Uuid,
        transition: SessionTransition,
    ) -> Result<Option<SessionEntity>> {
        if matches!(
            transition,
            SessionTransition::Settle | SessionTransition::Waitlist
        ) {
            bail!("{} is not a status-only transition", transition);
        }

        let mut state = self.state.lock().await;
        let Some(session) = state.sessions.get_mut(&session_id) else {
            return Ok(None);
        };
        let Ok(next) = session.status.apply(transition) else {
            return Ok(None);
        };
        session.status = next;
        session.paid = next.implies_paid();
        session.updated_at = Utc::now();
        Ok(Some(session.clone()))
    }

    async fn settle_if_reference_absent(
        &self,
        settlement: InsertSettlementEntity,
    ) -> Result<SettlementOutcome> {
        let mut state = self.state.lock().await;

        if let Some(existing) = state.settlements.get(&settlement.gateway_reference) {
            return Ok(SettlementOutcome::Duplicate {
                settlement: existing.clone(),
            });
        }

        let Some(session) = state.sessions.get(&settlement.session_id).cloned() else {
            bail!("session {} does not exist", settlement.session_id);
        };

        let record = SettlementEntity::from(settlement);
        state
            .settlements
            .insert(record.gateway_reference.clone(), record.clone());

        let Ok(next) = session.status.apply(SessionTransition::Settle) else {
            return Ok(SettlementOutcome::Unapplied {
                settlement: record,
                status: session.status,
            });
        };

        let mut scheduled = session;
        scheduled.status = next;
        scheduled.paid = true;
        scheduled.updated_at = Utc::now();
        state.sessions.insert(scheduled.id, scheduled.clone());

        Ok(SettlementOutcome::Settled {
            session: scheduled,
            settlement: record,
        })
    }

    async fn find_settlement_by_reference(
        &self,
        gateway_reference: String,
    ) -> Result<Option<SettlementEntity>> {
        Ok(self
            .state
            .lock()
            .await
            .settlements
            .get(&gateway_reference)
            .cloned())
    }

    async fn list_settlements_for_session(
        &self,
        session_id: Uuid,
    ) -> Result<Vec<SettlementEntity>> {
        let state = self.state.lock().await;
        let mut records: Vec<SettlementEntity> = state
            .settlements
            .values()
            .filter(|s| s.session_id == session_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::enums::purposes::Purpose;
    use chrono::{NaiveDate, NaiveTime, TimeZone};
    use std::sync::Arc;

    fn pending_session() -> SessionEntity {
        let now = Utc.with_ymd_and_hms(2026, 5, 4, 12, 0, 0).unwrap();
        SessionEntity {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            contact_email: "kemi@example.com".to_string(),
            full_name: "Kemi Ade".to_string(),
            institution: Some("Lagos General".to_string()),
            field: "Healthcare & Nursing".to_string(),
            custom_field: None,
            purpose: Purpose::Exam,
            scheduled_date: NaiveDate::from_ymd_opt(2026, 5, 10).unwrap(),
            scheduled_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            lead_time_days: 6,
            profile: SessionProfile::default(),
            selected_plan_id: Some("exam_one_off".to_string()),
            status: SessionStatus::PendingPayment,
            paid: false,
            committed_charge: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn settlement_for(session_id: Uuid, reference: &str) -> InsertSettlementEntity {
        InsertSettlementEntity {
            id: Uuid::new_v4(),
            session_id,
            plan_id: "exam_one_off".to_string(),
            amount_charged: 2550,
            gateway_reference: reference.to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn second_settlement_with_same_reference_is_a_duplicate() {
        let store = SessionMemory::new();
        let session = store.create_session(pending_session()).await.unwrap();

        let first = store
            .settle_if_reference_absent(settlement_for(session.id, "R1"))
            .await
            .unwrap();
        let second = store
            .settle_if_reference_absent(settlement_for(session.id, "R1"))
            .await
            .unwrap();

        assert!(matches!(first, SettlementOutcome::Settled { .. }));
        assert!(matches!(second, SettlementOutcome::Duplicate { .. }));
        assert_eq!(first.settlement(), second.settlement());
        assert_eq!(store.settlement_count().await, 1);

        let stored = store.find_session(session.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Scheduled);
        assert!(stored.paid);
    }

    #[tokio::test]
    async fn new_reference_on_scheduled_session_is_recorded_but_unapplied() {
        let store = SessionMemory::new();
        let session = store.create_session(pending_session()).await.unwrap();

        store
            .settle_if_reference_absent(settlement_for(session.id, "R1"))
            .await
            .unwrap();
        let outcome = store
            .settle_if_reference_absent(settlement_for(session.id, "R2"))
            .await
            .unwrap();

        match outcome {
            SettlementOutcome::Unapplied { status, settlement } => {
                assert_eq!(status, SessionStatus::Scheduled);
                assert_eq!(settlement.gateway_reference, "R2");
            }
            other => panic!("expected unapplied settlement, got {other:?}"),
        }
        assert_eq!(
            store.list_settlements_for_session(session.id).await.unwrap().len(),
            2
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_settlements_write_one_record() {
        let store = Arc::new(SessionMemory::new());
        let session = store.create_session(pending_session()).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let settlement = settlement_for(session.id, "R-race");
                tokio::spawn(async move { store.settle_if_reference_absent(settlement).await })
            })
            .collect();

        let mut settled = 0;
        for handle in handles {
            if let SettlementOutcome::Settled { .. } = handle.await.unwrap().unwrap() {
                settled += 1;
            }
        }

        assert_eq!(settled, 1);
        assert_eq!(store.settlement_count().await, 1);
    }

    #[tokio::test]
    async fn plan_cannot_change_after_waitlisting() {
        let store = SessionMemory::new();
        let session = store.create_session(pending_session()).await.unwrap();

        let waitlisted = store
            .move_to_waiting_list(session.id, 8500)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(waitlisted.status, SessionStatus::WaitingList);
        assert_eq!(waitlisted.committed_charge, Some(8500));

        let reassigned = store
            .assign_plan(session.id, "standard_test".to_string())
            .await
            .unwrap();
        assert!(reassigned.is_none());
    }

    #[tokio::test]
    async fn status_only_transitions_reject_settle() {
        let store = SessionMemory::new();
        let session = store.create_session(pending_session()).await.unwrap();

        assert!(
            store
                .transition_status(session.id, SessionTransition::Settle)
                .await
                .is_err()
        );

        let cancelled = store
            .transition_status(session.id, SessionTransition::Cancel)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cancelled.status, SessionStatus::Cancelled);
        assert!(!cancelled.paid);

        let completed = store
            .transition_status(session.id, SessionTransition::Complete)
            .await
            .unwrap();
        assert!(completed.is_none());
    }

    #[tokio::test]
    async fn search_matches_name_email_and_field() {
        let store = SessionMemory::new();
        let session = store.create_session(pending_session()).await.unwrap();
        let mut other = pending_session();
        other.full_name = "Tunde Bello".to_string();
        other.contact_email = "tunde@example.com".to_string();
        other.field = "Law & Corporate Legal".to_string();
        store.create_session(other).await.unwrap();

        let by_field = store
            .search_sessions(SessionSearchFilter {
                term: Some("nursing".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_field.len(), 1);
        assert_eq!(by_field[0].id, session.id);

        let scheduled_only = store
            .search_sessions(SessionSearchFilter {
                status: Some(SessionStatus::Scheduled),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(scheduled_only.is_empty());
    }
}
