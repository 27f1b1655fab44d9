use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row};

use teetime_core::store::SessionStore;
use teetime_core::{ConversationSession, ConversationState, OwnerId, StoreError, TeeTimeRequest};

use super::{encode_timestamp, parse_timestamp, RepositoryError};
use crate::DbPool;

pub struct SqlSessionStore {
    pool: DbPool,
}

impl SqlSessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn find(&self, owner: &OwnerId) -> Result<Option<ConversationSession>, RepositoryError> {
        let row = sqlx::query(
            "SELECT owner_id, state, pending_request_json, last_interaction
             FROM conversation_session
             WHERE owner_id = ?",
        )
        .bind(&owner.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(session_from_row).transpose()
    }

    async fn upsert(&self, session: &ConversationSession) -> Result<(), RepositoryError> {
        let pending_request_json = session
            .pending_request
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|error| RepositoryError::Decode(format!("pending request: {error}")))?;

        sqlx::query(
            "INSERT INTO conversation_session (
                owner_id,
                state,
                pending_request_json,
                last_interaction
             ) VALUES (?, ?, ?, ?)
             ON CONFLICT(owner_id) DO UPDATE SET
                state = excluded.state,
                pending_request_json = excluded.pending_request_json,
                last_interaction = excluded.last_interaction",
        )
        .bind(&session.owner.0)
        .bind(session.state.as_str())
        .bind(pending_request_json)
        .bind(encode_timestamp(session.last_interaction))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl SessionStore for SqlSessionStore {
    async fn get(&self, owner: &OwnerId) -> Result<Option<ConversationSession>, StoreError> {
        Ok(self.find(owner).await?)
    }

    async fn save(&self, session: &ConversationSession) -> Result<(), StoreError> {
        Ok(self.upsert(session).await?)
    }
}

fn session_from_row(row: SqliteRow) -> Result<ConversationSession, RepositoryError> {
    let state_raw = row.try_get::<String, _>("state")?;
    let state = ConversationState::parse(&state_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown conversation state `{state_raw}`"))
    })?;

    let pending_request = row
        .try_get::<Option<String>, _>("pending_request_json")?
        .map(|json| {
            serde_json::from_str::<TeeTimeRequest>(&json).map_err(|error| {
                RepositoryError::Decode(format!("invalid pending request `{json}` ({error})"))
            })
        })
        .transpose()?;

    Ok(ConversationSession {
        owner: OwnerId(row.try_get("owner_id")?),
        state,
        pending_request,
        last_interaction: parse_timestamp("last_interaction", row.try_get("last_interaction")?)?,
    })
}

#[cfg(test)]
mod tests {
    use teetime_core::chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
    use teetime_core::store::SessionStore;
    use teetime_core::{ConversationSession, ConversationState, OwnerId, TeeTimeRequest};

    use super::SqlSessionStore;
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn session_is_created_then_overwritten() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("run migrations");
        let store = SqlSessionStore::new(pool.clone());
        let owner = OwnerId("+15550001111".into());

        assert_eq!(store.get(&owner).await.expect("get"), None);

        let started = Utc.with_ymd_and_hms(2025, 12, 1, 15, 0, 0).single().expect("now");
        let mut session = ConversationSession::new(owner.clone(), started);
        session.state = ConversationState::AwaitingConfirmation;
        session.pending_request = Some(
            TeeTimeRequest::new(
                NaiveDate::from_ymd_opt(2025, 12, 20).expect("date"),
                NaiveTime::from_hms_opt(8, 0, 0).expect("time"),
                4,
                30,
            )
            .expect("request"),
        );
        store.save(&session).await.expect("save");
        assert_eq!(store.get(&owner).await.expect("get"), Some(session.clone()));

        session.reset();
        session.last_interaction = started + teetime_core::chrono::Duration::minutes(2);
        store.save(&session).await.expect("overwrite");
        let stored = store.get(&owner).await.expect("get").expect("exists");
        assert_eq!(stored.state, ConversationState::Idle);
        assert_eq!(stored.pending_request, None);
        assert_eq!(stored.last_interaction, session.last_interaction);

        pool.close().await;
    }
}
