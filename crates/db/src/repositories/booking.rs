use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite};

use teetime_core::chrono::{DateTime, Utc};
use teetime_core::store::{BookingFilter, BookingStore};
use teetime_core::{Booking, BookingId, BookingStatus, OwnerId, StoreError, TeeTimeRequest};

use super::{
    encode_time, encode_timestamp, parse_date, parse_optional_timestamp, parse_time,
    parse_timestamp, RepositoryError,
};
use crate::DbPool;

const BOOKING_COLUMNS: &str = "id,
    owner_id,
    requested_date,
    requested_time,
    party_size,
    fallback_window_minutes,
    status,
    scheduled_execution_at,
    actual_booked_time,
    confirmation_token,
    error_detail,
    alternatives_hint,
    created_at,
    updated_at";

pub struct SqlBookingStore {
    pool: DbPool,
}

impl SqlBookingStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn insert(&self, booking: &Booking) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO booking (
                id,
                owner_id,
                requested_date,
                requested_time,
                party_size,
                fallback_window_minutes,
                status,
                scheduled_execution_at,
                actual_booked_time,
                confirmation_token,
                error_detail,
                alternatives_hint,
                created_at,
                updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&booking.id.0)
        .bind(&booking.owner.0)
        .bind(booking.request.date().to_string())
        .bind(encode_time(booking.request.time()))
        .bind(i64::from(booking.request.party_size()))
        .bind(i64::from(booking.request.fallback_window_minutes()))
        .bind(booking.status.as_str())
        .bind(booking.scheduled_execution_at.map(encode_timestamp))
        .bind(booking.actual_booked_time.map(encode_time))
        .bind(booking.confirmation_token.as_deref())
        .bind(booking.error_detail.as_deref())
        .bind(booking.alternatives_hint.as_deref())
        .bind(encode_timestamp(booking.created_at))
        .bind(encode_timestamp(booking.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {BOOKING_COLUMNS} FROM booking WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(booking_from_row).transpose()
    }

    async fn select(&self, filter: &BookingFilter) -> Result<Vec<Booking>, RepositoryError> {
        let mut query: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {BOOKING_COLUMNS} FROM booking WHERE 1 = 1"));
        if let Some(owner) = &filter.owner {
            query.push(" AND owner_id = ").push_bind(owner.0.clone());
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        query.push(" ORDER BY requested_date ASC, requested_time ASC, created_at ASC");

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.into_iter().map(booking_from_row).collect()
    }

    /// One conditional UPDATE; the status predicate makes it the claim.
    async fn swap(
        &self,
        booking: &Booking,
        expected: &[BookingStatus],
    ) -> Result<bool, RepositoryError> {
        if expected.is_empty() {
            return Ok(false);
        }

        let mut query: QueryBuilder<'_, Sqlite> = QueryBuilder::new("UPDATE booking SET status = ");
        query
            .push_bind(booking.status.as_str())
            .push(", scheduled_execution_at = ")
            .push_bind(booking.scheduled_execution_at.map(encode_timestamp))
            .push(", actual_booked_time = ")
            .push_bind(booking.actual_booked_time.map(encode_time))
            .push(", confirmation_token = ")
            .push_bind(booking.confirmation_token.clone())
            .push(", error_detail = ")
            .push_bind(booking.error_detail.clone())
            .push(", alternatives_hint = ")
            .push_bind(booking.alternatives_hint.clone())
            .push(", updated_at = ")
            .push_bind(encode_timestamp(booking.updated_at))
            .push(" WHERE id = ")
            .push_bind(booking.id.0.clone())
            .push(" AND status IN (");
        let mut statuses = query.separated(", ");
        for status in expected {
            statuses.push_bind(status.as_str());
        }
        statuses.push_unseparated(")");

        let result = query.build().execute(&self.pool).await?;
        Ok(result.rows_affected() == 1)
    }

    async fn select_due(&self, now: DateTime<Utc>) -> Result<Vec<Booking>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS}
             FROM booking
             WHERE status = ? AND scheduled_execution_at IS NOT NULL
               AND scheduled_execution_at <= ?
             ORDER BY scheduled_execution_at ASC, created_at ASC"
        ))
        .bind(BookingStatus::Scheduled.as_str())
        .bind(encode_timestamp(now))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(booking_from_row).collect()
    }
}

#[async_trait]
impl BookingStore for SqlBookingStore {
    async fn create(&self, booking: Booking) -> Result<(), StoreError> {
        Ok(self.insert(&booking).await?)
    }

    async fn get(&self, id: &BookingId) -> Result<Option<Booking>, StoreError> {
        Ok(self.find(id).await?)
    }

    async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>, StoreError> {
        Ok(self.select(filter).await?)
    }

    async fn compare_and_swap(
        &self,
        booking: &Booking,
        expected: &[BookingStatus],
    ) -> Result<bool, StoreError> {
        Ok(self.swap(booking, expected).await?)
    }

    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<Booking>, StoreError> {
        Ok(self.select_due(now).await?)
    }
}

fn booking_from_row(row: SqliteRow) -> Result<Booking, RepositoryError> {
    let status_raw = row.try_get::<String, _>("status")?;
    let status = BookingStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown booking status `{status_raw}`")))?;

    let request = TeeTimeRequest::from_raw(
        parse_date("requested_date", row.try_get("requested_date")?)?,
        parse_time("requested_time", row.try_get("requested_time")?)?,
        row.try_get("party_size")?,
        row.try_get("fallback_window_minutes")?,
    )
    .map_err(|error| RepositoryError::Decode(format!("stored request is invalid: {error}")))?;

    let actual_booked_time = row
        .try_get::<Option<String>, _>("actual_booked_time")?
        .map(|value| parse_time("actual_booked_time", value))
        .transpose()?;

    Ok(Booking {
        id: BookingId(row.try_get("id")?),
        owner: OwnerId(row.try_get("owner_id")?),
        request,
        status,
        scheduled_execution_at: parse_optional_timestamp(
            "scheduled_execution_at",
            row.try_get("scheduled_execution_at")?,
        )?,
        actual_booked_time,
        confirmation_token: row.try_get("confirmation_token")?,
        error_detail: row.try_get("error_detail")?,
        alternatives_hint: row.try_get("alternatives_hint")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use teetime_core::chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
    use teetime_core::store::{BookingFilter, BookingStore};
    use teetime_core::{
        Booking, BookingEngine, BookingStatus, MockBackend, OwnerId, RecordingNotifier,
        SchedulingPolicy, StoreError, TeeTimeRequest,
    };

    use super::SqlBookingStore;
    use crate::{connect_with_settings, migrations, DbPool};

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, day, hour, minute, 0).single().expect("instant")
    }

    fn scheduled(owner: &str, day: u32, hour: u32, execute_at: DateTime<Utc>) -> Booking {
        let request = TeeTimeRequest::new(
            NaiveDate::from_ymd_opt(2025, 12, day).expect("date"),
            NaiveTime::from_hms_opt(hour, 0, 0).expect("time"),
            3,
            30,
        )
        .expect("request");
        let mut booking = Booking::new(OwnerId(owner.into()), request, at(1, 12, 0));
        booking.schedule(execute_at, at(1, 12, 0)).expect("schedule");
        booking
    }

    #[tokio::test]
    async fn booking_round_trips_through_sqlite() {
        let pool = setup_pool().await;
        let store = SqlBookingStore::new(pool.clone());
        let mut booking = scheduled("+1001", 20, 8, at(13, 12, 30));

        store.create(booking.clone()).await.expect("create");
        assert_eq!(store.get(&booking.id).await.expect("get"), Some(booking.clone()));

        let claimed = booking.status;
        booking.transition_to(BookingStatus::InProgress, at(13, 12, 30)).expect("claim");
        booking
            .record_success(NaiveTime::from_hms_opt(8, 8, 0).expect("t"), Some("C-1".into()), at(13, 12, 31))
            .expect("success");
        assert!(store.compare_and_swap(&booking, &[claimed]).await.expect("cas"));
        assert_eq!(store.get(&booking.id).await.expect("get"), Some(booking));

        pool.close().await;
    }

    #[tokio::test]
    async fn duplicate_create_is_a_conflict() {
        let pool = setup_pool().await;
        let store = SqlBookingStore::new(pool.clone());
        let booking = scheduled("+1001", 20, 8, at(13, 12, 30));

        store.create(booking.clone()).await.expect("create");
        let error = store.create(booking).await.expect_err("duplicate");
        assert!(matches!(error, StoreError::Conflict(_)));

        pool.close().await;
    }

    #[tokio::test]
    async fn compare_and_swap_refuses_when_status_moved_on() {
        let pool = setup_pool().await;
        let store = SqlBookingStore::new(pool.clone());
        let booking = scheduled("+1001", 20, 8, at(13, 12, 30));
        store.create(booking.clone()).await.expect("create");

        let mut first = booking.clone();
        first.transition_to(BookingStatus::InProgress, at(13, 12, 30)).expect("claim");
        let mut second = booking.clone();
        second.transition_to(BookingStatus::Cancelled, at(13, 12, 30)).expect("cancel");

        assert!(store.compare_and_swap(&first, &BookingStatus::CLAIMABLE).await.expect("cas"));
        assert!(!store.compare_and_swap(&second, &BookingStatus::CLAIMABLE).await.expect("cas"));
        assert!(!store.compare_and_swap(&second, &[]).await.expect("cas"));

        let stored = store.get(&booking.id).await.expect("get").expect("exists");
        assert_eq!(stored.status, BookingStatus::InProgress);

        pool.close().await;
    }

    #[tokio::test]
    async fn list_orders_by_date_time_then_creation_and_filters() {
        let pool = setup_pool().await;
        let store = SqlBookingStore::new(pool.clone());
        let late = scheduled("+1001", 21, 9, at(14, 12, 30));
        let early = scheduled("+1001", 20, 10, at(13, 12, 30));
        let earliest = scheduled("+1001", 20, 8, at(13, 12, 30));
        let other = scheduled("+1002", 20, 7, at(13, 12, 30));
        for booking in [&late, &early, &earliest, &other] {
            store.create(booking.clone()).await.expect("create");
        }

        let mine = store
            .list(&BookingFilter::for_owner(OwnerId("+1001".into())))
            .await
            .expect("list");
        let ids: Vec<_> = mine.iter().map(|booking| booking.id.clone()).collect();
        assert_eq!(ids, vec![earliest.id.clone(), early.id.clone(), late.id.clone()]);

        let scheduled_only = BookingFilter { owner: None, status: Some(BookingStatus::Scheduled) };
        assert_eq!(store.list(&scheduled_only).await.expect("list").len(), 4);
        let failed_only = BookingFilter { owner: None, status: Some(BookingStatus::Failed) };
        assert!(store.list(&failed_only).await.expect("list").is_empty());

        pool.close().await;
    }

    #[tokio::test]
    async fn list_due_returns_scheduled_bookings_at_or_before_now() {
        let pool = setup_pool().await;
        let store = SqlBookingStore::new(pool.clone());
        let due = scheduled("+1001", 20, 8, at(13, 12, 30));
        let future = scheduled("+1001", 21, 8, at(14, 12, 30));
        let mut claimed = scheduled("+1002", 20, 9, at(13, 12, 0));
        store.create(due.clone()).await.expect("create");
        store.create(future.clone()).await.expect("create");
        store.create(claimed.clone()).await.expect("create");
        claimed.transition_to(BookingStatus::InProgress, at(13, 12, 0)).expect("claim");
        assert!(store.compare_and_swap(&claimed, &BookingStatus::CLAIMABLE).await.expect("cas"));

        let listed = store.list_due(at(13, 12, 30)).await.expect("due");
        assert_eq!(listed, vec![due.clone()]);

        let later = store.list_due(at(14, 12, 30) + Duration::seconds(1)).await.expect("due");
        assert_eq!(later.len(), 2);

        pool.close().await;
    }

    #[tokio::test]
    async fn engine_sweep_against_sqlite_books_each_due_booking_once() {
        let pool = setup_pool().await;
        let store = Arc::new(SqlBookingStore::new(pool.clone()));
        let backend = Arc::new(MockBackend::new());
        let engine = BookingEngine::new(store.clone(), SchedulingPolicy::default())
            .with_backend(backend.clone())
            .with_notifier(Arc::new(RecordingNotifier::default()));
        let booking = scheduled("+1001", 20, 8, at(13, 12, 30));
        store.create(booking.clone()).await.expect("create");

        let (first, second) =
            tokio::join!(engine.run_due_sweep(at(13, 12, 31)), engine.run_due_sweep(at(13, 12, 31)));
        let first = first.expect("first sweep");
        let second = second.expect("second sweep");

        assert_eq!(first.succeeded + second.succeeded, 1);
        assert_eq!(backend.commit_calls(), 1);
        let stored = store.get(&booking.id).await.expect("get").expect("exists");
        assert_eq!(stored.status, BookingStatus::Success);
        assert_eq!(stored.actual_booked_time, NaiveTime::from_hms_opt(8, 0, 0));

        pool.close().await;
    }
}
