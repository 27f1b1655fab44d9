//! Booking management, parsed-message intake and the sweep trigger.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use teetime_agent::{ConversationTracker, ParsedIntent};
use teetime_core::chrono::{NaiveDate, NaiveTime};
use teetime_core::errors::{ApplicationError, InterfaceError};
use teetime_core::{
    BatchRunReport, Booking, BookingEngine, BookingFilter, BookingId, BookingStatus,
    ExecutionOutcome, OwnerId, TeeTimeRequest,
};

pub const SCHEDULER_KEY_HEADER: &str = "x-scheduler-api-key";

#[derive(Clone)]
pub struct ApiState {
    pub engine: BookingEngine,
    pub tracker: Arc<ConversationTracker>,
    pub scheduler_api_key: Option<SecretString>,
    pub default_fallback_window_minutes: u32,
}

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub owner: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub party_size: i64,
    pub fallback_window_minutes: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListBookingsQuery {
    pub owner: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelBookingQuery {
    pub owner: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub booking_id: BookingId,
    pub success: bool,
    pub status: BookingStatus,
}

#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    pub from: String,
    pub message: ParsedIntent,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageReply {
    pub to: String,
    pub reply: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

/// Error response for handlers; carries the status and a JSON body.
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn plain(status: StatusCode, error: impl Into<String>) -> Self {
        Self { status, body: ErrorBody { error: error.into(), detail: None, correlation_id: None } }
    }
}

impl From<ApplicationError> for ApiError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = uuid::Uuid::new_v4().to_string();
        let interface = value.into_interface(correlation_id.clone());
        let status = match &interface {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::Forbidden { .. } => StatusCode::FORBIDDEN,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            body: ErrorBody {
                error: interface.user_message().to_string(),
                detail: Some(interface.message().to_string()),
                correlation_id: Some(correlation_id),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/bookings", post(create_booking).get(list_bookings))
        .route("/bookings/{id}", get(get_booking).delete(cancel_booking))
        .route("/bookings/{id}/execute", post(execute_booking))
        .route("/messages", post(receive_message))
        .route("/jobs/execute-due-bookings", post(execute_due_bookings))
        .with_state(state)
}

async fn create_booking(
    State(state): State<ApiState>,
    Json(body): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), ApiError> {
    let window = body
        .fallback_window_minutes
        .unwrap_or_else(|| i64::from(state.default_fallback_window_minutes));
    let request = TeeTimeRequest::from_raw(body.date, body.time, body.party_size, window)
        .map_err(ApplicationError::from)?;

    let booking = state.engine.create_booking(OwnerId(body.owner), request).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

async fn list_bookings(
    State(state): State<ApiState>,
    Query(query): Query<ListBookingsQuery>,
) -> Result<Json<Vec<Booking>>, ApiError> {
    let status = match query.status.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(BookingStatus::parse(raw).ok_or_else(|| {
            ApiError::plain(StatusCode::BAD_REQUEST, format!("unknown booking status `{raw}`"))
        })?),
    };
    let filter = BookingFilter { owner: query.owner.map(OwnerId), status };
    Ok(Json(state.engine.list_bookings(&filter).await?))
}

async fn get_booking(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<Booking>, ApiError> {
    Ok(Json(state.engine.get_booking(&BookingId(id)).await?))
}

async fn cancel_booking(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Query(query): Query<CancelBookingQuery>,
) -> Result<Json<Booking>, ApiError> {
    let Some(owner) = query.owner.filter(|owner| !owner.trim().is_empty()) else {
        return Err(ApiError::plain(StatusCode::BAD_REQUEST, "owner query parameter is required"));
    };
    let booking = state.engine.cancel_booking_for_owner(&BookingId(id), &OwnerId(owner)).await?;
    Ok(Json(booking))
}

async fn execute_booking(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    let id = BookingId(id);
    let response = match state.engine.execute_detailed(&id).await? {
        ExecutionOutcome::Succeeded(booking)
        | ExecutionOutcome::Failed(booking)
        | ExecutionOutcome::TimedOut(booking) => ExecuteResponse {
            success: booking.status == BookingStatus::Success,
            booking_id: booking.id,
            status: booking.status,
        },
        ExecutionOutcome::Declined { id, status } => {
            ExecuteResponse { booking_id: id, success: false, status }
        }
    };
    Ok(Json(response))
}

async fn receive_message(
    State(state): State<ApiState>,
    Json(inbound): Json<InboundMessage>,
) -> Result<Json<MessageReply>, ApiError> {
    let owner = OwnerId(inbound.from);
    let reply = state.tracker.advance(&owner, &inbound.message).await?;
    Ok(Json(MessageReply { to: owner.0, reply }))
}

async fn execute_due_bookings(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Json<BatchRunReport>, ApiError> {
    let Some(expected) = &state.scheduler_api_key else {
        warn!(
            event_name = "jobs.sweep.unconfigured",
            "sweep trigger called but no scheduler api key is configured"
        );
        return Err(ApiError::plain(
            StatusCode::INTERNAL_SERVER_ERROR,
            "scheduler api key is not configured",
        ));
    };
    let Some(provided) = headers.get(SCHEDULER_KEY_HEADER).and_then(|value| value.to_str().ok())
    else {
        return Err(ApiError::plain(
            StatusCode::UNPROCESSABLE_ENTITY,
            "missing X-Scheduler-API-Key header",
        ));
    };
    if provided != expected.expose_secret() {
        warn!(event_name = "jobs.sweep.rejected", "sweep trigger called with an invalid key");
        return Err(ApiError::plain(StatusCode::UNAUTHORIZED, "invalid scheduler api key"));
    }

    let report = state.engine.run_due_sweep(state.engine.now()).await?;
    info!(
        event_name = "jobs.sweep.completed",
        total_due = report.total_due,
        succeeded = report.succeeded,
        failed = report.failed,
        "scheduled sweep completed"
    );
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use axum::{
        body::{to_bytes, Body, Bytes},
        http::{Request, StatusCode},
        Router,
    };
    use serde::de::DeserializeOwned;
    use serde_json::json;
    use tower::ServiceExt;

    use teetime_agent::ConversationTracker;
    use teetime_core::chrono::{TimeZone, Utc};
    use teetime_core::store::{InMemoryBookingStore, InMemorySessionStore};
    use teetime_core::{
        BatchRunReport, Booking, BookingEngine, BookingStatus, FixedClock, MockBackend,
        RecordingNotifier, SchedulingPolicy,
    };

    use super::{router, ApiState, ErrorBody, ExecuteResponse, MessageReply};

    struct Harness {
        app: Router,
        clock: Arc<FixedClock>,
    }

    fn harness(scheduler_api_key: Option<&str>) -> Harness {
        harness_with(MockBackend::new(), Duration::from_secs(300), scheduler_api_key)
    }

    fn harness_with(
        backend: MockBackend,
        per_item_timeout: Duration,
        scheduler_api_key: Option<&str>,
    ) -> Harness {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2025, 12, 1, 15, 0, 0).single().expect("now"),
        ));
        let engine = BookingEngine::new(
            Arc::new(InMemoryBookingStore::default()),
            SchedulingPolicy::default(),
        )
        .with_backend(Arc::new(backend))
        .with_notifier(Arc::new(RecordingNotifier::default()))
        .with_clock(clock.clone())
        .with_per_item_timeout(per_item_timeout);
        let tracker = Arc::new(ConversationTracker::new(
            engine.clone(),
            Arc::new(InMemorySessionStore::default()),
            "Northgate Country Club",
            30,
        ));
        let app = router(ApiState {
            engine,
            tracker,
            scheduler_api_key: scheduler_api_key.map(|key| key.to_string().into()),
            default_fallback_window_minutes: 30,
        });
        Harness { app, clock }
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Bytes) {
        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        (status, to_bytes(response.into_body(), usize::MAX).await.expect("body"))
    }

    fn decode<T: DeserializeOwned>(body: &[u8]) -> T {
        serde_json::from_slice(body).expect("json body")
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder().method(method).uri(uri).body(Body::empty()).expect("request")
    }

    async fn create(app: &Router, owner: &str, date: &str) -> Booking {
        let (status, body) = send(
            app,
            json_request(
                "POST",
                "/bookings",
                json!({"owner": owner, "date": date, "time": "08:00:00", "party_size": 4}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        decode(&body)
    }

    #[tokio::test]
    async fn create_then_fetch_and_list_booking() {
        let h = harness(None);
        let booking = create(&h.app, "+1001", "2025-12-20").await;
        assert_eq!(booking.status, BookingStatus::Scheduled);
        assert_eq!(booking.request.fallback_window_minutes(), 30);

        let (status, body) =
            send(&h.app, empty_request("GET", &format!("/bookings/{}", booking.id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(decode::<Booking>(&body), booking);

        let (_, body) =
            send(&h.app, empty_request("GET", "/bookings?owner=%2B1001&status=scheduled")).await;
        assert_eq!(decode::<Vec<Booking>>(&body), vec![booking]);

        let (status, _) = send(&h.app, empty_request("GET", "/bookings?status=booked")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn invalid_party_size_is_a_bad_request() {
        let h = harness(None);
        let (status, body) = send(
            &h.app,
            json_request(
                "POST",
                "/bookings",
                json!({"owner": "+1001", "date": "2025-12-20", "time": "08:00:00", "party_size": 6}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: ErrorBody = decode(&body);
        assert!(error.correlation_id.is_some());
    }

    #[tokio::test]
    async fn unknown_booking_is_not_found() {
        let h = harness(None);
        let (status, _) = send(&h.app, empty_request("GET", "/bookings/missing")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn cancel_requires_matching_owner() {
        let h = harness(None);
        let booking = create(&h.app, "+1001", "2025-12-20").await;
        let uri = format!("/bookings/{}", booking.id);

        let (status, _) = send(&h.app, empty_request("DELETE", &uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&h.app, empty_request("DELETE", &format!("{uri}?owner=%2B9999"))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) =
            send(&h.app, empty_request("DELETE", &format!("{uri}?owner=%2B1001"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(decode::<Booking>(&body).status, BookingStatus::Cancelled);
    }

    #[tokio::test]
    async fn execute_endpoint_books_and_then_declines() {
        let h = harness(None);
        let booking = create(&h.app, "+1001", "2025-12-20").await;
        let uri = format!("/bookings/{}/execute", booking.id);

        let (status, body) = send(&h.app, empty_request("POST", &uri)).await;
        assert_eq!(status, StatusCode::OK);
        let first: ExecuteResponse = decode(&body);
        assert!(first.success);
        assert_eq!(first.status, BookingStatus::Success);

        let (_, body) = send(&h.app, empty_request("POST", &uri)).await;
        let second: ExecuteResponse = decode(&body);
        assert!(!second.success);
        assert_eq!(second.status, BookingStatus::Success);
    }

    #[tokio::test]
    async fn execute_endpoint_returns_when_the_backend_hangs() {
        let backend = MockBackend::new().with_delay(Duration::from_secs(5));
        let h = harness_with(backend, Duration::from_millis(100), None);
        let booking = create(&h.app, "+1001", "2025-12-20").await;

        let started = Instant::now();
        let (status, body) =
            send(&h.app, empty_request("POST", &format!("/bookings/{}/execute", booking.id)))
                .await;

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(status, StatusCode::OK);
        let response: ExecuteResponse = decode(&body);
        assert!(!response.success);
        assert_eq!(response.status, BookingStatus::InProgress);
    }

    #[tokio::test]
    async fn message_intake_drives_the_conversation() {
        let h = harness(None);
        let (status, body) = send(
            &h.app,
            json_request("POST", "/messages", json!({"from": "+1001", "message": {"intent": "help"}})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let reply: MessageReply = decode(&body);
        assert_eq!(reply.to, "+1001");
        assert!(reply.reply.starts_with("I can help you book tee times at Northgate Country Club!"));
    }

    #[tokio::test]
    async fn sweep_trigger_checks_the_scheduler_key() {
        let unconfigured = harness(None);
        let (status, _) =
            send(&unconfigured.app, empty_request("POST", "/jobs/execute-due-bookings")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let h = harness(Some("sweep-secret"));
        let (status, _) = send(&h.app, empty_request("POST", "/jobs/execute-due-bookings")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let wrong = Request::builder()
            .method("POST")
            .uri("/jobs/execute-due-bookings")
            .header("X-Scheduler-API-Key", "nope")
            .body(Body::empty())
            .expect("request");
        let (status, _) = send(&h.app, wrong).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn sweep_trigger_runs_due_bookings_and_reports() {
        let h = harness(Some("sweep-secret"));
        let booking = create(&h.app, "+1001", "2025-12-20").await;
        h.clock.set(Utc.with_ymd_and_hms(2025, 12, 13, 12, 31, 0).single().expect("after open"));

        let request = Request::builder()
            .method("POST")
            .uri("/jobs/execute-due-bookings")
            .header("X-Scheduler-API-Key", "sweep-secret")
            .body(Body::empty())
            .expect("request");
        let (status, body) = send(&h.app, request).await;

        assert_eq!(status, StatusCode::OK);
        let report: BatchRunReport = decode(&body);
        assert_eq!(report.total_due, 1);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.items[0].booking_id, booking.id);
        assert!(report.items[0].confirmation_token.is_some());
    }
}
