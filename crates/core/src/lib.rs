pub mod backend;
pub mod clock;
pub mod config;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod messages;
pub mod notify;
pub mod scheduler;
pub mod slots;
pub mod store;

pub use chrono;
pub use chrono_tz;

pub use backend::{BackendError, MockBackend, ReservationBackend, RetryPolicy, RetryingBackend};
pub use clock::{Clock, FixedClock, SystemClock};
pub use domain::booking::{Booking, BookingId, BookingStatus, OwnerId};
pub use domain::request::TeeTimeRequest;
pub use domain::session::{ConversationSession, ConversationState};
pub use domain::slot::{ReservationOutcome, SlotCandidate};
pub use engine::{BatchRunReport, BookingEngine, ExecutionOutcome, ItemOutcome};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use notify::{Notifier, RecordingNotifier, TracingNotifier};
pub use scheduler::{compute_execution_instant, BookingWindowPolicy, SchedulingPolicy};
pub use store::{BookingFilter, BookingStore, SessionStore, StoreError};
