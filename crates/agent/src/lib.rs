//! Conversation runtime for SMS-style booking requests.
//!
//! Natural-language parsing happens upstream; this crate receives the parsed
//! intent for each inbound message and drives a per-owner state machine:
//!
//! 1. **Intent** (`intent`) - the structured result of parsing one message
//! 2. **Conversation** (`conversation`) - collect, confirm and hand a request
//!    to the booking engine, or list and cancel existing bookings
//!
//! The tracker only produces reply text. Delivering it is the caller's job.

pub mod conversation;
pub mod intent;

pub use conversation::ConversationTracker;
pub use intent::{IntentKind, ParsedIntent, RequestDraft};
