//! Attendance domain services.
//!
//! - [`checkin`]: the pure check-in validator
//! - [`recorder`]: exactly-once persistence of accepted check-ins
//! - [`registry`]: session lookup and expiry, backed by the database and the
//!   in-memory [`demo_store`]
//! - [`code`], [`geo`], [`policy`]: rotating codes, distance math and the
//!   configurable thresholds the validator applies

pub mod checkin;
pub mod code;
pub mod demo_store;
pub mod geo;
pub mod policy;
pub mod recorder;
pub mod registry;

pub use checkin::{
    AttendanceDraft, CheckInContext, CheckInRejection, CheckInRequest, SessionSnapshot, evaluate,
};
pub use demo_store::DemoSessionStore;
pub use policy::{AccuracyPolicy, CheckInPolicy};
pub use recorder::{AttendanceRecorder, RecordError, is_unique_violation};
pub use registry::{ResolvedSession, SessionOrigin, SessionRegistry};
