pub mod duration;
pub mod logging;

use uuid::Uuid;

pub use duration::parse_duration;

/// Opaque identifier tying a client-facing error to its log line.
pub fn correlation_id() -> String {
    Uuid::new_v4().simple().to_string()
}
