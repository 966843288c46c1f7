//! Process-wide `tracing` setup. Library code only uses the re-exported macros.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, info_span, trace, warn};
