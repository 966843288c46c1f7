//! In-process backing store. Used by the `memory` backend and by tests.

mod device_code_repo_memory;
mod grant_repo_memory;

pub use device_code_repo_memory::*;
pub use grant_repo_memory::*;
