// store

mod device_code_repo;
mod grant_repo;

pub use device_code_repo::*;
pub use grant_repo::*;

// notification

mod operational_notification;

pub use operational_notification::*;

mod repo_error;

pub use repo_error::*;
