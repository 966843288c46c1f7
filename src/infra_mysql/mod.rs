mod device_code_repo_mysql;
mod grant_repo_mysql;

pub use device_code_repo_mysql::*;
pub use grant_repo_mysql::*;

mod schema;

pub use schema::*;

mod util;
