mod cleanup_host;
mod server;

pub use cleanup_host::*;
pub use server::*;
