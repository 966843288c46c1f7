mod device_flow_store;
mod grant_store;

pub use device_flow_store::*;
pub use grant_store::*;
