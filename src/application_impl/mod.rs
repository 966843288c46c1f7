mod device_flow_store_impl;
mod grant_store_impl;
mod token_cleanup;

pub use device_flow_store_impl::*;
pub use grant_store_impl::*;
pub use token_cleanup::*;
