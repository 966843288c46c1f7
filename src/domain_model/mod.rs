mod device_code;
mod filter;
mod grant;

pub use device_code::*;
pub use filter::*;
pub use grant::*;
