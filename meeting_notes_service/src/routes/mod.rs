pub mod error_payload;
pub mod preflight;
pub mod process_meeting;
pub mod service_info;

pub use error_payload::*;
pub use preflight::*;
pub use process_meeting::*;
pub use service_info::*;
