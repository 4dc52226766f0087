//! HTTP endpoint implementations for the session and profile routes.

mod profile_handlers;
pub mod request_utils;
pub mod response;
mod session_handlers;

pub use profile_handlers::{change_password, get_profile, update_profile};
pub use response::{error_response, success_response, ApiError, ApiResponse, Envelope, ErrorResponse};
pub use session_handlers::{sign_in, sign_out, SessionToken};
