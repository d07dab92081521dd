pub mod attendance;
pub mod leave_request;
pub mod qr_code;
pub mod role;
pub mod shift;
pub mod user;
