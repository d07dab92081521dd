use crate::api::leave_request::{CreateLeave, UpdateLeave};
use crate::api::qr_code::{GenerateQr, ScanRequest};
use crate::api::shift::{CreateShift, UpdateShift};
use crate::api::user::UpdateUser;
use crate::model::attendance::{AttendanceAction, AttendanceRecord, AttendanceStatus};
use crate::model::leave_request::{LeaveRequest, LeaveStatus, LeaveType};
use crate::model::qr_code::QrCode;
use crate::model::role::Role;
use crate::model::shift::Shift;
use crate::model::user::User;
use crate::models::{LoginRequest, LoginResponse, RegisterRequest};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Timeclock API",
        version = "1.0.0",
        description = r#"
## Attendance & Leave Backend

Employees punch in and out, take breaks, request leave and check in with a shared QR code.

### 🔹 Key Features
- **Attendance**: punch-in, breaks, punch-out, one record per user per day
- **Leave**: holiday, permission and sick-leave requests with manager approval
- **QR Code**: a single active check-in code, rotated by admins
- **Shifts**: planned working hours per user
- **Users**: profiles and role management

### 🔐 Security
Everything except login, registration and QR scanning needs a **JWT Bearer** token.
Roles are `employee`, `manager` and `admin`.

### 📦 Errors
Failures return `{"error": "<message>"}` with the matching HTTP status.
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,

        crate::api::attendance::punch_in,
        crate::api::attendance::punch_out,
        crate::api::attendance::break_start,
        crate::api::attendance::break_end,
        crate::api::attendance::my_attendance,
        crate::api::attendance::today_status,
        crate::api::attendance::all_attendance,

        crate::api::leave_request::create_leave,
        crate::api::leave_request::my_requests,
        crate::api::leave_request::pending_requests,
        crate::api::leave_request::all_requests,
        crate::api::leave_request::update_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,

        crate::api::qr_code::generate,
        crate::api::qr_code::active,
        crate::api::qr_code::scan,
        crate::api::qr_code::history,
        crate::api::qr_code::deactivate,

        crate::api::user::list_users,
        crate::api::user::profile,
        crate::api::user::get_user,
        crate::api::user::update_user,
        crate::api::user::delete_user,

        crate::api::shift::my_shifts,
        crate::api::shift::all_shifts,
        crate::api::shift::create_shift,
        crate::api::shift::update_shift,
        crate::api::shift::delete_shift
    ),
    components(
        schemas(
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            User,
            Role,
            AttendanceRecord,
            AttendanceStatus,
            AttendanceAction,
            LeaveRequest,
            LeaveType,
            LeaveStatus,
            CreateLeave,
            UpdateLeave,
            QrCode,
            GenerateQr,
            ScanRequest,
            Shift,
            CreateShift,
            UpdateShift,
            UpdateUser
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration and login"),
        (name = "Attendance", description = "Attendance tracking APIs"),
        (name = "Leave", description = "Leave request APIs"),
        (name = "QR Code", description = "QR check-in APIs"),
        (name = "Users", description = "User management APIs"),
        (name = "Shifts", description = "Shift planning APIs"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_route_group() {
        let doc = ApiDoc::openapi();
        let paths: Vec<_> = doc.paths.paths.keys().cloned().collect();

        for expected in [
            "/api/auth/login",
            "/api/attendance/punch-in",
            "/api/leave-requests/{leave_id}/approve",
            "/api/qr-code/scan",
            "/api/users/profile",
            "/api/shifts/my-shifts",
        ] {
            assert!(paths.iter().any(|p| p == expected), "missing {expected}");
        }
    }

    #[test]
    fn declares_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");

        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
