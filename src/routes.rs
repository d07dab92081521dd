use crate::{
    api::{attendance, leave_request, qr_code, shift, user},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
    error::AppError,
    utils::UsernameIndex,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{
    middleware::{Condition, from_fn},
    web,
};
use sqlx::SqlitePool;
use std::sync::Arc;

type Limiter = Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>;

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Limiter {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);

    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_else(|| {
            tracing::warn!(requests_per_min, "Invalid rate limit, using governor defaults");
            GovernorConfig::default()
        });

    Arc::new(Governor::new(&cfg))
}

#[derive(Clone)]
struct RateLimiters {
    enabled: bool,
    login: Limiter,
    register: Limiter,
    scan: Limiter,
    protected: Limiter,
}

/// Everything the HTTP layer shares across workers. Build it once, then hand
/// it to [`configure`] from the `App` factory.
#[derive(Clone)]
pub struct AppState {
    pub pool: web::Data<SqlitePool>,
    pub config: web::Data<Config>,
    pub usernames: web::Data<UsernameIndex>,
    limiters: RateLimiters,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: Config) -> Self {
        let limiters = RateLimiters {
            enabled: config.rate_limit_enabled,
            login: build_limiter(config.rate_login_per_min),
            register: build_limiter(config.rate_register_per_min),
            scan: build_limiter(config.rate_scan_per_min),
            protected: build_limiter(config.rate_protected_per_min),
        };

        Self {
            pool: web::Data::new(pool),
            config: web::Data::new(config),
            usernames: web::Data::new(UsernameIndex::new()),
            limiters,
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig, state: &AppState) {
    let limits = &state.limiters;

    // malformed input gets the same {"error": ...} body as everything else
    cfg.app_data(state.pool.clone())
        .app_data(state.config.clone())
        .app_data(state.usernames.clone())
        .app_data(
            web::JsonConfig::default()
                .error_handler(|err, _req| AppError::validation(err.to_string()).into()),
        )
        .app_data(
            web::QueryConfig::default()
                .error_handler(|err, _req| AppError::validation(err.to_string()).into()),
        )
        .app_data(
            web::PathConfig::default()
                .error_handler(|err, _req| AppError::validation(err.to_string()).into()),
        );

    cfg.service(
        web::scope(&state.config.api_prefix)
            // Public routes
            .service(
                web::scope("/auth")
                    .service(
                        web::resource("/login")
                            .wrap(Condition::new(limits.enabled, limits.login.clone()))
                            .route(web::post().to(handlers::login)),
                    )
                    .service(
                        web::resource("/register")
                            .wrap(Condition::new(limits.enabled, limits.register.clone()))
                            .route(web::post().to(handlers::register)),
                    ),
            )
            .service(
                web::resource("/qr-code/scan")
                    .wrap(Condition::new(limits.enabled, limits.scan.clone()))
                    .route(web::post().to(qr_code::scan)),
            )
            // Protected routes
            .service(
                web::scope("")
                    .wrap(from_fn(auth_middleware))
                    .wrap(Condition::new(limits.enabled, limits.protected.clone()))
                    .service(
                        web::scope("/attendance")
                            .route("/punch-in", web::post().to(attendance::punch_in))
                            .route("/punch-out", web::post().to(attendance::punch_out))
                            .route("/break-start", web::post().to(attendance::break_start))
                            .route("/break-end", web::post().to(attendance::break_end))
                            .route("/my-attendance", web::get().to(attendance::my_attendance))
                            .route("/today-status", web::get().to(attendance::today_status))
                            .route("/all", web::get().to(attendance::all_attendance)),
                    )
                    .service(
                        web::scope("/leave-requests")
                            // /leave-requests
                            .service(web::resource("").route(web::post().to(leave_request::create_leave)))
                            .route("/my-requests", web::get().to(leave_request::my_requests))
                            .route("/pending", web::get().to(leave_request::pending_requests))
                            .route("/all", web::get().to(leave_request::all_requests))
                            // /leave-requests/{id}
                            .service(
                                web::resource("/{id}").route(web::put().to(leave_request::update_leave)),
                            )
                            .route("/{id}/approve", web::post().to(leave_request::approve_leave))
                            .route("/{id}/reject", web::post().to(leave_request::reject_leave)),
                    )
                    .service(
                        web::scope("/qr-code")
                            .route("/generate", web::post().to(qr_code::generate))
                            .route("/active", web::get().to(qr_code::active))
                            .route("/history", web::get().to(qr_code::history))
                            .route("/{id}/deactivate", web::post().to(qr_code::deactivate)),
                    )
                    .service(
                        web::scope("/users")
                            .service(web::resource("").route(web::get().to(user::list_users)))
                            // before /{id}
                            .route("/profile", web::get().to(user::profile))
                            .service(
                                web::resource("/{id}")
                                    .route(web::get().to(user::get_user))
                                    .route(web::put().to(user::update_user))
                                    .route(web::delete().to(user::delete_user)),
                            ),
                    )
                    .service(
                        web::scope("/shifts")
                            .service(web::resource("").route(web::post().to(shift::create_shift)))
                            .route("/my-shifts", web::get().to(shift::my_shifts))
                            .route("/all", web::get().to(shift::all_shifts))
                            .service(
                                web::resource("/{id}")
                                    .route(web::put().to(shift::update_shift))
                                    .route(web::delete().to(shift::delete_shift)),
                            ),
                    ),
            ),
    );
}
