use actix_web::middleware::NormalizePath;
use actix_web::{App, HttpServer};
use anyhow::Context;
use clap::Parser;
use std::str::FromStr;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use timeclock::{
    cli::{self, Cli, Command},
    config::Config,
    db::init_db,
    docs::ApiDoc,
    routes::{self, AppState},
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let level = tracing::Level::from_str(&config.log_level).unwrap_or(tracing::Level::INFO);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    let pool = init_db(&config.database_url).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::SetAdmin { username } => {
            let user = cli::set_admin(&pool, &username).await?;
            println!("User '{}' is now admin ({})", user.username, user.full_name());
            Ok(())
        }
        Command::ListUsers => {
            for line in cli::list_users(&pool).await? {
                println!("{line}");
            }
            Ok(())
        }
        Command::Serve => serve(pool, config).await,
    }
}

async fn serve(pool: sqlx::SqlitePool, config: Config) -> anyhow::Result<()> {
    info!("Server starting...");

    let server_addr = config.server_addr.clone();
    let state = AppState::new(pool.clone(), config);

    let usernames = state.usernames.clone();
    let warmup_pool = pool.clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = usernames.filter.warmup(&warmup_pool, 100).await {
            warn!(error = %e, "Failed to warmup username filter");
        }
        // Warm up last 30 days of recent users in batches of 250
        if let Err(e) = usernames.cache.warmup(&warmup_pool, 30, 250).await {
            warn!(error = %e, "Failed to warmup username cache");
        }
    });

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .configure(|cfg| routes::configure(cfg, &state))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
