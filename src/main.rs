use anyhow::Context;
use clap::Parser;

use ace::config::{CliArgs, Config};
use ace::database as db;
use ace::sandbox::{Judge, LanguageRegistry, SandboxSettings};
use ace::web_server::build_server;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = CliArgs::parse();

    let Config {
        server: server_config,
        sandbox: sandbox_config,
        languages: language_config,
        problems,
    } = cli
        .to_config()
        .with_context(|| format!("Failed to load configuration from {}", cli.config_path))?;

    let db_path = match &cli.db_path {
        Some(path) => path.clone(),
        None => db::get_db_path().context("Failed to locate local data directory")?,
    };

    if cli.flush_data {
        db::remove_db(&db_path);
    }

    let db_pool = db::init_db(&db_path)
        .await
        .context("Failed to initialize database")?;

    let seeded = db::seed_problems(&problems, &db_pool)
        .await
        .context("Failed to seed problems")?;
    let stored = db::count_problems(&db_pool).await?;
    log::info!("Seeded {seeded} problems, {stored} problems in store");

    let registry = LanguageRegistry::from_config(&language_config);
    registry.check_interpreters().await;

    let settings = SandboxSettings::from(&sandbox_config);
    log::info!(
        "Sandbox scratch directory {}, per-test timeout {:?}",
        settings.scratch_dir.display(),
        settings.timeout
    );
    log::warn!("Sandbox runs submissions as plain subprocesses with NO security isolation");

    let judge = Judge::new(registry, settings);

    let server =
        build_server(server_config, db_pool, judge).context("Failed to build server")?;

    let server_handle = server.handle();
    let server_task = actix_web::rt::spawn(server);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            log::info!("Ctrl-c received, shutting down...");
        }
        res_server = server_task => {
            log::error!("Server terminated unexpectedly: {:?}", res_server);
        }
    }

    server_handle.stop(true).await;

    log::info!("Shutdown complete");
    Ok(())
}
