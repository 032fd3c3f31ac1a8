// Copyright (c) Studydesk.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use studydesk::auth::{self, HmacVerifier};
use studydesk::config::ServerConfig;
use studydesk::routes::{build_router, AppState};
use studydesk::{cli, db};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli::build_cli().get_matches();

    match matches.subcommand() {
        Some(("init", _)) => {
            db::open_or_init()?;
            println!("Database initialized at {}", db::db_path()?.display());
        }
        Some(("serve", sub)) => serve(sub).await?,
        Some(("token", sub)) => token(sub)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}

async fn serve(sub: &clap::ArgMatches) -> Result<()> {
    let mut config = ServerConfig::from_env();
    if let Some(bind) = sub.get_one::<String>("bind") {
        config.bind = bind.clone();
    }
    if let Some(path) = sub.get_one::<String>("db") {
        config.db_path = Some(PathBuf::from(path));
    }
    init_tracing(config.log_json);

    let conn = match &config.db_path {
        Some(path) => db::open_at(path)?,
        None => db::open_or_init()?,
    };
    let verifier = auth::verifier_from_config(&config)?;
    let bind = config.bind.clone();
    let state = AppState::new(db::shared(conn), config, verifier);
    let app = build_router(state);

    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Bind {}", bind))?;
    info!("studydesk listening on {bind}");
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await
        .context("Server failed")?;
    Ok(())
}

fn token(sub: &clap::ArgMatches) -> Result<()> {
    let config = ServerConfig::from_env();
    let secret = config
        .auth_secret
        .context("STUDYDESK_AUTH_SECRET is not set")?;
    let user = sub.get_one::<String>("user").unwrap();
    println!("{}", HmacVerifier::new(&secret).sign(user)?);
    Ok(())
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("register SIGTERM");
        let mut sigint = signal(SignalKind::interrupt()).expect("register SIGINT");
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing(log_json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
