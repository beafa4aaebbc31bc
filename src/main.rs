// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Console-Session interactive client
//!
//! Runs the full session lifecycle from a terminal: login handshake, a live
//! refresh timer until Ctrl-C, then logout. Everything happens in one
//! process so the agent's session cookie survives the handshake.

use console_session::{
    config::Config, Authenticator, LoginOutcome, LoginParams, LogoutOutcome,
};
use reqwest::Url;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(api_url = %config.api_url, "Starting console session");

    let auth = Authenticator::from_config(&config)?;

    // Resume an existing session if the agent still knows us
    if auth.check_auth().await.is_err() {
        let LoginOutcome::Redirect(url) = auth.login(LoginParams::default()).await? else {
            return Err("login start did not return an authorization URL".into());
        };

        println!("Open this URL to sign in:\n\n  {url}\n");
        println!("Then paste the URL your browser was redirected to:");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let callback = lines
            .next_line()
            .await?
            .ok_or("no callback URL on stdin")?;
        let callback = Url::parse(callback.trim())?;

        auth.location().set(callback.clone());
        auth.login(LoginParams::from_url(&callback)).await?;
    }

    let identity = auth.get_identity().await?;
    println!(
        "Signed in as {} ({})",
        identity.full_name.as_deref().unwrap_or("<unnamed>"),
        identity.id
    );
    println!("Session refresh is running; press Ctrl-C to log out.");

    tokio::signal::ctrl_c().await?;

    match auth.logout().await? {
        LogoutOutcome::Redirect(url) => println!("Logged out. Finish at:\n\n  {url}\n"),
        LogoutOutcome::AlreadyAnonymous => println!("Session had already ended."),
    }

    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("console_session=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
