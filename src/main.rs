use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{Event, KeyEventKind};
use tokio::sync::watch;

use fxview::channel::update_channel;
use fxview::config::Config;
use fxview::error::AppError;
use fxview::event::FeedStatus;
use fxview::feed::BarPipeline;
use fxview::fxopen::ws::FxOpenWsClient;
use fxview::input::{parse_main_command, UiCommand};
use fxview::ui::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider (required by rustls 0.23+)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load config
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            eprintln!(
                "Make sure .env file exists with FEED_URL, WEB_API_ID, WEB_API_KEY and WEB_API_SECRET"
            );
            std::process::exit(1);
        }
    };

    // Init tracing (log to file so it doesn't interfere with TUI)
    let log_file = std::fs::File::create("fxview.log")
        .map_err(AppError::Io)
        .context("failed to create fxview.log")?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                config
                    .logging
                    .level
                    .parse()
                    .unwrap_or_else(|_| "info".parse().unwrap())
            }),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .json()
        .init();

    tracing::info!(
        symbol = %config.feed.symbol,
        periodicity = %config.feed.periodicity,
        feed_url = %config.feed.url,
        "Starting fxview"
    );

    let interval_ms = config
        .feed
        .interval_ms()
        .context("validated feed.periodicity became invalid at runtime")?;

    // Channels
    let (update_tx, update_rx) = update_channel();
    let (status_tx, status_rx) = watch::channel(FeedStatus::Connecting);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Feed task: network producer
    let mut pipeline = BarPipeline::new(update_tx, interval_ms)?;
    let client = FxOpenWsClient::new(&config.feed);
    let feed_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        match client.run(&mut pipeline, &status_tx, feed_shutdown).await {
            Ok(()) => tracing::info!("Feed task shutting down"),
            Err(e) => {
                tracing::error!(error = %e, "Feed session ended");
                let _ = status_tx.send(FeedStatus::Disconnected(e.to_string()));
            }
        }
    });

    // Ctrl+C handler
    let ctrl_c_shutdown = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Ctrl+C received");
        let _ = ctrl_c_shutdown.send(true);
    });

    // TUI main loop: render consumer
    let mut terminal = ratatui::init();
    let mut app_state = AppState::new(
        &config.feed.symbol,
        &config.feed.periodicity,
        config.ui.chart_mode,
        config.ui.visible_bars,
        update_rx,
    );
    let refresh = Duration::from_millis(config.ui.refresh_rate_ms);
    let mut needs_redraw = true;

    loop {
        if needs_redraw {
            terminal.draw(|frame| ui::render(frame, &app_state))?;
            needs_redraw = false;
        }

        // Handle input (non-blocking with timeout)
        if crossterm::event::poll(refresh)? {
            match crossterm::event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    match parse_main_command(&key.code) {
                        Some(UiCommand::Quit) => {
                            tracing::info!("User quit");
                            let _ = shutdown_tx.send(true);
                            break;
                        }
                        Some(UiCommand::ToggleChartMode) => {
                            app_state.toggle_mode();
                            needs_redraw = true;
                        }
                        None => {}
                    }
                }
                Event::Resize(_, _) => needs_redraw = true,
                _ => {}
            }
        }

        // Drain queued chart updates
        let status = status_rx.borrow().clone();
        needs_redraw |= app_state.set_feed_status(status);
        needs_redraw |= app_state.refresh();

        // Check shutdown
        if *shutdown_rx.borrow() {
            break;
        }
    }

    ratatui::restore();
    tracing::info!("Shutdown complete");
    println!("Goodbye! Check fxview.log for details.");
    Ok(())
}
