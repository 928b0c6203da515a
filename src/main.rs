use chainpulse::{config::Config, dashboard::Dashboard, ui};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    // Logs go to stderr; the UI draws on the alternate screen
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ {}", e);
            std::process::exit(2);
        }
    };
    config.apply_args(std::env::args());

    // NOTE: reqwest and tokio-tungstenite both pull in rustls; pick one provider
    if rustls::crypto::aws_lc_rs::default_provider().install_default().is_err() {
        log::warn!("A rustls crypto provider was already installed");
    }

    log::info!("🚀 Starting chainpulse...");
    log::info!("📊 Configuration:");
    log::info!("   Endpoint: {}", config.endpoint_base);
    log::info!("   Snapshot: {}", config.snapshot_url());
    log::info!("   Stream:   {}", config.stream_url());
    log::info!("   Chart:    {}", config.chart_style.as_str());
    log::info!("   RUST_LOG: {}", config.rust_log.as_deref().unwrap_or("info (default)"));

    let dashboard = Dashboard::mount(&config);

    let view = dashboard.view();
    let status = dashboard.stream_states();
    let style = config.chart_style;
    let ui_handle = tokio::task::spawn_blocking(move || {
        ui::run_ui(view, status, style).map_err(|e| e.to_string())
    });

    match ui_handle.await {
        Ok(Ok(())) => log::info!("UI exited"),
        Ok(Err(e)) => log::error!("UI error: {}", e),
        Err(e) => log::error!("UI task failed: {}", e),
    }

    dashboard.unmount().await;
}
