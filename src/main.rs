use log::{error, info};

use lab_env_monitor::chart::PlotRenderer;
use lab_env_monitor::config::MonitorConfig;
use lab_env_monitor::instrument::ModbusInstrument;
use lab_env_monitor::monitor::Monitor;
use lab_env_monitor::notify::SmtpTransport;
use lab_env_monitor::utils::Clock;

async fn main_loop(config: MonitorConfig, clock: Clock) -> Result<(), Box<dyn std::error::Error>> {
    let instrument = ModbusInstrument::connect(config.instrument.clone());
    let transport = SmtpTransport::new(&config.smtp, &config.lab_id)?;
    let renderer = PlotRenderer::new(config.temperature, config.humidity);

    Monitor::new(&config, instrument, transport, renderer, clock)
        .run()
        .await;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Must run while the process is still single-threaded
    let clock = Clock::local();

    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_secs()
        .init();

    info!("Starting Laboratory Environment Monitoring and Alert System");

    // Load configuration
    let config = match MonitorConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };
    config.log_config();

    // Handle Ctrl+C gracefully
    let (tx, mut rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            // Keep the sender alive so the monitor is not cancelled
            std::future::pending::<()>().await;
        }
        let _ = tx.send(());
    });

    // Run main loop or wait for shutdown signal
    tokio::select! {
        result = main_loop(config, clock) => {
            match result {
                Ok(_) => info!("Monitor stopped"),
                Err(e) => error!("Fatal error: {}", e),
            }
        }
        _ = &mut rx => {
            info!("Program terminated by user. Exiting gracefully.");
        }
    }

    Ok(())
}
