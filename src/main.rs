mod cache;
mod config;
mod conversion;
mod error;
mod models;
mod protocol;
mod sampler;
mod serial;
mod utils;

use log::{error, info, warn};
use time::OffsetDateTime;
use tokio::time::sleep;

use cache::ReadingCache;
use config::ReaderConfig;
use protocol::CommandChannel;
use sampler::Sampler;
use serial::{Connector, SerialConnector, SimulatedConnector};
use utils::{duration_to_seconds, format_datetime};

async fn main_loop<C>(
    mut sampler: Sampler<C>,
    config: ReaderConfig,
) -> Result<(), Box<dyn std::error::Error>>
where
    C: Connector + 'static,
    C::Link: 'static,
{
    info!(
        "Starting CloudWatcher reader service ({} variant)",
        sampler.variant()
    );

    let started = OffsetDateTime::now_utc();
    let mut cache = ReadingCache::new(started, config.stale_threshold_secs);

    // Device identity is read once; cycles below run strictly one at a time
    let (returned, info) = tokio::task::spawn_blocking(move || {
        let info = sampler.read_device_info();
        (sampler, info)
    })
    .await?;
    sampler = returned;

    info!(
        "Device: {} (firmware {})",
        info.name.as_deref().unwrap_or("unknown"),
        info.firmware.as_deref().unwrap_or("unknown")
    );
    cache.set_device_info(info);

    loop {
        let cycle_start = OffsetDateTime::now_utc();
        info!("Starting acquisition cycle at: {}", format_datetime(&cycle_start));

        let sample_count = config.sample_count;
        let (returned, result) = tokio::task::spawn_blocking(move || {
            let result = sampler.acquire(sample_count);
            (sampler, result)
        })
        .await?;
        sampler = returned;

        let now = OffsetDateTime::now_utc();
        match result {
            Ok(snapshot) => cache.record_success(snapshot, now),
            Err(e) => {
                error!("Acquisition cycle failed: {}", e);
                cache.record_failure(e.to_string());
                if !sampler.is_connected() {
                    warn!("No open link to {}, will reconnect next cycle", config.serial_port);
                }
            }
        }

        // Print summary
        if let Some(snap) = cache.snapshot() {
            info!("Summary:");
            info!("  Sky temperature: {:.2}°C", snap.sky_temp_c);
            if let Some(delta) = snap.delta_c {
                info!("  Sky delta: {:.2}°C", delta);
            }
            if let Some(rain) = snap.rain_freq {
                info!("  Rain frequency: {}", rain);
            }
            if let Some(mpsas) = snap.mpsas {
                info!("  Sky brightness: {:.2} mag/arcsec²", mpsas);
            }
            info!("  Based on {} samples", snap.samples);
        }
        if let Some(message) = cache.error() {
            warn!("Publishing with error quality: {}", message);
        }

        match serde_json::to_string(&cache.publish(now)) {
            Ok(json) => info!("Reading: {}", json),
            Err(e) => error!("Failed to serialize reading: {}", e),
        }

        // Wait until next cycle should start
        let elapsed = duration_to_seconds(OffsetDateTime::now_utc() - cycle_start);
        let interval = config.read_interval.as_secs();
        if elapsed < interval {
            let wait_time = interval - elapsed;
            info!("Waiting {} seconds until next cycle", wait_time);
            sleep(std::time::Duration::from_secs(wait_time)).await;
        }
    }
}

fn build_sampler<C: Connector>(connector: C, config: &ReaderConfig) -> Sampler<C> {
    let channel =
        CommandChannel::new(connector, config.variant).with_read_timeout(config.read_timeout);
    Sampler::new(channel, config.calibration.clone(), config.thresholds.clone())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    // Load configuration
    let mut config = match ReaderConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    if std::env::args().skip(1).any(|arg| arg == "--dummy") {
        config.use_dummy = true;
    }

    // Handle Ctrl+C gracefully
    let (tx, mut rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        let _ = tx.send(());
    });

    let service = async {
        if config.use_dummy {
            let connector = SimulatedConnector::new(config.variant);
            main_loop(build_sampler(connector, &config), config.clone()).await
        } else {
            let connector = SerialConnector::new(
                config.serial_port.clone(),
                config.baud_rate,
                config.read_timeout,
            );
            main_loop(build_sampler(connector, &config), config.clone()).await
        }
    };

    // Run main loop or wait for shutdown signal
    tokio::select! {
        result = service => {
            match result {
                Ok(_) => info!("Program completed successfully"),
                Err(e) => error!("Fatal error: {}", e),
            }
        }
        _ = &mut rx => {
            info!("Program terminated by user. Exiting gracefully.");
        }
    }

    Ok(())
}
