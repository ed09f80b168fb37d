// fakespot -- feed synthetic spots to a PSK Reporter collector.
//
// Builds a client, queues a batch of identical FT8 spots, and closes the
// client so the final flush goes out. Point it at a local collector when
// testing; the public collectors are real.
//
// Usage:
//   fakespot
//   fakespot --collector localhost:4739 --count 250
//   fakespot --collector report.pskreporter.info:14739 --kind basic
//   RUST_LOG=pskreporter=debug fakespot

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pskreporter::{unix_time_seconds, InformationSource, Spot, SpotKind, SpotterBuilder};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Feed synthetic spots to a PSK Reporter collector.
#[derive(Parser, Debug)]
#[command(name = "fakespot", version, about)]
struct Cli {
    /// Collector address (host:port).
    #[arg(long, default_value = "localhost:4739")]
    collector: String,

    /// Receiver callsign.
    #[arg(long, default_value = "N0CALL")]
    callsign: String,

    /// Receiver Maidenhead locator.
    #[arg(long, default_value = "JJ00OG")]
    locator: String,

    /// Receiver antenna description; empty to omit.
    #[arg(long, default_value = "Dipole")]
    antenna: String,

    /// Decoder software name and version.
    #[arg(long, default_value = "fakespot v0")]
    software: String,

    /// Persistent identifier; generated if empty.
    #[arg(long, default_value = "")]
    persistent_id: String,

    /// Sender record layout: basic, locator, snr-imd, snr-imd-locator.
    #[arg(long, default_value = "snr-imd-locator")]
    kind: SpotKind,

    /// Number of spots to feed.
    #[arg(long, default_value_t = 100)]
    count: u32,

    /// Sender callsign.
    #[arg(long, default_value = "N1CALL")]
    sender: String,

    /// Sender Maidenhead locator.
    #[arg(long, default_value = "II00OG")]
    sender_locator: String,

    /// Frequency in hertz.
    #[arg(long, default_value_t = 50_313_650)]
    freq_hz: u64,

    /// Signal-to-noise ratio in dB.
    #[arg(long, default_value_t = -3, allow_hyphen_values = true)]
    snr: i8,

    /// Intermodulation distortion.
    #[arg(long, default_value_t = 2)]
    imd: u8,

    /// Mode name.
    #[arg(long, default_value = "FT8")]
    mode: String,

    /// Mark spots as test transmissions.
    #[arg(long)]
    test: bool,

    /// Seconds to wait for the final flush on close.
    #[arg(long, default_value_t = 10)]
    close_timeout: u64,
}

impl Cli {
    fn spot(&self) -> Spot {
        let source = if self.test {
            InformationSource::AUTOMATIC.as_test()
        } else {
            InformationSource::AUTOMATIC
        };
        Spot::new(
            self.sender.as_str(),
            self.sender_locator.as_str(),
            self.freq_hz,
            self.snr,
            self.imd,
            self.mode.as_str(),
            source,
            unix_time_seconds(),
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("fakespot=info,pskreporter=info")),
        )
        .init();

    let cli = Cli::parse();

    let spotter = SpotterBuilder::new(&cli.collector)
        .receiver(&cli.callsign, &cli.locator)
        .antenna(&cli.antenna)
        .decoder_software(&cli.software)
        .persistent_identifier(&cli.persistent_id)
        .spot_kind(cli.kind)
        .close_timeout(Duration::from_secs(cli.close_timeout))
        .build()
        .await
        .with_context(|| format!("failed to start spot client for {}", cli.collector))?;

    info!(
        collector = %cli.collector,
        receiver = %spotter.receiver(),
        kind = %spotter.spot_kind(),
        session_id = spotter.session_id(),
        persistent_id = spotter.persistent_identifier(),
        "Spot client started"
    );

    let start = Instant::now();
    for _ in 0..cli.count {
        spotter
            .feed(cli.spot())
            .await
            .context("spot client stopped while feeding")?;
    }
    info!(count = cli.count, "Spots queued");

    check_closed(spotter.close().await, &cli.collector)?;
    info!(elapsed_ms = start.elapsed().as_millis() as u64, "Spot client closed");
    Ok(())
}

/// Turn the result of `Spotter::close` into the process outcome. A close
/// timeout means the queued spots were never sent, so it is an error too.
fn check_closed(result: pskreporter::Result<()>, collector: &str) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(pskreporter::Error::Timeout) => {
            warn!(collector, "Collector never became reachable; spots were not sent");
            Err(pskreporter::Error::Timeout)
                .with_context(|| format!("spots were not delivered to {collector}"))
        }
        Err(e) => Err(e).context("failed to close spot client"),
    }
}
