//! `netflows` demo: logs wifi / cellular rates once per second until Ctrl-C.
//!
//! Flags: `--short` (unit style "K/s"), `--consistent` (zero-padded numbers).
//! Interval and interface prefixes come from `NETFLOWS_*` environment
//! variables; log level from `RUST_LOG`.

use anyhow::{bail, Context};

use netflows::{
    human_readable_magnitude, human_readable_rate_unit, number_style, set_number_style,
    set_unit_style, unit_style, MonitorConfig, NumberStyle, TrafficItem, TrafficMonitor, UnitStyle,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!("PANIC in netflows: {info}");
        default_hook(info);
    }));

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "netflows=info".into()),
        )
        .init();

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--short" => set_unit_style(UnitStyle::Short),
            "--consistent" => set_number_style(NumberStyle::Consistent),
            other => bail!("unknown argument {other:?} (expected --short or --consistent)"),
        }
    }

    let config = MonitorConfig::from_env();
    tracing::info!(
        "Classifying wifi by {:?}, cellular by {:?}",
        config.classifier.wifi_prefixes,
        config.classifier.cellular_prefixes
    );
    let monitor = TrafficMonitor::start_system(config);

    // The first result needs a baseline tick plus one more.
    let window = monitor.config().tick_interval * 2;
    let first = monitor
        .await_next(window)
        .await
        .context("interface counters produced no sample")?;
    let total = &first.total_traffic;
    tracing::info!(
        "Since boot: wifi {} {}, cellular {} {}",
        total.wifi_total.magnitude,
        total.wifi_total.unit,
        total.cellular_total.magnitude,
        total.cellular_total.unit
    );

    monitor.subscribe(|info| {
        let rates = &info.traffic_per_second;
        tracing::info!(
            "\u{2193} {}  \u{2191} {}  (wifi {}, cellular {})",
            display_rate(&rates.down_total),
            display_rate(&rates.up_total),
            display_rate(&rates.wifi_total),
            display_rate(&rates.cellular_total)
        );
    });

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    monitor.stop();
    Ok(())
}

/// Rate for display. A counter reset yields a negative rate; show it as zero.
fn display_rate(item: &TrafficItem) -> String {
    if item.byte_count < 0 {
        format!(
            "{} {}",
            human_readable_magnitude(0, number_style()),
            human_readable_rate_unit(0, unit_style())
        )
    } else {
        format!("{} {}", item.magnitude, item.unit)
    }
}
