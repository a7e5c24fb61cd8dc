//! Wifi / cellular traffic monitor.
//!
//! Samples the OS interface byte counters once per tick, splits them into
//! wifi and cellular buckets, and publishes cumulative totals together with
//! per-second rates, each already formatted for display.
//!
//! ```no_run
//! # async fn demo() -> Result<(), netflows::MonitorError> {
//! use netflows::{MonitorConfig, TrafficMonitor};
//!
//! let monitor = TrafficMonitor::start_system(MonitorConfig::default());
//! monitor.subscribe(|info| {
//!     let down = &info.traffic_per_second.down_total;
//!     println!("{} {}", down.magnitude, down.unit);
//! });
//! let first = monitor.wait_default().await?;
//! println!("total up: {} bytes", first.total_traffic.up_total.byte_count);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;

pub use crate::config::MonitorConfig;
pub use crate::core::{
    aggregate, human_readable_magnitude, human_readable_rate_unit, human_readable_unit,
    number_style, sample_raw_counters, set_number_style, set_unit_style, unit_style,
    AddressFamily, ByteFormatter, InterfaceRecord, InterfaceSource, LinkClass, LinkClassifier,
    NextRequest, NumberStyle, RawCounterBucket, RawCounters, SubscriptionId, SysinfoInterfaces,
    SystemInterfaces, TrafficInfo, TrafficItem, TrafficMonitor, TrafficPack, UnitStyle,
};
pub use crate::error::MonitorError;
