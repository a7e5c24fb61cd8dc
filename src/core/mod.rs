//! Core logic: interface sampling, traffic packs, the per-second monitor.
//!
//! - [`formatter`] — byte counts to magnitude / unit strings, global styles
//! - [`interfaces`] — [`InterfaceSource`] seam over the OS interface list
//! - [`ifaddrs`] — `getifaddrs` FFI walk (the only unsafe code)
//! - [`counters`] — wifi / cellular classification and raw bucket sums
//! - [`pack`] — [`TrafficPack`] aggregation and per-second deltas
//! - [`monitor`] — [`TrafficMonitor`] tick, subscriptions and pull APIs

pub mod counters;
pub mod formatter;
#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios"
))]
pub mod ifaddrs;
pub mod interfaces;
pub mod monitor;
pub mod pack;

pub use counters::{sample_raw_counters, LinkClass, LinkClassifier, RawCounterBucket, RawCounters};
pub use formatter::{
    human_readable_magnitude, human_readable_rate_unit, human_readable_unit, number_style,
    set_number_style, set_unit_style, unit_style, ByteFormatter, NumberStyle, UnitStyle,
};
pub use interfaces::{AddressFamily, InterfaceRecord, InterfaceSource, SysinfoInterfaces, SystemInterfaces};
pub use monitor::{NextRequest, SubscriptionId, TrafficMonitor};
pub use pack::{aggregate, TrafficInfo, TrafficItem, TrafficPack};
