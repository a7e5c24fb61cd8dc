//! Traffic packs: eight formatted readings built from one raw sample, and the
//! per-second pack derived from two consecutive ones.

use serde::Serialize;

use crate::core::counters::RawCounters;
use crate::core::formatter::ByteFormatter;

/// One self-contained reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrafficItem {
    /// Count in bytes. Negative only in a per-second pack after a counter reset.
    pub byte_count: i64,
    /// Number part of the formatted reading, e.g. "100.5".
    pub magnitude: String,
    /// Unit part of the formatted reading, e.g. "MB" or "MB/s".
    pub unit: String,
}

impl TrafficItem {
    /// A cumulative reading.
    pub fn total(byte_count: i64, fmt: &ByteFormatter) -> Self {
        Self {
            byte_count,
            magnitude: fmt.magnitude(byte_count),
            unit: fmt.unit(byte_count),
        }
    }

    /// A per-second reading; the unit carries the "/s" suffix.
    pub fn rate(byte_count: i64, fmt: &ByteFormatter) -> Self {
        Self {
            byte_count,
            magnitude: fmt.magnitude(byte_count),
            unit: fmt.rate_unit(byte_count),
        }
    }
}

/// Upload / download / total readings per link class plus cross-class totals.
///
/// The four totals are always the integer sums of the base readings:
/// `cellular_total = cellular_up + cellular_down`,
/// `wifi_total = wifi_up + wifi_down`,
/// `up_total = cellular_up + wifi_up`,
/// `down_total = cellular_down + wifi_down`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrafficPack {
    pub cellular_up: TrafficItem,
    pub cellular_down: TrafficItem,
    pub cellular_total: TrafficItem,
    pub wifi_up: TrafficItem,
    pub wifi_down: TrafficItem,
    pub wifi_total: TrafficItem,
    pub up_total: TrafficItem,
    pub down_total: TrafficItem,
}

/// The four independent counts a pack is built from.
#[derive(Debug, Clone, Copy)]
struct BaseCounts {
    cellular_up: i64,
    cellular_down: i64,
    wifi_up: i64,
    wifi_down: i64,
}

impl TrafficPack {
    /// Cumulative pack from one raw sample.
    pub fn aggregate(counters: &RawCounters, fmt: &ByteFormatter) -> Self {
        let base = BaseCounts {
            cellular_up: clamp_to_i64(counters.cellular.sent),
            cellular_down: clamp_to_i64(counters.cellular.received),
            wifi_up: clamp_to_i64(counters.wifi.sent),
            wifi_down: clamp_to_i64(counters.wifi.received),
        };
        Self::build(base, fmt, TrafficItem::total)
    }

    /// Per-second pack: `current - previous` for every field, unclamped.
    pub fn delta(current: &TrafficPack, previous: &TrafficPack, fmt: &ByteFormatter) -> Self {
        let sub = |now: &TrafficItem, then: &TrafficItem| now.byte_count.saturating_sub(then.byte_count);
        let base = BaseCounts {
            cellular_up: sub(&current.cellular_up, &previous.cellular_up),
            cellular_down: sub(&current.cellular_down, &previous.cellular_down),
            wifi_up: sub(&current.wifi_up, &previous.wifi_up),
            wifi_down: sub(&current.wifi_down, &previous.wifi_down),
        };
        Self::build(base, fmt, TrafficItem::rate)
    }

    fn build(base: BaseCounts, fmt: &ByteFormatter, item: fn(i64, &ByteFormatter) -> TrafficItem) -> Self {
        Self {
            cellular_up: item(base.cellular_up, fmt),
            cellular_down: item(base.cellular_down, fmt),
            cellular_total: item(base.cellular_up.saturating_add(base.cellular_down), fmt),
            wifi_up: item(base.wifi_up, fmt),
            wifi_down: item(base.wifi_down, fmt),
            wifi_total: item(base.wifi_up.saturating_add(base.wifi_down), fmt),
            up_total: item(base.cellular_up.saturating_add(base.wifi_up), fmt),
            down_total: item(base.cellular_down.saturating_add(base.wifi_down), fmt),
        }
    }

    /// Whether the four sum relations hold exactly.
    pub fn check_sums(&self) -> bool {
        let sum = |a: &TrafficItem, b: &TrafficItem| a.byte_count.checked_add(b.byte_count);
        sum(&self.cellular_up, &self.cellular_down) == Some(self.cellular_total.byte_count)
            && sum(&self.wifi_up, &self.wifi_down) == Some(self.wifi_total.byte_count)
            && sum(&self.cellular_up, &self.wifi_up) == Some(self.up_total.byte_count)
            && sum(&self.cellular_down, &self.wifi_down) == Some(self.down_total.byte_count)
    }

    /// All readings with their field names, in declaration order.
    pub fn items(&self) -> [(&'static str, &TrafficItem); 8] {
        [
            ("cellular_up", &self.cellular_up),
            ("cellular_down", &self.cellular_down),
            ("cellular_total", &self.cellular_total),
            ("wifi_up", &self.wifi_up),
            ("wifi_down", &self.wifi_down),
            ("wifi_total", &self.wifi_total),
            ("up_total", &self.up_total),
            ("down_total", &self.down_total),
        ]
    }
}

/// Cumulative pack using the process-wide styles at call time.
pub fn aggregate(counters: &RawCounters) -> TrafficPack {
    TrafficPack::aggregate(counters, &ByteFormatter::current())
}

fn clamp_to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Result of one warm tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrafficInfo {
    /// Index of the tick that produced this result. Strictly increasing.
    pub tick: u64,
    /// Cumulative readings at this tick.
    pub total_traffic: TrafficPack,
    /// Difference from the previous tick.
    pub traffic_per_second: TrafficPack,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::counters::RawCounterBucket;
    use crate::core::formatter::{NumberStyle, UnitStyle};

    fn fmt() -> ByteFormatter {
        ByteFormatter::new(NumberStyle::Auto, UnitStyle::Full)
    }

    fn counters(wifi: (u64, u64), cellular: (u64, u64)) -> RawCounters {
        RawCounters {
            wifi: RawCounterBucket { sent: wifi.0, received: wifi.1 },
            cellular: RawCounterBucket { sent: cellular.0, received: cellular.1 },
        }
    }

    /// Pack whose `up_total` equals `up` (all upload on wifi).
    fn pack_with_up(up: u64) -> TrafficPack {
        TrafficPack::aggregate(&counters((up, 0), (0, 0)), &fmt())
    }

    #[test]
    fn test_wifi_megabyte_scenario() {
        let pack = TrafficPack::aggregate(&counters((1_000_000, 2_000_000), (0, 0)), &fmt());
        assert_eq!(pack.wifi_up.magnitude, "1");
        assert_eq!(pack.wifi_up.unit, "MB");
        assert_eq!(pack.up_total.byte_count, 1_000_000);
        assert_eq!(pack.wifi_total.byte_count, 3_000_000);
        assert_eq!(pack.wifi_total.magnitude, "3");
        assert_eq!(pack.cellular_total.byte_count, 0);
        assert_eq!(pack.cellular_total.unit, "KB");
    }

    #[test]
    fn test_aggregate_sums_hold() {
        let pack = TrafficPack::aggregate(&counters((11, 22), (33, 44)), &fmt());
        assert!(pack.check_sums());
        assert_eq!(pack.up_total.byte_count, 44);
        assert_eq!(pack.down_total.byte_count, 66);
        assert_eq!(pack.cellular_total.byte_count, 77);
        assert_eq!(pack.wifi_total.byte_count, 33);
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let raw = counters((123_456, 7_890_123), (45, 6_000_000_000));
        assert_eq!(
            TrafficPack::aggregate(&raw, &fmt()),
            TrafficPack::aggregate(&raw, &fmt())
        );
    }

    #[test]
    fn test_counts_beyond_i64_saturate() {
        let pack = TrafficPack::aggregate(&counters((u64::MAX, 0), (0, 0)), &fmt());
        assert_eq!(pack.wifi_up.byte_count, i64::MAX);
    }

    #[test]
    fn test_delta_scenario() {
        let delta = TrafficPack::delta(&pack_with_up(5_200), &pack_with_up(5_000), &fmt());
        assert_eq!(delta.up_total.byte_count, 200);
        assert!(delta.up_total.unit.ends_with("/s"));
        assert_eq!(delta.up_total.unit, "KB/s");
        assert!(delta.check_sums());
    }

    #[test]
    fn test_delta_reports_counter_reset_unclamped() {
        let delta = TrafficPack::delta(&pack_with_up(100), &pack_with_up(5_000), &fmt());
        assert_eq!(delta.up_total.byte_count, -4_900);
        assert_eq!(delta.up_total.magnitude, "-5");
        assert_eq!(delta.wifi_up.byte_count, -4_900);
        assert!(delta.check_sums());
    }

    #[test]
    fn test_delta_uses_short_units_before_suffix() {
        let short = ByteFormatter::new(NumberStyle::Auto, UnitStyle::Short);
        let delta = TrafficPack::delta(&pack_with_up(3_000_000), &pack_with_up(1_000_000), &short);
        assert_eq!(delta.up_total.unit, "M/s");
        assert_eq!(delta.up_total.magnitude, "2");
    }

    #[test]
    fn test_every_per_second_unit_has_suffix() {
        let now = TrafficPack::aggregate(&counters((10_000, 20_000), (30_000, 40_000)), &fmt());
        let then = TrafficPack::aggregate(&counters((1_000, 2_000), (3_000, 4_000)), &fmt());
        let delta = TrafficPack::delta(&now, &then, &fmt());
        for (name, item) in delta.items() {
            assert!(item.unit.ends_with("/s"), "{name}: {}", item.unit);
        }
        for (name, item) in now.items() {
            assert!(!item.unit.ends_with("/s"), "{name}: {}", item.unit);
        }
    }

    #[test]
    fn test_check_sums_detects_tampering() {
        let mut pack = pack_with_up(10);
        pack.up_total.byte_count += 1;
        assert!(!pack.check_sums());
    }

    #[test]
    fn test_info_serializes_both_packs() {
        let info = TrafficInfo {
            tick: 2,
            total_traffic: pack_with_up(5_200),
            traffic_per_second: TrafficPack::delta(&pack_with_up(5_200), &pack_with_up(5_000), &fmt()),
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["tick"], 2);
        assert_eq!(json["total_traffic"]["up_total"]["byte_count"], 5_200);
        assert_eq!(json["traffic_per_second"]["up_total"]["unit"], "KB/s");
    }
}
