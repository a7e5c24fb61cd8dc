//! Platform interface enumeration behind a single safe seam.
//!
//! The rest of the crate only sees owned [`InterfaceRecord`]s produced by an
//! [`InterfaceSource`]. The default [`SystemInterfaces`] walks `getifaddrs`
//! where available and falls back to `sysinfo` elsewhere.

use std::io;
use std::sync::Mutex;

use serde::Serialize;
use sysinfo::Networks;

/// Address family tag of one interface entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AddressFamily {
    /// Link-layer entry (`AF_PACKET` / `AF_LINK`). Only these carry counters.
    Link,
    Inet,
    Inet6,
    Other(i32),
}

/// One entry of the OS interface list, copied out of OS memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceRecord {
    pub name: String,
    pub family: AddressFamily,
    /// Outbound byte counter.
    pub sent_bytes: u64,
    /// Inbound byte counter.
    pub received_bytes: u64,
}

impl InterfaceRecord {
    pub fn link(name: impl Into<String>, sent_bytes: u64, received_bytes: u64) -> Self {
        Self {
            name: name.into(),
            family: AddressFamily::Link,
            sent_bytes,
            received_bytes,
        }
    }
}

/// Anything that can list the host's interfaces with their byte counters.
pub trait InterfaceSource: Send + Sync {
    fn interfaces(&self) -> io::Result<Vec<InterfaceRecord>>;
}

/// The OS interface list.
#[derive(Debug, Default)]
pub struct SystemInterfaces {
    #[cfg(not(any(
        target_os = "linux",
        target_os = "android",
        target_os = "macos",
        target_os = "ios"
    )))]
    fallback: SysinfoInterfaces,
}

impl SystemInterfaces {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios"
))]
impl InterfaceSource for SystemInterfaces {
    fn interfaces(&self) -> io::Result<Vec<InterfaceRecord>> {
        Ok(super::ifaddrs::IfAddrs::new()?.collect())
    }
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios"
)))]
impl InterfaceSource for SystemInterfaces {
    fn interfaces(&self) -> io::Result<Vec<InterfaceRecord>> {
        self.fallback.interfaces()
    }
}

/// Interface counters via `sysinfo`. Every record is reported as link-layer.
pub struct SysinfoInterfaces {
    networks: Mutex<Networks>,
}

impl SysinfoInterfaces {
    pub fn new() -> Self {
        Self {
            networks: Mutex::new(Networks::new_with_refreshed_list()),
        }
    }
}

impl Default for SysinfoInterfaces {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SysinfoInterfaces {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SysinfoInterfaces").finish_non_exhaustive()
    }
}

impl InterfaceSource for SysinfoInterfaces {
    fn interfaces(&self) -> io::Result<Vec<InterfaceRecord>> {
        let mut networks = self
            .networks
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "sysinfo network list poisoned"))?;
        // Also re-reads the counters of every listed interface.
        networks.refresh_list();
        Ok(networks
            .iter()
            .map(|(name, data)| {
                InterfaceRecord::link(name.as_str(), data.total_transmitted(), data.total_received())
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_constructor_sets_family() {
        let record = InterfaceRecord::link("en0", 10, 20);
        assert_eq!(record.family, AddressFamily::Link);
        assert_eq!(record.name, "en0");
        assert_eq!((record.sent_bytes, record.received_bytes), (10, 20));
    }

    #[test]
    fn test_system_interfaces_enumerates() {
        let records = SystemInterfaces::new().interfaces().unwrap();
        assert!(!records.is_empty());
    }

    #[test]
    fn test_sysinfo_records_are_link_layer() {
        let records = SysinfoInterfaces::new().interfaces().unwrap();
        assert!(records.iter().all(|r| r.family == AddressFamily::Link));
    }

    #[test]
    fn test_sysinfo_counters_do_not_go_backwards() {
        let source = SysinfoInterfaces::new();
        let first = source.interfaces().unwrap();
        let second = source.interfaces().unwrap();
        for before in &first {
            if let Some(after) = second.iter().find(|r| r.name == before.name) {
                assert!(after.sent_bytes >= before.sent_bytes, "{}", before.name);
                assert!(after.received_bytes >= before.received_bytes, "{}", before.name);
            }
        }
    }

    #[test]
    fn test_record_serializes_family_tag() {
        let json = serde_json::to_value(InterfaceRecord::link("wlan0", 1, 2)).unwrap();
        assert_eq!(json["family"], "Link");
        assert_eq!(json["received_bytes"], 2);
    }
}
