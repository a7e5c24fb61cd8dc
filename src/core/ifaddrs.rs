//! `getifaddrs(3)` FFI for reading per-interface byte counters.
//!
//! This is the only place in the crate that dereferences OS-provided
//! pointers. The linked list returned by `getifaddrs` is walked by [`IfAddrs`],
//! which copies each entry into an owned [`InterfaceRecord`] and frees the list
//! when dropped.
//!
//! Link-layer entries carry the interface statistics in `ifa_data`:
//! - Linux / Android: `AF_PACKET`, `struct rtnl_link_stats`
//! - macOS / iOS: `AF_LINK`, `struct if_data`
//!
//! `rtnl_link_stats` counters are 32-bit and wrap at 4 GiB, so on Linux the
//! byte counts come from the 64-bit `/sys/class/net/<name>/statistics` files
//! and `ifa_data` is only used when those cannot be read.

use std::ffi::CStr;
use std::io;
#[cfg(any(target_os = "linux", target_os = "android"))]
use std::path::Path;

use super::interfaces::{AddressFamily, InterfaceRecord};

#[cfg(any(target_os = "linux", target_os = "android"))]
const LINK_FAMILY: libc::c_int = libc::AF_PACKET;

#[cfg(any(target_os = "macos", target_os = "ios"))]
const LINK_FAMILY: libc::c_int = libc::AF_LINK;

#[cfg(any(target_os = "linux", target_os = "android"))]
const SYSFS_NET: &str = "/sys/class/net";

/// Leading fields of `struct rtnl_link_stats` (linux/if_link.h).
#[cfg(any(target_os = "linux", target_os = "android"))]
#[repr(C)]
struct RtnlLinkStats {
    rx_packets: u32,
    tx_packets: u32,
    rx_bytes: u32,
    tx_bytes: u32,
}

/// Owning iterator over the interface list returned by `getifaddrs`.
pub struct IfAddrs {
    head: *mut libc::ifaddrs,
    cursor: *mut libc::ifaddrs,
}

impl IfAddrs {
    /// Snapshot the OS interface list.
    pub fn new() -> io::Result<Self> {
        let mut head: *mut libc::ifaddrs = std::ptr::null_mut();
        // SAFETY: `head` is a valid out-pointer; on success the list is owned
        // by us until `freeifaddrs` in `Drop`.
        let ret = unsafe { libc::getifaddrs(&mut head) };
        if ret != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { head, cursor: head })
    }
}

impl Iterator for IfAddrs {
    type Item = InterfaceRecord;

    fn next(&mut self) -> Option<InterfaceRecord> {
        if self.cursor.is_null() {
            return None;
        }
        // SAFETY: `cursor` is a non-null node of the list owned by `self`,
        // which stays alive until `Drop`.
        let entry = unsafe { &*self.cursor };
        self.cursor = entry.ifa_next;
        Some(read_entry(entry))
    }
}

impl Drop for IfAddrs {
    fn drop(&mut self) {
        if !self.head.is_null() {
            // SAFETY: `head` came from a successful `getifaddrs` and is freed once.
            unsafe { libc::freeifaddrs(self.head) };
        }
    }
}

fn read_entry(entry: &libc::ifaddrs) -> InterfaceRecord {
    let name = if entry.ifa_name.is_null() {
        String::new()
    } else {
        // SAFETY: `ifa_name` is a NUL-terminated string owned by the list.
        unsafe { CStr::from_ptr(entry.ifa_name) }
            .to_string_lossy()
            .into_owned()
    };

    let family = if entry.ifa_addr.is_null() {
        AddressFamily::Other(libc::AF_UNSPEC)
    } else {
        // SAFETY: non-null `ifa_addr` points to a sockaddr owned by the list.
        let raw = libc::c_int::from(unsafe { (*entry.ifa_addr).sa_family });
        match raw {
            LINK_FAMILY => AddressFamily::Link,
            libc::AF_INET => AddressFamily::Inet,
            libc::AF_INET6 => AddressFamily::Inet6,
            other => AddressFamily::Other(other),
        }
    };

    let (sent_bytes, received_bytes) = if family == AddressFamily::Link {
        link_counters(entry, &name)
    } else {
        (0, 0)
    };

    InterfaceRecord {
        name,
        family,
        sent_bytes,
        received_bytes,
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn link_counters(entry: &libc::ifaddrs, name: &str) -> (u64, u64) {
    if let Some(counters) = sysfs_counters(Path::new(SYSFS_NET), name) {
        return counters;
    }
    let stats = entry.ifa_data as *const RtnlLinkStats;
    if stats.is_null() {
        return (0, 0);
    }
    // SAFETY: for AF_PACKET entries the kernel stores `rtnl_link_stats` in `ifa_data`.
    let stats = unsafe { &*stats };
    (u64::from(stats.tx_bytes), u64::from(stats.rx_bytes))
}

/// 64-bit `(tx_bytes, rx_bytes)` of `name` under a sysfs net directory.
#[cfg(any(target_os = "linux", target_os = "android"))]
fn sysfs_counters(net_dir: &Path, name: &str) -> Option<(u64, u64)> {
    if name.is_empty() || name.contains('/') || name == "." || name == ".." {
        return None;
    }
    let stats = net_dir.join(name).join("statistics");
    let read = |file: &str| -> Option<u64> {
        std::fs::read_to_string(stats.join(file)).ok()?.trim().parse().ok()
    };
    Some((read("tx_bytes")?, read("rx_bytes")?))
}

#[cfg(any(target_os = "macos", target_os = "ios"))]
fn link_counters(entry: &libc::ifaddrs, _name: &str) -> (u64, u64) {
    let data = entry.ifa_data as *const libc::if_data;
    if data.is_null() {
        return (0, 0);
    }
    // SAFETY: for AF_LINK entries `ifa_data` points to the interface's `if_data`.
    let data = unsafe { &*data };
    (u64::from(data.ifi_obytes), u64::from(data.ifi_ibytes))
}
