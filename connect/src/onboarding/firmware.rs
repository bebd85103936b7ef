//! Firmware update check and the cosmetic progress timer settings

use std::cmp::Ordering;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Firmware update offer shown during onboarding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareUpdateInfo {
    pub current_version: String,
    pub available_version: String,
    pub update_available: bool,
    pub release_notes: String,
}

impl FirmwareUpdateInfo {
    /// Compare the running firmware against the latest known release
    pub fn check(current: &str, latest: Option<&str>) -> Self {
        match latest {
            Some(latest) => Self {
                current_version: current.to_string(),
                available_version: latest.to_string(),
                update_available: compare_versions(latest, current) == Ordering::Greater,
                release_notes: String::new(),
            },
            None => Self {
                current_version: current.to_string(),
                available_version: current.to_string(),
                update_available: false,
                release_notes: String::new(),
            },
        }
    }
}

/// Compare dotted numeric versions; a leading `v` and non-numeric suffixes are ignored
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse = |v: &str| -> Vec<u64> {
        v.trim()
            .trim_start_matches(['v', 'V'])
            .split('.')
            .map(|part| {
                let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
                digits.parse().unwrap_or(0)
            })
            .collect()
    };

    let (a, b) = (parse(a), parse(b));
    let len = a.len().max(b.len());
    for i in 0..len {
        let ord = a.get(i).unwrap_or(&0).cmp(b.get(i).unwrap_or(&0));
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Settings for the simulated update progress bar
#[derive(Debug, Clone)]
pub struct FirmwareProgressOptions {
    /// Percentage added per tick
    pub increment: u8,

    /// Delay between ticks
    pub tick: Duration,
}

impl Default for FirmwareProgressOptions {
    fn default() -> Self {
        Self {
            increment: 10,
            tick: Duration::from_millis(300),
        }
    }
}
