// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-ContextViewer-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Context Viewer and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

static LAST_ISSUED_MICROS: AtomicU64 = AtomicU64::new(0);

/// Wall-clock capture/creation time in seconds since the Unix epoch.
///
/// Stored as a JSON number so state files stay readable by other tooling. Values produced by
/// [`Timestamp::now`] are strictly increasing within a process, even when the system clock stalls
/// or steps backwards.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(f64);

impl Timestamp {
    pub fn now() -> Self {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0);

        let mut last = LAST_ISSUED_MICROS.load(Ordering::Relaxed);
        loop {
            let next = wall.max(last.saturating_add(1));
            match LAST_ISSUED_MICROS.compare_exchange_weak(
                last,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Self::from_micros(next),
                Err(actual) => last = actual,
            }
        }
    }

    pub fn from_secs(secs: f64) -> Self {
        Self(secs)
    }

    fn from_micros(micros: u64) -> Self {
        Self(micros as f64 / 1_000_000.0)
    }

    pub fn as_secs(self) -> f64 {
        self.0
    }

    pub fn is_newer_than(self, other: Option<Timestamp>) -> bool {
        match other {
            Some(other) => self.0 > other.0,
            None => true,
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}
