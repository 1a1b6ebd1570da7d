// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-ContextViewer-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Context Viewer and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Fetching the committed selection on behalf of the assistant.
//!
//! Two delivery modes share one rule set: immediate mode reads the store once; wait mode polls
//! until a selection newer than the last one delivered shows up or the timeout elapses. Delivered
//! selections are consumed by default, so each capture reaches at most one caller.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::model::{Selection, Timestamp};
use crate::store::{StateStore, StoreError};

pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(60);
pub const MAX_WAIT_TIMEOUT: Duration = Duration::from_secs(3600);
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Options for one retrieval call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalRequest {
    pub wait: bool,
    pub timeout: Duration,
    pub consume: bool,
}

impl Default for RetrievalRequest {
    fn default() -> Self {
        Self {
            wait: false,
            timeout: DEFAULT_WAIT_TIMEOUT,
            consume: true,
        }
    }
}

impl RetrievalRequest {
    /// Builds a request from loosely typed tool arguments.
    ///
    /// Missing values take their defaults; the timeout is clamped to `0..=3600` seconds and a
    /// non-finite timeout falls back to the default.
    pub fn from_args(wait: Option<bool>, timeout_secs: Option<f64>, consume: Option<bool>) -> Self {
        Self {
            wait: wait.unwrap_or(false),
            timeout: clamp_timeout(timeout_secs),
            consume: consume.unwrap_or(true),
        }
    }
}

pub fn clamp_timeout(timeout_secs: Option<f64>) -> Duration {
    match timeout_secs {
        Some(secs) if secs.is_finite() => {
            Duration::from_secs_f64(secs.clamp(0.0, MAX_WAIT_TIMEOUT.as_secs_f64()))
        }
        _ => DEFAULT_WAIT_TIMEOUT,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    Selected(Selection),
    /// Immediate mode found nothing stored.
    Empty,
    /// Wait mode saw no new selection before the timeout.
    TimedOut { waited: Duration },
}

impl Retrieval {
    pub fn selection(&self) -> Option<&Selection> {
        match self {
            Self::Selected(selection) => Some(selection),
            Self::Empty | Self::TimedOut { .. } => None,
        }
    }
}

/// Consumer side of the selection channel.
///
/// Remembers the timestamp of the last selection it handed out so wait mode never returns the
/// same capture twice, even when `consume` is off.
#[derive(Debug)]
pub struct SelectionRetriever {
    store: Arc<StateStore>,
    poll_interval: Duration,
    last_delivered: Mutex<Option<Timestamp>>,
}

impl SelectionRetriever {
    pub fn new(store: Arc<StateStore>) -> Self {
        Self {
            store,
            poll_interval: POLL_INTERVAL,
            last_delivered: Mutex::new(None),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn last_delivered(&self) -> Option<Timestamp> {
        *self.last_delivered.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub async fn get(&self, request: RetrievalRequest) -> Result<Retrieval, StoreError> {
        if request.wait {
            self.wait(request.timeout, request.consume).await
        } else {
            self.immediate(request.consume)
        }
    }

    /// One store read; returns whatever selection is stored.
    pub fn immediate(&self, consume: bool) -> Result<Retrieval, StoreError> {
        match self.store.load().selection {
            Some(selection) => self.deliver(selection, consume).map(Retrieval::Selected),
            None => Ok(Retrieval::Empty),
        }
    }

    /// Polls until a selection newer than the last delivered one appears, or `timeout` passes.
    ///
    /// At least one read happens even for a zero timeout, and the final sleep is shortened to
    /// the remaining time, so the call returns within `timeout + poll_interval`.
    pub async fn wait(&self, timeout: Duration, consume: bool) -> Result<Retrieval, StoreError> {
        let started = Instant::now();
        let deadline = started + timeout;
        debug!(timeout_ms = timeout.as_millis() as u64, "waiting for selection");

        loop {
            if let Some(selection) = self.store.load().selection {
                if selection.timestamp.is_newer_than(self.last_delivered()) {
                    return self.deliver(selection, consume).map(Retrieval::Selected);
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(Retrieval::TimedOut {
                    waited: now.duration_since(started),
                });
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    /// Unconditionally removes the stored selection. Returns whether one was present.
    pub fn clear(&self) -> Result<bool, StoreError> {
        self.store.clear_selection()
    }

    fn deliver(&self, selection: Selection, consume: bool) -> Result<Selection, StoreError> {
        if consume {
            self.store.consume_selection(selection.timestamp)?;
        }
        *self.last_delivered.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) =
            Some(selection.timestamp);
        info!(
            file = %selection.file_path,
            range = %selection.range(),
            consumed = consume,
            "selection delivered"
        );
        Ok(selection)
    }
}
