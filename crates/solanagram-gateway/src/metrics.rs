// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rolling login-performance counters for `/api/metrics/login-performance`.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;

/// How many recent timings the rolling window keeps.
const WINDOW: usize = 10;

#[derive(Default)]
struct Inner {
    total: u64,
    successful: u64,
    failed: u64,
    last_times: VecDeque<f64>,
}

/// Thread-safe rolling counters over login attempts.
#[derive(Default)]
pub struct LoginMetrics {
    inner: Mutex<Inner>,
}

/// Snapshot served by the metrics endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct LoginMetricsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub last_10_times: Vec<f64>,
    pub avg_time: f64,
}

impl LoginMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one login attempt and its wall-clock duration.
    pub fn record(&self, success: bool, elapsed: Duration) {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        inner.total += 1;
        if success {
            inner.successful += 1;
        } else {
            inner.failed += 1;
        }
        if inner.last_times.len() == WINDOW {
            inner.last_times.pop_front();
        }
        inner.last_times.push_back(elapsed.as_secs_f64());
    }

    /// Mean of the rolling window, 0.0 when empty.
    pub fn recent_average(&self) -> f64 {
        let inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        if inner.last_times.is_empty() {
            0.0
        } else {
            inner.last_times.iter().sum::<f64>() / inner.last_times.len() as f64
        }
    }

    pub fn snapshot(&self) -> LoginMetricsSnapshot {
        let inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        let avg_time = if inner.last_times.is_empty() {
            0.0
        } else {
            inner.last_times.iter().sum::<f64>() / inner.last_times.len() as f64
        };
        LoginMetricsSnapshot {
            total_requests: inner.total,
            successful_requests: inner.successful,
            failed_requests: inner.failed,
            last_10_times: inner.last_times.iter().copied().collect(),
            avg_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let metrics = LoginMetrics::new();
        metrics.record(true, Duration::from_millis(100));
        metrics.record(false, Duration::from_millis(300));

        let snap = metrics.snapshot();
        assert_eq!(snap.total_requests, 2);
        assert_eq!(snap.successful_requests, 1);
        assert_eq!(snap.failed_requests, 1);
        assert_eq!(snap.last_10_times.len(), 2);
        assert!((snap.avg_time - 0.2).abs() < 1e-9);
    }

    #[test]
    fn window_keeps_only_last_ten() {
        let metrics = LoginMetrics::new();
        for i in 0..15 {
            metrics.record(true, Duration::from_millis(i * 10));
        }
        let snap = metrics.snapshot();
        assert_eq!(snap.last_10_times.len(), 10);
        // Oldest five entries dropped.
        assert!((snap.last_10_times[0] - 0.05).abs() < 1e-9);
    }

    #[test]
    fn recent_average_of_empty_window_is_zero() {
        assert_eq!(LoginMetrics::new().recent_average(), 0.0);
    }
}
