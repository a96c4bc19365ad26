use std::time::{Duration, Instant};

#[cfg(feature = "cli")]
use sysinfo::{Pid, ProcessesToUpdate, System};

#[derive(Debug, Clone)]
pub struct SystemStats {
    pub cpu_usage: f32,
    pub memory_usage_mb: u64,
    pub peak_memory_mb: u64,
}

#[cfg(feature = "cli")]
pub struct SystemMonitor {
    system: System,
    pid: Option<Pid>,
    peak_memory_mb: u64,
    enabled: bool,
}

#[cfg(feature = "cli")]
impl SystemMonitor {
    pub fn new(enabled: bool) -> Self {
        let pid = if enabled {
            sysinfo::get_current_pid().ok()
        } else {
            None
        };
        if enabled && pid.is_none() {
            tracing::warn!("Could not resolve current PID, system stats disabled");
        }

        Self {
            system: System::new(),
            pid,
            peak_memory_mb: 0,
            enabled: enabled && pid.is_some(),
        }
    }

    pub fn sample(&mut self) -> Option<SystemStats> {
        if !self.enabled {
            return None;
        }
        let pid = self.pid?;
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

        let process = self.system.process(pid)?;
        let memory_mb = process.memory() / 1024 / 1024;
        self.peak_memory_mb = self.peak_memory_mb.max(memory_mb);

        Some(SystemStats {
            cpu_usage: process.cpu_usage(),
            memory_usage_mb: memory_mb,
            peak_memory_mb: self.peak_memory_mb,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(not(feature = "cli"))]
pub struct SystemMonitor;

#[cfg(not(feature = "cli"))]
impl SystemMonitor {
    pub fn new(_enabled: bool) -> Self {
        Self
    }

    pub fn sample(&mut self) -> Option<SystemStats> {
        None
    }

    pub fn is_enabled(&self) -> bool {
        false
    }
}

/// Reports how far into the feed file the offer pass has read.
///
/// A line is logged every time another `step_percent` of the file has been
/// consumed, so a multi-gigabyte feed produces a bounded number of log lines.
pub struct ProgressMonitor {
    total_bytes: u64,
    step_percent: u64,
    next_mark: u64,
    offers: u64,
    start_time: Instant,
    system: SystemMonitor,
}

impl ProgressMonitor {
    pub fn new(total_bytes: u64, system_stats: bool) -> Self {
        Self {
            total_bytes,
            step_percent: 10,
            next_mark: 10,
            offers: 0,
            start_time: Instant::now(),
            system: SystemMonitor::new(system_stats),
        }
    }

    pub fn with_step_percent(mut self, step_percent: u64) -> Self {
        let step = step_percent.clamp(1, 100);
        self.step_percent = step;
        self.next_mark = step;
        self
    }

    pub fn percent(&self, bytes_read: u64) -> u64 {
        if self.total_bytes == 0 {
            return 100;
        }
        (bytes_read.min(self.total_bytes) * 100) / self.total_bytes
    }

    /// Records `offers` more offers and the reader position. Returns `true`
    /// when a progress line was emitted.
    pub fn update(&mut self, bytes_read: u64, offers: u64) -> bool {
        self.offers += offers;
        let percent = self.percent(bytes_read);
        if percent < self.next_mark {
            return false;
        }
        while self.next_mark <= percent {
            self.next_mark += self.step_percent;
        }

        tracing::info!(
            "⏳ Processing offers: {}% ({} offers, {:?})",
            percent,
            self.offers,
            self.elapsed()
        );
        self.log_stats("offers");
        true
    }

    pub fn log_stats(&mut self, phase: &str) {
        if let Some(stats) = self.system.sample() {
            tracing::info!(
                "📊 {} - CPU: {:.1}%, Memory: {}MB, Peak: {}MB",
                phase,
                stats.cpu_usage,
                stats.memory_usage_mb,
                stats.peak_memory_mb
            );
        }
    }

    pub fn log_final_stats(&mut self) {
        let peak = self.system.sample().map(|s| s.peak_memory_mb);
        match peak {
            Some(peak) => tracing::info!(
                "📊 Final Stats - Total Time: {:?}, Offers: {}, Peak Memory: {}MB",
                self.elapsed(),
                self.offers,
                peak
            ),
            None => tracing::info!(
                "📊 Final Stats - Total Time: {:?}, Offers: {}",
                self.elapsed(),
                self.offers
            ),
        }
    }

    pub fn offers(&self) -> u64 {
        self.offers
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn system_stats_enabled(&self) -> bool {
        self.system.is_enabled()
    }
}
