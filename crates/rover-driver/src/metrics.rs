//! 采集线程性能指标
//!
//! 全部使用原子计数器（Relaxed），采集线程写、任意线程读，互不阻塞。

use std::sync::atomic::{AtomicU64, Ordering};

/// 单个 Poller 的运行指标
#[derive(Debug, Default)]
pub struct PollerMetrics {
    /// 已完成的采集周期数（含失败周期）
    pub cycles_total: AtomicU64,
    /// 失败的采集周期数（发布了无效快照）
    pub cycles_failed: AtomicU64,
    /// 其中因测距超时失败的周期数
    pub timeouts: AtomicU64,
    /// 超出周期预算的采集次数（下一周期立即开始）
    pub overruns: AtomicU64,
    /// 最近一次采集耗时（µs）
    pub last_cycle_us: AtomicU64,
}

impl PollerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取一致性较弱的快照（各计数器独立读取）
    pub fn snapshot(&self) -> PollerMetricsSnapshot {
        PollerMetricsSnapshot {
            cycles_total: self.cycles_total.load(Ordering::Relaxed),
            cycles_failed: self.cycles_failed.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
            last_cycle_us: self.last_cycle_us.load(Ordering::Relaxed),
        }
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PollerMetricsSnapshot {
    pub cycles_total: u64,
    pub cycles_failed: u64,
    pub timeouts: u64,
    pub overruns: u64,
    pub last_cycle_us: u64,
}

impl PollerMetricsSnapshot {
    /// 失败周期占比（0.0 ~ 1.0）
    pub fn failure_rate(&self) -> f64 {
        if self.cycles_total == 0 {
            0.0
        } else {
            self.cycles_failed as f64 / self.cycles_total as f64
        }
    }
}
