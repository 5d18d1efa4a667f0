//! 时钟源抽象
//!
//! 测距协议需要微秒级时间戳和延迟。通过 trait 注入，测试时可替换为虚拟时钟。

use std::time::{Duration, Instant};

/// 单调微秒时钟
pub trait Clock: Send {
    /// 自任意起点以来的微秒数（单调递增）
    fn now_us(&self) -> u64;

    /// 延迟 `us` 微秒
    fn delay_us(&self, us: u64);
}

/// 基于 `Instant` 的单调时钟
///
/// 使用 spin_sleep 提供微秒级延迟精度（相比 std::thread::sleep 的 1-2ms）
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_us(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }

    fn delay_us(&self, us: u64) {
        spin_sleep::sleep(Duration::from_micros(us));
    }
}
