//! 通用采集线程（Poller）
//!
//! 每个传感器一个后台线程，按固定频率调用 [`Sensor::sample`]，
//! 将结果发布到共享快照存储。
//!
//! # 生命周期
//!
//! ```text
//! Idle --start()--> Running --stop()--> Stopping --join--> Idle
//! ```
//!
//! 传感器（及其总线句柄）在 `start()` 时移入线程，`stop()` 时随 join 交还，
//! 因此句柄只能在线程停止之后释放。

use crate::error::DriverError;
use crate::metrics::{PollerMetrics, PollerMetricsSnapshot};
use crate::snapshot::SnapshotStore;
use crate::state::Snapshot;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

/// 可被 Poller 驱动的传感器
pub trait Sensor: Send + 'static {
    type Snapshot: Snapshot;

    /// 传感器名称（用于线程名与日志）
    fn name(&self) -> &'static str;

    /// 执行一次采集
    fn sample(&mut self) -> Result<Self::Snapshot, DriverError>;

    /// 发布之后的副作用（在快照锁之外执行）
    fn after_publish(&mut self, _snapshot: &Self::Snapshot) {}

    /// 采集线程退出前将硬件置于空闲状态
    fn park(&mut self) {}
}

/// Poller 运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum PollerState {
    #[default]
    Idle = 0,
    Running = 1,
    Stopping = 2,
}

impl PollerState {
    /// 无效值按 Idle 处理
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Stopping,
            _ => Self::Idle,
        }
    }
}

/// Poller 状态（原子版本，用于线程间共享）
#[derive(Debug, Default)]
pub struct AtomicPollerState {
    inner: AtomicU8,
}

impl AtomicPollerState {
    pub fn new(state: PollerState) -> Self {
        Self {
            inner: AtomicU8::new(state as u8),
        }
    }

    pub fn get(&self) -> PollerState {
        PollerState::from_u8(self.inner.load(Ordering::Acquire))
    }

    pub fn set(&self, state: PollerState) {
        self.inner.store(state as u8, Ordering::Release);
    }

    /// 比较并交换，成功返回 `Ok(current)`，失败返回 `Err(actual)`
    pub fn compare_exchange(
        &self,
        current: PollerState,
        new: PollerState,
    ) -> Result<PollerState, PollerState> {
        self.inner
            .compare_exchange(
                current as u8,
                new as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(PollerState::from_u8)
            .map_err(PollerState::from_u8)
    }
}

/// 无效频率时的回退周期（1 Hz）
const DEFAULT_PERIOD: Duration = Duration::from_secs(1);

/// 频率 → 周期，频率非正或周期无法用 `Duration` 表示时返回 `None`
fn period_for(rate_hz: f32) -> Option<Duration> {
    if rate_hz.is_nan() || rate_hz <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f32(1.0 / rate_hz).ok()
}

/// 运行中的采集线程
struct Worker<S> {
    handle: JoinHandle<S>,
    stop_tx: Sender<()>,
}

/// 通用采集线程
pub struct Poller<S: Sensor> {
    name: &'static str,
    period: Duration,
    state: Arc<AtomicPollerState>,
    store: Arc<SnapshotStore<S::Snapshot>>,
    metrics: Arc<PollerMetrics>,
    sensor: Option<S>,
    worker: Option<Worker<S>>,
}

impl<S: Sensor> Poller<S> {
    /// 创建 Poller（不启动线程）
    ///
    /// `rate_hz` 无法换算为有效周期（≤ 0、NaN 或过小）时按 1 Hz 处理。
    pub fn new(sensor: S, rate_hz: f32) -> Self {
        let period = period_for(rate_hz).unwrap_or_else(|| {
            warn!("{}: invalid rate {} Hz, falling back to 1 Hz", sensor.name(), rate_hz);
            DEFAULT_PERIOD
        });
        Self {
            name: sensor.name(),
            period,
            state: Arc::new(AtomicPollerState::new(PollerState::Idle)),
            store: Arc::new(SnapshotStore::new()),
            metrics: Arc::new(PollerMetrics::new()),
            sensor: Some(sensor),
            worker: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// 快照存储（与采集线程共享）
    pub fn store(&self) -> Arc<SnapshotStore<S::Snapshot>> {
        self.store.clone()
    }

    pub fn metrics(&self) -> PollerMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn state(&self) -> PollerState {
        self.state.get()
    }

    pub fn is_running(&self) -> bool {
        self.state.get() == PollerState::Running
    }

    /// 启动采集线程
    ///
    /// # 错误
    /// - `DriverError::AlreadyRunning`: 已在运行（不会创建第二个线程）
    /// - `DriverError::SensorLost`: 上一次运行的线程 panic，传感器句柄已丢失
    /// - `DriverError::ThreadSpawn`: 线程创建失败
    pub fn start(&mut self) -> Result<(), DriverError> {
        if self
            .state
            .compare_exchange(PollerState::Idle, PollerState::Running)
            .is_err()
        {
            return Err(DriverError::AlreadyRunning);
        }

        let Some(sensor) = self.sensor.take() else {
            self.state.set(PollerState::Idle);
            return Err(DriverError::SensorLost);
        };

        let (stop_tx, stop_rx) = bounded(1);
        let period = self.period;
        let store = self.store.clone();
        let metrics = self.metrics.clone();

        let spawned = thread::Builder::new()
            .name(format!("{}-poller", self.name))
            .spawn(move || poll_loop(sensor, period, store, metrics, stop_rx));

        match spawned {
            Ok(handle) => {
                self.worker = Some(Worker { handle, stop_tx });
                info!("{} poller started ({:?} period)", self.name, self.period);
                Ok(())
            },
            Err(e) => {
                self.state.set(PollerState::Idle);
                error!("Failed to spawn {} poller: {}", self.name, e);
                Err(DriverError::ThreadSpawn(e.to_string()))
            },
        }
    }

    /// 停止采集线程，阻塞直到当前周期结束
    ///
    /// 未运行时为空操作。
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        self.state.set(PollerState::Stopping);

        // 线程可能正在等待下一个周期，也可能已经退出，发送失败无需处理
        let _ = worker.stop_tx.send(());
        drop(worker.stop_tx);

        match worker.handle.join() {
            Ok(sensor) => {
                self.sensor = Some(sensor);
                info!("{} poller stopped", self.name);
            },
            Err(_) => {
                error!("{} poller thread panicked", self.name);
            },
        }
        self.state.set(PollerState::Idle);
    }

    /// 停止线程并取回传感器
    pub fn into_sensor(mut self) -> Option<S> {
        self.stop();
        self.sensor.take()
    }
}

impl<S: Sensor> Drop for Poller<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// 采集循环，退出时交还传感器
fn poll_loop<S: Sensor>(
    mut sensor: S,
    period: Duration,
    store: Arc<SnapshotStore<S::Snapshot>>,
    metrics: Arc<PollerMetrics>,
    stop_rx: Receiver<()>,
) -> S {
    let name = sensor.name();
    let mut failing = false;

    loop {
        let cycle_start = Instant::now();

        let snapshot = match sensor.sample() {
            Ok(snapshot) => {
                if failing {
                    info!("{} readings recovered", name);
                    failing = false;
                }
                snapshot
            },
            Err(e) => {
                metrics.cycles_failed.fetch_add(1, Ordering::Relaxed);
                if e.is_timeout() {
                    metrics.timeouts.fetch_add(1, Ordering::Relaxed);
                }
                // 连续失败只记录一次 warn
                if failing {
                    debug!("{} sample failed: {}", name, e);
                } else {
                    warn!("{} sample failed: {}", name, e);
                    failing = true;
                }
                S::Snapshot::invalid()
            },
        };

        store.publish(snapshot.clone());
        sensor.after_publish(&snapshot);

        let elapsed = cycle_start.elapsed();
        metrics.cycles_total.fetch_add(1, Ordering::Relaxed);
        metrics
            .last_cycle_us
            .store(elapsed.as_micros() as u64, Ordering::Relaxed);

        let wait = match period.checked_sub(elapsed) {
            Some(wait) => wait,
            None => {
                metrics.overruns.fetch_add(1, Ordering::Relaxed);
                trace!("{} cycle overrun: {:?}", name, elapsed);
                Duration::ZERO
            },
        };

        match stop_rx.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => {},
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    sensor.park();
    trace!("{} poller loop exited", name);
    sensor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::RangingSnapshot;
    use std::sync::atomic::AtomicUsize;

    struct CountingSensor {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl Sensor for CountingSensor {
        type Snapshot = RangingSnapshot;

        fn name(&self) -> &'static str {
            "counting"
        }

        fn sample(&mut self) -> Result<RangingSnapshot, DriverError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(DriverError::OutOfRange {
                    distance_cm: 999.0,
                    min_cm: 2.0,
                    max_cm: 400.0,
                })
            } else {
                Ok(RangingSnapshot::valid(n as f32))
            }
        }
    }

    fn counting(fail: bool) -> (CountingSensor, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            CountingSensor {
                calls: calls.clone(),
                fail,
            },
            calls,
        )
    }

    #[test]
    fn test_atomic_state_transitions() {
        let state = AtomicPollerState::new(PollerState::Idle);
        assert!(
            state
                .compare_exchange(PollerState::Idle, PollerState::Running)
                .is_ok()
        );
        assert_eq!(
            state.compare_exchange(PollerState::Idle, PollerState::Running),
            Err(PollerState::Running)
        );
        state.set(PollerState::Stopping);
        assert_eq!(state.get(), PollerState::Stopping);
        assert_eq!(PollerState::from_u8(42), PollerState::Idle);
    }

    #[test]
    fn test_start_stop_returns_sensor() {
        let (sensor, calls) = counting(false);
        let mut poller = Poller::new(sensor, 200.0);
        assert_eq!(poller.state(), PollerState::Idle);

        poller.start().unwrap();
        assert!(poller.is_running());
        thread::sleep(Duration::from_millis(50));
        poller.stop();

        assert_eq!(poller.state(), PollerState::Idle);
        assert!(calls.load(Ordering::SeqCst) >= 1);
        assert!(poller.store().read().is_valid());
        assert!(poller.into_sensor().is_some());
    }

    #[test]
    fn test_start_twice_rejected() {
        let (sensor, _calls) = counting(false);
        let mut poller = Poller::new(sensor, 100.0);
        poller.start().unwrap();
        assert!(matches!(poller.start(), Err(DriverError::AlreadyRunning)));
        poller.stop();

        // 停止后可以重新启动
        poller.start().unwrap();
        poller.stop();
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let (sensor, calls) = counting(false);
        let mut poller = Poller::new(sensor, 100.0);
        poller.stop();
        poller.stop();
        assert_eq!(poller.state(), PollerState::Idle);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failures_publish_invalid_and_count() {
        let (sensor, _calls) = counting(true);
        let mut poller = Poller::new(sensor, 500.0);
        poller.start().unwrap();
        thread::sleep(Duration::from_millis(30));
        poller.stop();

        assert!(!poller.store().read().is_valid());
        let metrics = poller.metrics();
        assert!(metrics.cycles_total >= 1);
        assert_eq!(metrics.cycles_total, metrics.cycles_failed);
        assert_eq!(metrics.timeouts, 0);
    }

    #[test]
    fn test_stop_interrupts_long_period() {
        let (sensor, _calls) = counting(false);
        // 0.1 Hz：不被打断的话要等 10 秒
        let mut poller = Poller::new(sensor, 0.1);
        poller.start().unwrap();
        thread::sleep(Duration::from_millis(20));

        let t0 = Instant::now();
        poller.stop();
        assert!(t0.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_unusable_rate_falls_back_to_one_hz() {
        for rate in [0.0, -5.0, f32::NAN, 1e-30, f32::MIN_POSITIVE] {
            let (sensor, _calls) = counting(false);
            let poller = Poller::new(sensor, rate);
            assert_eq!(poller.period(), Duration::from_secs(1), "rate {}", rate);
        }

        let (sensor, _calls) = counting(false);
        assert_eq!(Poller::new(sensor, 4.0).period(), Duration::from_millis(250));
    }
}
