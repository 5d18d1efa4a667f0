//! # Rover Driver
//!
//! 后台采集与状态分发层：
//!
//! - [`Poller`]: 每个传感器一个后台线程，按固定频率采集
//! - [`SnapshotStore`]: 互斥保护的当前快照，单写多读
//! - [`state`]: 姿态/测距快照与接近状态推导
//! - [`sensors`]: IMU 与超声波测距的 [`Sensor`] 实现
//!
//! 采集失败永远不会让线程退出：失败周期发布无效快照、计入指标，
//! 下一个周期照常进行。

mod config;
mod error;
mod metrics;
pub mod poller;
pub mod sensors;
mod snapshot;
pub mod state;

pub use config::{ImuConfig, LedPins, RangingConfig};
pub use error::DriverError;
pub use metrics::{PollerMetrics, PollerMetricsSnapshot};
pub use poller::{Poller, PollerState, Sensor};
pub use sensors::{ImuSensor, ProximityIndicator, RangingSensor};
pub use snapshot::SnapshotStore;
pub use state::{
    IndicatorState, OrientationSnapshot, ProximityStatus, RangingSnapshot, Snapshot,
    derive_proximity,
};
