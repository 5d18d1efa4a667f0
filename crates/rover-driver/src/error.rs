//! 驱动层错误类型定义

use rover_devices::DeviceError;
use rover_hal::HalError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 设备驱动错误
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    /// 硬件访问错误
    #[error("HAL error: {0}")]
    Hal(#[from] HalError),

    /// 采集线程已在运行
    #[error("Poller is already running")]
    AlreadyRunning,

    /// 采集线程创建失败
    #[error("Failed to spawn poller thread: {0}")]
    ThreadSpawn(String),

    /// 传感器句柄已丢失（采集线程 panic）
    #[error("Sensor handle lost (poller thread panicked)")]
    SensorLost,

    /// 测距结果超出有效范围
    #[error("Distance {distance_cm:.2} cm out of range [{min_cm:.1}, {max_cm:.1}]")]
    OutOfRange {
        distance_cm: f32,
        min_cm: f32,
        max_cm: f32,
    },
}

impl DriverError {
    /// 是否为测距超时
    pub fn is_timeout(&self) -> bool {
        matches!(self, DriverError::Device(e) if e.is_timeout())
    }
}
