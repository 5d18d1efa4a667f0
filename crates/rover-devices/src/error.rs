//! 设备驱动层错误类型定义

use rover_hal::HalError;
use std::fmt;
use thiserror::Error;

/// 回波等待阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoStage {
    /// 等待回波变高
    Rising,
    /// 等待回波变低
    Falling,
}

impl fmt::Display for EchoStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EchoStage::Rising => write!(f, "rising"),
            EchoStage::Falling => write!(f, "falling"),
        }
    }
}

/// 设备驱动层错误类型
#[derive(Error, Debug)]
pub enum DeviceError {
    /// 总线事务失败
    #[error("Bus error: {0}")]
    Bus(#[from] HalError),

    /// WHO_AM_I 校验失败
    #[error("Unexpected {device} chip id: 0x{actual:02X} (expected 0x{expected:02X})")]
    ChipId {
        device: &'static str,
        expected: u8,
        actual: u8,
    },

    /// 回波等待超出轮询预算
    #[error("Echo timeout waiting for {0} edge")]
    EchoTimeout(EchoStage),

    /// PWM 通道号越界
    #[error("Invalid PWM channel: {0} (valid: 0-15)")]
    InvalidChannel(u8),
}

impl DeviceError {
    /// 是否为测距超时（无目标或目标超出量程）
    pub fn is_timeout(&self) -> bool {
        matches!(self, DeviceError::EchoTimeout(_))
    }
}
