//! # Rover 设备驱动
//!
//! 基于 [`rover_hal`] 的设备驱动层：
//!
//! - [`lsm9ds1`]: 惯性传感器（加速度计/陀螺仪 + 磁力计）初始化与读取
//! - [`pca9685`]: 16 通道 PWM 驱动芯片
//! - [`hcsr05`]: 超声波测距协议（触发/回波时序测量）
//!
//! 驱动不做重试：每次失败都原样返回给调用者。

mod error;
pub mod hcsr05;
pub mod lsm9ds1;
pub mod pca9685;

pub use error::{DeviceError, EchoStage};
pub use hcsr05::{EchoPulse, Hcsr05, RangingPins, SPEED_OF_SOUND_CM_PER_US};
pub use lsm9ds1::{AccelDataRate, AccelRange, GyroScale, ImuReading, Lsm9ds1, MagGain};
pub use pca9685::{DutyCycleOutput, MAX_COUNT, Pca9685, duty_to_count};
