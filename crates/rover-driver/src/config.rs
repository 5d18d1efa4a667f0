//! 传感器配置

use rover_devices::{AccelDataRate, AccelRange, GyroScale, MagGain, RangingPins};

/// IMU 配置
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ImuConfig {
    /// I2C 设备路径
    pub i2c_bus: String,
    /// 采集频率（Hz）
    pub rate_hz: f32,
    pub accel_range: AccelRange,
    pub accel_rate: AccelDataRate,
    pub gyro_scale: GyroScale,
    pub mag_gain: MagGain,
}

impl Default for ImuConfig {
    fn default() -> Self {
        Self {
            i2c_bus: "/dev/i2c-1".to_string(),
            rate_hz: 10.0,
            accel_range: AccelRange::G2,
            accel_rate: AccelDataRate::Hz119,
            gyro_scale: GyroScale::Dps245,
            mag_gain: MagGain::Gauss4,
        }
    }
}

/// 指示灯引脚（BCM 编号）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LedPins {
    pub green: u8,
    pub yellow: u8,
    pub red: u8,
}

impl Default for LedPins {
    fn default() -> Self {
        Self {
            green: 25,
            yellow: 24,
            red: 23,
        }
    }
}

/// 测距传感器配置
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RangingConfig {
    /// 外设物理基地址（Pi 2/3: 0x3F000000，Pi 1: 0x20000000）
    pub peripheral_base: u64,
    pub trigger_pin: u8,
    pub echo_pin: u8,
    pub leds: LedPins,
    /// 采集频率（Hz）
    pub rate_hz: f32,
    /// 最大有效距离（cm），超出即为无效
    pub max_range_cm: f32,
    /// 最小有效距离（cm），仅在 `enforce_min_range` 时生效
    pub min_range_cm: f32,
    pub enforce_min_range: bool,
    /// 每个回波等待阶段的轮询预算
    pub echo_timeout_polls: u32,
    /// 初始化后的稳定等待时间（ms）
    pub stabilize_ms: u64,
}

impl RangingConfig {
    pub fn pins(&self) -> RangingPins {
        RangingPins {
            trigger: self.trigger_pin,
            echo: self.echo_pin,
        }
    }
}

impl Default for RangingConfig {
    fn default() -> Self {
        let pins = RangingPins::default();
        Self {
            peripheral_base: 0x3F00_0000,
            trigger_pin: pins.trigger,
            echo_pin: pins.echo,
            leds: LedPins::default(),
            rate_hz: 10.0,
            max_range_cm: 400.0,
            min_range_cm: 2.0,
            enforce_min_range: false,
            echo_timeout_polls: rover_devices::hcsr05::DEFAULT_ECHO_TIMEOUT_POLLS,
            stabilize_ms: 1000,
        }
    }
}
