//! PCA9685 16 通道 PWM 驱动

use crate::DeviceError;
use rover_hal::RegisterBus;
use std::time::Duration;
use tracing::{debug, info};

/// 默认 I2C 地址
pub const DEFAULT_ADDRESS: u8 = 0x40;
/// 默认 PWM 频率（Hz）
pub const DEFAULT_FREQUENCY_HZ: f32 = 50.0;
/// 12 位计数器最大值
pub const MAX_COUNT: u16 = 4095;
/// 通道数
pub const CHANNEL_COUNT: u8 = 16;

const REG_MODE1: u8 = 0x00;
const REG_LED0_ON_L: u8 = 0x06;
const REG_PRESCALE: u8 = 0xFE;

const MODE1_SLEEP: u8 = 0x10;
const OSCILLATOR_HZ: f32 = 25_000_000.0;
const MIN_FREQUENCY_HZ: f32 = 24.0;
const MAX_FREQUENCY_HZ: f32 = 1526.0;

/// 振荡器重新起振的等待时间
const OSCILLATOR_SETTLE: Duration = Duration::from_millis(5);

/// 占空比百分比 → 12 位计数值
///
/// `count = round(pct / 100 * 4095)`，输入先钳位到 [0, 100]。
/// 范围校验属于调用者：越界值应在到达这里之前被拒绝。
pub fn duty_to_count(percent: f32) -> u16 {
    let pct = percent.clamp(0.0, 100.0);
    (pct / 100.0 * MAX_COUNT as f32).round() as u16
}

/// 频率 → 预分频值，频率钳位到 [24, 1526] Hz
fn prescale_for(freq_hz: f32) -> u8 {
    let freq = freq_hz.clamp(MIN_FREQUENCY_HZ, MAX_FREQUENCY_HZ);
    (OSCILLATOR_HZ / (4096.0 * freq) - 1.0).round() as u8
}

/// 占空比输出端口
///
/// 命令层只依赖这个 trait，测试中可以替换为记录型实现。
pub trait DutyCycleOutput: Send {
    /// 将 `channel` 设为 `count`/4096 的占空比（ON 在 0，OFF 在 count）
    fn set_duty(&mut self, channel: u8, count: u16) -> Result<(), DeviceError>;
}

/// PCA9685 驱动
pub struct Pca9685<B> {
    bus: B,
    frequency_hz: f32,
}

impl<B: RegisterBus> Pca9685<B> {
    /// 初始化并设置 PWM 频率
    pub fn init(bus: B, frequency_hz: f32) -> Result<Self, DeviceError> {
        let mut pwm = Self {
            bus,
            frequency_hz: 0.0,
        };
        pwm.set_frequency(frequency_hz)?;
        info!("PCA9685 initialized at {:.1} Hz", pwm.frequency_hz);
        Ok(pwm)
    }

    /// 设置 PWM 频率
    ///
    /// 预分频只能在睡眠模式下写入：MODE1 进入睡眠 → 写 PRESCALE → 唤醒 → 等待 5ms。
    pub fn set_frequency(&mut self, frequency_hz: f32) -> Result<(), DeviceError> {
        let prescale = prescale_for(frequency_hz);

        self.bus.write_register(REG_MODE1, MODE1_SLEEP)?;
        self.bus.write_register(REG_PRESCALE, prescale)?;
        self.bus.write_register(REG_MODE1, 0x00)?;
        std::thread::sleep(OSCILLATOR_SETTLE);

        self.frequency_hz = frequency_hz.clamp(MIN_FREQUENCY_HZ, MAX_FREQUENCY_HZ);
        debug!("PCA9685 prescale = {} ({:.1} Hz)", prescale, self.frequency_hz);
        Ok(())
    }

    pub fn frequency_hz(&self) -> f32 {
        self.frequency_hz
    }

    /// 写入通道的 ON/OFF 计数（各 12 位）
    pub fn set_channel_duty(&mut self, channel: u8, on: u16, off: u16) -> Result<(), DeviceError> {
        if channel >= CHANNEL_COUNT {
            return Err(DeviceError::InvalidChannel(channel));
        }

        let base = REG_LED0_ON_L + 4 * channel;
        self.bus.write_register(base, (on & 0xFF) as u8)?;
        self.bus.write_register(base + 1, ((on >> 8) & 0x0F) as u8)?;
        self.bus.write_register(base + 2, (off & 0xFF) as u8)?;
        self.bus.write_register(base + 3, ((off >> 8) & 0x0F) as u8)?;
        Ok(())
    }

    pub fn release(self) -> B {
        self.bus
    }
}

impl<B: RegisterBus + Send> DutyCycleOutput for Pca9685<B> {
    fn set_duty(&mut self, channel: u8, count: u16) -> Result<(), DeviceError> {
        self.set_channel_duty(channel, 0, count.min(MAX_COUNT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rover_hal::mock::MockRegisterBus;

    #[test]
    fn test_duty_to_count_endpoints() {
        assert_eq!(duty_to_count(0.0), 0);
        assert_eq!(duty_to_count(50.0), 2048);
        assert_eq!(duty_to_count(100.0), 4095);
        assert_eq!(duty_to_count(25.0), 1024);
    }

    #[test]
    fn test_prescale() {
        assert_eq!(prescale_for(50.0), 121);
        assert_eq!(prescale_for(1.0), prescale_for(24.0));
        assert_eq!(prescale_for(5000.0), 3);
    }

    #[test]
    fn test_init_writes_frequency_sequence() {
        let bus = MockRegisterBus::new();
        let pwm = Pca9685::init(bus.clone(), DEFAULT_FREQUENCY_HZ).unwrap();
        assert_eq!(
            bus.writes(),
            vec![(REG_MODE1, 0x10), (REG_PRESCALE, 121), (REG_MODE1, 0x00)]
        );
        assert_eq!(pwm.frequency_hz(), 50.0);
    }

    #[test]
    fn test_set_channel_duty_registers() {
        let bus = MockRegisterBus::new();
        let mut pwm = Pca9685::init(bus.clone(), 50.0).unwrap();
        bus.clear_writes();

        pwm.set_duty(2, 2048).unwrap();
        assert_eq!(
            bus.writes(),
            vec![(0x0E, 0x00), (0x0F, 0x00), (0x10, 0x00), (0x11, 0x08)]
        );

        bus.clear_writes();
        pwm.set_channel_duty(15, 0x123, 0xFFF).unwrap();
        assert_eq!(
            bus.writes(),
            vec![(0x42, 0x23), (0x43, 0x01), (0x44, 0xFF), (0x45, 0x0F)]
        );
    }

    #[test]
    fn test_invalid_channel_rejected_without_write() {
        let bus = MockRegisterBus::new();
        let mut pwm = Pca9685::init(bus.clone(), 50.0).unwrap();
        bus.clear_writes();

        assert!(matches!(pwm.set_duty(16, 100), Err(DeviceError::InvalidChannel(16))));
        assert!(bus.writes().is_empty());
    }

    proptest! {
        #[test]
        fn prop_duty_to_count_in_range(pct in 0.0f32..=100.0) {
            let count = duty_to_count(pct);
            prop_assert!(count <= MAX_COUNT);
            let exact = pct / 100.0 * MAX_COUNT as f32;
            prop_assert!((count as f32 - exact).abs() <= 0.5 + 1e-3);
        }

        #[test]
        fn prop_duty_to_count_monotonic(a in 0.0f32..=100.0, b in 0.0f32..=100.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(duty_to_count(lo) <= duty_to_count(hi));
        }
    }
}
