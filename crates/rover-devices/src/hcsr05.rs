//! HC-SR05 超声波测距协议
//!
//! 时序：TRIG 拉低 2µs → 拉高 10µs → 拉低，随后测量 ECHO 高电平宽度。
//! 每个等待阶段最多轮询 `echo_timeout_polls` 次（每次间隔 1µs），超出即超时。

use crate::{DeviceError, EchoStage};
use rover_hal::{Clock, GpioBank, HalError, Level, PinMode};
use tracing::trace;

/// 声速的一半（cm/µs），回波往返时间 × 该值 = 单程距离
pub const SPEED_OF_SOUND_CM_PER_US: f32 = 0.01715;

const TRIGGER_SETTLE_US: u64 = 2;
const TRIGGER_PULSE_US: u64 = 10;
const POLL_INTERVAL_US: u64 = 1;

/// 默认轮询预算
pub const DEFAULT_ECHO_TIMEOUT_POLLS: u32 = 30_000;

/// 测距传感器引脚分配（BCM 编号）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangingPins {
    pub trigger: u8,
    pub echo: u8,
}

impl Default for RangingPins {
    fn default() -> Self {
        Self {
            trigger: 27,
            echo: 17,
        }
    }
}

/// 一次回波测量
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoPulse {
    /// 回波高电平宽度（µs）
    pub duration_us: u64,
}

impl EchoPulse {
    /// 换算为距离（cm）
    pub fn distance_cm(&self) -> f32 {
        self.duration_us as f32 * SPEED_OF_SOUND_CM_PER_US
    }
}

/// HC-SR05 测距协议
///
/// 本身不持有 GPIO：LED 指示灯与测距共用同一个 GPIO 寄存器块，
/// 由调用者在每次测量时借入。
#[derive(Debug, Clone)]
pub struct Hcsr05 {
    pins: RangingPins,
    echo_timeout_polls: u32,
}

impl Hcsr05 {
    pub fn new(pins: RangingPins) -> Self {
        Self {
            pins,
            echo_timeout_polls: DEFAULT_ECHO_TIMEOUT_POLLS,
        }
    }

    /// 设置每个等待阶段的轮询预算
    pub fn with_echo_timeout_polls(mut self, polls: u32) -> Self {
        self.echo_timeout_polls = polls;
        self
    }

    pub fn pins(&self) -> RangingPins {
        self.pins
    }

    /// 配置引脚方向，并将 TRIG 置低
    pub fn init(&self, gpio: &mut impl GpioBank) -> Result<(), HalError> {
        gpio.configure(self.pins.trigger, PinMode::Output)?;
        gpio.configure(self.pins.echo, PinMode::Input)?;
        gpio.write(self.pins.trigger, Level::Low);
        Ok(())
    }

    /// 执行一次测量
    ///
    /// # 错误
    /// - `DeviceError::EchoTimeout(Rising)`: 回波始终未变高（无目标）
    /// - `DeviceError::EchoTimeout(Falling)`: 回波始终未变低（超出量程或线路故障）
    pub fn measure(
        &self,
        gpio: &mut impl GpioBank,
        clock: &impl Clock,
    ) -> Result<EchoPulse, DeviceError> {
        let RangingPins { trigger, echo } = self.pins;

        gpio.write(trigger, Level::Low);
        clock.delay_us(TRIGGER_SETTLE_US);
        gpio.write(trigger, Level::High);
        clock.delay_us(TRIGGER_PULSE_US);
        gpio.write(trigger, Level::Low);

        self.wait_while(gpio, clock, echo, Level::Low, EchoStage::Rising)?;
        let start = clock.now_us();

        self.wait_while(gpio, clock, echo, Level::High, EchoStage::Falling)?;
        let end = clock.now_us();

        let pulse = EchoPulse {
            duration_us: end.saturating_sub(start),
        };
        trace!("Echo pulse: {}us", pulse.duration_us);
        Ok(pulse)
    }

    fn wait_while(
        &self,
        gpio: &impl GpioBank,
        clock: &impl Clock,
        pin: u8,
        level: Level,
        stage: EchoStage,
    ) -> Result<(), DeviceError> {
        let mut polls: u32 = 0;
        while gpio.read(pin) == level {
            polls += 1;
            if polls > self.echo_timeout_polls {
                return Err(DeviceError::EchoTimeout(stage));
            }
            clock.delay_us(POLL_INTERVAL_US);
        }
        Ok(())
    }
}
