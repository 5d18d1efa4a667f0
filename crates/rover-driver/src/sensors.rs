//! 可被 Poller 驱动的传感器实现

use crate::config::{ImuConfig, LedPins, RangingConfig};
use crate::error::DriverError;
use crate::poller::Sensor;
use crate::state::{OrientationSnapshot, ProximityStatus, RangingSnapshot};
use rover_devices::{Hcsr05, Lsm9ds1};
use rover_hal::{Clock, GpioBank, HalError, Level, PinMode, RegisterBus};
use tracing::{debug, info};

// ============================================================
// IMU
// ============================================================

/// IMU 传感器
pub struct ImuSensor<XG, M> {
    imu: Lsm9ds1<XG, M>,
}

impl<XG, M> ImuSensor<XG, M>
where
    XG: RegisterBus + Send + 'static,
    M: RegisterBus + Send + 'static,
{
    /// 初始化 LSM9DS1 并应用配置的量程
    pub fn init(xg: XG, mag: M, config: &ImuConfig) -> Result<Self, DriverError> {
        let mut imu = Lsm9ds1::init(xg, mag)?;
        imu.setup_accel(config.accel_range, config.accel_rate)?;
        imu.setup_gyro(config.gyro_scale)?;
        imu.setup_mag(config.mag_gain)?;
        Ok(Self { imu })
    }

    pub fn release(self) -> (XG, M) {
        self.imu.release()
    }
}

impl<XG, M> Sensor for ImuSensor<XG, M>
where
    XG: RegisterBus + Send + 'static,
    M: RegisterBus + Send + 'static,
{
    type Snapshot = OrientationSnapshot;

    fn name(&self) -> &'static str {
        "imu"
    }

    fn sample(&mut self) -> Result<OrientationSnapshot, DriverError> {
        let reading = self.imu.read()?;
        Ok(OrientationSnapshot::from_reading(&reading))
    }
}

// ============================================================
// 测距 + 接近指示灯
// ============================================================

/// 三色接近指示灯
#[derive(Debug, Clone, Copy)]
pub struct ProximityIndicator {
    pins: LedPins,
}

impl ProximityIndicator {
    pub fn new(pins: LedPins) -> Self {
        Self { pins }
    }

    /// 配置为输出并全部熄灭
    pub fn init(&self, gpio: &mut impl GpioBank) -> Result<(), HalError> {
        for pin in [self.pins.green, self.pins.yellow, self.pins.red] {
            gpio.configure(pin, PinMode::Output)?;
        }
        self.all_off(gpio);
        Ok(())
    }

    /// 先全部熄灭，再点亮与状态对应的一个（ERROR 时全灭）
    pub fn show(&self, gpio: &mut impl GpioBank, status: ProximityStatus) {
        self.all_off(gpio);
        let state = status.indicator();
        if state.green {
            gpio.write(self.pins.green, Level::High);
        }
        if state.yellow {
            gpio.write(self.pins.yellow, Level::High);
        }
        if state.red {
            gpio.write(self.pins.red, Level::High);
        }
    }

    pub fn all_off(&self, gpio: &mut impl GpioBank) {
        gpio.write(self.pins.green, Level::Low);
        gpio.write(self.pins.yellow, Level::Low);
        gpio.write(self.pins.red, Level::Low);
    }
}

/// 超声波测距传感器
///
/// 独占 GPIO 寄存器块：测距引脚与指示灯引脚都由采集线程驱动。
pub struct RangingSensor<G, C> {
    protocol: Hcsr05,
    indicator: ProximityIndicator,
    gpio: G,
    clock: C,
    max_range_cm: f32,
    min_range_cm: f32,
    enforce_min_range: bool,
}

impl<G, C> RangingSensor<G, C>
where
    G: GpioBank + Send + 'static,
    C: Clock + 'static,
{
    /// 配置引脚并等待传感器稳定
    pub fn init(mut gpio: G, clock: C, config: &RangingConfig) -> Result<Self, DriverError> {
        let protocol =
            Hcsr05::new(config.pins()).with_echo_timeout_polls(config.echo_timeout_polls);
        let indicator = ProximityIndicator::new(config.leds);

        protocol.init(&mut gpio)?;
        indicator.init(&mut gpio)?;

        debug!("Waiting {}ms for ranging sensor to settle", config.stabilize_ms);
        clock.delay_us(config.stabilize_ms * 1000);

        info!(
            "Ranging sensor initialized (trigger={}, echo={})",
            config.trigger_pin, config.echo_pin
        );
        Ok(Self {
            protocol,
            indicator,
            gpio,
            clock,
            max_range_cm: config.max_range_cm,
            min_range_cm: config.min_range_cm,
            enforce_min_range: config.enforce_min_range,
        })
    }

    /// 距离有效性检查
    fn classify(&self, distance_cm: f32) -> Result<f32, DriverError> {
        let too_far = distance_cm > self.max_range_cm;
        let too_near = self.enforce_min_range && distance_cm < self.min_range_cm;
        if too_far || too_near {
            return Err(DriverError::OutOfRange {
                distance_cm,
                min_cm: self.min_range_cm,
                max_cm: self.max_range_cm,
            });
        }
        Ok(distance_cm)
    }

    /// 释放 GPIO：TRIG 置低，指示灯全灭
    pub fn release(mut self) -> G {
        self.park();
        self.gpio
    }
}

impl<G, C> Sensor for RangingSensor<G, C>
where
    G: GpioBank + Send + 'static,
    C: Clock + 'static,
{
    type Snapshot = RangingSnapshot;

    fn name(&self) -> &'static str {
        "sonar"
    }

    fn sample(&mut self) -> Result<RangingSnapshot, DriverError> {
        let pulse = self.protocol.measure(&mut self.gpio, &self.clock)?;
        let distance = self.classify(pulse.distance_cm())?;
        Ok(RangingSnapshot::valid(distance))
    }

    fn after_publish(&mut self, snapshot: &RangingSnapshot) {
        self.indicator.show(&mut self.gpio, snapshot.status);
    }

    fn park(&mut self) {
        self.gpio.write(self.protocol.pins().trigger, Level::Low);
        self.indicator.all_off(&mut self.gpio);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Snapshot;
    use rover_hal::mock::{EchoProfile, FakeClock, MockGpio, MockRegisterBus};

    fn ranging(profile: EchoProfile, config: RangingConfig) -> (RangingSensor<MockGpio, FakeClock>, MockGpio) {
        let clock = FakeClock::new();
        let gpio = MockGpio::new().with_echo(config.trigger_pin, config.echo_pin, clock.clone(), profile);
        let sensor = RangingSensor::init(gpio.clone(), clock, &config).unwrap();
        (sensor, gpio)
    }

    fn pulse(high_for_us: u64) -> EchoProfile {
        EchoProfile::Pulse {
            rise_after_us: 50,
            high_for_us,
        }
    }

    fn leds(gpio: &MockGpio) -> [Level; 3] {
        [gpio.level(25), gpio.level(24), gpio.level(23)]
    }

    #[test]
    fn test_ranging_init_configures_outputs() {
        let (_sensor, gpio) = ranging(EchoProfile::Silent, RangingConfig::default());
        for pin in [27, 25, 24, 23] {
            assert_eq!(gpio.mode(pin), Some(PinMode::Output));
        }
        assert_eq!(gpio.mode(17), Some(PinMode::Input));
        assert_eq!(leds(&gpio), [Level::Low; 3]);
    }

    #[test]
    fn test_ranging_sample_and_indicator() {
        // 5831µs ≈ 100cm → FAR → 绿灯
        let (mut sensor, gpio) = ranging(pulse(5831), RangingConfig::default());
        let snap = sensor.sample().unwrap();
        assert!(snap.is_valid());
        assert!((snap.distance_cm - 100.0).abs() < 0.01);
        assert_eq!(snap.status, ProximityStatus::Far);

        sensor.after_publish(&snap);
        assert_eq!(leds(&gpio), [Level::High, Level::Low, Level::Low]);

        // 10cm → CLOSE → 红灯
        gpio.set_echo_profile(pulse(583));
        let snap = sensor.sample().unwrap();
        assert_eq!(snap.status, ProximityStatus::Close);
        sensor.after_publish(&snap);
        assert_eq!(leds(&gpio), [Level::Low, Level::Low, Level::High]);

        // 无效 → 全灭
        sensor.after_publish(&RangingSnapshot::invalid());
        assert_eq!(leds(&gpio), [Level::Low; 3]);
    }

    #[test]
    fn test_ranging_beyond_max_is_out_of_range() {
        // 29155µs ≈ 500cm
        let config = RangingConfig {
            echo_timeout_polls: 40_000,
            ..Default::default()
        };
        let (mut sensor, _gpio) = ranging(pulse(29_155), config);
        assert!(matches!(sensor.sample(), Err(DriverError::OutOfRange { .. })));
    }

    #[test]
    fn test_ranging_min_range_is_advisory_by_default() {
        // 58µs ≈ 1cm
        let (mut sensor, _gpio) = ranging(pulse(58), RangingConfig::default());
        let snap = sensor.sample().unwrap();
        assert!(snap.is_valid());
        assert_eq!(snap.status, ProximityStatus::Close);

        let config = RangingConfig {
            enforce_min_range: true,
            ..Default::default()
        };
        let (mut sensor, _gpio) = ranging(pulse(58), config);
        assert!(matches!(sensor.sample(), Err(DriverError::OutOfRange { .. })));
    }

    #[test]
    fn test_ranging_timeout() {
        let config = RangingConfig {
            echo_timeout_polls: 100,
            ..Default::default()
        };
        let (mut sensor, _gpio) = ranging(EchoProfile::Silent, config);
        let err = sensor.sample().unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn test_ranging_release_turns_leds_off() {
        let (mut sensor, gpio) = ranging(pulse(2000), RangingConfig::default());
        let snap = sensor.sample().unwrap();
        sensor.after_publish(&snap);
        assert_eq!(leds(&gpio), [Level::Low, Level::High, Level::Low]);

        let _gpio = sensor.release();
        assert_eq!(leds(&gpio), [Level::Low; 3]);
        assert_eq!(gpio.level(27), Level::Low);
    }

    #[test]
    fn test_imu_sensor_sample() {
        let xg = MockRegisterBus::new();
        xg.set_register(0x0F, 0x68);
        let mag = MockRegisterBus::new();
        mag.set_register(0x0F, 0x3D);

        let mut sensor = ImuSensor::init(xg.clone(), mag.clone(), &ImuConfig::default()).unwrap();
        // Z = +1g
        xg.set_registers(0x28, &[0, 0, 0, 0, 0x09, 0x40]);
        mag.set_registers(0x28, &[0xE8, 0x03, 0, 0, 0, 0]);

        let snap = sensor.sample().unwrap();
        assert!(snap.is_valid());
        assert_eq!(snap.roll_deg, 0.0);
        assert_eq!(snap.yaw_deg, 0.0);
        assert!(snap.accel[2] > 9.7 && snap.accel[2] < 9.9);

        xg.set_fail(true);
        assert!(matches!(sensor.sample(), Err(DriverError::Device(_))));
    }
}
