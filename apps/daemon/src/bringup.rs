//! 硬件初始化（降级模式）
//!
//! 每个子系统独立初始化：任意一个失败只记录错误，该模块在分发器中报告为不可用，
//! 服务继续以剩余模块运行。

use crate::config::DaemonConfig;
use rover_command::{AcquisitionTask, CommandContext, RoverController};
use rover_driver::SnapshotStore;
use std::sync::Arc;
use tracing::{error, info};

/// 已初始化的采集任务及其快照存储
struct Acquisition<T> {
    task: Box<dyn AcquisitionTask>,
    store: Arc<SnapshotStore<T>>,
}

/// 初始化所有启用的子系统并组装控制器（不启动采集线程）
pub fn bring_up(config: &DaemonConfig) -> RoverController {
    let mut ctx = CommandContext::new();
    let mut tasks = Vec::new();

    if config.pwm.enabled {
        match hardware::pwm(config) {
            Ok(pwm) => {
                ctx = ctx.with_boxed_actuator(pwm);
                info!("PWM controller ready");
            },
            Err(e) => error!("PWM controller unavailable: {:#}", e),
        }
    }

    if config.imu.enabled {
        match hardware::imu(config) {
            Ok(Acquisition { task, store }) => {
                ctx = ctx.with_imu(store);
                tasks.push(task);
                info!("IMU ready");
            },
            Err(e) => error!("IMU unavailable, continuing without it: {:#}", e),
        }
    }

    if config.sonar.enabled {
        match hardware::sonar(config) {
            Ok(Acquisition { task, store }) => {
                ctx = ctx.with_sonar(store);
                tasks.push(task);
                info!("Ranging sensor ready");
            },
            Err(e) => error!("Ranging sensor unavailable, continuing without it: {:#}", e),
        }
    }

    let mut controller = RoverController::new(ctx);
    for task in tasks {
        controller.add_task(task);
    }
    controller
}

#[cfg(target_os = "linux")]
mod hardware {
    use super::Acquisition;
    use crate::config::DaemonConfig;
    use anyhow::Context;
    use rover_devices::{DutyCycleOutput, Pca9685, lsm9ds1};
    use rover_driver::{ImuSensor, OrientationSnapshot, Poller, RangingSensor, RangingSnapshot};
    use rover_hal::{I2cDevice, MappedGpio, MonotonicClock};

    pub(super) fn pwm(config: &DaemonConfig) -> anyhow::Result<Box<dyn DutyCycleOutput>> {
        let cfg = &config.pwm;
        let bus = I2cDevice::open(&cfg.i2c_bus, cfg.address)
            .with_context(|| format!("opening {} @ 0x{:02X}", cfg.i2c_bus, cfg.address))?;
        let pwm = Pca9685::init(bus, cfg.frequency_hz).context("configuring PCA9685")?;
        Ok(Box::new(pwm))
    }

    pub(super) fn imu(config: &DaemonConfig) -> anyhow::Result<Acquisition<OrientationSnapshot>> {
        let cfg = &config.imu.settings;
        let xg = I2cDevice::open(&cfg.i2c_bus, lsm9ds1::ADDRESS_ACCELGYRO)
            .with_context(|| format!("opening accel/gyro on {}", cfg.i2c_bus))?;
        let mag = I2cDevice::open(&cfg.i2c_bus, lsm9ds1::ADDRESS_MAG)
            .with_context(|| format!("opening magnetometer on {}", cfg.i2c_bus))?;
        let sensor = ImuSensor::init(xg, mag, cfg).context("initializing LSM9DS1")?;

        let poller = Poller::new(sensor, cfg.rate_hz);
        let store = poller.store();
        Ok(Acquisition {
            task: Box::new(poller),
            store,
        })
    }

    pub(super) fn sonar(config: &DaemonConfig) -> anyhow::Result<Acquisition<RangingSnapshot>> {
        let cfg = &config.sonar.settings;
        let gpio = MappedGpio::open(cfg.peripheral_base)
            .context("mapping GPIO registers (requires root)")?;
        let sensor = RangingSensor::init(gpio, MonotonicClock::new(), cfg)
            .context("initializing ranging sensor")?;

        let poller = Poller::new(sensor, cfg.rate_hz);
        let store = poller.store();
        Ok(Acquisition {
            task: Box::new(poller),
            store,
        })
    }
}

#[cfg(not(target_os = "linux"))]
mod hardware {
    use super::Acquisition;
    use crate::config::DaemonConfig;
    use rover_devices::DutyCycleOutput;
    use rover_driver::{OrientationSnapshot, RangingSnapshot};

    const UNSUPPORTED: &str = "I2C and memory-mapped GPIO are only supported on Linux";

    pub(super) fn pwm(_config: &DaemonConfig) -> anyhow::Result<Box<dyn DutyCycleOutput>> {
        anyhow::bail!(UNSUPPORTED)
    }

    pub(super) fn imu(_config: &DaemonConfig) -> anyhow::Result<Acquisition<OrientationSnapshot>> {
        anyhow::bail!(UNSUPPORTED)
    }

    pub(super) fn sonar(_config: &DaemonConfig) -> anyhow::Result<Acquisition<RangingSnapshot>> {
        anyhow::bail!(UNSUPPORTED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 指向不存在设备的配置：所有子系统都会初始化失败
    fn missing_hardware() -> DaemonConfig {
        let mut config = DaemonConfig::default();
        config.imu.settings.i2c_bus = "/nonexistent/i2c-99".to_string();
        config.pwm.i2c_bus = "/nonexistent/i2c-99".to_string();
        config.sonar.enabled = false;
        config
    }

    #[test]
    fn test_degraded_mode_reports_unavailable() {
        let mut controller = bring_up(&missing_hardware());
        assert_eq!(controller.start_all(), 0);
        assert!(controller.status().is_empty());

        let dispatcher = controller.dispatcher();
        assert!(!dispatcher.context().has_imu());
        assert!(!dispatcher.context().has_actuator());
        assert_eq!(dispatcher.dispatch("IMU read").text(), "ERROR: IMU not available");
        assert_eq!(dispatcher.dispatch("SONAR").text(), "ERROR: SONAR not available");
        assert_eq!(dispatcher.dispatch("PWM 50").to_line(), "ERROR\n");
    }

    #[test]
    fn test_disabled_modules_are_skipped() {
        let mut config = DaemonConfig::default();
        config.imu.enabled = false;
        config.sonar.enabled = false;
        config.pwm.enabled = false;

        let controller = bring_up(&config);
        let dispatcher = controller.dispatcher();
        assert!(!dispatcher.context().has_imu());
        assert!(!dispatcher.context().has_sonar());
        assert!(!dispatcher.context().has_actuator());
    }
}
