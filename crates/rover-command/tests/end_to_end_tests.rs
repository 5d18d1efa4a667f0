//! 端到端测试：mock 硬件 → 驱动 → Poller → 分发器 → 回复行

use proptest::prelude::*;
use rover_command::{CommandContext, Dispatcher, RoverController};
use rover_devices::Pca9685;
use rover_driver::{
    ImuConfig, ImuSensor, Poller, RangingConfig, RangingSensor, Snapshot,
};
use rover_hal::mock::{EchoProfile, FakeClock, MockGpio, MockRegisterBus};
use std::thread;
use std::time::{Duration, Instant};

/// 寄存器 0x06 + 4·ch 起的 OFF 计数
fn off_count(bus: &MockRegisterBus, channel: u8) -> u16 {
    let base = 0x06 + 4 * channel;
    bus.register(base + 2) as u16 | ((bus.register(base + 3) as u16) << 8)
}

/// 某通道依次写入过的 OFF 计数
fn off_history(bus: &MockRegisterBus, channel: u8) -> Vec<u16> {
    let base = 0x06 + 4 * channel;
    let mut low = 0u16;
    let mut history = Vec::new();
    for (reg, value) in bus.writes() {
        if reg == base + 2 {
            low = value as u16;
        } else if reg == base + 3 {
            history.push(low | ((value as u16) << 8));
        }
    }
    history
}

fn pwm_dispatcher() -> (Dispatcher, MockRegisterBus) {
    let bus = MockRegisterBus::new();
    let pwm = Pca9685::init(bus.clone(), 50.0).unwrap();
    bus.clear_writes();
    (Dispatcher::new(CommandContext::new().with_actuator(pwm)), bus)
}

/// 水平放置的 IMU：Z = +1g，磁场指向 X
fn level_imu() -> (MockRegisterBus, MockRegisterBus) {
    let xg = MockRegisterBus::new();
    xg.set_register(0x0F, 0x68);
    xg.set_registers(0x28, &[0, 0, 0, 0, 0x09, 0x40]);
    xg.set_registers(0x15, &[0x20, 0x00]);
    let mag = MockRegisterBus::new();
    mag.set_register(0x0F, 0x3D);
    mag.set_registers(0x28, &[0xE8, 0x03, 0, 0, 0, 0]);
    (xg, mag)
}

fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn test_imu_orientation_level_attitude() {
    let (xg, mag) = level_imu();
    let sensor = ImuSensor::init(xg, mag, &ImuConfig::default()).unwrap();
    let poller = Poller::new(sensor, 100.0);
    let store = poller.store();

    let mut controller = RoverController::new(CommandContext::new().with_imu(store.clone()));
    controller.add_task(Box::new(poller));
    assert_eq!(controller.start_all(), 1);
    assert!(wait_until(|| store.read().is_valid()));

    let dispatcher = controller.dispatcher();
    let reply = dispatcher.dispatch("IMU orientation\n");
    assert!(reply.is_ok());
    assert_eq!(reply.to_line(), "Roll: 0.0° | Pitch: 0.0° | Yaw: 0.0°\n");

    let reply = dispatcher.dispatch("IMU raw");
    assert!(reply.text().ends_with("| Temp: 25.0°C"), "{}", reply.text());

    controller.shutdown();
    assert!(controller.status().is_empty());
}

#[test]
fn test_sonar_read_through_poller() {
    let config = RangingConfig::default();
    let clock = FakeClock::new();
    let gpio = MockGpio::new().with_echo(
        config.trigger_pin,
        config.echo_pin,
        clock.clone(),
        EchoProfile::Pulse {
            rise_after_us: 100,
            high_for_us: 1000,
        },
    );
    let sensor = RangingSensor::init(gpio, clock, &config).unwrap();
    let poller = Poller::new(sensor, 100.0);
    let store = poller.store();

    let mut controller = RoverController::new(CommandContext::new().with_sonar(store.clone()));
    controller.add_task(Box::new(poller));
    controller.start_all();
    assert!(wait_until(|| store.read().is_valid()));

    let dispatcher = controller.dispatcher();
    assert_eq!(
        dispatcher.dispatch("SONAR read").to_line(),
        "{\"distance\":17.15,\"status\":\"CLOSE\",\"valid\":true}\n"
    );
    assert_eq!(dispatcher.dispatch("SONAR distance").text(), "17.15 cm");
    assert_eq!(dispatcher.dispatch("SONAR status").text(), "CLOSE");
    assert_eq!(
        dispatcher.dispatch("SONAR echo").text(),
        "ERROR: Unknown SONAR command 'echo'"
    );
}

#[test]
fn test_legacy_pwm_sets_channel_zero() {
    let (dispatcher, bus) = pwm_dispatcher();
    let reply = dispatcher.dispatch("50\n");
    assert_eq!(reply.to_line(), "OK\n");
    assert_eq!(off_count(&bus, 0), 2048);
}

#[test]
fn test_pwm_dual_and_explicit_channel() {
    let (dispatcher, bus) = pwm_dispatcher();
    assert_eq!(dispatcher.dispatch("PWM 100 0").text(), "OK");
    assert_eq!(off_count(&bus, 0), 4095);
    assert_eq!(off_count(&bus, 1), 0);

    assert_eq!(dispatcher.dispatch("PWM -c 7 25").text(), "OK");
    assert_eq!(off_count(&bus, 7), 1024);
}

#[test]
fn test_pwm_out_of_range_rejected_without_write() {
    let (dispatcher, bus) = pwm_dispatcher();
    assert_eq!(dispatcher.dispatch("-c 2 150").to_line(), "ERROR\n");
    assert!(bus.writes().is_empty());
}

#[test]
fn test_empty_command() {
    let (dispatcher, bus) = pwm_dispatcher();
    let reply = dispatcher.dispatch("");
    assert!(!reply.is_ok());
    assert_eq!(reply.to_line(), "ERROR\n");
    assert!(bus.writes().is_empty());
}

#[test]
fn test_pwm_hold_resets_to_zero() {
    let (dispatcher, bus) = pwm_dispatcher();
    let t0 = Instant::now();
    assert_eq!(dispatcher.dispatch("PWM -t 0.2 -c 3 75").text(), "OK");
    assert!(t0.elapsed() >= Duration::from_millis(200));

    // 先 3071（75%），后归零
    let offs: Vec<(u8, u8)> = bus
        .writes()
        .into_iter()
        .filter(|(reg, _)| *reg == 0x14 || *reg == 0x15)
        .collect();
    assert_eq!(offs, vec![(0x14, 0xFF), (0x15, 0x0B), (0x14, 0x00), (0x15, 0x00)]);
    assert_eq!(off_count(&bus, 3), 0);
}

#[test]
fn test_pwm_dual_hold_resets_both_channels() {
    let (dispatcher, bus) = pwm_dispatcher();
    let t0 = Instant::now();
    assert_eq!(dispatcher.dispatch("PWM -t 0.1 30 70").to_line(), "OK\n");
    assert!(t0.elapsed() >= Duration::from_millis(100));

    let ch0 = rover_devices::duty_to_count(30.0);
    let ch1 = rover_devices::duty_to_count(70.0);
    assert!(ch0 > 0 && ch1 > 0);
    assert_eq!(off_history(&bus, 0), vec![ch0, 0]);
    assert_eq!(off_history(&bus, 1), vec![ch1, 0]);
    assert_eq!(off_count(&bus, 0), 0);
    assert_eq!(off_count(&bus, 1), 0);
}

#[test]
fn test_actuator_failure_reports_error() {
    let (dispatcher, bus) = pwm_dispatcher();
    bus.set_fail(true);
    assert_eq!(dispatcher.dispatch("PWM 10").text(), "ERROR");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_out_of_range_duty_never_writes(pct in prop_oneof![-1000.0f32..-0.001, 100.001f32..1000.0]) {
        let (dispatcher, bus) = pwm_dispatcher();
        let reply = dispatcher.dispatch(&format!("PWM {}", pct));
        prop_assert!(!reply.is_ok());
        prop_assert!(bus.writes().is_empty());
    }

    #[test]
    fn prop_valid_duty_writes_rounded_count(pct in 0.0f32..=100.0) {
        let (dispatcher, bus) = pwm_dispatcher();
        let line = format!("PWM {}", pct);
        prop_assert!(dispatcher.dispatch(&line).is_ok());
        let parsed: f32 = line[4..].parse().unwrap();
        prop_assert_eq!(off_count(&bus, 0), rover_devices::duty_to_count(parsed));
    }
}
