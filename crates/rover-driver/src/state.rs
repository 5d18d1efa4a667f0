//! 传感器快照与接近状态
//!
//! 快照只能通过构造函数创建：要么所有字段来自同一次成功读取，
//! 要么是数值清零、状态为 `ERROR` 的无效快照，不存在"部分有效"。

use rover_devices::ImuReading;
use std::fmt;

/// 远/中距离分界（cm），严格大于即为 FAR
pub const FAR_THRESHOLD_CM: f32 = 60.0;
/// 中/近距离分界（cm），大于等于即为 MEDIUM
pub const CLOSE_THRESHOLD_CM: f32 = 20.0;

/// 快照类型的公共接口（供 Poller 使用）
pub trait Snapshot: Clone + Send + Sync + 'static {
    /// 读取失败或尚无数据时发布的无效快照
    fn invalid() -> Self;

    fn is_valid(&self) -> bool;
}

// ============================================================
// 姿态快照
// ============================================================

/// IMU 快照
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OrientationSnapshot {
    /// 加速度（m/s²）
    pub accel: [f32; 3],
    /// 角速度（rad/s）
    pub gyro: [f32; 3],
    /// 磁场（µT）
    pub mag: [f32; 3],
    /// 芯片温度（°C）
    pub temperature_c: f32,
    /// 横滚角（度）
    pub roll_deg: f32,
    /// 俯仰角（度）
    pub pitch_deg: f32,
    /// 航向角（度，未做倾斜补偿）
    pub yaw_deg: f32,
    valid: bool,
}

impl OrientationSnapshot {
    /// 由一次成功读取构造，并计算姿态角
    ///
    /// - roll  = atan2(ay, √(ax² + az²))
    /// - pitch = atan2(−ax, √(ay² + az²))
    /// - yaw   = atan2(my, mx)
    pub fn from_reading(reading: &ImuReading) -> Self {
        let [ax, ay, az] = reading.accel;
        let [mx, my, _] = reading.mag;

        let roll = ay.atan2((ax * ax + az * az).sqrt());
        let pitch = (-ax).atan2((ay * ay + az * az).sqrt());
        let yaw = my.atan2(mx);

        Self {
            accel: reading.accel,
            gyro: reading.gyro,
            mag: reading.mag,
            temperature_c: reading.temperature_c,
            roll_deg: roll.to_degrees(),
            pitch_deg: pitch.to_degrees(),
            yaw_deg: yaw.to_degrees(),
            valid: true,
        }
    }
}

impl Snapshot for OrientationSnapshot {
    fn invalid() -> Self {
        Self::default()
    }

    fn is_valid(&self) -> bool {
        self.valid
    }
}

// ============================================================
// 测距快照
// ============================================================

/// 接近状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProximityStatus {
    Far,
    Medium,
    Close,
    #[default]
    Error,
}

impl ProximityStatus {
    /// 协议中的状态标签
    pub fn as_str(self) -> &'static str {
        match self {
            ProximityStatus::Far => "FAR",
            ProximityStatus::Medium => "MEDIUM",
            ProximityStatus::Close => "CLOSE",
            ProximityStatus::Error => "ERROR",
        }
    }

    /// 对应的指示灯状态
    pub fn indicator(self) -> IndicatorState {
        IndicatorState {
            green: self == ProximityStatus::Far,
            yellow: self == ProximityStatus::Medium,
            red: self == ProximityStatus::Close,
        }
    }
}

impl fmt::Display for ProximityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 距离 → 接近状态
pub fn derive_proximity(distance_cm: f32, valid: bool) -> ProximityStatus {
    if !valid {
        ProximityStatus::Error
    } else if distance_cm > FAR_THRESHOLD_CM {
        ProximityStatus::Far
    } else if distance_cm >= CLOSE_THRESHOLD_CM {
        ProximityStatus::Medium
    } else {
        ProximityStatus::Close
    }
}

/// 三色指示灯状态（绿 = 远，黄 = 中，红 = 近）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndicatorState {
    pub green: bool,
    pub yellow: bool,
    pub red: bool,
}

impl IndicatorState {
    pub fn active_count(&self) -> usize {
        [self.green, self.yellow, self.red]
            .iter()
            .filter(|on| **on)
            .count()
    }
}

/// 测距快照
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RangingSnapshot {
    /// 距离（cm），无效时为 0
    pub distance_cm: f32,
    pub status: ProximityStatus,
    valid: bool,
}

impl RangingSnapshot {
    pub fn valid(distance_cm: f32) -> Self {
        Self {
            distance_cm,
            status: derive_proximity(distance_cm, true),
            valid: true,
        }
    }
}

impl Snapshot for RangingSnapshot {
    fn invalid() -> Self {
        Self::default()
    }

    fn is_valid(&self) -> bool {
        self.valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_level_attitude() {
        let reading = ImuReading {
            accel: [0.0, 0.0, 9.80665],
            gyro: [0.0; 3],
            mag: [20.0, 0.0, -40.0],
            temperature_c: 25.0,
        };
        let snap = OrientationSnapshot::from_reading(&reading);
        assert!(snap.is_valid());
        assert_eq!(snap.roll_deg, 0.0);
        assert_eq!(snap.pitch_deg, 0.0);
        assert_eq!(snap.yaw_deg, 0.0);
    }

    #[test]
    fn test_tilted_attitude() {
        let g = 9.80665_f32;
        let reading = ImuReading {
            accel: [0.0, g, 0.0],
            mag: [0.0, 30.0, 0.0],
            ..Default::default()
        };
        let snap = OrientationSnapshot::from_reading(&reading);
        assert!((snap.roll_deg - 90.0).abs() < 1e-3);
        assert!((snap.yaw_deg - 90.0).abs() < 1e-3);

        let reading = ImuReading {
            accel: [g, 0.0, 0.0],
            ..Default::default()
        };
        let snap = OrientationSnapshot::from_reading(&reading);
        assert!((snap.pitch_deg + 90.0).abs() < 1e-3);
    }

    #[test]
    fn test_invalid_snapshots_are_zeroed() {
        let snap = OrientationSnapshot::invalid();
        assert!(!snap.is_valid());
        assert_eq!(snap.accel, [0.0; 3]);
        assert_eq!(snap.temperature_c, 0.0);

        let snap = RangingSnapshot::invalid();
        assert!(!snap.is_valid());
        assert_eq!(snap.distance_cm, 0.0);
        assert_eq!(snap.status, ProximityStatus::Error);
    }

    #[test]
    fn test_proximity_thresholds() {
        assert_eq!(derive_proximity(100.0, false), ProximityStatus::Error);
        assert_eq!(derive_proximity(60.01, true), ProximityStatus::Far);
        assert_eq!(derive_proximity(60.0, true), ProximityStatus::Medium);
        assert_eq!(derive_proximity(20.0, true), ProximityStatus::Medium);
        assert_eq!(derive_proximity(19.99, true), ProximityStatus::Close);
        assert_eq!(derive_proximity(0.0, true), ProximityStatus::Close);

        assert_eq!(RangingSnapshot::valid(45.5).status, ProximityStatus::Medium);
        assert_eq!(ProximityStatus::Far.to_string(), "FAR");
    }

    #[test]
    fn test_error_indicator_all_off() {
        assert_eq!(ProximityStatus::Error.indicator(), IndicatorState::default());
        assert_eq!(ProximityStatus::Error.indicator().active_count(), 0);
    }

    proptest! {
        #[test]
        fn prop_exactly_one_indicator_when_valid(distance in 0.0f32..400.0) {
            let status = derive_proximity(distance, true);
            prop_assert_ne!(status, ProximityStatus::Error);
            prop_assert_eq!(status.indicator().active_count(), 1);
        }
    }
}
