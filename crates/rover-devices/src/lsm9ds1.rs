//! LSM9DS1 惯性传感器驱动
//!
//! 加速度计/陀螺仪（地址 0x6B）与磁力计（地址 0x1E）是两个独立的 I2C 从设备，
//! 因此驱动持有两个寄存器总线句柄。

use crate::DeviceError;
use rover_hal::RegisterBus;
use std::time::Duration;
use tracing::{debug, info};

/// 加速度计/陀螺仪 I2C 地址
pub const ADDRESS_ACCELGYRO: u8 = 0x6B;
/// 磁力计 I2C 地址
pub const ADDRESS_MAG: u8 = 0x1E;

const XG_ID: u8 = 0x68;
const MAG_ID: u8 = 0x3D;

// 加速度计/陀螺仪寄存器
const REG_WHO_AM_I_XG: u8 = 0x0F;
const REG_CTRL_REG1_G: u8 = 0x10;
const REG_TEMP_OUT_L: u8 = 0x15;
const REG_OUT_X_L_G: u8 = 0x18;
const REG_CTRL_REG5_XL: u8 = 0x1F;
const REG_CTRL_REG6_XL: u8 = 0x20;
const REG_CTRL_REG8: u8 = 0x22;
const REG_OUT_X_L_XL: u8 = 0x28;

// 磁力计寄存器
const REG_WHO_AM_I_M: u8 = 0x0F;
const REG_CTRL_REG2_M: u8 = 0x21;
const REG_CTRL_REG3_M: u8 = 0x22;
const REG_OUT_X_L_M: u8 = 0x28;

const GRAVITY_STANDARD: f32 = 9.80665;
const DPS_TO_RADS: f32 = 0.017_453_293;

/// 软复位后的等待时间
const RESET_SETTLE: Duration = Duration::from_millis(10);

/// 加速度计量程
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AccelRange {
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "2g"))]
    G2,
    #[cfg_attr(feature = "serde", serde(rename = "4g"))]
    G4,
    #[cfg_attr(feature = "serde", serde(rename = "8g"))]
    G8,
    #[cfg_attr(feature = "serde", serde(rename = "16g"))]
    G16,
}

impl AccelRange {
    /// CTRL_REG6_XL 中的 FS_XL 位
    fn bits(self) -> u8 {
        match self {
            AccelRange::G2 => 0b00 << 3,
            AccelRange::G4 => 0b10 << 3,
            AccelRange::G8 => 0b11 << 3,
            AccelRange::G16 => 0b01 << 3,
        }
    }

    /// 灵敏度（mg/LSB）
    fn mg_per_lsb(self) -> f32 {
        match self {
            AccelRange::G2 => 0.061,
            AccelRange::G4 => 0.122,
            AccelRange::G8 => 0.244,
            AccelRange::G16 => 0.732,
        }
    }
}

/// 加速度计输出数据率
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum AccelDataRate {
    PowerDown,
    Hz10,
    Hz50,
    #[default]
    Hz119,
    Hz238,
    Hz476,
    Hz952,
}

impl AccelDataRate {
    /// CTRL_REG6_XL 中的 ODR_XL 位
    fn bits(self) -> u8 {
        let odr: u8 = match self {
            AccelDataRate::PowerDown => 0b000,
            AccelDataRate::Hz10 => 0b001,
            AccelDataRate::Hz50 => 0b010,
            AccelDataRate::Hz119 => 0b011,
            AccelDataRate::Hz238 => 0b100,
            AccelDataRate::Hz476 => 0b101,
            AccelDataRate::Hz952 => 0b110,
        };
        odr << 5
    }
}

/// 陀螺仪量程
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GyroScale {
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "245dps"))]
    Dps245,
    #[cfg_attr(feature = "serde", serde(rename = "500dps"))]
    Dps500,
    #[cfg_attr(feature = "serde", serde(rename = "2000dps"))]
    Dps2000,
}

impl GyroScale {
    fn bits(self) -> u8 {
        match self {
            GyroScale::Dps245 => 0b00 << 3,
            GyroScale::Dps500 => 0b01 << 3,
            GyroScale::Dps2000 => 0b11 << 3,
        }
    }

    /// 灵敏度（dps/digit）
    fn dps_per_digit(self) -> f32 {
        match self {
            GyroScale::Dps245 => 0.008_75,
            GyroScale::Dps500 => 0.017_50,
            GyroScale::Dps2000 => 0.070_00,
        }
    }
}

/// 磁力计增益
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MagGain {
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "4gauss"))]
    Gauss4,
    #[cfg_attr(feature = "serde", serde(rename = "8gauss"))]
    Gauss8,
    #[cfg_attr(feature = "serde", serde(rename = "12gauss"))]
    Gauss12,
    #[cfg_attr(feature = "serde", serde(rename = "16gauss"))]
    Gauss16,
}

impl MagGain {
    fn bits(self) -> u8 {
        let fs: u8 = match self {
            MagGain::Gauss4 => 0,
            MagGain::Gauss8 => 1,
            MagGain::Gauss12 => 2,
            MagGain::Gauss16 => 3,
        };
        fs << 5
    }

    /// 灵敏度（gauss/LSB）
    fn gauss_per_lsb(self) -> f32 {
        match self {
            MagGain::Gauss4 => 1.0 / 6842.0,
            MagGain::Gauss8 => 1.0 / 3421.0,
            MagGain::Gauss12 => 1.0 / 2281.0,
            MagGain::Gauss16 => 1.0 / 1711.0,
        }
    }
}

/// 一次完整读取的换算结果
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ImuReading {
    /// 加速度（m/s²）[X, Y, Z]
    pub accel: [f32; 3],
    /// 角速度（rad/s）[X, Y, Z]
    pub gyro: [f32; 3],
    /// 磁场（µT）[X, Y, Z]
    pub mag: [f32; 3],
    /// 芯片温度（°C）
    pub temperature_c: f32,
}

/// LSM9DS1 驱动
pub struct Lsm9ds1<XG, M> {
    xg: XG,
    mag: M,
    accel_mg_lsb: f32,
    gyro_dps_digit: f32,
    mag_gauss_lsb: f32,
}

impl<XG: RegisterBus, M: RegisterBus> Lsm9ds1<XG, M> {
    /// 初始化传感器
    ///
    /// 校验两个 WHO_AM_I、软复位、使能三个传感器，
    /// 并应用默认量程（±2g / 10Hz、245dps、4gauss）。
    ///
    /// # 错误
    /// - `DeviceError::ChipId`: WHO_AM_I 不匹配（接错设备或总线异常）
    /// - `DeviceError::Bus`: 总线事务失败
    pub fn init(mut xg: XG, mut mag: M) -> Result<Self, DeviceError> {
        let id = xg.read_register(REG_WHO_AM_I_XG)?;
        if id != XG_ID {
            return Err(DeviceError::ChipId {
                device: "LSM9DS1 accel/gyro",
                expected: XG_ID,
                actual: id,
            });
        }

        let id = mag.read_register(REG_WHO_AM_I_M)?;
        if id != MAG_ID {
            return Err(DeviceError::ChipId {
                device: "LSM9DS1 magnetometer",
                expected: MAG_ID,
                actual: id,
            });
        }

        // 软复位
        xg.write_register(REG_CTRL_REG8, 0x05)?;
        std::thread::sleep(RESET_SETTLE);

        // 使能陀螺仪、加速度计，磁力计连续转换模式
        xg.write_register(REG_CTRL_REG1_G, 0xC0)?;
        xg.write_register(REG_CTRL_REG5_XL, 0x38)?;
        xg.write_register(REG_CTRL_REG6_XL, 0xC0)?;
        mag.write_register(REG_CTRL_REG3_M, 0x00)?;

        let mut sensor = Self {
            xg,
            mag,
            accel_mg_lsb: AccelRange::G2.mg_per_lsb(),
            gyro_dps_digit: GyroScale::Dps245.dps_per_digit(),
            mag_gauss_lsb: MagGain::Gauss4.gauss_per_lsb(),
        };
        sensor.setup_accel(AccelRange::G2, AccelDataRate::Hz10)?;
        sensor.setup_gyro(GyroScale::Dps245)?;
        sensor.setup_mag(MagGain::Gauss4)?;

        info!("LSM9DS1 initialized");
        Ok(sensor)
    }

    /// 配置加速度计量程和数据率
    pub fn setup_accel(&mut self, range: AccelRange, rate: AccelDataRate) -> Result<(), DeviceError> {
        let mut reg = self.xg.read_register(REG_CTRL_REG6_XL)?;
        reg &= !0b1111_1000;
        reg |= range.bits() | rate.bits();
        self.xg.write_register(REG_CTRL_REG6_XL, reg)?;

        self.accel_mg_lsb = range.mg_per_lsb();
        debug!("Accel configured: {:?} @ {:?}", range, rate);
        Ok(())
    }

    /// 配置陀螺仪量程
    pub fn setup_gyro(&mut self, scale: GyroScale) -> Result<(), DeviceError> {
        let mut reg = self.xg.read_register(REG_CTRL_REG1_G)?;
        reg &= !0b0001_1000;
        reg |= scale.bits();
        self.xg.write_register(REG_CTRL_REG1_G, reg)?;

        self.gyro_dps_digit = scale.dps_per_digit();
        debug!("Gyro configured: {:?}", scale);
        Ok(())
    }

    /// 配置磁力计增益
    pub fn setup_mag(&mut self, gain: MagGain) -> Result<(), DeviceError> {
        self.mag.write_register(REG_CTRL_REG2_M, gain.bits())?;

        self.mag_gauss_lsb = gain.gauss_per_lsb();
        debug!("Mag configured: {:?}", gain);
        Ok(())
    }

    /// 读取全部传感器并换算为物理量
    ///
    /// 共 4 次块读取（加速度、角速度、磁场、温度），任意一次失败即返回错误，
    /// 不会返回部分结果。
    pub fn read(&mut self) -> Result<ImuReading, DeviceError> {
        let accel_raw = read_vector(&mut self.xg, REG_OUT_X_L_XL)?;
        let gyro_raw = read_vector(&mut self.xg, REG_OUT_X_L_G)?;
        let mag_raw = read_vector(&mut self.mag, REG_OUT_X_L_M)?;

        let mut temp = [0u8; 2];
        self.xg.read_registers(REG_TEMP_OUT_L, &mut temp)?;
        let temp_raw = i16::from_le_bytes(temp);

        let accel_scale = self.accel_mg_lsb / 1000.0 * GRAVITY_STANDARD;
        let gyro_scale = self.gyro_dps_digit * DPS_TO_RADS;
        let mag_scale = self.mag_gauss_lsb * 100.0;

        Ok(ImuReading {
            accel: accel_raw.map(|v| v as f32 * accel_scale),
            gyro: gyro_raw.map(|v| v as f32 * gyro_scale),
            mag: mag_raw.map(|v| v as f32 * mag_scale),
            temperature_c: 21.0 + temp_raw as f32 / 8.0,
        })
    }

    /// 释放总线句柄
    pub fn release(self) -> (XG, M) {
        (self.xg, self.mag)
    }
}

/// 读取 3 轴 16 位小端数据
fn read_vector(bus: &mut impl RegisterBus, reg: u8) -> Result<[i16; 3], DeviceError> {
    let mut buf = [0u8; 6];
    bus.read_registers(reg, &mut buf)?;
    Ok([
        i16::from_le_bytes([buf[0], buf[1]]),
        i16::from_le_bytes([buf[2], buf[3]]),
        i16::from_le_bytes([buf[4], buf[5]]),
    ])
}
