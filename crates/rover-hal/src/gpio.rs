//! GPIO 寄存器块抽象

use crate::HalError;

/// 单个寄存器块（GPFSEL/GPSET0/GPCLR0/GPLEV0）可寻址的引脚数
pub const MAX_PIN: u8 = 32;

/// 数字电平
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Level {
    #[default]
    Low,
    High,
}

impl Level {
    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Level::High } else { Level::Low }
    }
}

/// 引脚方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Input,
    Output,
}

/// 内存映射 GPIO 寄存器块
///
/// `write`/`read` 是单次寄存器访问，不会失败；引脚合法性在 `configure` 时检查。
pub trait GpioBank {
    /// 配置引脚方向
    ///
    /// # 错误
    /// - `HalError::InvalidPin`: 引脚号 >= [`MAX_PIN`]
    fn configure(&mut self, pin: u8, mode: PinMode) -> Result<(), HalError>;

    /// 设置输出电平（通过 SET/CLR 寄存器，不影响其他引脚）
    fn write(&mut self, pin: u8, level: Level);

    /// 读取引脚电平
    fn read(&self, pin: u8) -> Level;
}

/// 引脚在 SET/CLR/LEV 寄存器中的位掩码，越界时为 0
pub(crate) fn pin_mask(pin: u8) -> u32 {
    1u32.checked_shl(pin as u32).unwrap_or(0)
}

pub(crate) fn check_pin(pin: u8) -> Result<(), HalError> {
    if pin >= MAX_PIN {
        return Err(HalError::InvalidPin(pin));
    }
    Ok(())
}
