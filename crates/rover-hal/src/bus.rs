//! 寄存器总线抽象

use crate::HalError;

/// 连续读取多个寄存器时附加在寄存器地址上的自增标志位
pub const AUTO_INCREMENT: u8 = 0x80;

/// 字节寻址的寄存器总线（I2C 从设备）
///
/// 每个实例绑定到一个设备地址，句柄在 Drop 时释放。
pub trait RegisterBus {
    /// 从 `reg` 开始读取 `buf.len()` 个字节
    ///
    /// 读取多于一个字节时使用自增寻址（寄存器地址 `| AUTO_INCREMENT`）。
    /// 读到的字节数不足时返回 `HalError::ShortTransfer`。
    fn read_registers(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), HalError>;

    /// 向 `reg` 写入一个字节
    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), HalError>;

    /// 读取单个寄存器
    fn read_register(&mut self, reg: u8) -> Result<u8, HalError> {
        let mut value = [0u8; 1];
        self.read_registers(reg, &mut value)?;
        Ok(value[0])
    }
}

impl<B: RegisterBus + ?Sized> RegisterBus for Box<B> {
    fn read_registers(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), HalError> {
        (**self).read_registers(reg, buf)
    }

    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), HalError> {
        (**self).write_register(reg, value)
    }
}

/// 计算块读取时实际发送的寄存器地址
pub(crate) fn block_address(reg: u8, len: usize) -> u8 {
    if len > 1 { reg | AUTO_INCREMENT } else { reg }
}
