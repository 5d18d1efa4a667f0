//! Linux I2C 设备（/dev/i2c-N）

use crate::bus::block_address;
use crate::{HalError, RegisterBus};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::os::unix::io::AsRawFd;
use std::path::Path;
use tracing::{debug, trace};

/// `linux/i2c-dev.h` 中的 `I2C_SLAVE` 请求号
const I2C_SLAVE: u64 = 0x0703;

/// 绑定到单个从地址的 I2C 设备句柄
///
/// 每次寄存器访问都是一次 `write`（寄存器地址）+ `read` 系统调用，
/// 不做任何缓存。文件描述符在 Drop 时关闭。
#[derive(Debug)]
pub struct I2cDevice {
    file: File,
    path: String,
    address: u8,
}

impl I2cDevice {
    /// 打开 I2C 总线并绑定从地址
    ///
    /// # 错误
    /// - `HalError::PermissionDenied`: 无权访问设备节点
    /// - `HalError::Open`: 设备节点不存在等
    /// - `HalError::Io`: `I2C_SLAVE` ioctl 失败
    pub fn open(path: impl AsRef<Path>, address: u8) -> Result<Self, HalError> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| HalError::from_open(path_str.clone(), e))?;

        // SAFETY: fd 在 `file` 存活期间有效；I2C_SLAVE 只接受一个整数参数
        let ret = unsafe {
            libc::ioctl(file.as_raw_fd(), I2C_SLAVE as _, address as libc::c_ulong)
        };
        if ret < 0 {
            return Err(HalError::Io(std::io::Error::last_os_error()));
        }

        debug!("Opened I2C device {} at address 0x{:02X}", path_str, address);

        Ok(Self {
            file,
            path: path_str,
            address,
        })
    }

    /// 设备节点路径
    pub fn path(&self) -> &str {
        &self.path
    }

    /// 从设备地址（7 位）
    pub fn address(&self) -> u8 {
        self.address
    }

    fn write_all_checked(&mut self, bytes: &[u8]) -> Result<(), HalError> {
        let written = self.file.write(bytes)?;
        if written != bytes.len() {
            return Err(HalError::ShortTransfer {
                expected: bytes.len(),
                actual: written,
            });
        }
        Ok(())
    }
}

impl RegisterBus for I2cDevice {
    fn read_registers(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), HalError> {
        self.write_all_checked(&[block_address(reg, buf.len())])?;

        let read = self.file.read(buf)?;
        if read != buf.len() {
            return Err(HalError::ShortTransfer {
                expected: buf.len(),
                actual: read,
            });
        }

        trace!("i2c 0x{:02X} read reg 0x{:02X} -> {:02X?}", self.address, reg, buf);
        Ok(())
    }

    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), HalError> {
        trace!("i2c 0x{:02X} write reg 0x{:02X} <- 0x{:02X}", self.address, reg, value);
        self.write_all_checked(&[reg, value])
    }
}
