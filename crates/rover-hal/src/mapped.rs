//! /dev/mem 映射的 BCM283x GPIO 寄存器块

use crate::gpio::{check_pin, pin_mask};
use crate::{GpioBank, HalError, Level, PinMode};
use std::fs::OpenOptions;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::ptr::NonNull;
use tracing::{debug, info};

/// GPIO 寄存器块相对外设基地址的偏移
pub const GPIO_BASE_OFFSET: u64 = 0x20_0000;

/// 映射长度（一页）
const BLOCK_SIZE: usize = 4 * 1024;

// 寄存器字偏移（32 位字）
const GPSET0: usize = 7;
const GPCLR0: usize = 10;
const GPLEV0: usize = 13;

const DEV_MEM: &str = "/dev/mem";

/// 内存映射 GPIO
///
/// 所有访问都是 volatile 读写。映射在 Drop 时解除，
/// 调用者必须先停止使用该句柄的采集线程。
pub struct MappedGpio {
    base: NonNull<u32>,
}

// SAFETY: 映射区域由本结构独占；同一时刻只有持有者线程访问
unsafe impl Send for MappedGpio {}

impl MappedGpio {
    /// 映射 GPIO 寄存器块
    ///
    /// # 参数
    /// - `peripheral_base`: 外设物理基地址（Pi Zero 2W / Pi 3: `0x3F00_0000`）
    ///
    /// # 错误
    /// - `HalError::PermissionDenied`: 打开 /dev/mem 需要 root
    /// - `HalError::Map`: mmap 失败
    pub fn open(peripheral_base: u64) -> Result<Self, HalError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(DEV_MEM)
            .map_err(|e| HalError::from_open(DEV_MEM, e))?;

        let offset = peripheral_base + GPIO_BASE_OFFSET;

        // SAFETY: 映射一个新的共享区域，参数均为有效值；失败时返回 MAP_FAILED
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                BLOCK_SIZE,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                offset as libc::off_t,
            )
        };

        // 映射建立后文件描述符可以关闭
        drop(file);

        if ptr == libc::MAP_FAILED {
            return Err(HalError::Map(std::io::Error::last_os_error()));
        }

        let base = NonNull::new(ptr as *mut u32)
            .ok_or_else(|| HalError::Map(std::io::Error::other("mmap returned null")))?;

        info!("Mapped GPIO registers at 0x{:08X}", offset);
        Ok(Self { base })
    }

    fn load(&self, word: usize) -> u32 {
        // SAFETY: word 总是小于 BLOCK_SIZE / 4
        unsafe { std::ptr::read_volatile(self.base.as_ptr().add(word)) }
    }

    fn store(&self, word: usize, value: u32) {
        // SAFETY: 同上
        unsafe { std::ptr::write_volatile(self.base.as_ptr().add(word), value) }
    }
}

impl GpioBank for MappedGpio {
    fn configure(&mut self, pin: u8, mode: PinMode) -> Result<(), HalError> {
        check_pin(pin)?;

        // GPFSELn：每个引脚 3 位，每个寄存器 10 个引脚
        let word = (pin / 10) as usize;
        let shift = (pin % 10) as u32 * 3;

        let mut value = self.load(word) & !(0b111 << shift);
        if mode == PinMode::Output {
            value |= 0b001 << shift;
        }
        self.store(word, value);

        debug!("GPIO{} configured as {:?}", pin, mode);
        Ok(())
    }

    fn write(&mut self, pin: u8, level: Level) {
        let word = match level {
            Level::High => GPSET0,
            Level::Low => GPCLR0,
        };
        self.store(word, pin_mask(pin));
    }

    fn read(&self, pin: u8) -> Level {
        Level::from(self.load(GPLEV0) & pin_mask(pin) != 0)
    }
}

impl Drop for MappedGpio {
    fn drop(&mut self) {
        // SAFETY: base 来自 open() 中成功的 mmap，长度一致
        unsafe {
            libc::munmap(self.base.as_ptr() as *mut libc::c_void, BLOCK_SIZE);
        }
        debug!("Unmapped GPIO registers");
    }
}
