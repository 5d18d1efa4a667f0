//! # Rover HAL
//!
//! 寄存器/内存访问层，提供统一的硬件访问抽象：
//!
//! - **寄存器总线** ([`RegisterBus`]): 字节级寄存器读写（I2C 设备）
//! - **GPIO 寄存器块** ([`GpioBank`]): 内存映射 GPIO 的电平读写与方向配置
//! - **时钟** ([`Clock`]): 单调微秒时钟与微秒级延迟
//!
//! 本层不做任何缓冲、缓存或重试：每次调用都是一次真实的总线事务，
//! 失败与否由调用者（Poller 或初始化代码）决定如何处理。

mod bus;
mod clock;
mod error;
mod gpio;

#[cfg(target_os = "linux")]
mod i2c;
#[cfg(target_os = "linux")]
mod mapped;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use bus::{AUTO_INCREMENT, RegisterBus};
pub use clock::{Clock, MonotonicClock};
pub use error::HalError;
pub use gpio::{GpioBank, Level, MAX_PIN, PinMode};

#[cfg(target_os = "linux")]
pub use i2c::I2cDevice;
#[cfg(target_os = "linux")]
pub use mapped::{GPIO_BASE_OFFSET, MappedGpio};
