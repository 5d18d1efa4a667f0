//! Mock 硬件后端
//!
//! 用于测试的模拟寄存器总线、GPIO 寄存器块和虚拟时钟。
//! 所有 mock 都是 `Clone` 的共享句柄：测试代码保留一份，被测对象持有另一份。

use crate::bus::AUTO_INCREMENT;
use crate::gpio::check_pin;
use crate::{Clock, GpioBank, HalError, Level, MAX_PIN, PinMode, RegisterBus};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

// ============================================================
// 虚拟时钟
// ============================================================

/// 虚拟时钟：`delay_us` 直接推进时间，不真正睡眠
#[derive(Debug, Clone, Default)]
pub struct FakeClock {
    now_us: Arc<AtomicU64>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// 手动推进时间
    pub fn advance(&self, us: u64) {
        self.now_us.fetch_add(us, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now_us(&self) -> u64 {
        self.now_us.load(Ordering::SeqCst)
    }

    fn delay_us(&self, us: u64) {
        self.advance(us);
    }
}

// ============================================================
// 模拟寄存器总线
// ============================================================

#[derive(Debug)]
struct MockBusState {
    registers: [u8; 256],
    writes: Vec<(u8, u8)>,
    transactions: usize,
    fail: bool,
}

/// 模拟寄存器总线
///
/// 维护 256 字节寄存器文件，记录所有写操作，可注入总线故障。
/// 块读取时剥离自增标志位并从起始寄存器连续读取。
#[derive(Debug, Clone)]
pub struct MockRegisterBus {
    inner: Arc<Mutex<MockBusState>>,
}

impl MockRegisterBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockBusState {
                registers: [0; 256],
                writes: Vec::new(),
                transactions: 0,
                fail: false,
            })),
        }
    }

    /// 设置单个寄存器值（模拟设备侧数据）
    pub fn set_register(&self, reg: u8, value: u8) {
        self.inner.lock().registers[reg as usize] = value;
    }

    /// 从 `start` 开始设置连续寄存器
    pub fn set_registers(&self, start: u8, values: &[u8]) {
        let mut state = self.inner.lock();
        for (i, value) in values.iter().enumerate() {
            state.registers[(start as usize + i) & 0xFF] = *value;
        }
    }

    /// 读取寄存器当前值（不计入事务）
    pub fn register(&self, reg: u8) -> u8 {
        self.inner.lock().registers[reg as usize]
    }

    /// 所有写操作 `(reg, value)`，按时间顺序
    pub fn writes(&self) -> Vec<(u8, u8)> {
        self.inner.lock().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.inner.lock().writes.clear();
    }

    /// 已执行的事务数（读 + 写）
    pub fn transactions(&self) -> usize {
        self.inner.lock().transactions
    }

    /// 注入总线故障：之后的所有事务返回 IO 错误
    pub fn set_fail(&self, fail: bool) {
        self.inner.lock().fail = fail;
    }
}

impl Default for MockRegisterBus {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterBus for MockRegisterBus {
    fn read_registers(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), HalError> {
        let mut state = self.inner.lock();
        if state.fail {
            return Err(HalError::Io(std::io::Error::other("mock bus failure")));
        }
        state.transactions += 1;

        let start = if buf.len() > 1 {
            (reg & !AUTO_INCREMENT) as usize
        } else {
            reg as usize
        };
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = state.registers[(start + i) & 0xFF];
        }
        Ok(())
    }

    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), HalError> {
        let mut state = self.inner.lock();
        if state.fail {
            return Err(HalError::Io(std::io::Error::other("mock bus failure")));
        }
        state.transactions += 1;
        state.registers[reg as usize] = value;
        state.writes.push((reg, value));
        Ok(())
    }
}

// ============================================================
// 模拟 GPIO
// ============================================================

/// 回波引脚的脚本化行为（相对触发脉冲下降沿）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoProfile {
    /// 下降沿后 `rise_after_us` 微秒变高，持续 `high_for_us` 微秒
    Pulse { rise_after_us: u64, high_for_us: u64 },
    /// 永不变高（无回波）
    Silent,
    /// 变高后永不变低
    Stuck { rise_after_us: u64 },
}

#[derive(Debug, Clone)]
struct EchoScript {
    trigger_pin: u8,
    echo_pin: u8,
    clock: FakeClock,
    profile: EchoProfile,
    trigger_fell_at: Option<u64>,
}

impl EchoScript {
    fn level_at(&self, now: u64) -> Level {
        let Some(t0) = self.trigger_fell_at else {
            return Level::Low;
        };
        let elapsed = now.saturating_sub(t0);
        match self.profile {
            EchoProfile::Pulse {
                rise_after_us,
                high_for_us,
            } => Level::from(elapsed >= rise_after_us && elapsed < rise_after_us + high_for_us),
            EchoProfile::Silent => Level::Low,
            EchoProfile::Stuck { rise_after_us } => Level::from(elapsed >= rise_after_us),
        }
    }
}

#[derive(Debug)]
struct MockGpioState {
    levels: [Level; MAX_PIN as usize],
    modes: [Option<PinMode>; MAX_PIN as usize],
    writes: Vec<(u8, Level)>,
    echo: Option<EchoScript>,
}

/// 模拟 GPIO 寄存器块
///
/// 记录引脚方向、电平与写入历史；可为测距传感器挂载回波脚本。
#[derive(Debug, Clone)]
pub struct MockGpio {
    inner: Arc<Mutex<MockGpioState>>,
}

impl MockGpio {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockGpioState {
                levels: [Level::Low; MAX_PIN as usize],
                modes: [None; MAX_PIN as usize],
                writes: Vec::new(),
                echo: None,
            })),
        }
    }

    /// 挂载回波脚本：`trigger_pin` 的下降沿启动 `echo_pin` 的脉冲时序
    pub fn with_echo(
        self,
        trigger_pin: u8,
        echo_pin: u8,
        clock: FakeClock,
        profile: EchoProfile,
    ) -> Self {
        self.inner.lock().echo = Some(EchoScript {
            trigger_pin,
            echo_pin,
            clock,
            profile,
            trigger_fell_at: None,
        });
        self
    }

    /// 替换回波行为（保留已挂载的引脚与时钟）
    pub fn set_echo_profile(&self, profile: EchoProfile) {
        if let Some(script) = self.inner.lock().echo.as_mut() {
            script.profile = profile;
            script.trigger_fell_at = None;
        }
    }

    /// 直接设置输入引脚电平
    pub fn set_level(&self, pin: u8, level: Level) {
        self.inner.lock().levels[pin as usize] = level;
    }

    /// 引脚当前电平（不经过回波脚本）
    pub fn level(&self, pin: u8) -> Level {
        self.inner.lock().levels[pin as usize]
    }

    pub fn mode(&self, pin: u8) -> Option<PinMode> {
        self.inner.lock().modes[pin as usize]
    }

    /// 所有写操作 `(pin, level)`，按时间顺序
    pub fn writes(&self) -> Vec<(u8, Level)> {
        self.inner.lock().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.inner.lock().writes.clear();
    }
}

impl Default for MockGpio {
    fn default() -> Self {
        Self::new()
    }
}

impl GpioBank for MockGpio {
    fn configure(&mut self, pin: u8, mode: PinMode) -> Result<(), HalError> {
        check_pin(pin)?;
        self.inner.lock().modes[pin as usize] = Some(mode);
        Ok(())
    }

    fn write(&mut self, pin: u8, level: Level) {
        if pin >= MAX_PIN {
            return;
        }
        let mut state = self.inner.lock();
        let previous = state.levels[pin as usize];
        state.levels[pin as usize] = level;
        state.writes.push((pin, level));

        if let Some(script) = state.echo.as_mut()
            && script.trigger_pin == pin
            && previous == Level::High
            && level == Level::Low
        {
            script.trigger_fell_at = Some(script.clock.now_us());
        }
    }

    fn read(&self, pin: u8) -> Level {
        if pin >= MAX_PIN {
            return Level::Low;
        }
        let state = self.inner.lock();
        match state.echo.as_ref() {
            Some(script) if script.echo_pin == pin => script.level_at(script.clock.now_us()),
            _ => state.levels[pin as usize],
        }
    }
}
