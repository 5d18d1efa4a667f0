//! 命令分发
//!
//! 一行请求 → 按模块前缀路由 → 一行回复。请求之间不保留任何状态，
//! 所有错误都在这里转换为回复，不会向上传播。

use crate::error::CommandError;
use crate::reply::CommandReply;
use crate::{imu, pwm, sonar};
use parking_lot::Mutex;
use rover_devices::DutyCycleOutput;
use rover_driver::{OrientationSnapshot, RangingSnapshot, SnapshotStore};
use std::sync::Arc;
use tracing::{debug, warn};

/// 分发器可访问的模块
///
/// 未初始化（启动失败或被禁用）的模块为 `None`，相应命令回复不可用。
#[derive(Default)]
pub struct CommandContext {
    imu: Option<Arc<SnapshotStore<OrientationSnapshot>>>,
    sonar: Option<Arc<SnapshotStore<RangingSnapshot>>>,
    actuator: Option<Mutex<Box<dyn DutyCycleOutput>>>,
}

impl CommandContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_imu(mut self, store: Arc<SnapshotStore<OrientationSnapshot>>) -> Self {
        self.imu = Some(store);
        self
    }

    pub fn with_sonar(mut self, store: Arc<SnapshotStore<RangingSnapshot>>) -> Self {
        self.sonar = Some(store);
        self
    }

    pub fn with_actuator(self, actuator: impl DutyCycleOutput + 'static) -> Self {
        self.with_boxed_actuator(Box::new(actuator))
    }

    /// 同 [`with_actuator`](Self::with_actuator)，接受已装箱的执行器
    pub fn with_boxed_actuator(mut self, actuator: Box<dyn DutyCycleOutput>) -> Self {
        self.actuator = Some(Mutex::new(actuator));
        self
    }

    pub fn has_imu(&self) -> bool {
        self.imu.is_some()
    }

    pub fn has_sonar(&self) -> bool {
        self.sonar.is_some()
    }

    pub fn has_actuator(&self) -> bool {
        self.actuator.is_some()
    }
}

/// 命令分发器（可廉价克隆，共享同一个上下文）
#[derive(Clone)]
pub struct Dispatcher {
    ctx: Arc<CommandContext>,
}

impl Dispatcher {
    pub fn new(ctx: CommandContext) -> Self {
        Self { ctx: Arc::new(ctx) }
    }

    pub fn context(&self) -> &CommandContext {
        &self.ctx
    }

    /// 处理一行请求
    ///
    /// 模块前缀区分大小写，前缀后的空格被跳过；
    /// 无已知前缀时按旧版 PWM 语法解析整行。
    pub fn dispatch(&self, line: &str) -> CommandReply {
        let line = line.trim_end();
        debug!("Received: {:?}", line);

        if let Some(rest) = line.strip_prefix(imu::MODULE) {
            let result = imu::execute(self.ctx.imu.as_deref(), skip_spaces(rest));
            text_reply(imu::MODULE, result)
        } else if let Some(rest) = line.strip_prefix(sonar::MODULE) {
            let result = sonar::execute(self.ctx.sonar.as_deref(), skip_spaces(rest));
            text_reply(sonar::MODULE, result)
        } else if let Some(rest) = line.strip_prefix(pwm::MODULE) {
            status_reply(pwm::execute(self.ctx.actuator.as_ref(), skip_spaces(rest)))
        } else {
            status_reply(pwm::execute(self.ctx.actuator.as_ref(), line))
        }
    }
}

fn skip_spaces(s: &str) -> &str {
    s.trim_start_matches(' ')
}

/// 查询类命令：成功返回内容，失败返回 `ERROR: <原因>`
fn text_reply(module: &str, result: Result<String, CommandError>) -> CommandReply {
    match result {
        Ok(text) => CommandReply::success(text),
        Err(e) => {
            debug!("{} command failed: {}", module, e);
            CommandReply::failure(format!("ERROR: {}", e))
        },
    }
}

/// 执行类命令：`OK` / `ERROR`，失败原因只记录在日志中
fn status_reply(result: Result<(), CommandError>) -> CommandReply {
    match result {
        Ok(()) => CommandReply::success("OK"),
        Err(e) => {
            warn!("PWM command failed: {}", e);
            CommandReply::failure("ERROR")
        },
    }
}
