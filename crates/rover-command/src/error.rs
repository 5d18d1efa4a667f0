//! 命令层错误类型定义

use rover_devices::DeviceError;
use thiserror::Error;

/// 命令解析/执行错误
///
/// 模块前缀路由的回复直接使用 `ERROR: {err}` 作为文本，
/// 因此 Display 文本同时也是协议内容。
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,

    #[error("Missing value for {0}")]
    MissingFlagValue(&'static str),

    #[error("Invalid number '{0}'")]
    InvalidNumber(String),

    #[error("Duty cycle {0} out of range (0-100)")]
    DutyOutOfRange(f32),

    #[error("Invalid channel {0} (valid: 0-15)")]
    InvalidChannel(i64),

    #[error("Missing duty cycle value")]
    MissingDuty,

    #[error("Unknown {module} command '{command}'")]
    UnknownSubcommand {
        module: &'static str,
        command: String,
    },

    /// 模块未初始化（启动失败或被禁用）
    #[error("{0} not available")]
    ModuleUnavailable(&'static str),

    /// 模块在运行，但当前快照无效
    #[error("{0} data unavailable")]
    DataUnavailable(&'static str),

    #[error("Actuator failure: {0}")]
    Actuator(#[from] DeviceError),
}
