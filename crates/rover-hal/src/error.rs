//! HAL 层错误类型定义

use thiserror::Error;

/// 寄存器/内存访问层统一错误类型
#[derive(Error, Debug)]
pub enum HalError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    /// 打开设备节点失败（总线不存在、地址绑定失败等）
    #[error("Failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 权限不足（访问 /dev/mem 需要 root）
    #[error("Permission denied opening {path} (need root)")]
    PermissionDenied { path: String },

    /// 读写字节数不足
    #[error("Short transfer: expected {expected} bytes, got {actual}")]
    ShortTransfer { expected: usize, actual: usize },

    /// 寄存器块映射失败
    #[error("Failed to map register block: {0}")]
    Map(std::io::Error),

    /// GPIO 引脚超出寄存器块可寻址范围
    #[error("Invalid GPIO pin: {0}")]
    InvalidPin(u8),
}

impl HalError {
    /// 将打开设备时的 IO 错误分类为 `PermissionDenied` 或 `Open`
    pub fn from_open(path: impl Into<String>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            Self::PermissionDenied { path }
        } else {
            Self::Open { path, source }
        }
    }
}
