//! 守护进程配置
//!
//! TOML 文件，所有字段都有默认值；命令行参数覆盖文件中的值。
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0"
//! port = 5000
//!
//! [imu]
//! enabled = true
//! i2c_bus = "/dev/i2c-1"
//! accel_range = "2g"
//!
//! [sonar]
//! max_range_cm = 400.0
//! enforce_min_range = false
//!
//! [pwm]
//! frequency_hz = 50.0
//!
//! [log]
//! directory = "/var/log/rover"
//! ```

use rover_driver::{ImuConfig, RangingConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub server: ServerConfig,
    pub imu: ImuSection,
    pub sonar: SonarSection,
    pub pwm: PwmSection,
    pub log: LogConfig,
}

impl DaemonConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// 单个连接的读超时（ms）
    pub read_timeout_ms: u64,
    /// 无连接时接受循环的休眠间隔（ms）
    pub idle_sleep_ms: u64,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn idle_sleep(&self) -> Duration {
        Duration::from_millis(self.idle_sleep_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 5000,
            read_timeout_ms: 5000,
            idle_sleep_ms: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImuSection {
    pub enabled: bool,
    #[serde(flatten)]
    pub settings: ImuConfig,
}

impl Default for ImuSection {
    fn default() -> Self {
        Self {
            enabled: true,
            settings: ImuConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SonarSection {
    pub enabled: bool,
    #[serde(flatten)]
    pub settings: RangingConfig,
}

impl Default for SonarSection {
    fn default() -> Self {
        Self {
            enabled: true,
            settings: RangingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PwmSection {
    pub enabled: bool,
    pub i2c_bus: String,
    pub address: u8,
    pub frequency_hz: f32,
}

impl Default for PwmSection {
    fn default() -> Self {
        Self {
            enabled: true,
            i2c_bus: "/dev/i2c-1".to_string(),
            address: rover_devices::pca9685::DEFAULT_ADDRESS,
            frequency_hz: rover_devices::pca9685::DEFAULT_FREQUENCY_HZ,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// 日志过滤规则（`RUST_LOG` 优先）
    pub filter: Option<String>,
    /// 日志文件目录（每日轮转）；不设置则只输出到 stderr
    pub directory: Option<PathBuf>,
}
