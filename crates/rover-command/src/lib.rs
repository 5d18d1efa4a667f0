//! # Rover Command
//!
//! 行协议命令层：
//!
//! - [`Dispatcher`]: 解析一行请求，按前缀（`IMU` / `SONAR` / `PWM`）路由，生成有界回复
//! - [`RoverController`]: 持有采集任务与分发上下文，管理启动/关闭顺序
//!
//! 分发器只读取快照、转发执行器命令，从不直接访问寄存器。

mod controller;
mod dispatcher;
mod error;
mod format;
mod imu;
pub mod pwm;
mod reply;
mod sonar;

pub use controller::{AcquisitionTask, RoverController, TaskStatus};
pub use dispatcher::{CommandContext, Dispatcher};
pub use error::CommandError;
pub use pwm::{DutyAssignment, PwmCommand};
pub use reply::{CommandReply, MAX_RESPONSE_LEN};
