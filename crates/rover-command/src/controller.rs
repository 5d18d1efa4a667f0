//! 控制器上下文
//!
//! 持有所有采集任务与分发上下文，负责启动与关闭顺序：
//! 先停止所有采集线程（阻塞到当前周期结束），再释放传感器与执行器句柄。

use crate::dispatcher::{CommandContext, Dispatcher};
use rover_driver::{DriverError, Poller, PollerMetricsSnapshot, Sensor};
use tracing::{info, warn};

/// 后台采集任务（类型擦除的 Poller）
pub trait AcquisitionTask: Send {
    fn name(&self) -> &'static str;

    fn start(&mut self) -> Result<(), DriverError>;

    /// 停止并等待线程退出；未运行时为空操作
    fn stop(&mut self);

    fn is_running(&self) -> bool;

    fn metrics(&self) -> PollerMetricsSnapshot;
}

impl<S: Sensor> AcquisitionTask for Poller<S> {
    fn name(&self) -> &'static str {
        Poller::name(self)
    }

    fn start(&mut self) -> Result<(), DriverError> {
        Poller::start(self)
    }

    fn stop(&mut self) {
        Poller::stop(self)
    }

    fn is_running(&self) -> bool {
        Poller::is_running(self)
    }

    fn metrics(&self) -> PollerMetricsSnapshot {
        Poller::metrics(self)
    }
}

/// 单个任务的运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskStatus {
    pub name: &'static str,
    pub running: bool,
    pub metrics: PollerMetricsSnapshot,
}

/// 控制器
pub struct RoverController {
    tasks: Vec<Box<dyn AcquisitionTask>>,
    dispatcher: Dispatcher,
}

impl RoverController {
    pub fn new(context: CommandContext) -> Self {
        Self {
            tasks: Vec::new(),
            dispatcher: Dispatcher::new(context),
        }
    }

    /// 注册采集任务（不启动）
    pub fn add_task(&mut self, task: Box<dyn AcquisitionTask>) {
        self.tasks.push(task);
    }

    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }

    /// 启动所有任务，返回成功启动的数量
    ///
    /// 单个任务启动失败只记录日志，不影响其他任务。
    pub fn start_all(&mut self) -> usize {
        let mut started = 0;
        for task in &mut self.tasks {
            match task.start() {
                Ok(()) => started += 1,
                Err(e) => warn!("Failed to start {} task: {}", task.name(), e),
            }
        }
        started
    }

    pub fn status(&self) -> Vec<TaskStatus> {
        self.tasks
            .iter()
            .map(|t| TaskStatus {
                name: t.name(),
                running: t.is_running(),
                metrics: t.metrics(),
            })
            .collect()
    }

    /// 停止所有任务并释放传感器句柄
    ///
    /// 可重复调用。执行器在控制器（及所有分发器克隆）被丢弃时释放。
    pub fn shutdown(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        for task in &mut self.tasks {
            task.stop();
            let m = task.metrics();
            info!(
                "{} task stopped: {} cycles, {} failed, {} overruns",
                task.name(),
                m.cycles_total,
                m.cycles_failed,
                m.overruns
            );
        }
        self.tasks.clear();
    }
}

impl Drop for RoverController {
    fn drop(&mut self) {
        self.shutdown();
    }
}
