//! 传感器/执行器网络服务主入口
//!
//! 初始化 IMU、超声波测距和 PWM 控制器（失败的模块降级为不可用），
//! 启动后台采集线程，然后在 TCP 端口上逐连接处理单行命令。

mod bringup;
mod config;
mod server;

use anyhow::Context;
use clap::Parser;
use config::DaemonConfig;
use server::Server;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_LOG_FILTER: &str =
    "rover_daemon=info,rover_driver=info,rover_command=info,rover_devices=info";

/// 机器人传感器/执行器守护进程
///
/// 通过 TCP 行协议提供 IMU 姿态、超声波测距和 PWM 占空比控制
#[derive(Parser, Debug)]
#[command(name = "rover_daemon")]
#[command(about = "Rover daemon - sensor queries and PWM control over a TCP line protocol", long_about = None)]
struct Args {
    /// TOML 配置文件（不指定则使用内置默认值）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 监听地址（覆盖配置文件）
    #[arg(long)]
    bind: Option<String>,

    /// 监听端口（覆盖配置文件）
    ///
    /// 默认: 5000
    #[arg(short, long)]
    port: Option<u16>,

    /// 禁用 IMU
    #[arg(long)]
    no_imu: bool,

    /// 禁用超声波测距
    #[arg(long)]
    no_sonar: bool,

    /// 禁用 PWM 控制器
    #[arg(long)]
    no_pwm: bool,
}

impl Args {
    fn into_config(self) -> anyhow::Result<DaemonConfig> {
        let mut config = match &self.config {
            Some(path) => DaemonConfig::load(path)?,
            None => DaemonConfig::default(),
        };

        if let Some(bind) = self.bind {
            config.server.bind = bind;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if self.no_imu {
            config.imu.enabled = false;
        }
        if self.no_sonar {
            config.sonar.enabled = false;
        }
        if self.no_pwm {
            config.pwm.enabled = false;
        }
        Ok(config)
    }
}

/// 初始化日志：stderr + 可选的每日轮转文件
///
/// 返回的 guard 必须存活到进程退出，否则文件日志会丢失尾部记录。
fn init_logging(config: &config::LogConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(env) if !env.is_empty() => EnvFilter::try_new(env),
        _ => EnvFilter::try_new(config.filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)),
    }
    .context("invalid log filter")?;

    let (file_layer, guard) = match &config.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "rover_daemon.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        },
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .context("installing tracing subscriber")?;

    Ok(guard)
}

fn main() -> anyhow::Result<()> {
    let config = Args::parse().into_config()?;
    let _log_guard = init_logging(&config.log)?;

    info!("Rover daemon starting (v{})", env!("CARGO_PKG_VERSION"));

    // SIGINT 与 SIGTERM（ctrlc `termination` feature）都只清除运行标志，
    // 由接受循环退出后执行有序关闭
    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            running.store(false, Ordering::Release);
        })
        .context("installing signal handler")?;
    }

    let mut controller = bringup::bring_up(&config);
    let started = controller.start_all();
    info!("{} acquisition task(s) running", started);

    let server = Server::bind(
        config.server.address(),
        config.server.read_timeout(),
        config.server.idle_sleep(),
    )
    .with_context(|| format!("binding {}", config.server.address()))?;

    let result = server.run(&controller.dispatcher(), &running);

    info!("Shutting down...");
    for task in controller.status() {
        if task.metrics.cycles_failed > 0 {
            warn!(
                "{}: {} of {} cycles failed",
                task.name, task.metrics.cycles_failed, task.metrics.cycles_total
            );
        }
    }
    controller.shutdown();

    let stats = server.stats();
    info!(
        "Served {} connection(s), {} error repl(ies), {} I/O error(s)",
        stats.connections.load(Ordering::Relaxed),
        stats.failed_replies.load(Ordering::Relaxed),
        stats.io_errors.load(Ordering::Relaxed)
    );

    result.context("accept loop failed")
}
