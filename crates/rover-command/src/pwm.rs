//! PWM 命令解析与执行
//!
//! 语法：`[-t <秒>] [-c <通道>] <占空比1> [<占空比2>]`
//!
//! - 第一个非标志 token 为占空比 1；紧随其后且不以 `-` 开头的 token 为占空比 2
//! - 读到占空比后停止解析，之后的 token 被忽略
//! - 无 `-c`：单值 → 通道 0；双值 → 通道 0 和 1
//! - 有 `-c`：只设置该通道（占空比 2 仍做范围检查，但不使用）
//! - `-t`：保持指定秒数后将所涉及的通道归零（同步阻塞）

use crate::error::CommandError;
use parking_lot::Mutex;
use rover_devices::{DutyCycleOutput, duty_to_count};
use std::time::Duration;
use tracing::{debug, info};

pub(crate) const MODULE: &str = "PWM";

/// 最大通道号
pub const MAX_CHANNEL: u8 = 15;

/// 单个通道的占空比设定
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DutyAssignment {
    pub channel: u8,
    /// 百分比（0 ~ 100）
    pub percent: f32,
}

/// 解析后的 PWM 命令
#[derive(Debug, Clone, PartialEq)]
pub struct PwmCommand {
    pub assignments: Vec<DutyAssignment>,
    /// 保持时间，结束后归零
    pub hold: Option<Duration>,
}

impl PwmCommand {
    pub fn parse(args: &str) -> Result<Self, CommandError> {
        let tokens: Vec<&str> = args.split_whitespace().collect();
        if tokens.is_empty() {
            return Err(CommandError::Empty);
        }

        let mut hold = None;
        let mut channel = None;
        let mut duties = None;

        let mut i = 0;
        while i < tokens.len() {
            match tokens[i] {
                "-t" => {
                    let value = tokens.get(i + 1).ok_or(CommandError::MissingFlagValue("-t"))?;
                    hold = parse_hold(value)?;
                    i += 2;
                },
                "-c" => {
                    let value = tokens.get(i + 1).ok_or(CommandError::MissingFlagValue("-c"))?;
                    channel = Some(parse_channel(value)?);
                    i += 2;
                },
                first => {
                    let duty1 = parse_duty(first)?;
                    let duty2 = match tokens.get(i + 1) {
                        Some(next) if !next.starts_with('-') => Some(parse_duty(next)?),
                        _ => None,
                    };
                    duties = Some((duty1, duty2));
                    break;
                },
            }
        }

        let (duty1, duty2) = duties.ok_or(CommandError::MissingDuty)?;

        let assignments = match (channel, duty2) {
            (Some(channel), _) => vec![DutyAssignment {
                channel,
                percent: duty1,
            }],
            (None, Some(duty2)) => vec![
                DutyAssignment {
                    channel: 0,
                    percent: duty1,
                },
                DutyAssignment {
                    channel: 1,
                    percent: duty2,
                },
            ],
            (None, None) => vec![DutyAssignment {
                channel: 0,
                percent: duty1,
            }],
        };

        Ok(Self { assignments, hold })
    }
}

fn parse_duty(token: &str) -> Result<f32, CommandError> {
    let value: f32 = token
        .parse()
        .map_err(|_| CommandError::InvalidNumber(token.to_string()))?;
    if !value.is_finite() {
        return Err(CommandError::InvalidNumber(token.to_string()));
    }
    if !(0.0..=100.0).contains(&value) {
        return Err(CommandError::DutyOutOfRange(value));
    }
    Ok(value)
}

fn parse_channel(token: &str) -> Result<u8, CommandError> {
    let value: i64 = token
        .parse()
        .map_err(|_| CommandError::InvalidNumber(token.to_string()))?;
    if !(0..=MAX_CHANNEL as i64).contains(&value) {
        return Err(CommandError::InvalidChannel(value));
    }
    Ok(value as u8)
}

/// 保持时间（秒，可为小数）；0 表示不保持
fn parse_hold(token: &str) -> Result<Option<Duration>, CommandError> {
    let secs: f64 = token
        .parse()
        .map_err(|_| CommandError::InvalidNumber(token.to_string()))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(CommandError::InvalidNumber(token.to_string()));
    }
    Ok((secs > 0.0).then(|| Duration::from_secs_f64(secs)))
}

/// 执行 PWM 命令
///
/// 保持期间调用线程被阻塞（接受循环在此期间不处理新连接）；
/// 执行器锁在睡眠期间释放。
pub(crate) fn execute(
    actuator: Option<&Mutex<Box<dyn DutyCycleOutput>>>,
    args: &str,
) -> Result<(), CommandError> {
    let command = PwmCommand::parse(args)?;
    let actuator = actuator.ok_or(CommandError::ModuleUnavailable(MODULE))?;

    {
        let mut out = actuator.lock();
        for a in &command.assignments {
            let count = duty_to_count(a.percent);
            debug!("Setting Ch{}={:.1}% (count {})", a.channel, a.percent, count);
            out.set_duty(a.channel, count)?;
        }
    }

    if let Some(hold) = command.hold {
        info!("Holding PWM for {:?}", hold);
        std::thread::sleep(hold);

        let mut out = actuator.lock();
        for a in &command.assignments {
            out.set_duty(a.channel, 0)?;
        }
        info!("PWM hold finished, outputs reset");
    }

    Ok(())
}
