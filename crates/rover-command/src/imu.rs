//! IMU 子命令
//!
//! | 子命令 | 回复 |
//! |---|---|
//! | `read` / `get` / 空 | `{"accel":[..],"gyro":[..],"mag":[..],"temp":t,"roll":r,"pitch":p,"yaw":y}` |
//! | `raw` | `Accel: x y z \| Gyro: x y z \| Mag: x y z \| Temp: t°C` |
//! | `orientation` | `Roll: r° \| Pitch: p° \| Yaw: y°` |

use crate::error::CommandError;
use crate::format::{fixed, triple};
use rover_driver::{OrientationSnapshot, Snapshot, SnapshotStore};

pub(crate) const MODULE: &str = "IMU";

pub(crate) fn execute(
    store: Option<&SnapshotStore<OrientationSnapshot>>,
    command: &str,
) -> Result<String, CommandError> {
    let store = store.ok_or(CommandError::ModuleUnavailable(MODULE))?;

    let render: fn(&OrientationSnapshot) -> String = match command {
        "read" | "get" | "" => render_json,
        "raw" => render_raw,
        "orientation" => render_orientation,
        _ => {
            return Err(CommandError::UnknownSubcommand {
                module: MODULE,
                command: command.to_string(),
            });
        },
    };

    let snapshot = store.read();
    if !snapshot.is_valid() {
        return Err(CommandError::DataUnavailable(MODULE));
    }
    Ok(render(&snapshot))
}

fn render_json(s: &OrientationSnapshot) -> String {
    format!(
        r#"{{"accel":[{}],"gyro":[{}],"mag":[{}],"temp":{},"roll":{},"pitch":{},"yaw":{}}}"#,
        triple(&s.accel, 3, ","),
        triple(&s.gyro, 3, ","),
        triple(&s.mag, 3, ","),
        fixed(s.temperature_c, 1),
        fixed(s.roll_deg, 1),
        fixed(s.pitch_deg, 1),
        fixed(s.yaw_deg, 1),
    )
}

fn render_raw(s: &OrientationSnapshot) -> String {
    format!(
        "Accel: {} | Gyro: {} | Mag: {} | Temp: {}°C",
        triple(&s.accel, 3, " "),
        triple(&s.gyro, 3, " "),
        triple(&s.mag, 3, " "),
        fixed(s.temperature_c, 1),
    )
}

fn render_orientation(s: &OrientationSnapshot) -> String {
    format!(
        "Roll: {}° | Pitch: {}° | Yaw: {}°",
        fixed(s.roll_deg, 1),
        fixed(s.pitch_deg, 1),
        fixed(s.yaw_deg, 1),
    )
}
