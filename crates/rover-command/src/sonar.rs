//! SONAR 子命令
//!
//! `read` 在快照无效时仍然成功返回（`"valid":false`），由客户端判断有效性。

use crate::error::CommandError;
use crate::format::fixed;
use rover_driver::{RangingSnapshot, Snapshot, SnapshotStore};

pub(crate) const MODULE: &str = "SONAR";

pub(crate) fn execute(
    store: Option<&SnapshotStore<RangingSnapshot>>,
    command: &str,
) -> Result<String, CommandError> {
    let store = store.ok_or(CommandError::ModuleUnavailable(MODULE))?;

    match command {
        "read" | "get" | "" => {
            let s = store.read();
            Ok(if s.is_valid() {
                format!(
                    r#"{{"distance":{},"status":"{}","valid":true}}"#,
                    fixed(s.distance_cm, 2),
                    s.status
                )
            } else {
                r#"{"distance":null,"status":"ERROR","valid":false}"#.to_string()
            })
        },
        "distance" => {
            let s = store.read();
            Ok(if s.is_valid() {
                format!("{} cm", fixed(s.distance_cm, 2))
            } else {
                "ERROR".to_string()
            })
        },
        "status" => Ok(store.read().status.to_string()),
        _ => Err(CommandError::UnknownSubcommand {
            module: MODULE,
            command: command.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_reading() {
        let store = SnapshotStore::new();
        store.publish(RangingSnapshot::valid(42.123));
        assert_eq!(
            execute(Some(&store), "read").unwrap(),
            r#"{"distance":42.12,"status":"MEDIUM","valid":true}"#
        );
        assert_eq!(execute(Some(&store), "distance").unwrap(), "42.12 cm");
        assert_eq!(execute(Some(&store), "status").unwrap(), "MEDIUM");
    }

    #[test]
    fn test_invalid_reading() {
        let store = SnapshotStore::<RangingSnapshot>::new();
        assert_eq!(
            execute(Some(&store), "").unwrap(),
            r#"{"distance":null,"status":"ERROR","valid":false}"#
        );
        assert_eq!(execute(Some(&store), "distance").unwrap(), "ERROR");
        assert_eq!(execute(Some(&store), "status").unwrap(), "ERROR");
    }

    #[test]
    fn test_unknown_and_unavailable() {
        let store = SnapshotStore::<RangingSnapshot>::new();
        let err = execute(Some(&store), "ping").unwrap_err();
        assert_eq!(err.to_string(), "Unknown SONAR command 'ping'");
        assert!(matches!(
            execute(None, "read"),
            Err(CommandError::ModuleUnavailable("SONAR"))
        ));
    }
}
