//! Wire protocol between the daemon and its clients.
//!
//! Every connection carries one JSON request and one JSON response. Requests
//! are externally tagged (`"list"`, `{"pause": 1}`, ...). Successful responses
//! are always `{"ok": {...}}`; failures are always a bare lowercase tag such
//! as `"timernotfound"`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::timer::{TimerId, TimerInfo};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    List,
    StartTimer {
        duration: Duration,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    #[serde(rename = "pause", alias = "pausetimer")]
    Pause(TimerId),
    #[serde(rename = "resume", alias = "resumetimer")]
    Resume(TimerId),
    #[serde(rename = "cancel", alias = "canceltimer")]
    Cancel(TimerId),
    Again,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::List => "list",
            Command::StartTimer { .. } => "starttimer",
            Command::Pause(_) => "pause",
            Command::Resume(_) => "resume",
            Command::Cancel(_) => "cancel",
            Command::Again => "again",
        }
    }
}

/// Success payloads. Variant order matters for decoding: the most specific
/// shape has to be tried first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    List { timers: Vec<TimerInfo> },
    /// `duration` is in milliseconds.
    Again { id: TimerId, duration: u64 },
    Started { id: TimerId },
    Empty {},
}

/// Failure tags. `TimerNotFound` is the not-found kind, `AlreadyPaused` and
/// `AlreadyRunning` are the two invalid-state kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    #[error("timer not found")]
    TimerNotFound,

    #[error("timer is already paused")]
    AlreadyPaused,

    #[error("timer is already running")]
    AlreadyRunning,

    #[error("no timer has been started yet")]
    NonePreviouslyStarted,

    #[error("malformed request")]
    Malformed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Ok { ok: Payload },
    Err(ErrorKind),
}

impl Response {
    pub fn ok(payload: Payload) -> Self {
        Self::Ok { ok: payload }
    }

    pub fn empty() -> Self {
        Self::ok(Payload::Empty {})
    }

    pub fn err(kind: ErrorKind) -> Self {
        Self::Err(kind)
    }

    pub fn into_result(self) -> Result<Payload, ErrorKind> {
        match self {
            Response::Ok { ok } => Ok(ok),
            Response::Err(kind) => Err(kind),
        }
    }
}

impl From<Result<Payload, ErrorKind>> for Response {
    fn from(result: Result<Payload, ErrorKind>) -> Self {
        match result {
            Ok(payload) => Response::ok(payload),
            Err(kind) => Response::err(kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::{TimerState, TimerInfo};
    use serde_json::json;

    #[test]
    fn test_unit_commands_are_bare_strings() {
        assert_eq!(serde_json::to_string(&Command::List).unwrap(), "\"list\"");
        assert_eq!(serde_json::to_string(&Command::Again).unwrap(), "\"again\"");

        let cmd: Command = serde_json::from_str("\"list\"").unwrap();
        assert_eq!(cmd, Command::List);
    }

    #[test]
    fn test_start_timer_decoding() {
        let cmd: Command = serde_json::from_value(json!({
            "starttimer": { "duration": { "secs": 600, "nanos": 0 }, "message": "Hello, world!" }
        }))
        .unwrap();

        assert_eq!(
            cmd,
            Command::StartTimer {
                duration: Duration::from_secs(600),
                message: Some("Hello, world!".to_string()),
            }
        );

        let cmd: Command = serde_json::from_value(json!({
            "starttimer": { "duration": { "secs": 60, "nanos": 0 } }
        }))
        .unwrap();
        assert_eq!(
            cmd,
            Command::StartTimer {
                duration: Duration::from_secs(60),
                message: None,
            }
        );
    }

    #[test]
    fn test_id_commands_accept_both_tag_generations() {
        let pause: Command = serde_json::from_value(json!({ "pause": 4 })).unwrap();
        assert_eq!(pause, Command::Pause(TimerId::new(4)));

        let pause: Command = serde_json::from_value(json!({ "pausetimer": 4 })).unwrap();
        assert_eq!(pause, Command::Pause(TimerId::new(4)));

        let cancel: Command = serde_json::from_value(json!({ "canceltimer": 2 })).unwrap();
        assert_eq!(cancel, Command::Cancel(TimerId::new(2)));

        assert_eq!(
            serde_json::to_value(Command::Resume(TimerId::new(9))).unwrap(),
            json!({ "resume": 9 })
        );
    }

    #[test]
    fn test_unknown_tags_are_rejected() {
        assert!(serde_json::from_str::<Command>("\"explode\"").is_err());
        assert!(serde_json::from_value::<Command>(json!({ "addTimer": { "duration": { "millis": 1 } } })).is_err());
        assert!(serde_json::from_value::<Command>(json!({ "pause": "one" })).is_err());
    }

    #[test]
    fn test_response_envelopes() {
        assert_eq!(
            serde_json::to_value(Response::ok(Payload::List { timers: vec![] })).unwrap(),
            json!({ "ok": { "timers": [] } })
        );
        assert_eq!(
            serde_json::to_value(Response::ok(Payload::Started { id: TimerId::new(1) })).unwrap(),
            json!({ "ok": { "id": 1 } })
        );
        assert_eq!(
            serde_json::to_value(Response::ok(Payload::Again {
                id: TimerId::new(2),
                duration: 1000
            }))
            .unwrap(),
            json!({ "ok": { "id": 2, "duration": 1000 } })
        );
        assert_eq!(serde_json::to_value(Response::empty()).unwrap(), json!({ "ok": {} }));
        assert_eq!(
            serde_json::to_value(Response::err(ErrorKind::NonePreviouslyStarted)).unwrap(),
            json!("nonepreviouslystarted")
        );
        assert_eq!(
            serde_json::to_value(Response::err(ErrorKind::TimerNotFound)).unwrap(),
            json!("timernotfound")
        );
    }

    #[test]
    fn test_response_decoding_picks_the_right_payload() {
        let resp: Response = serde_json::from_value(json!({ "ok": { "id": 2, "duration": 1000 } })).unwrap();
        assert_eq!(
            resp.into_result(),
            Ok(Payload::Again {
                id: TimerId::new(2),
                duration: 1000
            })
        );

        let resp: Response = serde_json::from_value(json!({ "ok": { "id": 7 } })).unwrap();
        assert_eq!(resp.into_result(), Ok(Payload::Started { id: TimerId::new(7) }));

        let resp: Response = serde_json::from_value(json!({ "ok": {} })).unwrap();
        assert_eq!(resp.into_result(), Ok(Payload::Empty {}));

        let resp: Response = serde_json::from_value(json!({
            "ok": { "timers": [{ "id": 1, "message": null, "state": "Running", "remaining": { "millis": 10 } }] }
        }))
        .unwrap();
        assert_eq!(
            resp.into_result(),
            Ok(Payload::List {
                timers: vec![TimerInfo {
                    id: TimerId::new(1),
                    message: None,
                    state: TimerState::Running,
                    remaining: Duration::from_millis(10).into(),
                }]
            })
        );

        let resp: Response = serde_json::from_value(json!("alreadypaused")).unwrap();
        assert_eq!(resp.into_result(), Err(ErrorKind::AlreadyPaused));
    }
}
