use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error};

use crate::error::LinkError;

/// Default address of the servo bridge access point.
pub const DEFAULT_HOST: &str = "192.168.4.1";

/// Default timeout for one remote call.
pub const DEFAULT_LINK_TIMEOUT: Duration = Duration::from_millis(3000);

/// `t` value for relative selection.
pub const COMMAND_TYPE_SELECT: i32 = 0;
/// `t` value for absolute actions on the selected actuator.
pub const COMMAND_TYPE_ACTION: i32 = 1;

/// Relative selection step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Next,
    Previous,
}

impl Direction {
    /// Wire value: `+1` or `-1`.
    pub fn step(self) -> i32 {
        match self {
            Self::Next => 1,
            Self::Previous => -1,
        }
    }
}

/// Absolute actions applied to the currently selected actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ActionCode {
    MoveMiddle = 1,
    Stop = 2,
    TorqueOff = 3,
    TorqueOn = 4,
    MoveMax = 5,
    MoveMin = 6,
    SpeedUp = 7,
    SpeedDown = 8,
    SetMiddle = 11,
    ModeServo = 12,
    ModeMotor = 13,
}

impl ActionCode {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// One request to the remote endpoint: the `{t, i, a, b}` tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RemoteCommand {
    #[serde(rename = "t")]
    pub kind: i32,
    #[serde(rename = "i")]
    pub id: i32,
    pub a: i32,
    pub b: i32,
}

impl RemoteCommand {
    /// Step the remote selection one actuator in `direction`.
    pub fn select(direction: Direction) -> Self {
        Self {
            kind: COMMAND_TYPE_SELECT,
            id: direction.step(),
            a: 0,
            b: 0,
        }
    }

    /// Apply `action` to the selected actuator.
    pub fn action(action: ActionCode) -> Self {
        Self {
            kind: COMMAND_TYPE_ACTION,
            id: action.code(),
            a: 0,
            b: 0,
        }
    }

    /// `t=..&i=..&a=..&b=..`
    pub fn query(&self) -> String {
        format!("t={}&i={}&a={}&b={}", self.kind, self.id, self.a, self.b)
    }
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.query())
    }
}

/// Transport for remote commands.
///
/// Implementations are synchronous, bounded by their own timeout and keep no
/// selection state; tracking which actuator is selected is the
/// multiplexer's job.
pub trait RemoteLink: Send + Sync {
    fn send(&self, command: RemoteCommand) -> Result<(), LinkError>;
}

impl<L: RemoteLink + ?Sized> RemoteLink for std::sync::Arc<L> {
    fn send(&self, command: RemoteCommand) -> Result<(), LinkError> {
        (**self).send(command)
    }
}

impl<L: RemoteLink + ?Sized> RemoteLink for &L {
    fn send(&self, command: RemoteCommand) -> Result<(), LinkError> {
        (**self).send(command)
    }
}

/// HTTP endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Host or `host:port`, optionally prefixed with `http://`.
    pub host: String,
    /// Per-request timeout. Default: 3s.
    pub timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            timeout: DEFAULT_LINK_TIMEOUT,
        }
    }
}

impl LinkConfig {
    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> String {
        let host = self.host.trim().trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("http://{host}")
        }
    }
}

/// Remote link over HTTP GET requests.
pub struct HttpLink {
    agent: ureq::Agent,
    config: LinkConfig,
    base_url: String,
}

impl HttpLink {
    pub fn new(config: LinkConfig) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(config.timeout).build();
        let base_url = config.base_url();
        Self {
            agent,
            config,
            base_url,
        }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// URL a command is sent to.
    pub fn command_url(&self, command: &RemoteCommand) -> String {
        format!("{}/cmd?{}", self.base_url, command.query())
    }

    /// Raw status report from `/readSTS`.
    pub fn read_status(&self) -> Result<String, LinkError> {
        self.get_text("/readSTS")
    }

    /// Raw actuator id listing from `/readID`.
    pub fn read_id_list(&self) -> Result<String, LinkError> {
        self.get_text("/readID")
    }

    fn get_text(&self, path: &str) -> Result<String, LinkError> {
        let url = format!("{}{path}", self.base_url);
        let response = self.get(&url)?;
        let body = response.into_string()?;
        debug!(url, bytes = body.len(), "readback received");
        Ok(body)
    }

    fn get(&self, url: &str) -> Result<ureq::Response, LinkError> {
        debug!(url, "remote request");
        self.agent.get(url).call().map_err(|err| {
            let err = self.classify(url, err);
            error!(error = %err, "remote request failed");
            err
        })
    }

    fn classify(&self, url: &str, err: ureq::Error) -> LinkError {
        match err {
            ureq::Error::Status(code, _) => LinkError::Status {
                url: url.to_string(),
                code,
            },
            ureq::Error::Transport(transport) => {
                if is_timeout(&transport) {
                    LinkError::Timeout {
                        url: url.to_string(),
                        timeout: self.config.timeout,
                    }
                } else {
                    LinkError::Transport {
                        url: url.to_string(),
                        message: transport.to_string(),
                    }
                }
            }
        }
    }
}

impl RemoteLink for HttpLink {
    fn send(&self, command: RemoteCommand) -> Result<(), LinkError> {
        let url = self.command_url(&command);
        self.get(&url).map(|_| ())
    }
}

impl fmt::Debug for HttpLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpLink")
            .field("base_url", &self.base_url)
            .field("timeout", &self.config.timeout)
            .finish()
    }
}

fn is_timeout(transport: &ureq::Transport) -> bool {
    let mut source = std::error::Error::source(transport);
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            ) {
                return true;
            }
        }
        source = err.source();
    }
    false
}
