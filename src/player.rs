use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("player ipc failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("player rejected command: {0}")]
    Rejected(String),
}

/// Capability exposed by the external playback widget once it is ready.
/// Seek targets are whole non-negative seconds; out-of-range handling is
/// the player's own business.
pub trait Player {
    fn seek(&mut self, seconds: u32) -> Result<(), PlayerError>;
    fn play(&mut self) -> Result<(), PlayerError>;
}

/// Holds the late-bound player handle and exposes the one operation
/// annotation clicks need. The player attaches whenever it signals ready;
/// renders may happen before or after that, so every call tolerates an
/// absent handle.
#[derive(Default)]
pub struct PlaybackController {
    current_player: Option<Box<dyn Player>>,
}

impl PlaybackController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or replace) the ready player handle.
    pub fn attach(&mut self, player: Box<dyn Player>) {
        self.current_player = Some(player);
    }

    pub fn is_attached(&self) -> bool {
        self.current_player.is_some()
    }

    /// Move playback to `seconds` and resume. No-op without a player;
    /// player failures are logged and swallowed so a click can never
    /// throw past the event handler.
    pub fn seek_and_play(&mut self, seconds: u32) {
        let Some(player) = self.current_player.as_mut() else {
            debug!(seconds, "seek ignored, no player attached");
            return;
        };
        if let Err(err) = player.seek(seconds).and_then(|_| player.play()) {
            warn!(%err, seconds, "failure skipping to timestamp");
        }
    }
}

/// mpv speaking its JSON IPC protocol over a Unix socket
/// (`mpv --input-ipc-server=<path> <video>`). Connecting to the socket is
/// the ready signal.
pub struct MpvPlayer {
    stream: UnixStream,
    next_request_id: u64,
}

impl MpvPlayer {
    pub fn connect<P: AsRef<Path>>(socket: P) -> Result<Self, PlayerError> {
        let stream = UnixStream::connect(socket)?;
        stream.set_read_timeout(Some(Duration::from_millis(500)))?;
        Ok(Self {
            stream,
            next_request_id: 1,
        })
    }

    fn command(&mut self, cmd: serde_json::Value) -> Result<(), PlayerError> {
        let request_id = self.next_request_id;
        self.next_request_id += 1;
        let msg = json!({ "command": cmd, "request_id": request_id });
        self.stream.write_all(msg.to_string().as_bytes())?;
        self.stream.write_all(b"\n")?;

        // mpv interleaves events with replies; scan until our reply shows up
        let mut reader = BufReader::new(self.stream.try_clone()?);
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                return Err(PlayerError::Rejected("player closed the socket".into()));
            }
            let Ok(reply) = serde_json::from_str::<serde_json::Value>(&line) else {
                continue;
            };
            if reply.get("request_id").and_then(|v| v.as_u64()) != Some(request_id) {
                continue;
            }
            return match reply.get("error").and_then(|v| v.as_str()) {
                Some("success") => Ok(()),
                Some(other) => Err(PlayerError::Rejected(other.to_string())),
                None => Err(PlayerError::Rejected("malformed reply".into())),
            };
        }
    }
}

impl Player for MpvPlayer {
    fn seek(&mut self, seconds: u32) -> Result<(), PlayerError> {
        self.command(json!(["seek", seconds, "absolute"]))
    }

    fn play(&mut self) -> Result<(), PlayerError> {
        self.command(json!(["set_property", "pause", false]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    pub struct RecordingPlayer {
        pub calls: Arc<Mutex<Vec<String>>>,
        pub fail_seek: bool,
    }

    impl Player for RecordingPlayer {
        fn seek(&mut self, seconds: u32) -> Result<(), PlayerError> {
            if self.fail_seek {
                return Err(PlayerError::Rejected("detached".into()));
            }
            self.calls.lock().unwrap().push(format!("seek {}", seconds));
            Ok(())
        }

        fn play(&mut self) -> Result<(), PlayerError> {
            self.calls.lock().unwrap().push("play".into());
            Ok(())
        }
    }

    #[test]
    fn seek_and_play_without_player_is_a_noop() {
        let mut controller = PlaybackController::new();
        assert!(!controller.is_attached());
        controller.seek_and_play(62);
    }

    #[test]
    fn seek_and_play_drives_the_attached_player() {
        let player = RecordingPlayer::default();
        let calls = player.calls.clone();
        let mut controller = PlaybackController::new();
        controller.attach(Box::new(player));

        controller.seek_and_play(62);

        assert_eq!(*calls.lock().unwrap(), vec!["seek 62", "play"]);
    }

    #[test]
    fn player_failure_is_swallowed() {
        let player = RecordingPlayer {
            fail_seek: true,
            ..Default::default()
        };
        let calls = player.calls.clone();
        let mut controller = PlaybackController::new();
        controller.attach(Box::new(player));

        controller.seek_and_play(10);

        // seek failed, play never reached, nothing escaped
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn reattach_replaces_the_handle() {
        let first = RecordingPlayer::default();
        let first_calls = first.calls.clone();
        let second = RecordingPlayer::default();
        let second_calls = second.calls.clone();

        let mut controller = PlaybackController::new();
        controller.attach(Box::new(first));
        controller.attach(Box::new(second));
        controller.seek_and_play(5);

        assert!(first_calls.lock().unwrap().is_empty());
        assert_eq!(*second_calls.lock().unwrap(), vec!["seek 5", "play"]);
    }
}
