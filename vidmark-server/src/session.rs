//! Session controller: the interface the player shell drives.
//!
//! A [`SessionController`] owns everything that lives for one run of the
//! application: the mark timeline, the session start timestamp used to name
//! exports, and at most one [`MediaServer`]. Opening another video replaces
//! the server; the old one is stopped and its port released before the new
//! one binds.
//!
//! Boundary operations return `Result`s; [`Reply`] turns them into the JSON
//! payloads the shell consumes (`{...}` on success, `{"error": "..."}` on
//! failure).

use log::{debug, info};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use vidmark_core::{
    compute_output_path, MarkResult, MarkTimeline, UndoResult, SESSION_TIMESTAMP_FORMAT,
};

use crate::{
    config::default_output_path,
    error::SessionError,
    port::PortAllocator,
    web::{MediaFile, MediaServer, MediaSource},
    Cli,
};

/// Settings a session is created with
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub allocator: PortAllocator,
    /// Base path used by `save` when the caller passes none
    pub default_output: PathBuf,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            allocator: PortAllocator::default(),
            default_output: default_output_path(),
        }
    }
}

impl From<&Cli> for SessionSettings {
    fn from(args: &Cli) -> Self {
        Self {
            allocator: PortAllocator::new(args.port_low, args.port_high, args.port_attempts),
            default_output: args.output.clone().unwrap_or_else(default_output_path),
        }
    }
}

/// Result of a successful export
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub saved_to: PathBuf,
    pub count: usize,
}

/// Snapshot of the session for the shell's status line
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub session_timestamp: String,
    pub video: Option<MediaSource>,
    pub count: usize,
    pub last: Option<f64>,
}

/// Structured reply for the shell: the payload, or `{"error": message}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply<T> {
    Ok(T),
    Error { error: String },
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for Reply<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Reply::Ok(value),
            Err(e) => Reply::Error {
                error: e.to_string(),
            },
        }
    }
}

pub struct SessionController {
    timeline: RwLock<MarkTimeline>,
    session_timestamp: String,
    settings: SessionSettings,
    server: Option<MediaServer>,
}

impl SessionController {
    /// Start a session stamped with the current local time
    pub fn new(settings: SessionSettings) -> Self {
        let timestamp = chrono::Local::now()
            .format(SESSION_TIMESTAMP_FORMAT)
            .to_string();
        Self::with_timestamp(settings, timestamp)
    }

    pub fn with_timestamp(settings: SessionSettings, session_timestamp: impl Into<String>) -> Self {
        let session_timestamp = session_timestamp.into();
        debug!("Session {} started", session_timestamp);
        Self {
            timeline: RwLock::new(MarkTimeline::new()),
            session_timestamp,
            settings,
            server: None,
        }
    }

    pub fn session_timestamp(&self) -> &str {
        &self.session_timestamp
    }

    pub fn server(&self) -> Option<&MediaServer> {
        self.server.as_ref()
    }

    fn read(&self) -> RwLockReadGuard<'_, MarkTimeline> {
        self.timeline.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MarkTimeline> {
        self.timeline.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Serve `path` to the player, replacing any video already being served.
    ///
    /// A missing file fails before the current server is touched.
    pub async fn open_video(&mut self, path: impl AsRef<Path>) -> Result<MediaSource, SessionError> {
        let media = MediaFile::open(path.as_ref()).await?;

        if let Some(mut previous) = self.server.take() {
            debug!("Replacing media server on port {}", previous.port());
            previous.stop().await;
        }

        let server = MediaServer::serve(media, &self.settings.allocator).await?;
        let source = server.source();
        self.server = Some(server);
        Ok(source)
    }

    pub fn mark(&self, offset_seconds: f64) -> MarkResult {
        let result = self.write().append(offset_seconds);
        debug!("mark({:.3}) -> {:?}", offset_seconds, result);
        result
    }

    pub fn undo(&self) -> UndoResult {
        self.write().undo()
    }

    pub fn get_marks(&self) -> Vec<f64> {
        self.read().list()
    }

    /// Export the timeline as CSV.
    ///
    /// `path` defaults to the configured output; the final file name is
    /// derived from it, the session timestamp, the role and the last name.
    pub fn save(
        &self,
        path: Option<&Path>,
        role_suffix: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<ExportSummary, SessionError> {
        let base = path.unwrap_or(self.settings.default_output.as_path());
        let out = compute_output_path(base, &self.session_timestamp, role_suffix, last_name);
        let marks = self.get_marks();

        crate::storage::write_marks_csv(&out, &marks)?;

        Ok(ExportSummary {
            saved_to: out,
            count: marks.len(),
        })
    }

    pub fn status(&self) -> SessionStatus {
        let timeline = self.read();
        SessionStatus {
            session_timestamp: self.session_timestamp.clone(),
            video: self.server.as_ref().map(MediaServer::source),
            count: timeline.len(),
            last: timeline.last(),
        }
    }

    /// Stop the media server, if any
    pub async fn shutdown(&mut self) {
        if let Some(mut server) = self.server.take() {
            server.stop().await;
            info!("Media server stopped");
        } else {
            debug!("No media server to stop");
        }
        let count = self.read().len();
        if count > 0 {
            info!("Session ends with {} marks in memory", count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const TS: &str = "20240115_1430";

    fn create_test_session() -> (SessionController, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let settings = SessionSettings {
            allocator: PortAllocator::default(),
            default_output: temp_dir.path().join("marks.csv"),
        };
        (SessionController::with_timestamp(settings, TS), temp_dir)
    }

    #[test]
    fn test_timestamp_format() {
        let session = SessionController::new(SessionSettings::default());
        let ts = session.session_timestamp();
        assert_eq!(ts.len(), 13);
        assert_eq!(&ts[8..9], "_");
        assert!(ts.chars().filter(|c| *c != '_').all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_end_to_end_mark_undo_save() {
        let (session, temp) = create_test_session();

        session.mark(1.0);
        session.mark(5.25);
        let result = session.mark(5.3);
        assert_eq!(result.count, 2);
        assert_eq!(session.undo().count, 1);
        assert_eq!(session.get_marks(), vec![1.0]);

        let summary = session.save(None, None, None).unwrap();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.saved_to, temp.path().join("20240115_1430_mark.csv"));
        assert_eq!(
            fs::read_to_string(&summary.saved_to).unwrap(),
            "timestamp_seconds\n1.000\n"
        );
    }

    #[test]
    fn test_save_with_role_and_name() {
        let (session, temp) = create_test_session();
        session.mark(3.5);

        let summary = session
            .save(None, Some("attending"), Some("Dr. O'Brien!"))
            .unwrap();
        assert_eq!(
            summary.saved_to,
            temp.path().join("20240115_1430_mark_attending_dr_obrien.csv")
        );
    }

    #[test]
    fn test_save_role_cannot_leave_export_dir() {
        let (session, temp) = create_test_session();
        session.mark(1.0);

        let summary = session
            .save(None, Some("x/../../escaped"), None)
            .unwrap();
        assert_eq!(
            summary.saved_to,
            temp.path().join("20240115_1430_mark_xescaped.csv")
        );
        assert!(summary.saved_to.exists());
        let entries: Vec<_> = fs::read_dir(temp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_save_custom_path() {
        let (session, temp) = create_test_session();
        let base = temp.path().join("cases").join("case7.csv");

        let summary = session.save(Some(&base), Some("resident"), None).unwrap();
        assert_eq!(
            summary.saved_to,
            temp.path().join("cases").join("20240115_1430_case7_resident.csv")
        );
        assert!(summary.saved_to.exists());
    }

    #[test]
    fn test_save_empty_timeline() {
        let (session, _temp) = create_test_session();
        let summary = session.save(None, None, None).unwrap();
        assert_eq!(summary.count, 0);
        assert_eq!(
            fs::read_to_string(&summary.saved_to).unwrap(),
            "timestamp_seconds\n"
        );
    }

    #[test]
    fn test_save_failure_is_reply_error() {
        let (session, temp) = create_test_session();
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, b"x").unwrap();

        let reply: Reply<ExportSummary> = session.save(Some(&blocker.join("marks.csv")), None, None).into();
        let json = serde_json::to_value(&reply).unwrap();
        assert!(json["error"].as_str().unwrap().starts_with("I/O error"));
    }

    #[tokio::test]
    async fn test_open_missing_video_keeps_current() {
        let (mut session, temp) = create_test_session();
        let video = temp.path().join("a.mp4");
        fs::write(&video, vec![0u8; 64]).unwrap();

        let source = session.open_video(&video).await.unwrap();
        assert_eq!(source.file_name, "a.mp4");

        let result = session.open_video(temp.path().join("missing.mp4")).await;
        assert!(matches!(result, Err(SessionError::FileNotFound(_))));
        assert_eq!(session.status().video, Some(source));

        session.shutdown().await;
        assert!(session.server().is_none());
    }

    #[test]
    fn test_reply_serialization() {
        let ok: Reply<UndoResult> = Ok::<_, SessionError>(UndoResult { count: 2 }).into();
        assert_eq!(serde_json::to_string(&ok).unwrap(), r#"{"count":2}"#);

        let err: Reply<UndoResult> =
            Err(SessionError::FileNotFound(PathBuf::from("/x.mp4"))).into();
        assert_eq!(
            serde_json::to_string(&err).unwrap(),
            r#"{"error":"File not found: /x.mp4"}"#
        );

        let summary = ExportSummary {
            saved_to: PathBuf::from("/tmp/a.csv"),
            count: 1,
        };
        assert_eq!(
            serde_json::to_string(&summary).unwrap(),
            r#"{"savedTo":"/tmp/a.csv","count":1}"#
        );
    }
}
