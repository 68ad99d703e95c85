//! Loopback media server.
//!
//! Serves a single video file to the player with HTTP byte-range support so
//! it can seek without downloading the whole file. Each [`MediaServer`] owns
//! its listening socket and background task; stopping it releases both.
//!
//! | Path               | Response                                   |
//! |--------------------|--------------------------------------------|
//! | `GET /`            | the video (`200`, or `206` with `Range`)   |
//! | `GET /{file_name}` | same as `/`                                |
//! | anything else      | `404`                                      |

use axum::{
    body::Body,
    extract::{Path as UrlPath, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use futures_util::StreamExt;
use log::{debug, error, info, warn};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Serialize;
use std::{
    io::SeekFrom,
    net::Ipv4Addr,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt},
    net::TcpListener,
    task::JoinHandle,
};
use tokio_util::{io::ReaderStream, sync::CancellationToken};
use vidmark_core::{content_type_for, resolve_range, unsatisfiable_content_range, RangeRequest};

use crate::{error::SessionError, port::PortAllocator};

/// How long `stop` waits for in-flight responses before abandoning the task
const STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Characters escaped in the file-name path segment of the URL
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Playable location of the current video, as handed to the player
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaSource {
    pub url: String,
    pub file_name: String,
}

/// The file being served. Captured once at start and never mutated.
#[derive(Debug)]
pub struct MediaFile {
    path: PathBuf,
    file_name: String,
    file_size: u64,
    content_type: &'static str,
}

impl MediaFile {
    /// Resolve `path` and check it is an existing regular file
    pub async fn open(path: &Path) -> Result<Self, SessionError> {
        let not_found = || SessionError::FileNotFound(path.to_path_buf());

        let path = tokio::fs::canonicalize(path).await.map_err(|_| not_found())?;
        let metadata = tokio::fs::metadata(&path).await.map_err(|_| not_found())?;
        if !metadata.is_file() {
            return Err(not_found());
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(not_found)?;

        Ok(Self {
            content_type: content_type_for(&path),
            file_size: metadata.len(),
            file_name,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }
}

#[derive(Clone)]
struct MediaState {
    media: Arc<MediaFile>,
    shutdown: CancellationToken,
}

/// A running media server for one file
pub struct MediaServer {
    port: u16,
    media: Arc<MediaFile>,
    url: String,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl MediaServer {
    /// Validate `path` and start serving it on a freshly allocated port
    pub async fn start(path: &Path, allocator: &PortAllocator) -> Result<Self, SessionError> {
        let media = MediaFile::open(path).await?;
        Self::serve(media, allocator).await
    }

    /// Start serving an already validated file on a background task
    pub async fn serve(media: MediaFile, allocator: &PortAllocator) -> Result<Self, SessionError> {
        let (port, listener) = allocator.allocate()?;
        let listener = TcpListener::from_std(listener)?;

        let media = Arc::new(media);
        let url = format!(
            "http://{}:{}/{}",
            Ipv4Addr::LOCALHOST,
            port,
            utf8_percent_encode(&media.file_name, PATH_SEGMENT)
        );

        let shutdown = CancellationToken::new();
        let app = router(MediaState {
            media: media.clone(),
            shutdown: shutdown.clone(),
        });

        let until = shutdown.clone();
        let task = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(until.cancelled_owned())
                .await;
            match result {
                Ok(()) => debug!("Media server on port {} stopped", port),
                Err(e) => error!("Media server on port {} failed: {}", port, e),
            }
        });

        info!(
            "Serving {} ({} bytes, {}) at {}",
            media.path.display(),
            media.file_size,
            media.content_type,
            url
        );

        Ok(Self {
            port,
            media,
            url,
            shutdown,
            task: Some(task),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn media(&self) -> &MediaFile {
        &self.media
    }

    pub fn source(&self) -> MediaSource {
        MediaSource {
            url: self.url.clone(),
            file_name: self.media.file_name.clone(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop serving and wait until the listening socket is released.
    ///
    /// Streaming responses are cut short; the serve task gets
    /// [`STOP_TIMEOUT`] to wind down before it is aborted.
    pub async fn stop(&mut self) {
        self.shutdown.cancel();
        let Some(mut task) = self.task.take() else {
            return;
        };

        if tokio::time::timeout(STOP_TIMEOUT, &mut task).await.is_err() {
            warn!(
                "Media server on port {} did not stop in {:?}, aborting",
                self.port, STOP_TIMEOUT
            );
            task.abort();
            let _ = task.await;
        }
        debug!("Released port {}", self.port);
    }
}

impl Drop for MediaServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for MediaServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaServer")
            .field("port", &self.port)
            .field("url", &self.url)
            .finish()
    }
}

fn router(state: MediaState) -> Router {
    Router::new()
        .route("/", get(serve_root))
        .route("/{file_name}", get(serve_named))
        .fallback(not_found)
        .layer(middleware::from_fn(no_cache_middleware))
        .with_state(state)
}

/// Middleware to add no-cache headers, so a replaced video is never stale
async fn no_cache_middleware(request: axum::extract::Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-cache"),
    );
    response
}

async fn not_found() -> Response {
    StatusCode::NOT_FOUND.into_response()
}

async fn serve_root(State(state): State<MediaState>, headers: HeaderMap) -> Response {
    stream_media(&state, &headers).await
}

async fn serve_named(
    State(state): State<MediaState>,
    UrlPath(file_name): UrlPath<String>,
    headers: HeaderMap,
) -> Response {
    if file_name != state.media.file_name {
        debug!("GET /{}: not the served file", file_name);
        return StatusCode::NOT_FOUND.into_response();
    }
    stream_media(&state, &headers).await
}

/// Build the `200`/`206`/`416` response for one request.
///
/// Every request opens its own file handle; failures before the body starts
/// become a `500` for this request only.
async fn stream_media(state: &MediaState, headers: &HeaderMap) -> Response {
    let media = &state.media;
    let range_header = headers.get(header::RANGE).and_then(|v| v.to_str().ok());

    let request = match resolve_range(range_header, media.file_size) {
        Ok(request) => request,
        Err(e) => {
            debug!("Range {:?} not satisfiable: {}", range_header, e);
            return (
                StatusCode::RANGE_NOT_SATISFIABLE,
                [
                    (header::CONTENT_RANGE, unsatisfiable_content_range(media.file_size)),
                    (header::ACCEPT_RANGES, "bytes".to_string()),
                ],
            )
                .into_response();
        }
    };

    let (status, start, length) = match request {
        RangeRequest::Full => (StatusCode::OK, 0, media.file_size),
        RangeRequest::Partial(range) => (StatusCode::PARTIAL_CONTENT, range.start, range.len()),
    };
    log::trace!(
        "GET range={:?} -> {} ({} bytes from {})",
        range_header,
        status,
        length,
        start
    );

    let mut file = match File::open(&media.path).await {
        Ok(file) => file,
        Err(e) => return internal_error(media, e),
    };
    if start > 0 {
        if let Err(e) = file.seek(SeekFrom::Start(start)).await {
            return internal_error(media, e);
        }
    }

    let body = ReaderStream::new(file.take(length))
        .take_until(state.shutdown.clone().cancelled_owned());

    let mut response = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, media.content_type)
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_LENGTH, length);
    if let RangeRequest::Partial(range) = request {
        response = response.header(header::CONTENT_RANGE, range.content_range(media.file_size));
    }

    match response.body(Body::from_stream(body)) {
        Ok(response) => response,
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

fn internal_error(media: &MediaFile, e: std::io::Error) -> Response {
    warn!("Failed to read {}: {}", media.path.display(), e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Failed to read {}: {}", media.file_name, e),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_video(dir: &TempDir, name: &str, len: usize) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        file.write_all(&data).unwrap();
        path
    }

    #[tokio::test]
    async fn test_open_missing_file() {
        let result = MediaFile::open(Path::new("/definitely/not/here.mp4")).await;
        assert!(matches!(result, Err(SessionError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn test_open_directory_is_not_found() {
        let dir = TempDir::new().unwrap();
        let result = MediaFile::open(dir.path()).await;
        assert!(matches!(result, Err(SessionError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn test_open_captures_metadata() {
        let dir = TempDir::new().unwrap();
        let path = write_video(&dir, "clip.MOV", 1234);
        let media = MediaFile::open(&path).await.unwrap();
        assert_eq!(media.file_name(), "clip.MOV");
        assert_eq!(media.file_size(), 1234);
        assert_eq!(media.content_type, "video/quicktime");
    }

    #[tokio::test]
    async fn test_url_escapes_file_name() {
        let dir = TempDir::new().unwrap();
        let path = write_video(&dir, "case 12 #1.mp4", 10);
        let mut server = MediaServer::start(&path, &PortAllocator::default())
            .await
            .unwrap();

        let expected = format!("http://127.0.0.1:{}/case%2012%20%231.mp4", server.port());
        assert_eq!(server.url(), expected);
        assert_eq!(server.source().file_name, "case 12 #1.mp4");
        assert!(server.is_running());

        server.stop().await;
        assert!(!server.is_running());
    }
}
