use common::{helper::error_chain_fmt, telemetry::spawn_blocking_with_tracing};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// The meeting notes of one request
#[derive(Debug)]
pub enum MeetingInput {
    /// Notes sent inline, in a `text` field
    Text(String),
    /// Notes uploaded as a plain text file
    File(UploadedMeetingFile),
}

impl MeetingInput {
    /// Reads the meeting text, whatever the way it was sent
    pub async fn text(&self) -> Result<String, MeetingInputError> {
        match self {
            MeetingInput::Text(text) => Ok(text.clone()),
            MeetingInput::File(file) => file.read_text().await,
        }
    }
}

/// An uploaded file, buffered on disk for the duration of a request.
///
/// The file is deleted when this value is dropped: whether the request succeeded,
/// returned early with an error, or is unwinding from a panic.
/// A failed deletion is logged and otherwise ignored.
pub struct UploadedMeetingFile {
    // Only `None` while a write is running on the blocking pool
    file: Option<NamedTempFile>,
    path: PathBuf,
    file_name: Option<String>,
    content_type: String,
    size: usize,
}

impl UploadedMeetingFile {
    /// Creates an empty temporary file inside `directory`
    pub fn create_in(
        directory: &Path,
        file_name: Option<String>,
        content_type: String,
    ) -> Result<Self, MeetingInputError> {
        let file = tempfile::Builder::new()
            .prefix("meeting-")
            .suffix(".txt")
            .tempfile_in(directory)?;
        let path = file.path().to_path_buf();

        debug!(path = %path.display(), "Created temporary meeting file");

        Ok(Self {
            file: Some(file),
            path,
            file_name,
            content_type,
            size: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name given by the client, if any
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Media type declared by the client
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Number of bytes written so far
    pub fn size(&self) -> usize {
        self.size
    }

    /// Appends a chunk of the upload to the file
    ///
    /// Writing is blocking, so it runs on tokio's blocking pool.
    pub async fn append<B>(&mut self, chunk: B) -> Result<(), MeetingInputError>
    where
        B: AsRef<[u8]> + Send + 'static,
    {
        let mut file = self.file.take().ok_or(MeetingInputError::Closed)?;
        let len = chunk.as_ref().len();

        // If the write fails, the temporary file is dropped, and deleted, on the blocking pool
        let file = spawn_blocking_with_tracing(move || file.write_all(chunk.as_ref()).map(|_| file))
            .await??;

        self.file = Some(file);
        self.size += len;
        Ok(())
    }

    /// Reads the whole file as UTF-8 text
    pub async fn read_text(&self) -> Result<String, MeetingInputError> {
        let content = tokio::fs::read(&self.path).await?;
        Ok(String::from_utf8(content)?)
    }
}

impl Drop for UploadedMeetingFile {
    fn drop(&mut self) {
        let Some(file) = self.file.take() else {
            return;
        };

        match file.close() {
            Ok(()) => debug!(path = %self.path.display(), "Deleted temporary meeting file"),
            Err(error) => warn!(
                ?error,
                path = %self.path.display(),
                "Failed to delete temporary meeting file"
            ),
        }
    }
}

impl std::fmt::Debug for UploadedMeetingFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadedMeetingFile")
            .field("path", &self.path)
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size", &self.size)
            .finish()
    }
}

#[derive(thiserror::Error)]
pub enum MeetingInputError {
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error("Blocking file task failed: {0}")]
    BlockingTaskError(#[from] tokio::task::JoinError),
    #[error("Uploaded file is not valid UTF-8 text")]
    NotUtf8(#[from] std::string::FromUtf8Error),
    #[error("Temporary meeting file is no longer available")]
    Closed,
}

impl std::fmt::Debug for MeetingInputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
