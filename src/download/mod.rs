//! Task execution engine: queue, job runner, fetch and post-processing

pub mod archive;
pub mod artifact;
pub mod compositor;
pub mod error;
pub mod events;
pub mod fetcher;
pub mod format;
pub mod queue;
pub mod request;
pub mod runner;
pub mod ytdlp_errors;

// Re-exports for convenience
pub use archive::{ArchiveFile, ArchiveStore};
pub use artifact::DownloadedArtifact;
pub use compositor::{CompositeOutcome, FfmpegTranscoder, SubtitleCompositor, Transcoder};
pub use error::{FetchError, FetchErrorKind};
pub use events::{ChannelSink, EventSink, Events, LogSink, TaskEvent};
pub use fetcher::{CredentialMode, Fetched, MediaFetcher, YtDlpFetcher};
pub use queue::{TaskQueue, TaskSubmitter, WorkerStatus};
pub use request::{QualityMode, SubtitleLanguage, TaskInput, TaskRequest};
pub use runner::{JobReport, JobRunner};
