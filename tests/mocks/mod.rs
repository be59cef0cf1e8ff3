//! Fake implementations of the fetch and transcode seams
//!
//! Integration tests drive the real queue and job runner against these, so no network
//! access or external binaries are needed.

pub mod mock_fetcher;
pub mod mock_transcoder;

#[allow(unused_imports)]
pub use mock_fetcher::{MockFetcher, MockMedia, MockResponse};
#[allow(unused_imports)]
pub use mock_transcoder::MockTranscoder;
