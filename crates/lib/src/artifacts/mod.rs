//! Artifact download: fetch generated images into uniquely named local files.
//!
//! The file lives only as long as its `TempArtifact` guard: removed explicitly after the
//! reply is sent, or on drop on every other path.

mod fetcher;
mod temp;

pub use fetcher::{ArtifactFetcher, FetchError};
pub use temp::TempArtifact;
