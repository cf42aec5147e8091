//! Media processing for Pixvault.
//!
//! Probing (dimensions and format), EXIF metadata extraction, thumbnail
//! generation, and video transcoding. The prober and transcoder are traits so
//! the job pipeline can run against fakes in tests; the production
//! implementations use the `image` crate and the `ffmpeg`/`ffprobe` binaries.

pub mod exif_data;
pub mod probe;
pub mod thumbnail;
pub mod video;

pub use probe::{MediaInfo, MediaProber, StandardProber};
pub use thumbnail::generate_thumbnail;
pub use video::{FfmpegService, VideoTranscoder};
