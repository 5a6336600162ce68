// src/services/mod.rs
pub mod output_video;
pub mod video_library;

pub use output_video::OutputVideoService;
pub use video_library::{LibraryVideo, SortOrder, VideoLibrary, VideoPage};
