pub mod ffmpeg;
pub mod ffprobe;
pub mod notify;
