pub mod encoder;
pub mod reaper;
