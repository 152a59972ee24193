pub mod config;
pub mod detector;
pub mod error;
pub mod frame_source;
pub mod kalman;
pub mod mask;
pub mod memory;
pub mod object;
pub mod pipeline;
pub mod quality_gate;
pub mod ring_buffer;
pub mod tracker;

pub use error::{Error, Result};
pub use tracker::*;
