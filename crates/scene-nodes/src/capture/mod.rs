//! Capture sources

mod webcam;

pub use webcam::WebcamNode;
