//! Vision processing

mod segmenter;

pub use segmenter::SegmenterNode;
