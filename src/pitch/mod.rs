//! Pitch contour processing
//!
//! The pitch path runs smoothing (median filter + octave correction), note
//! segmentation, and anchor/pitch-bend encoding over the voiced frame
//! stream. Each stage consumes the previous stage's output and never
//! mutates shared state.

pub mod anchor;
pub mod segmenter;
pub mod smoothing;
