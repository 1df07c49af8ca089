//! Simple Online and Realtime Tracking (SORT) in Rust.
//!
//! Consumes per-frame sets of bounding box detections and produces temporally
//! consistent integer track identities via a constant-velocity Kalman filter
//! per track and optimal IoU-based assignment (Kuhn-Munkres).
pub mod mot;
pub mod utils;
