use crate::mot::kalman::KalmanBoxFilter;
use crate::mot::mot_errors::TrackerError;
use crate::utils::Rect;

/// One hypothesized physical object across frames: a Kalman motion model
/// plus the lifecycle counters driving confirmation and pruning.
#[derive(Debug, Clone)]
pub struct Track {
    /// Unique within the owning tracker's lifetime, assigned monotonically.
    pub id: u64,
    /// Frames since creation, incremented once per frame.
    pub age: usize,
    /// Frames since the last successful association.
    pub time_since_update: usize,
    /// Consecutive matched frames since the last miss.
    pub hit_streak: usize,
    /// Total matched frames over the track's lifetime.
    pub hits: usize,
    filter: KalmanBoxFilter,
}

impl Track {
    /// Creates a track seeded from an unmatched detection. A newborn track
    /// counts as matched in its birth frame: `time_since_update` is 0 and
    /// `hit_streak` starts at 1.
    pub fn new(id: u64, bbox: &Rect) -> Self {
        Track {
            id,
            age: 0,
            time_since_update: 0,
            hit_streak: 1,
            hits: 1,
            filter: KalmanBoxFilter::new(bbox),
        }
    }

    /// Advances the motion model one frame and returns the predicted box.
    /// Called exactly once per frame before any update.
    pub fn predict(&mut self) -> Rect {
        self.filter.predict()
    }

    /// Corrects the motion model from the matched detection and resets the
    /// miss counter.
    pub fn update(&mut self, bbox: &Rect) -> Result<(), TrackerError> {
        self.filter.update(bbox)?;
        self.time_since_update = 0;
        self.hit_streak += 1;
        self.hits += 1;
        Ok(())
    }

    /// Registers a frame with no matching detection.
    pub fn mark_missed(&mut self) {
        self.time_since_update += 1;
        self.hit_streak = 0;
    }

    /// Current box estimate from the motion model state.
    pub fn bbox(&self) -> Rect {
        self.filter.state_rect()
    }

    /// A confirmed track has matched at least `min_hits` consecutive frames.
    pub fn is_confirmed(&self, min_hits: usize) -> bool {
        min_hits <= 1 || self.hit_streak >= min_hits
    }

    /// A track dies once it has gone more than `max_age` consecutive frames
    /// without a match.
    pub fn is_expired(&self, max_age: usize) -> bool {
        self.time_since_update > max_age
    }
}
