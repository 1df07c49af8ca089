use std::collections::BTreeMap;
use std::fmt;

use crate::mot::assignment::{Association, AssociationSolver, HungarianSolver};
use crate::mot::mot_errors::TrackerError;
use crate::mot::track::Track;
use crate::utils::{iou, BBoxFormat, Rect};

/// Multi-object tracker implementing SORT (Simple Online and Realtime
/// Tracking): per-track constant-velocity Kalman filters, optimal IoU
/// assignment and a birth/confirmation/death lifecycle.
///
/// Single-threaded and frame-sequential: one `run` call per frame, no
/// internal concurrency. Callers sharing an instance across threads must
/// serialize access externally.
pub struct SortTracker {
    /// Max number of consecutive missed frames before a track is removed.
    max_age: usize,
    /// Consecutive hits required before a track is surfaced by `get_tracks`.
    min_hits: usize,
    /// Minimum IoU for a track-detection pair to be accepted.
    iou_threshold: f32,
    /// First id handed out, and the value `reset_id` returns to.
    id_origin: u64,
    next_id: u64,
    solver: Box<dyn AssociationSolver>,
    /// Live tracks keyed by id; BTreeMap keeps iteration in ascending id
    /// order for deterministic output.
    pub tracks: BTreeMap<u64, Track>,
}

impl Default for SortTracker {
    /// Creates a tracker with the original SORT defaults:
    /// `max_age = 3`, `min_hits = 1`, `iou_threshold = 0.3`.
    ///
    /// Basic usage:
    ///
    /// ```
    /// use sort_rs::mot::SortTracker;
    /// let mut tracker = SortTracker::default();
    /// ```
    fn default() -> Self {
        SortTracker::new(3, 1, 0.3).expect("default configuration is valid")
    }
}

impl SortTracker {
    /// Creates a tracker with the given configuration.
    ///
    /// Fails with `InvalidConfiguration` if `iou_threshold` is outside
    /// \[0, 1\]. `max_age` and `min_hits` are unsigned, so negative values
    /// are unrepresentable.
    ///
    /// Basic usage:
    ///
    /// ```
    /// use sort_rs::mot::SortTracker;
    /// let max_age: usize = 5;
    /// let min_hits: usize = 3;
    /// let iou_threshold: f32 = 0.3;
    /// let mut tracker = SortTracker::new(max_age, min_hits, iou_threshold).unwrap();
    /// ```
    pub fn new(max_age: usize, min_hits: usize, iou_threshold: f32) -> Result<Self, TrackerError> {
        if !(0.0..=1.0).contains(&iou_threshold) || iou_threshold.is_nan() {
            return Err(TrackerError::InvalidConfiguration(format!(
                "iou_threshold must be within [0, 1], got {}",
                iou_threshold
            )));
        }
        Ok(SortTracker {
            max_age,
            min_hits,
            iou_threshold,
            id_origin: 1,
            next_id: 1,
            solver: Box::new(HungarianSolver),
            tracks: BTreeMap::new(),
        })
    }
    /// Overrides the first id handed out (default 1).
    pub fn with_id_origin(mut self, origin: u64) -> Self {
        self.id_origin = origin;
        self.next_id = origin;
        self
    }
    /// Substitutes the association strategy, e.g. `GreedySolver` for
    /// benchmarking. Lifecycle logic is unaffected.
    pub fn with_solver(mut self, solver: Box<dyn AssociationSolver>) -> Self {
        self.solver = solver;
        self
    }

    /// Executes one full frame step: predict every live track, associate
    /// predictions with `detections`, update matched tracks, age unmatched
    /// ones, spawn tracks for unmatched detections and prune dead tracks.
    ///
    /// Fails with `InvalidInput` if any detection has negative width/height
    /// or non-finite coordinates; in that case no track state is mutated.
    pub fn run(&mut self, detections: &[Rect]) -> Result<(), TrackerError> {
        // Validate the whole frame up front so the step stays atomic
        for (i, det) in detections.iter().enumerate() {
            if det.width < 0.0 || det.height < 0.0 {
                return Err(TrackerError::InvalidInput(format!(
                    "detection {} has negative size: {}x{}",
                    i, det.width, det.height
                )));
            }
            if ![det.x, det.y, det.width, det.height]
                .iter()
                .all(|v| v.is_finite())
            {
                return Err(TrackerError::InvalidInput(format!(
                    "detection {} has non-finite coordinates",
                    i
                )));
            }
        }

        // 1. Advance every motion model one frame
        let track_ids: Vec<u64> = self.tracks.keys().copied().collect();
        let mut predicted: Vec<Rect> = Vec::with_capacity(track_ids.len());
        for id in &track_ids {
            let track = self.tracks.get_mut(id).expect("live track id");
            predicted.push(track.predict());
        }

        // 2. Associate predicted boxes with the new detections. With no live
        // tracks there is nothing to solve: every detection is unmatched.
        let association = if predicted.is_empty() {
            Association {
                unmatched_detections: (0..detections.len()).collect(),
                ..Association::default()
            }
        } else {
            let iou_matrix: Vec<Vec<f32>> = predicted
                .iter()
                .map(|track_bbox| detections.iter().map(|det| iou(track_bbox, det)).collect())
                .collect();
            self.solver.solve(&iou_matrix, self.iou_threshold)?
        };

        // 3. Update matched tracks
        for &(track_idx, det_idx) in &association.matches {
            let id = track_ids[track_idx];
            let track = self.tracks.get_mut(&id).expect("matched track id");
            track.update(&detections[det_idx])?;
        }
        // 4. Age unmatched tracks
        for &track_idx in &association.unmatched_tracks {
            let id = track_ids[track_idx];
            let track = self.tracks.get_mut(&id).expect("unmatched track id");
            track.mark_missed();
        }
        // 5. Spawn tracks for unmatched detections
        for &det_idx in &association.unmatched_detections {
            let id = self.next_id;
            self.next_id += 1;
            self.tracks.insert(id, Track::new(id, &detections[det_idx]));
        }
        // 6. Everybody ages one frame
        for track in self.tracks.values_mut() {
            track.age += 1;
        }
        // 7. Prune dead tracks; their ids are never handed out again
        let max_age = self.max_age;
        self.tracks.retain(|_, track| !track.is_expired(max_age));
        Ok(())
    }

    /// Read-only snapshot of the current tracks in ascending id order, boxes
    /// rendered in the requested coordinate format.
    ///
    /// When `min_hits > 1` only tracks with `hit_streak >= min_hits` are
    /// surfaced; otherwise every live track is returned.
    pub fn get_tracks(&self, format: BBoxFormat) -> Vec<(u64, [f32; 4])> {
        self.tracks
            .values()
            .filter(|track| track.is_confirmed(self.min_hits))
            .map(|track| (track.id, track.bbox().to_coords(format)))
            .collect()
    }

    /// Reinitializes the id counter to its origin. Live tracks are kept and
    /// retain their ids; pair with [SortTracker::clear] when id collisions
    /// with surviving tracks are unacceptable.
    pub fn reset_id(&mut self) {
        self.next_id = self.id_origin;
    }

    /// Removes every live track and reinitializes the id counter.
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.next_id = self.id_origin;
    }
}

impl fmt::Display for SortTracker {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Max age: {}\n\tMin hits: {}\n\tIoU threshold: {}\n\tLive tracks: {}",
            self.max_age,
            self.min_hits,
            self.iou_threshold,
            self.tracks.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mot::assignment::GreedySolver;
    use approx::assert_abs_diff_eq;
    use itertools::izip;

    fn assert_coords_eq(actual: [f32; 4], expected: [f32; 4]) {
        for (a, e) in izip!(actual, expected) {
            assert_abs_diff_eq!(a, e, epsilon = 0.5);
        }
    }

    #[test]
    fn test_invalid_configuration() {
        assert!(SortTracker::new(3, 1, -0.1).is_err());
        assert!(SortTracker::new(3, 1, 1.1).is_err());
        assert!(SortTracker::new(3, 1, f32::NAN).is_err());
        assert!(SortTracker::new(3, 0, 0.0).is_ok());
        assert!(SortTracker::new(3, 1, 1.0).is_ok());
    }

    #[test]
    fn test_first_frame_spawns_tracks() {
        // No live tracks means no solver call, not an empty association:
        // every first-frame detection births a track
        let mut tracker = SortTracker::default();
        tracker
            .run(&[
                Rect::new(0.0, 0.0, 10.0, 10.0),
                Rect::new(100.0, 0.0, 10.0, 10.0),
            ])
            .unwrap();
        let tracks = tracker.get_tracks(BBoxFormat::TopLeftWh);
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].0, 1);
        assert_eq!(tracks[1].0, 2);

        // Same once the live set empties mid-session
        let mut tracker = SortTracker::new(0, 1, 0.3).unwrap();
        tracker.run(&[Rect::new(0.0, 0.0, 10.0, 10.0)]).unwrap();
        tracker.run(&[]).unwrap();
        assert!(tracker.tracks.is_empty());
        tracker.run(&[Rect::new(50.0, 0.0, 10.0, 10.0)]).unwrap();
        assert_eq!(tracker.get_tracks(BBoxFormat::TopLeftWh).len(), 1);
    }

    #[test]
    fn test_lifecycle_scenario() {
        // max_age=1, min_hits=1, iou_threshold=0.3
        let mut tracker = SortTracker::new(1, 1, 0.3).unwrap();

        // Frame 1: one detection births track 1
        tracker.run(&[Rect::new(0.0, 0.0, 10.0, 10.0)]).unwrap();
        let tracks = tracker.get_tracks(BBoxFormat::TopLeftWh);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].0, 1);
        assert_coords_eq(tracks[0].1, [0.0, 0.0, 10.0, 10.0]);

        // Frame 2: overlapping detection (IoU ~ 0.68) keeps id 1
        tracker.run(&[Rect::new(1.0, 1.0, 10.0, 10.0)]).unwrap();
        let tracks = tracker.get_tracks(BBoxFormat::TopLeftWh);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].0, 1);
        assert!(tracks[0].1[0] > 0.0);

        // Frame 3: no detections; time_since_update = 1 is not > max_age,
        // the track survives one miss
        tracker.run(&[]).unwrap();
        assert_eq!(tracker.get_tracks(BBoxFormat::TopLeftWh).len(), 1);

        // Frame 4: second miss kills it
        tracker.run(&[]).unwrap();
        assert!(tracker.get_tracks(BBoxFormat::TopLeftWh).is_empty());
        assert!(tracker.tracks.is_empty());
    }

    #[test]
    fn test_min_hits_gating() {
        let mut tracker = SortTracker::new(3, 3, 0.3).unwrap();
        let frames = [
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Rect::new(1.0, 1.0, 10.0, 10.0),
            Rect::new(2.0, 2.0, 10.0, 10.0),
        ];
        // Absent until the streak reaches 3 consecutive matched frames
        tracker.run(&frames[0..1]).unwrap();
        assert!(tracker.get_tracks(BBoxFormat::TopLeftWh).is_empty());
        tracker.run(&frames[1..2]).unwrap();
        assert!(tracker.get_tracks(BBoxFormat::TopLeftWh).is_empty());
        tracker.run(&frames[2..3]).unwrap();
        let tracks = tracker.get_tracks(BBoxFormat::TopLeftWh);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].0, 1);
        // A miss resets the streak and hides the track again
        tracker.run(&[]).unwrap();
        assert!(tracker.get_tracks(BBoxFormat::TopLeftWh).is_empty());
    }

    #[test]
    fn test_id_monotonicity() {
        let mut tracker = SortTracker::new(0, 1, 0.3).unwrap();
        let mut issued: Vec<u64> = Vec::new();
        // Disjoint detections each frame; max_age=0 kills every track after
        // a single miss, so ids must keep climbing without reuse
        for i in 0..5 {
            let offset = i as f32 * 1000.0;
            tracker
                .run(&[
                    Rect::new(offset, 0.0, 10.0, 10.0),
                    Rect::new(offset + 100.0, 0.0, 10.0, 10.0),
                ])
                .unwrap();
            for (id, _) in tracker.get_tracks(BBoxFormat::TopLeftWh) {
                issued.push(id);
            }
            tracker.run(&[]).unwrap();
        }
        let mut sorted = issued.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(issued.len(), 10);
        assert_eq!(sorted.len(), issued.len(), "ids were reused: {:?}", issued);
        assert_eq!(issued, sorted, "ids must be issued in increasing order");
    }

    #[test]
    fn test_two_objects_keep_identities() {
        let mut tracker = SortTracker::new(3, 1, 0.3).unwrap();
        let mut left = Rect::new(0.0, 0.0, 20.0, 20.0);
        let mut right = Rect::new(200.0, 0.0, 20.0, 20.0);
        for _ in 0..10 {
            // Present detections in swapped order to stress the assignment
            tracker.run(&[right, left]).unwrap();
            left.x += 2.0;
            right.x -= 2.0;
        }
        let tracks = tracker.get_tracks(BBoxFormat::TopLeftWh);
        assert_eq!(tracks.len(), 2);
        let (left_track, right_track) = (tracks[1], tracks[0]);
        // First frame order was [right, left] so the right object got id 1
        assert_eq!(right_track.0, 1);
        assert_eq!(left_track.0, 2);
        assert!(left_track.1[0] < right_track.1[0]);
    }

    #[test]
    fn test_output_formats() {
        let mut tracker = SortTracker::new(3, 1, 0.3).unwrap();
        tracker.run(&[Rect::new(10.0, 20.0, 30.0, 40.0)]).unwrap();
        let top_left = tracker.get_tracks(BBoxFormat::TopLeftWh);
        assert_coords_eq(top_left[0].1, [10.0, 20.0, 30.0, 40.0]);
        let center = tracker.get_tracks(BBoxFormat::CenterWh);
        assert_coords_eq(center[0].1, [25.0, 40.0, 30.0, 40.0]);
        let corners = tracker.get_tracks(BBoxFormat::Corners);
        assert_coords_eq(corners[0].1, [10.0, 20.0, 40.0, 60.0]);
    }

    #[test]
    fn test_get_tracks_is_pure() {
        let mut tracker = SortTracker::new(3, 1, 0.3).unwrap();
        tracker.run(&[Rect::new(0.0, 0.0, 10.0, 10.0)]).unwrap();
        let before = tracker.get_tracks(BBoxFormat::TopLeftWh);
        for _ in 0..5 {
            let again = tracker.get_tracks(BBoxFormat::TopLeftWh);
            assert_eq!(again, before);
        }
        let track = tracker.tracks.get(&1).unwrap();
        assert_eq!(track.age, 1);
        assert_eq!(track.time_since_update, 0);
        assert_eq!(track.hit_streak, 1);
    }

    #[test]
    fn test_invalid_input_is_atomic() {
        let mut tracker = SortTracker::new(3, 1, 0.3).unwrap();
        tracker.run(&[Rect::new(0.0, 0.0, 10.0, 10.0)]).unwrap();
        let snapshot = tracker.get_tracks(BBoxFormat::TopLeftWh);
        let age_before = tracker.tracks.get(&1).unwrap().age;

        let result = tracker.run(&[
            Rect::new(1.0, 1.0, 10.0, 10.0),
            Rect::new(5.0, 5.0, -2.0, 10.0),
        ]);
        assert!(matches!(result, Err(TrackerError::InvalidInput(_))));
        // Rejected frame must leave every counter and box untouched
        assert_eq!(tracker.tracks.get(&1).unwrap().age, age_before);
        assert_eq!(tracker.get_tracks(BBoxFormat::TopLeftWh), snapshot);

        assert!(tracker
            .run(&[Rect::new(0.0, 0.0, f32::NAN, 10.0)])
            .is_err());
    }

    #[test]
    fn test_reset_id() {
        let mut tracker = SortTracker::new(3, 1, 0.3).unwrap();
        tracker
            .run(&[
                Rect::new(0.0, 0.0, 10.0, 10.0),
                Rect::new(100.0, 0.0, 10.0, 10.0),
            ])
            .unwrap();
        tracker.reset_id();
        // Counter restarts at the origin regardless of live tracks
        tracker
            .run(&[
                Rect::new(0.0, 0.0, 10.0, 10.0),
                Rect::new(100.0, 0.0, 10.0, 10.0),
                Rect::new(200.0, 0.0, 10.0, 10.0),
            ])
            .unwrap();
        let ids: Vec<u64> = tracker
            .get_tracks(BBoxFormat::TopLeftWh)
            .iter()
            .map(|(id, _)| *id)
            .collect();
        assert!(ids.contains(&1));
        assert!(ids.contains(&2));
    }

    #[test]
    fn test_clear() {
        let mut tracker = SortTracker::new(3, 1, 0.3).unwrap();
        tracker.run(&[Rect::new(0.0, 0.0, 10.0, 10.0)]).unwrap();
        tracker.clear();
        assert!(tracker.tracks.is_empty());
        tracker.run(&[Rect::new(0.0, 0.0, 10.0, 10.0)]).unwrap();
        assert_eq!(tracker.get_tracks(BBoxFormat::TopLeftWh)[0].0, 1);
    }

    #[test]
    fn test_id_origin() {
        let mut tracker = SortTracker::new(3, 1, 0.3).unwrap().with_id_origin(100);
        tracker.run(&[Rect::new(0.0, 0.0, 10.0, 10.0)]).unwrap();
        assert_eq!(tracker.get_tracks(BBoxFormat::TopLeftWh)[0].0, 100);
    }

    #[test]
    fn test_greedy_solver_substitution() {
        let mut tracker = SortTracker::new(3, 1, 0.3)
            .unwrap()
            .with_solver(Box::new(GreedySolver));
        tracker.run(&[Rect::new(0.0, 0.0, 10.0, 10.0)]).unwrap();
        tracker.run(&[Rect::new(1.0, 1.0, 10.0, 10.0)]).unwrap();
        let tracks = tracker.get_tracks(BBoxFormat::TopLeftWh);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].0, 1);
    }

    #[test]
    fn test_occlusion_bridged_by_prediction() {
        let mut tracker = SortTracker::new(2, 1, 0.3).unwrap();
        // Constant motion so the filter learns the velocity
        for i in 0..8 {
            tracker
                .run(&[Rect::new(i as f32 * 3.0, 0.0, 20.0, 20.0)])
                .unwrap();
        }
        // Two-frame detector gap
        tracker.run(&[]).unwrap();
        tracker.run(&[]).unwrap();
        // Reappears where the constant-velocity model expects it
        tracker.run(&[Rect::new(30.0, 0.0, 20.0, 20.0)]).unwrap();
        let tracks = tracker.get_tracks(BBoxFormat::TopLeftWh);
        assert_eq!(tracks.len(), 1, "track should survive the gap");
        assert_eq!(tracks[0].0, 1, "identity must persist across occlusion");
    }
}
