use pathfinding::{matrix::Matrix, prelude::kuhn_munkres_min};

use crate::mot::mot_errors::TrackerError;

/// IoU values are scaled to integer costs for the Kuhn-Munkres solver.
const SCALE_FACTOR: f32 = 1_000_000.0;

/// Outcome of one frame's track-to-detection association. Every track index
/// and detection index appears in exactly one of the three sets.
#[derive(Debug, Clone, Default)]
pub struct Association {
    /// Pairs of (track index, detection index) passing the IoU gate.
    pub matches: Vec<(usize, usize)>,
    /// Track indices with no accepted detection this frame.
    pub unmatched_tracks: Vec<usize>,
    /// Detection indices with no accepted track this frame.
    pub unmatched_detections: Vec<usize>,
}

/// One-to-one matching strategy between predicted track boxes (rows) and
/// detection boxes (columns) of an IoU matrix.
///
/// Implementations must be deterministic for a given input ordering and must
/// reject any pair whose IoU falls below `iou_threshold`, pushing both sides
/// into the unmatched sets.
pub trait AssociationSolver {
    fn solve(
        &self,
        iou_matrix: &[Vec<f32>],
        iou_threshold: f32,
    ) -> Result<Association, TrackerError>;
}

/// Exact optimal assignment via the Kuhn-Munkres (Hungarian) algorithm,
/// maximizing total gated IoU. Rectangular problems are padded with dummy
/// columns at the cost of a zero-IoU pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct HungarianSolver;

impl AssociationSolver for HungarianSolver {
    fn solve(
        &self,
        iou_matrix: &[Vec<f32>],
        iou_threshold: f32,
    ) -> Result<Association, TrackerError> {
        let num_tracks = iou_matrix.len();
        let num_detections = iou_matrix.first().map_or(0, |row| row.len());
        if num_tracks == 0 || num_detections == 0 {
            return Ok(all_unmatched(num_tracks, num_detections));
        }

        // Sub-threshold entries are priced as zero IoU so the maximized total
        // only counts pairs that can survive the gate.
        let padded_cols = num_tracks.max(num_detections);
        let cost_data: Vec<i32> = (0..num_tracks)
            .flat_map(|i| {
                (0..padded_cols)
                    .map(|j| {
                        if j < num_detections && iou_matrix[i][j] >= iou_threshold {
                            ((1.0 - iou_matrix[i][j]) * SCALE_FACTOR) as i32
                        } else {
                            SCALE_FACTOR as i32
                        }
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        let cost_matrix = Matrix::from_vec(num_tracks, padded_cols, cost_data).map_err(|e| {
            TrackerError::SolverInfeasible(format!("cannot build cost matrix: {}", e))
        })?;
        let (_, assignments) = kuhn_munkres_min(&cost_matrix);

        let mut result = Association::default();
        for (track_idx, &det_idx) in assignments.iter().enumerate() {
            // Dummy columns and gated pairs fall back to the unmatched sets
            if det_idx < num_detections && iou_matrix[track_idx][det_idx] >= iou_threshold {
                result.matches.push((track_idx, det_idx));
            } else {
                result.unmatched_tracks.push(track_idx);
            }
        }
        let matched_detections: Vec<usize> =
            result.matches.iter().map(|&(_, det)| det).collect();
        result.unmatched_detections = (0..num_detections)
            .filter(|det| !matched_detections.contains(det))
            .collect();
        Ok(result)
    }
}

/// Greedy assignment: each track takes the best still-unclaimed detection
/// above the gate, in track order. Faster but suboptimal; kept as a
/// benchmarking substitute for [HungarianSolver].
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedySolver;

impl AssociationSolver for GreedySolver {
    fn solve(
        &self,
        iou_matrix: &[Vec<f32>],
        iou_threshold: f32,
    ) -> Result<Association, TrackerError> {
        let num_tracks = iou_matrix.len();
        let num_detections = iou_matrix.first().map_or(0, |row| row.len());
        if num_tracks == 0 || num_detections == 0 {
            return Ok(all_unmatched(num_tracks, num_detections));
        }

        let mut result = Association::default();
        let mut claimed = vec![false; num_detections];
        for (track_idx, row) in iou_matrix.iter().enumerate() {
            let mut best: Option<(usize, f32)> = None;
            for (det_idx, &iou_val) in row.iter().enumerate() {
                if claimed[det_idx] || iou_val < iou_threshold {
                    continue;
                }
                if best.map_or(true, |(_, best_iou)| iou_val > best_iou) {
                    best = Some((det_idx, iou_val));
                }
            }
            match best {
                Some((det_idx, _)) => {
                    claimed[det_idx] = true;
                    result.matches.push((track_idx, det_idx));
                }
                None => result.unmatched_tracks.push(track_idx),
            }
        }
        result.unmatched_detections = (0..num_detections)
            .filter(|&det| !claimed[det])
            .collect();
        Ok(result)
    }
}

fn all_unmatched(num_tracks: usize, num_detections: usize) -> Association {
    Association {
        matches: Vec::new(),
        unmatched_tracks: (0..num_tracks).collect(),
        unmatched_detections: (0..num_detections).collect(),
    }
}
