use nalgebra::{SMatrix, SVector};

use crate::mot::mot_errors::TrackerError;
use crate::utils::{observation_to_rect, rect_to_observation, Rect};

/// State dimension: [cx, cy, s, r, vx, vy, vs]
const DIM_X: usize = 7;
/// Observation dimension: [cx, cy, s, r]
const DIM_Z: usize = 4;

type StateVector = SVector<f32, DIM_X>;
type StateMatrix = SMatrix<f32, DIM_X, DIM_X>;
type ObservationVector = SVector<f32, DIM_Z>;
type ObservationMatrix = SMatrix<f32, DIM_Z, DIM_Z>;
type ProjectionMatrix = SMatrix<f32, DIM_Z, DIM_X>;

/// Constant-velocity Kalman filter over a single bounding box.
///
/// State vector follows the conventional SORT parameterization:
/// center x, center y, scale (area), aspect ratio, and velocities for the
/// first three. Aspect ratio is assumed constant. Only the four positional
/// components are observed; velocities are inferred by the filter from
/// repeated position updates.
#[derive(Debug, Clone)]
pub struct KalmanBoxFilter {
    /// State estimate
    x: StateVector,
    /// State covariance
    p: StateMatrix,
    /// State transition
    f: StateMatrix,
    /// Observation projection
    h: ProjectionMatrix,
    /// Observation noise covariance
    r: ObservationMatrix,
    /// Process noise covariance
    q: StateMatrix,
}

impl KalmanBoxFilter {
    /// Creates a filter seeded from the first observed box: zero velocity,
    /// low positional uncertainty and high velocity uncertainty.
    ///
    /// Basic usage:
    ///
    /// ```
    /// use sort_rs::mot::KalmanBoxFilter;
    /// use sort_rs::utils::Rect;
    /// let kf = KalmanBoxFilter::new(&Rect::new(0.0, 0.0, 10.0, 10.0));
    /// assert_eq!(kf.state_rect(), Rect::new(0.0, 0.0, 10.0, 10.0));
    /// ```
    pub fn new(bbox: &Rect) -> Self {
        let z = rect_to_observation(bbox);
        let x = StateVector::from_column_slice(&[z[0], z[1], z[2], z[3], 0.0, 0.0, 0.0]);
        let p = StateMatrix::from_diagonal(&StateVector::from_column_slice(&[
            10.0, 10.0, 10.0, 10.0, 10000.0, 10000.0, 10000.0,
        ]));
        #[rustfmt::skip]
        let f = StateMatrix::from_row_slice(&[
            1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, // cx' = cx + vx
            0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, // cy' = cy + vy
            0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, // s'  = s + vs
            0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, // r'  = r
            0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0,
        ]);
        #[rustfmt::skip]
        let h = ProjectionMatrix::from_row_slice(&[
            1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0,
        ]);
        let r = ObservationMatrix::from_diagonal(&ObservationVector::from_column_slice(&[
            1.0, 1.0, 10.0, 10.0,
        ]));
        let q = StateMatrix::from_diagonal(&StateVector::from_column_slice(&[
            1.0, 1.0, 1.0, 1.0, 0.01, 0.01, 0.0001,
        ]));
        KalmanBoxFilter { x, p, f, h, r, q }
    }

    /// Advances the state one frame by the constant-velocity transition and
    /// grows the covariance by the process noise. Returns the predicted box.
    ///
    /// The scale velocity is clamped so the predicted area cannot go negative.
    pub fn predict(&mut self) -> Rect {
        if self.x[6] + self.x[2] <= 0.0 {
            self.x[6] = 0.0;
        }
        self.x = self.f * self.x;
        self.p = self.f * self.p * self.f.transpose() + self.q;
        self.state_rect()
    }

    /// Corrects the state from an observed box (standard Kalman gain update).
    pub fn update(&mut self, bbox: &Rect) -> Result<(), TrackerError> {
        let z = ObservationVector::from_column_slice(&rect_to_observation(bbox));
        let y = z - self.h * self.x;
        let s = self.h * self.p * self.h.transpose() + self.r;
        let s_inv = s.try_inverse().ok_or_else(|| {
            TrackerError::KalmanError(
                "innovation covariance matrix is not invertible".to_string(),
            )
        })?;
        let k = self.p * self.h.transpose() * s_inv;
        self.x += k * y;
        self.p = (StateMatrix::identity() - k * self.h) * self.p;
        Ok(())
    }

    /// Current state estimate rendered as a rectangle.
    pub fn state_rect(&self) -> Rect {
        observation_to_rect(&[self.x[0], self.x[1], self.x[2], self.x[3]])
    }

    /// Current velocity estimate (vx, vy, vs).
    pub fn velocity(&self) -> (f32, f32, f32) {
        (self.x[4], self.x[5], self.x[6])
    }
}
