use thiserror::Error;

/// Errors surfaced by the tracking engine.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Rejected configuration at construction time. The tracker instance is
    /// not created.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// Malformed detection input. The whole frame step is rejected and no
    /// track state is mutated.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Numeric failure inside the Kalman correction step (innovation
    /// covariance is not invertible).
    #[error("kalman filter error: {0}")]
    KalmanError(String),
    /// The assignment problem as posed here is always feasible, so this
    /// signals an internal invariant violation rather than a caller error.
    #[error("assignment solver infeasible: {0}")]
    SolverInfeasible(String),
}
