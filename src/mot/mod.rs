//! Export contents of `mot` folder
mod assignment;
mod kalman;
mod mot_errors;
mod sort;
mod track;

pub use self::{assignment::*, kalman::*, mot_errors::*, sort::*, track::*};
