//! Impulsive transfer utilities: classical two-burn transfers and a Lambert intercept planner.

pub mod lambert;
pub mod transfers;

pub use lambert::{Intercept, LambertSolverError, intercept, solve as lambert_solve};
pub use transfers::{BiEllipticTransfer, TransferError, TransferOrbit, bi_elliptic, hohmann};
