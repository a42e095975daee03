pub mod accounting;
pub mod asset;
pub mod decision;
pub mod history;
pub mod market;
pub mod model;
pub mod point;
pub mod product;
pub mod solar;
pub mod summary;

use crate::quantity::time::Hours;

/// Duration of every time step, the data and the model are strictly hourly.
pub const STEP: Hours = Hours::ONE;
