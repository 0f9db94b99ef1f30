//! Data types shared by the fetch, normalize, and reconcile stages.

mod audit;
mod cell;
mod grid;
mod location;
mod outcome;
mod record;

pub use audit::*;
pub use cell::*;
pub use grid::*;
pub use location::*;
pub use outcome::*;
pub use record::*;
