//! Paleomagnetic primitives.
//!
//! - [`direction`]: directions, pole positions, great-circle distance
//! - [`transform`]: direction ↔ VGP at a site
//! - [`fisher`]: Fisher mean and its statistics
//! - [`vandamme`]: iterative VGP cutoff
//! - [`tk03`]: TK03.GAD field model for drawing site directions

pub mod direction;
pub mod fisher;
pub mod tk03;
pub mod transform;
pub mod vandamme;

pub use direction::{great_circle_distance, wrap_degrees, Direction, Pole};
pub use fisher::{fisher_mean, FisherMean};
pub use tk03::Tk03;
pub use transform::{direction_to_vgp, vgp_to_direction};
pub use vandamme::{vandamme_cutoff, VandammeCutoff};
