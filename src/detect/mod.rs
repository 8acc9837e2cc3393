mod domain;
mod normalize;

pub use domain::Domain;
pub use normalize::{normalize, Announcement, UNKNOWN_OBJECT_LABEL};
