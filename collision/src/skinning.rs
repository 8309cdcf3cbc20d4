pub mod bone;
pub mod pose;
pub mod skinner;
pub mod source;
