pub mod classifier;
pub mod remote_classifier;
