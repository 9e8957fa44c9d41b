//! Question-to-widget core: typed intents, SQL construction and result shaping.

pub mod builder;
pub mod intent;
pub mod shaper;
