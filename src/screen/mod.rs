pub mod detector;
pub mod normalize;
pub mod screen_model;
