pub mod paint;
pub mod render;
pub mod script;
