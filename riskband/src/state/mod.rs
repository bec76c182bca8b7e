pub mod frequency;
pub mod window;
