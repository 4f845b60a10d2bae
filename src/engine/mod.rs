pub mod components;
pub mod core;
pub mod input;
pub mod rendering;
