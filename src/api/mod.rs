pub mod index;
pub mod relay;
