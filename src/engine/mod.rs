pub mod arena;
pub mod assets;
pub mod transform;
