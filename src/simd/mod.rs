mod engine;

pub use engine::SIMDEngine;
