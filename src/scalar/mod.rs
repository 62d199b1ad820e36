mod engine;

pub use engine::ScalarEngine;
