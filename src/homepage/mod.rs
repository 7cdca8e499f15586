pub mod assemble;
pub mod document;
pub mod normalize;
pub mod pool;
pub mod sampler;
pub mod score;
