pub mod cast;
pub mod prepack;
pub mod runtime;
pub mod simd;
