//! # RustML QNBit
//!
//! Load-time and inference-time helpers for 4-bit block-quantized GEMM.
//!
//! This crate provides:
//! - Prepacking of 4-bit quantized B matrices into the 8-column tiled
//!   layout consumed by fp16 SIMD GEMM kernels
//! - Vectorized f16 <-> f32 buffer conversion with a scalar tail path
//!
//! ## Example
//!
//! ```rust
//! use rustml_qnbit::{pack_quant_b_data, pack_quant_b_data_size, ComputeType};
//!
//! let (n, k, blk_len) = (9, 31, 16);
//! let size = pack_quant_b_data_size(n, k, 4, blk_len, ComputeType::Fp16).unwrap();
//! let src = vec![0x21u8; size];
//! let mut packed = vec![0u8; size];
//! pack_quant_b_data(n, k, 4, blk_len, ComputeType::Fp16, &src, &mut packed, None).unwrap();
//! ```

pub mod api;
mod core;
mod saf;

pub use saf::*;
