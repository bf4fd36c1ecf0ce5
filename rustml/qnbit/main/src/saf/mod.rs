//! Facade re-exports for rustml-qnbit

pub use crate::api::error::*;
pub use crate::api::types::*;
pub use crate::core::cast::{
    cast_f16_to_f32, cast_f16_to_f32_par, cast_f16_to_f32_scalar_ref, cast_f32_to_f16,
    cast_f32_to_f16_par, cast_f32_to_f16_scalar_ref, narrow_f32, widen_f16,
};
pub use crate::core::prepack::{
    pack_quant_b_data, pack_quant_b_data_size, packed_nibble, unpack_quant_b_data,
};
pub use crate::core::runtime::{OptProfile, RuntimeConfig};
pub use crate::core::simd;
