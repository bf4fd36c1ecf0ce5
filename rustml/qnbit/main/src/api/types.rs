//! Core types for quantized B packing and precision casts

use crate::api::error::{QuantError, QuantResult};

/// Bit width of every quantized element handled by this crate.
pub const QNBIT_BITS: usize = 4;

/// Columns per prepack tile (one SIMD lane per column).
pub const PACK_TILE_COLS: usize = 8;

/// Bytes per column chunk inside a prepack tile.
pub const PACK_TILE_BYTES: usize = 8;

/// Smallest supported quantization block length.
pub const MIN_BLK_LEN: usize = 16;

/// Largest supported quantization block length.
pub const MAX_BLK_LEN: usize = 256;

/// Elements converted per vector step by the cast kernels.
pub const CAST_VECTOR_WIDTH: usize = 8;

/// Compute type of the GEMM that will consume the packed B matrix.
///
/// Each compute type has its own tiling convention; only `Fp16` has a
/// prepack rule in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ComputeType {
    #[default]
    Undef,
    Fp32,
    Fp16,
    Bf16,
    Int8,
}

impl ComputeType {
    /// Whether `pack_quant_b_data` has a layout rule for this compute type.
    pub fn has_prepack_layout(&self) -> bool {
        matches!(self, ComputeType::Fp16)
    }
}

impl std::fmt::Display for ComputeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComputeType::Undef => write!(f, "undef"),
            ComputeType::Fp32 => write!(f, "fp32"),
            ComputeType::Fp16 => write!(f, "fp16"),
            ComputeType::Bf16 => write!(f, "bf16"),
            ComputeType::Int8 => write!(f, "int8"),
        }
    }
}

/// Instruction set used by the vector kernels on this machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimdBackend {
    /// x86_64 with AVX2 and F16C: 8-wide hardware f16 conversion
    Avx2F16c,
    /// x86_64 baseline: SSE2 transpose, scalar f16 conversion
    Sse2,
    /// aarch64 Advanced SIMD
    Neon,
    Scalar,
}

impl SimdBackend {
    /// Whether f16 <-> f32 conversion runs on native vector instructions.
    pub fn has_native_f16(&self) -> bool {
        matches!(self, SimdBackend::Avx2F16c | SimdBackend::Neon)
    }
}

impl std::fmt::Display for SimdBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimdBackend::Avx2F16c => write!(f, "AVX2+F16C"),
            SimdBackend::Sse2 => write!(f, "SSE2"),
            SimdBackend::Neon => write!(f, "NEON"),
            SimdBackend::Scalar => write!(f, "scalar"),
        }
    }
}

/// Shape of a column-major 4-bit quantized B matrix.
///
/// `n` columns (output features) of `k` elements each, grouped into blocks of
/// `blk_len` along K. Every column is padded up to a whole number of blocks
/// and stored in `ldb()` bytes, two elements per byte with the lower K index
/// in the low nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantBDataLayout {
    n: usize,
    k: usize,
    blk_len: usize,
}

impl QuantBDataLayout {
    /// Validate a shape. Only 4-bit data and power-of-two block lengths in
    /// `[MIN_BLK_LEN, MAX_BLK_LEN]` are accepted.
    pub fn new(n: usize, k: usize, bits: usize, blk_len: usize) -> QuantResult<Self> {
        if bits != QNBIT_BITS {
            return Err(QuantError::UnsupportedBits(bits));
        }
        if !blk_len.is_power_of_two() || !(MIN_BLK_LEN..=MAX_BLK_LEN).contains(&blk_len) {
            return Err(QuantError::InvalidBlockLen(blk_len));
        }
        if n == 0 || k == 0 {
            return Err(QuantError::InvalidDimension(format!(
                "N and K must be non-zero, got N={} K={}",
                n, k
            )));
        }
        Ok(Self { n, k, blk_len })
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn blk_len(&self) -> usize {
        self.blk_len
    }

    /// K rounded up to a whole number of quantization blocks.
    pub fn k_padded(&self) -> usize {
        self.k.div_ceil(self.blk_len) * self.blk_len
    }

    /// Bytes per column.
    pub fn ldb(&self) -> usize {
        (self.k_padded() * QNBIT_BITS).div_ceil(8)
    }

    /// Total buffer size, identical for the source and packed layouts.
    pub fn size_in_bytes(&self) -> usize {
        self.n * self.ldb()
    }

    /// Columns covered by full 8-column transpose tiles.
    pub fn full_tile_cols(&self) -> usize {
        self.n - self.tail_cols()
    }

    /// Trailing columns handled by the nibble regroup path.
    pub fn tail_cols(&self) -> usize {
        self.n % PACK_TILE_COLS
    }
}
