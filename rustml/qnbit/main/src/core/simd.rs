//! SIMD kernels for quantized B prepacking and f16 <-> f32 conversion.
//!
//! Uses `std::arch` intrinsics (and `asm!` where the intrinsics are not
//! stable) with scalar fallbacks. No nightly features required.
//!
//! Dispatch hierarchy:
//! - x86_64: AVX2+F16C (8 halves/step) -> SSE2 transpose + scalar cast
//! - aarch64: NEON transpose, `fcvtl`/`fcvtn` conversion
//! - Other: scalar fallback
use crate::api::types::{SimdBackend, CAST_VECTOR_WIDTH, PACK_TILE_BYTES, PACK_TILE_COLS};

/// Widen one IEEE binary16 bit pattern to f32.
///
/// Exact for every finite pattern. Signaling NaNs come back quiet, matching
/// what the hardware converters do.
pub fn f16_bits_to_f32(half: u16) -> f32 {
    let sign = ((half & 0x8000) as u32) << 16;
    let exp = ((half >> 10) & 0x1F) as u32;
    let man = (half & 0x03FF) as u32;

    let bits = match exp {
        0 if man == 0 => sign,
        0 => {
            // Subnormal: shift the leading one into the implicit bit position.
            let shift = man.leading_zeros() - 21;
            let man = (man << shift) & 0x03FF;
            sign | ((113 - shift) << 23) | (man << 13)
        }
        0x1F if man == 0 => sign | 0x7F80_0000,
        0x1F => sign | 0x7FC0_0000 | (man << 13),
        _ => sign | ((exp + 112) << 23) | (man << 13),
    };
    f32::from_bits(bits)
}

/// Narrow one f32 to an IEEE binary16 bit pattern, rounding to nearest even.
///
/// Overflow saturates to signed infinity, tiny values underflow through the
/// subnormal range to signed zero, NaN stays a quiet NaN.
pub fn f32_to_f16_bits(value: f32) -> u16 {
    let x = value.to_bits();
    let sign = x & 0x8000_0000;
    let exp = x & 0x7F80_0000;
    let man = x & 0x007F_FFFF;
    let half_sign = sign >> 16;

    if exp == 0x7F80_0000 {
        let nan_bit = if man == 0 { 0 } else { 0x0200 };
        return (half_sign | 0x7C00 | nan_bit | (man >> 13)) as u16;
    }

    let half_exp = ((exp >> 23) as i32) - 127 + 15;
    if half_exp >= 0x1F {
        return (half_sign | 0x7C00) as u16;
    }

    if half_exp <= 0 {
        if half_exp < -10 {
            return half_sign as u16;
        }
        let man = man | 0x0080_0000;
        let mut half_man = man >> (14 - half_exp);
        let round_bit = 1u32 << (13 - half_exp);
        if (man & round_bit) != 0 && (man & (3 * round_bit - 1)) != 0 {
            half_man += 1;
        }
        return (half_sign | half_man) as u16;
    }

    let packed = half_sign | ((half_exp as u32) << 10) | (man >> 13);
    let round_bit = 0x0000_1000;
    // A carry out of the mantissa bumps the exponent, up to infinity.
    if (man & round_bit) != 0 && (man & (3 * round_bit - 1)) != 0 {
        (packed + 1) as u16
    } else {
        packed as u16
    }
}

/// Scalar 8x8 byte transpose: `dst[r * 8 + c] = src[c * stride + r]`.
fn transpose_8x8_scalar(src: &[u8], stride: usize, dst: &mut [u8]) {
    for c in 0..PACK_TILE_COLS {
        for r in 0..PACK_TILE_BYTES {
            dst[r * PACK_TILE_COLS + c] = src[c * stride + r];
        }
    }
}

// --- x86_64 SIMD implementations ---

#[cfg(target_arch = "x86_64")]
mod x86 {
    #[target_feature(enable = "sse2")]
    pub(super) unsafe fn transpose_8x8_sse2(src: &[u8], stride: usize, dst: &mut [u8]) {
        use std::arch::x86_64::*;

        let p = src.as_ptr();
        let a0 = _mm_loadl_epi64(p as *const __m128i);
        let a1 = _mm_loadl_epi64(p.add(stride) as *const __m128i);
        let a2 = _mm_loadl_epi64(p.add(2 * stride) as *const __m128i);
        let a3 = _mm_loadl_epi64(p.add(3 * stride) as *const __m128i);
        let a4 = _mm_loadl_epi64(p.add(4 * stride) as *const __m128i);
        let a5 = _mm_loadl_epi64(p.add(5 * stride) as *const __m128i);
        let a6 = _mm_loadl_epi64(p.add(6 * stride) as *const __m128i);
        let a7 = _mm_loadl_epi64(p.add(7 * stride) as *const __m128i);

        // Byte pairs, then quads, then full 8-byte output rows.
        let t0 = _mm_unpacklo_epi8(a0, a1);
        let t1 = _mm_unpacklo_epi8(a2, a3);
        let t2 = _mm_unpacklo_epi8(a4, a5);
        let t3 = _mm_unpacklo_epi8(a6, a7);

        let u0 = _mm_unpacklo_epi16(t0, t1);
        let u1 = _mm_unpackhi_epi16(t0, t1);
        let u2 = _mm_unpacklo_epi16(t2, t3);
        let u3 = _mm_unpackhi_epi16(t2, t3);

        let rows01 = _mm_unpacklo_epi32(u0, u2);
        let rows23 = _mm_unpackhi_epi32(u0, u2);
        let rows45 = _mm_unpacklo_epi32(u1, u3);
        let rows67 = _mm_unpackhi_epi32(u1, u3);

        let q = dst.as_mut_ptr();
        _mm_storeu_si128(q as *mut __m128i, rows01);
        _mm_storeu_si128(q.add(16) as *mut __m128i, rows23);
        _mm_storeu_si128(q.add(32) as *mut __m128i, rows45);
        _mm_storeu_si128(q.add(48) as *mut __m128i, rows67);
    }

    #[target_feature(enable = "avx,f16c")]
    pub(super) unsafe fn cvt_f16_to_f32_f16c(src: &[u16], dst: &mut [f32]) -> usize {
        use std::arch::x86_64::*;

        let steps = src.len() / 8;
        for i in 0..steps {
            let h = _mm_loadu_si128(src.as_ptr().add(i * 8) as *const __m128i);
            _mm256_storeu_ps(dst.as_mut_ptr().add(i * 8), _mm256_cvtph_ps(h));
        }
        steps * 8
    }

    #[target_feature(enable = "avx,f16c")]
    pub(super) unsafe fn cvt_f32_to_f16_f16c(src: &[f32], dst: &mut [u16]) -> usize {
        use std::arch::x86_64::*;

        let steps = src.len() / 8;
        for i in 0..steps {
            let f = _mm256_loadu_ps(src.as_ptr().add(i * 8));
            let h = _mm256_cvtps_ph::<_MM_FROUND_TO_NEAREST_INT>(f);
            _mm_storeu_si128(dst.as_mut_ptr().add(i * 8) as *mut __m128i, h);
        }
        steps * 8
    }
}

// --- aarch64 SIMD implementations ---

#[cfg(target_arch = "aarch64")]
mod arm {
    pub(super) unsafe fn transpose_8x8_neon(src: &[u8], stride: usize, dst: &mut [u8]) {
        use std::arch::aarch64::*;

        let p = src.as_ptr();
        let a0 = vld1_u8(p);
        let a1 = vld1_u8(p.add(stride));
        let a2 = vld1_u8(p.add(2 * stride));
        let a3 = vld1_u8(p.add(3 * stride));
        let a4 = vld1_u8(p.add(4 * stride));
        let a5 = vld1_u8(p.add(5 * stride));
        let a6 = vld1_u8(p.add(6 * stride));
        let a7 = vld1_u8(p.add(7 * stride));

        let t0 = vreinterpretq_u16_u8(vcombine_u8(vzip1_u8(a0, a1), vzip2_u8(a0, a1)));
        let t1 = vreinterpretq_u16_u8(vcombine_u8(vzip1_u8(a2, a3), vzip2_u8(a2, a3)));
        let t2 = vreinterpretq_u16_u8(vcombine_u8(vzip1_u8(a4, a5), vzip2_u8(a4, a5)));
        let t3 = vreinterpretq_u16_u8(vcombine_u8(vzip1_u8(a6, a7), vzip2_u8(a6, a7)));

        let u0 = vreinterpretq_u32_u16(vzip1q_u16(t0, t1));
        let u1 = vreinterpretq_u32_u16(vzip2q_u16(t0, t1));
        let u2 = vreinterpretq_u32_u16(vzip1q_u16(t2, t3));
        let u3 = vreinterpretq_u32_u16(vzip2q_u16(t2, t3));

        let q = dst.as_mut_ptr();
        vst1q_u8(q, vreinterpretq_u8_u32(vzip1q_u32(u0, u2)));
        vst1q_u8(q.add(16), vreinterpretq_u8_u32(vzip2q_u32(u0, u2)));
        vst1q_u8(q.add(32), vreinterpretq_u8_u32(vzip1q_u32(u1, u3)));
        vst1q_u8(q.add(48), vreinterpretq_u8_u32(vzip2q_u32(u1, u3)));
    }

    // The float16x8_t conversion intrinsics are not stable yet; fcvtl/fcvtn
    // are base Advanced SIMD, so inline asm is enough.
    pub(super) unsafe fn cvt_f16_to_f32_neon(src: &[u16], dst: &mut [f32]) -> usize {
        use std::arch::asm;

        let steps = src.len() / 8;
        for i in 0..steps {
            asm!(
                "ld1 {{v0.8h}}, [{src}]",
                "fcvtl v1.4s, v0.4h",
                "fcvtl2 v2.4s, v0.8h",
                "st1 {{v1.4s, v2.4s}}, [{dst}]",
                src = in(reg) src.as_ptr().add(i * 8),
                dst = in(reg) dst.as_mut_ptr().add(i * 8),
                out("v0") _,
                out("v1") _,
                out("v2") _,
                options(nostack, preserves_flags),
            );
        }
        steps * 8
    }

    pub(super) unsafe fn cvt_f32_to_f16_neon(src: &[f32], dst: &mut [u16]) -> usize {
        use std::arch::asm;

        let steps = src.len() / 8;
        for i in 0..steps {
            asm!(
                "ld1 {{v0.4s, v1.4s}}, [{src}]",
                "fcvtn v2.4h, v0.4s",
                "fcvtn2 v2.8h, v1.4s",
                "st1 {{v2.8h}}, [{dst}]",
                src = in(reg) src.as_ptr().add(i * 8),
                dst = in(reg) dst.as_mut_ptr().add(i * 8),
                out("v0") _,
                out("v1") _,
                out("v2") _,
                options(nostack, preserves_flags),
            );
        }
        steps * 8
    }
}

// --- Public dispatch functions ---

/// Best instruction set available for these kernels on the running CPU.
pub fn detect_backend() -> SimdBackend {
    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("f16c") {
            return SimdBackend::Avx2F16c;
        }
        return SimdBackend::Sse2;
    }

    #[cfg(target_arch = "aarch64")]
    {
        return SimdBackend::Neon;
    }

    #[allow(unreachable_code)]
    SimdBackend::Scalar
}

/// Runtime-dispatched 8x8 byte transpose.
///
/// Reads 8 rows of 8 bytes, row `c` starting at `src[c * stride]`, and writes
/// them as 8 columns into the 64 contiguous bytes of `dst`:
/// `dst[r * 8 + c] = src[c * stride + r]`.
pub fn transpose_8x8(src: &[u8], stride: usize, dst: &mut [u8]) {
    assert!(stride >= PACK_TILE_BYTES);
    assert!(src.len() >= (PACK_TILE_COLS - 1) * stride + PACK_TILE_BYTES);
    assert!(dst.len() >= PACK_TILE_COLS * PACK_TILE_BYTES);

    #[cfg(target_arch = "x86_64")]
    {
        return unsafe { x86::transpose_8x8_sse2(src, stride, dst) };
    }

    #[cfg(target_arch = "aarch64")]
    {
        return unsafe { arm::transpose_8x8_neon(src, stride, dst) };
    }

    #[allow(unreachable_code)]
    transpose_8x8_scalar(src, stride, dst)
}

/// Vector part of f16 -> f32 widening.
///
/// Converts the longest prefix that is a whole number of vector steps and
/// returns its length; the caller finishes the remainder with
/// `f16_bits_to_f32`. Returns 0 when no native conversion exists.
pub fn cvt_f16_to_f32_vector(src: &[u16], dst: &mut [f32]) -> usize {
    let len = src.len().min(dst.len());
    if len < CAST_VECTOR_WIDTH {
        return 0;
    }

    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx") && is_x86_feature_detected!("f16c") {
            return unsafe { x86::cvt_f16_to_f32_f16c(&src[..len], &mut dst[..len]) };
        }
    }

    #[cfg(target_arch = "aarch64")]
    {
        return unsafe { arm::cvt_f16_to_f32_neon(&src[..len], &mut dst[..len]) };
    }

    #[allow(unreachable_code)]
    0
}

/// Vector part of f32 -> f16 narrowing (round to nearest even).
///
/// Same prefix contract as `cvt_f16_to_f32_vector`.
pub fn cvt_f32_to_f16_vector(src: &[f32], dst: &mut [u16]) -> usize {
    let len = src.len().min(dst.len());
    if len < CAST_VECTOR_WIDTH {
        return 0;
    }

    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx") && is_x86_feature_detected!("f16c") {
            return unsafe { x86::cvt_f32_to_f16_f16c(&src[..len], &mut dst[..len]) };
        }
    }

    #[cfg(target_arch = "aarch64")]
    {
        return unsafe { arm::cvt_f32_to_f16_neon(&src[..len], &mut dst[..len]) };
    }

    #[allow(unreachable_code)]
    0
}

/// Scalar-only 8x8 byte transpose (for testing).
pub fn transpose_8x8_scalar_ref(src: &[u8], stride: usize, dst: &mut [u8]) {
    transpose_8x8_scalar(src, stride, dst)
}
