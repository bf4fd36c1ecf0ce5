use crate::api::error::{QuantError, QuantResult};
use crate::api::types::CAST_VECTOR_WIDTH;
use crate::core::runtime::CAST_PAR_THRESHOLD;
use crate::core::simd;
use half::f16;
use rayon::prelude::*;
use std::sync::atomic::Ordering;
use std::time::Instant;

/// Widen f16 bit patterns to f32.
///
/// Full vector steps use the hardware converter, the remaining
/// `len % 8` elements go through the scalar path with the same semantics.
/// `src` and `dst` must have the same length.
pub fn cast_f16_to_f32(src: &[u16], dst: &mut [f32]) -> QuantResult<()> {
    check_len(src.len(), dst.len())?;
    widen(src, dst);
    Ok(())
}

/// Narrow f32 values to f16 bit patterns, rounding to nearest even.
pub fn cast_f32_to_f16(src: &[f32], dst: &mut [u16]) -> QuantResult<()> {
    check_len(src.len(), dst.len())?;
    narrow(src, dst);
    Ok(())
}

/// `cast_f16_to_f32` over `half::f16` values.
pub fn widen_f16(src: &[f16], dst: &mut [f32]) -> QuantResult<()> {
    cast_f16_to_f32(bytemuck::cast_slice(src), dst)
}

/// `cast_f32_to_f16` into `half::f16` values.
pub fn narrow_f32(src: &[f32], dst: &mut [f16]) -> QuantResult<()> {
    cast_f32_to_f16(src, bytemuck::cast_slice_mut(dst))
}

/// Parallel `cast_f16_to_f32` for large buffers.
///
/// Buffers shorter than the configured threshold take the sequential path.
pub fn cast_f16_to_f32_par(src: &[u16], dst: &mut [f32]) -> QuantResult<()> {
    check_len(src.len(), dst.len())?;
    let _t = if log::log_enabled!(log::Level::Trace) { Some(Instant::now()) } else { None };

    match par_chunk_len(src.len()) {
        Some(chunk) => dst
            .par_chunks_mut(chunk)
            .zip(src.par_chunks(chunk))
            .for_each(|(d, s)| widen(s, d)),
        None => widen(src, dst),
    }

    if let Some(t) = _t {
        log::trace!("[perf] qnbit::cast_f16_to_f32_par len={} {:.3}ms",
            src.len(), t.elapsed().as_secs_f64() * 1000.0);
    }
    Ok(())
}

/// Parallel `cast_f32_to_f16` for large buffers.
pub fn cast_f32_to_f16_par(src: &[f32], dst: &mut [u16]) -> QuantResult<()> {
    check_len(src.len(), dst.len())?;
    let _t = if log::log_enabled!(log::Level::Trace) { Some(Instant::now()) } else { None };

    match par_chunk_len(src.len()) {
        Some(chunk) => dst
            .par_chunks_mut(chunk)
            .zip(src.par_chunks(chunk))
            .for_each(|(d, s)| narrow(s, d)),
        None => narrow(src, dst),
    }

    if let Some(t) = _t {
        log::trace!("[perf] qnbit::cast_f32_to_f16_par len={} {:.3}ms",
            src.len(), t.elapsed().as_secs_f64() * 1000.0);
    }
    Ok(())
}

/// Scalar-only widening (for testing).
pub fn cast_f16_to_f32_scalar_ref(src: &[u16], dst: &mut [f32]) -> QuantResult<()> {
    check_len(src.len(), dst.len())?;
    for (s, d) in src.iter().zip(dst.iter_mut()) {
        *d = simd::f16_bits_to_f32(*s);
    }
    Ok(())
}

/// Scalar-only narrowing (for testing).
pub fn cast_f32_to_f16_scalar_ref(src: &[f32], dst: &mut [u16]) -> QuantResult<()> {
    check_len(src.len(), dst.len())?;
    for (s, d) in src.iter().zip(dst.iter_mut()) {
        *d = simd::f32_to_f16_bits(*s);
    }
    Ok(())
}

fn check_len(src: usize, dst: usize) -> QuantResult<()> {
    if src != dst {
        return Err(QuantError::ShapeMismatch {
            expected: vec![src],
            actual: vec![dst],
        });
    }
    Ok(())
}

fn widen(src: &[u16], dst: &mut [f32]) {
    let done = simd::cvt_f16_to_f32_vector(src, dst);
    for (s, d) in src[done..].iter().zip(dst[done..].iter_mut()) {
        *d = simd::f16_bits_to_f32(*s);
    }
}

fn narrow(src: &[f32], dst: &mut [u16]) {
    let done = simd::cvt_f32_to_f16_vector(src, dst);
    for (s, d) in src[done..].iter().zip(dst[done..].iter_mut()) {
        *d = simd::f32_to_f16_bits(*s);
    }
}

/// Per-task chunk length, a whole number of vector steps so that only the
/// final chunk has a scalar tail. `None` below the parallel threshold.
fn par_chunk_len(len: usize) -> Option<usize> {
    if len < CAST_PAR_THRESHOLD.load(Ordering::Relaxed) {
        return None;
    }
    let per_thread = len.div_ceil(rayon::current_num_threads());
    Some(per_thread.next_multiple_of(CAST_VECTOR_WIDTH).max(CAST_VECTOR_WIDTH))
}
