use crate::api::error::{QuantError, QuantResult};
use crate::api::types::*;
use crate::core::runtime::PACK_PAR_THRESHOLD;
use crate::core::simd;
use rayon::prelude::*;
use std::sync::atomic::Ordering;
use std::time::Instant;

/// Size in bytes of the packed B buffer, or `None` when the combination has
/// no packing rule (unsupported bit width, block length, compute type, or a
/// zero dimension).
pub fn pack_quant_b_data_size(
    n: usize,
    k: usize,
    bits: usize,
    blk_len: usize,
    compute_type: ComputeType,
) -> Option<usize> {
    if !compute_type.has_prepack_layout() {
        return None;
    }
    QuantBDataLayout::new(n, k, bits, blk_len)
        .ok()
        .map(|layout| layout.size_in_bytes())
}

/// Repack a column-major 4-bit quantized B matrix for the fp16 GEMM kernel.
///
/// `src` holds `n` columns of `ldb` bytes each (two elements per byte, lower
/// K index in the low nibble). The packed layout has the same size:
/// - every group of 8 columns is stored as 8x8 byte tiles, so that byte `b`
///   of column `n0 + c` lands at `n0 * ldb + b * 8 + c`;
/// - each of the last `n % 8` columns keeps its own `ldb` bytes, but every
///   16-element group is regrouped so that byte `i` holds elements `i`
///   (low nibble) and `i + 8` (high nibble).
///
/// `workspace` is accepted for parity with other compute types; the fp16
/// layout does not need one.
#[allow(clippy::too_many_arguments)]
pub fn pack_quant_b_data(
    n: usize,
    k: usize,
    bits: usize,
    blk_len: usize,
    compute_type: ComputeType,
    src: &[u8],
    dst: &mut [u8],
    workspace: Option<&mut [u8]>,
) -> QuantResult<()> {
    let _t = if log::log_enabled!(log::Level::Trace) { Some(Instant::now()) } else { None };
    let layout = QuantBDataLayout::new(n, k, bits, blk_len)?;
    if !compute_type.has_prepack_layout() {
        return Err(QuantError::UnsupportedComputeType(compute_type));
    }
    check_buffer(&layout, src.len())?;
    check_buffer(&layout, dst.len())?;
    let _ = workspace;

    let ldb = layout.ldb();
    let tile_bytes = PACK_TILE_COLS * ldb;
    let (src_tiles, src_tail) = src.split_at(layout.full_tile_cols() * ldb);
    let (dst_tiles, dst_tail) = dst.split_at_mut(layout.full_tile_cols() * ldb);

    if n >= PACK_PAR_THRESHOLD.load(Ordering::Relaxed) {
        dst_tiles
            .par_chunks_mut(tile_bytes)
            .zip(src_tiles.par_chunks(tile_bytes))
            .for_each(|(d, s)| transpose_tile(s, ldb, d));
        dst_tail
            .par_chunks_mut(ldb)
            .zip(src_tail.par_chunks(ldb))
            .for_each(|(d, s)| regroup_column(s, d));
    } else {
        for (d, s) in dst_tiles.chunks_mut(tile_bytes).zip(src_tiles.chunks(tile_bytes)) {
            transpose_tile(s, ldb, d);
        }
        for (d, s) in dst_tail.chunks_mut(ldb).zip(src_tail.chunks(ldb)) {
            regroup_column(s, d);
        }
    }

    if let Some(t) = _t {
        log::trace!("[perf] qnbit::pack_quant_b_data N={} K={} blk_len={} tiles={} tail={} {:.3}ms",
            n, k, blk_len, layout.full_tile_cols() / PACK_TILE_COLS, layout.tail_cols(),
            t.elapsed().as_secs_f64() * 1000.0);
    }
    Ok(())
}

/// Restore the column-major source layout from a packed buffer.
pub fn unpack_quant_b_data(layout: &QuantBDataLayout, packed: &[u8], dst: &mut [u8]) -> QuantResult<()> {
    check_buffer(layout, packed.len())?;
    check_buffer(layout, dst.len())?;

    let ldb = layout.ldb();
    let tile_bytes = PACK_TILE_COLS * ldb;
    let (packed_tiles, packed_tail) = packed.split_at(layout.full_tile_cols() * ldb);
    let (dst_tiles, dst_tail) = dst.split_at_mut(layout.full_tile_cols() * ldb);

    for (d, p) in dst_tiles.chunks_mut(tile_bytes).zip(packed_tiles.chunks(tile_bytes)) {
        for b in 0..ldb {
            for c in 0..PACK_TILE_COLS {
                d[c * ldb + b] = p[b * PACK_TILE_COLS + c];
            }
        }
    }

    for (d, p) in dst_tail.chunks_mut(ldb).zip(packed_tail.chunks(ldb)) {
        for (out, group) in d.chunks_exact_mut(PACK_TILE_BYTES).zip(p.chunks_exact(PACK_TILE_BYTES)) {
            let element = |e: usize| {
                if e < 8 { group[e] & 0x0F } else { group[e - 8] >> 4 }
            };
            for (b, byte) in out.iter_mut().enumerate() {
                *byte = element(2 * b) | (element(2 * b + 1) << 4);
            }
        }
    }
    Ok(())
}

/// Read element (`col`, `k_index`) of a packed B buffer.
///
/// `k_index` may address the block padding, i.e. anything below
/// `layout.k_padded()`.
pub fn packed_nibble(layout: &QuantBDataLayout, packed: &[u8], col: usize, k_index: usize) -> u8 {
    debug_assert!(col < layout.n());
    debug_assert!(k_index < layout.k_padded());
    let ldb = layout.ldb();

    if col < layout.full_tile_cols() {
        let tile_start = (col / PACK_TILE_COLS) * PACK_TILE_COLS * ldb;
        let byte = packed[tile_start + (k_index / 2) * PACK_TILE_COLS + col % PACK_TILE_COLS];
        nibble(byte, k_index)
    } else {
        let group_start = col * ldb + (k_index / 16) * PACK_TILE_BYTES;
        let e = k_index % 16;
        let byte = packed[group_start + e % 8];
        if e < 8 { byte & 0x0F } else { byte >> 4 }
    }
}

fn check_buffer(layout: &QuantBDataLayout, len: usize) -> QuantResult<()> {
    if len != layout.size_in_bytes() {
        return Err(QuantError::ShapeMismatch {
            expected: vec![layout.n(), layout.ldb()],
            actual: vec![len],
        });
    }
    Ok(())
}

#[inline]
fn nibble(byte: u8, index: usize) -> u8 {
    if index & 1 == 1 { byte >> 4 } else { byte & 0x0F }
}

/// Transpose one 8-column tile (`8 * ldb` bytes) in 8x8 byte blocks.
fn transpose_tile(src: &[u8], ldb: usize, dst: &mut [u8]) {
    for k in (0..ldb).step_by(PACK_TILE_BYTES) {
        let out = k * PACK_TILE_COLS;
        simd::transpose_8x8(&src[k..], ldb, &mut dst[out..out + PACK_TILE_COLS * PACK_TILE_BYTES]);
    }
}

/// Regroup one tail column: each 8-byte group (16 elements) becomes
/// `out[i] = e[i] | e[i + 8] << 4`.
fn regroup_column(src: &[u8], dst: &mut [u8]) {
    for (s, d) in src.chunks_exact(PACK_TILE_BYTES).zip(dst.chunks_exact_mut(PACK_TILE_BYTES)) {
        for i in 0..PACK_TILE_BYTES {
            let lo = nibble(s[i >> 1], i);
            let hi = nibble(s[(i + 8) >> 1], i + 8);
            d[i] = lo | (hi << 4);
        }
    }
}
