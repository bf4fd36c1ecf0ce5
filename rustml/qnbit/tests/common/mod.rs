#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Bytes per column of a 4-bit B matrix padded to whole blocks.
pub fn ldb(k: usize, blk_len: usize) -> usize {
    let k_padded = (k + blk_len - 1) & !(blk_len - 1);
    (k_padded * 4 + 7) / 8
}

/// Deterministic random byte buffer.
pub fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen::<u8>()).collect()
}

fn get_int4(v: u8, i: usize) -> u8 {
    if i & 1 == 1 { v >> 4 } else { v & 0x0F }
}

fn transpose_block(src: &[u8], ldb: usize, n: usize, k: usize, dst: &mut [u8]) {
    for c in 0..8 {
        for r in 0..8 {
            let i = (n + c) * ldb + r + k;
            let j = n * ldb + (r + k) * 8 + c;
            dst[j] = src[i];
        }
    }
}

fn regroup_slice(src: &[u8], j: usize, dst: &mut [u8]) {
    for i in 0..8 {
        let v0 = get_int4(src[j + (i >> 1)], i);
        let v1 = get_int4(src[j + ((8 + i) >> 1)], i + 8);
        dst[j + i] = v0 | (v1 << 4);
    }
}

/// Element-by-element model of the fp16 prepack layout.
pub fn reference_prepack(src: &[u8], n_cols: usize, ldb: usize) -> Vec<u8> {
    let mut dst = vec![0u8; src.len()];
    let mut n = 0;
    while n + 8 <= n_cols {
        for k in (0..ldb).step_by(8) {
            transpose_block(src, ldb, n, k, &mut dst);
        }
        n += 8;
    }
    while n < n_cols {
        for k in (0..ldb).step_by(8) {
            regroup_slice(src, n * ldb + k, &mut dst);
        }
        n += 1;
    }
    dst
}

/// Element `e` of column `col` in the unpacked source layout.
pub fn source_nibble(src: &[u8], ldb: usize, col: usize, e: usize) -> u8 {
    get_int4(src[col * ldb + e / 2], e)
}
