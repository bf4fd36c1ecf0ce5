use half::f16;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustml_qnbit::{
    cast_f16_to_f32, cast_f16_to_f32_par, cast_f32_to_f16, cast_f32_to_f16_par, narrow_f32,
    widen_f16,
};

fn is_inf_or_nan_pattern(bits: u16) -> bool {
    bits & 0x7C00 == 0x7C00
}

#[test]
fn widen_every_pattern() {
    let src: Vec<u16> = (0..=u16::MAX).collect();
    let mut dst = vec![0.0f32; src.len()];
    cast_f16_to_f32(&src, &mut dst).unwrap();

    for (&bits, &out) in src.iter().zip(dst.iter()) {
        let expected = f16::from_bits(bits).to_f32();
        if is_inf_or_nan_pattern(bits) {
            // Non-finite values: compare class only.
            assert_eq!(out.is_nan(), expected.is_nan(), "pattern {:#06x}", bits);
            assert_eq!(out.is_infinite(), expected.is_infinite(), "pattern {:#06x}", bits);
            if out.is_infinite() {
                assert_eq!(out.is_sign_negative(), expected.is_sign_negative());
            }
            continue;
        }
        assert_eq!(out.to_bits(), expected.to_bits(), "pattern {:#06x}: {} vs {}", bits, out, expected);
    }
}

#[test]
fn narrow_sweep_matches_reference() {
    let src: Vec<f32> = (0..65536).map(|i| i as f32 + 0.125).collect();
    let mut dst = vec![0u16; src.len()];
    cast_f32_to_f16(&src, &mut dst).unwrap();

    for (i, (&x, &out)) in src.iter().zip(dst.iter()).enumerate() {
        assert_eq!(out, f16::from_f32(x).to_bits(), "index {} value {}", i, x);
    }
}

#[test]
fn narrow_edge_values_match_reference() {
    let mut src = vec![
        0.0f32,
        -0.0,
        1.0,
        -1.0,
        65504.0,
        65519.99,
        65520.0,
        -65520.0,
        1.0e10,
        f32::MAX,
        f32::MIN_POSITIVE,
        5.960_464_5e-8,  // 2^-24
        2.980_232_2e-8,  // 2^-25
        4.470_348_4e-8,  // 1.5 * 2^-25
        6.097_555e-5,    // just under 2^-14
        6.103_515_6e-5,  // 2^-14
        f32::INFINITY,
        f32::NEG_INFINITY,
    ];
    for i in 0..64 {
        src.push(2049.0 + 2.0 * i as f32);
    }
    let mut dst = vec![0u16; src.len()];
    cast_f32_to_f16(&src, &mut dst).unwrap();

    for (&x, &out) in src.iter().zip(dst.iter()) {
        assert_eq!(out, f16::from_f32(x).to_bits(), "value {:e}", x);
    }

    let mut nan_out = [0u16; 9];
    cast_f32_to_f16(&[f32::NAN; 9], &mut nan_out).unwrap();
    assert!(nan_out.iter().all(|&h| f16::from_bits(h).is_nan()));
}

#[test]
fn narrow_random_values_match_reference() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let src: Vec<f32> = (0..10_007)
        .map(|_| {
            let exp: i32 = rng.gen_range(-30..17);
            let mantissa: f32 = rng.gen_range(-2.0..2.0);
            mantissa * 2.0f32.powi(exp)
        })
        .collect();
    let mut dst = vec![0u16; src.len()];
    cast_f32_to_f16(&src, &mut dst).unwrap();

    for (&x, &out) in src.iter().zip(dst.iter()) {
        assert_eq!(out, f16::from_f32(x).to_bits(), "value {:e}", x);
    }
}

#[test]
fn short_counts_match_elementwise() {
    let halves: Vec<u16> = (0..7u16).map(|i| 0x3C00 + i * 0x155).collect();
    let floats: Vec<f32> = (0..7).map(|i| i as f32 * 1.37 + 0.125).collect();

    for count in [1, 3, 4, 6, 7] {
        let mut wide = vec![0.0f32; count];
        cast_f16_to_f32(&halves[..count], &mut wide).unwrap();
        for i in 0..count {
            let mut single = [0.0f32];
            cast_f16_to_f32(&halves[i..i + 1], &mut single).unwrap();
            assert_eq!(wide[i].to_bits(), single[0].to_bits(), "count {} index {}", count, i);
        }

        let mut narrow = vec![0u16; count];
        cast_f32_to_f16(&floats[..count], &mut narrow).unwrap();
        for i in 0..count {
            let mut single = [0u16];
            cast_f32_to_f16(&floats[i..i + 1], &mut single).unwrap();
            assert_eq!(narrow[i], single[0], "count {} index {}", count, i);
        }
    }
}

#[test]
fn tail_after_vector_steps_matches_elementwise() {
    for count in [8, 9, 15, 16, 17, 31, 33] {
        let floats: Vec<f32> = (0..count).map(|i| (i as f32 - 10.0) * 0.71).collect();
        let mut bulk = vec![0u16; count];
        cast_f32_to_f16(&floats, &mut bulk).unwrap();

        let mut wide = vec![0.0f32; count];
        cast_f16_to_f32(&bulk, &mut wide).unwrap();

        for i in 0..count {
            assert_eq!(bulk[i], f16::from_f32(floats[i]).to_bits(), "count {} index {}", count, i);
            assert_eq!(wide[i], f16::from_bits(bulk[i]).to_f32(), "count {} index {}", count, i);
        }
    }
}

#[test]
fn parallel_matches_sequential() {
    let len = 200_003;
    let floats: Vec<f32> = (0..len).map(|i| (i as f32).sin() * 1000.0).collect();

    let mut seq = vec![0u16; len];
    let mut par = vec![0u16; len];
    cast_f32_to_f16(&floats, &mut seq).unwrap();
    cast_f32_to_f16_par(&floats, &mut par).unwrap();
    assert_eq!(seq, par);

    let mut wide_seq = vec![0.0f32; len];
    let mut wide_par = vec![0.0f32; len];
    cast_f16_to_f32(&seq, &mut wide_seq).unwrap();
    cast_f16_to_f32_par(&seq, &mut wide_par).unwrap();
    assert_eq!(wide_seq, wide_par);
}

#[test]
fn half_typed_roundtrip() {
    let values: Vec<f32> = (0..100).map(|i| i as f32 * 0.25 - 12.5).collect();
    let mut halves = vec![f16::ZERO; values.len()];
    narrow_f32(&values, &mut halves).unwrap();

    let mut back = vec![0.0f32; values.len()];
    widen_f16(&halves, &mut back).unwrap();
    // Quarter steps below 2048 are exact in binary16.
    assert_eq!(back, values);
}
