//! Property-based round-trip tests for the XPACK codec.
//!
//! These verify the core contract across a wide range of inputs and
//! levels: whatever the compressor accepts, the decompressor restores
//! byte-exactly; whatever the compressor declines, it declines without
//! touching more than the output capacity allows.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use xpack::{max_compressed_size, Compressor, Decompressor};
use xpack_core::CompressionLevel;

/// Compress with a worst-case sized buffer, decompress, compare.
fn assert_roundtrip(data: &[u8], level: u8) {
    let mut c = Compressor::new(data.len().max(1), CompressionLevel::Custom(level))
        .expect("level in range");
    let mut compressed = vec![0u8; max_compressed_size(data.len())];
    let written = c.compress(data, &mut compressed);
    if data.is_empty() {
        assert_eq!(written, 0);
        return;
    }
    assert!(written > 0, "worst-case buffer must always fit");
    assert!(written <= compressed.len());

    let mut d = Decompressor::new();
    let mut restored = vec![0u8; data.len()];
    let n = d
        .decompress(&compressed[..written], &mut restored)
        .expect("round-trip decode");
    assert_eq!(n, data.len());
    assert_eq!(restored, data);
}

/// Byte-vector strategies with different texture.
fn any_texture() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        // Arbitrary bytes.
        prop::collection::vec(any::<u8>(), 0..4096),
        // Tight alphabet: match-heavy.
        prop::collection::vec(prop::sample::select(vec![b'a', b'b', b'c', b' ']), 0..8192),
        // Run-structured.
        (any::<u8>(), 1usize..6000).prop_map(|(b, n)| vec![b; n]),
        // Repeated phrase with mutations.
        (0usize..64, prop::collection::vec(any::<u8>(), 8..64)).prop_map(|(reps, phrase)| {
            let mut out = Vec::new();
            for _ in 0..=reps {
                out.extend_from_slice(&phrase);
            }
            out
        }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        max_shrink_iters: 200,
        ..ProptestConfig::default()
    })]

    /// Property: decompress(compress(B, L)) == B for every accepted input.
    #[test]
    fn prop_roundtrip_levels(data in any_texture(), level in 1u8..=9) {
        assert_roundtrip(&data, level);
    }

    /// Property: a capacity of input_len - 1 either fits a strictly
    /// smaller stream or yields 0, and nothing past the written length is
    /// relied upon.
    #[test]
    fn prop_capacity_contract(data in any_texture(), level in prop::sample::select(vec![1u8, 6, 9])) {
        prop_assume!(!data.is_empty());
        let mut c = Compressor::new(data.len(), CompressionLevel::Custom(level)).unwrap();
        let mut out = vec![0u8; data.len().saturating_sub(1)];
        let written = c.compress(&data, &mut out);
        prop_assert!(written <= out.len());
        if written > 0 {
            let mut d = Decompressor::new();
            let mut restored = vec![0u8; data.len()];
            d.decompress(&out[..written], &mut restored).unwrap();
            prop_assert_eq!(restored, data);
        }
    }

    /// Property: truncating a valid stream anywhere fails cleanly.
    #[test]
    fn prop_truncation_is_detected(seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut data = vec![0u8; 2048];
        for b in data.iter_mut() {
            *b = if rng.gen_bool(0.8) { b'q' } else { rng.gen() };
        }
        let mut c = Compressor::new(data.len(), CompressionLevel::Default).unwrap();
        let mut out = vec![0u8; max_compressed_size(data.len())];
        let written = c.compress(&data, &mut out);
        prop_assert!(written > 1);

        let cut = (seed as usize) % (written - 1) + 1;
        let mut d = Decompressor::new();
        let mut restored = vec![0u8; data.len()];
        prop_assert!(d.decompress(&out[..cut], &mut restored).is_err());
    }
}

#[test]
fn test_empty_input_compresses_to_nothing() {
    let mut c = Compressor::new(1, CompressionLevel::Default).unwrap();
    let mut out = vec![0u8; 64];
    assert_eq!(c.compress(&[], &mut out), 0);
}

#[test]
fn test_single_byte_with_container_capacity() {
    // The container hands the codec a capacity of original_size - 1, so a
    // one-byte chunk is always stored raw.
    let mut c = Compressor::new(1, CompressionLevel::Default).unwrap();
    let mut out = [0u8; 0];
    assert_eq!(c.compress(b"Z", &mut out), 0);
}

#[test]
fn test_megabyte_run_ratio_and_roundtrip() {
    let data = vec![0x5Au8; 1 << 20];
    for level in [1u8, 9] {
        let mut c = Compressor::new(data.len(), CompressionLevel::Custom(level)).unwrap();
        let mut out = vec![0u8; data.len()];
        let written = c.compress(&data, &mut out);
        assert!(written > 0);
        assert!(
            written * 200 < data.len(),
            "level {}: run of a single byte must compress below 0.5%, got {}",
            level,
            written
        );

        let mut d = Decompressor::new();
        let mut restored = vec![0u8; data.len()];
        d.decompress(&out[..written], &mut restored).unwrap();
        assert_eq!(restored, data);
    }
}

#[test]
fn test_random_64k_at_level_9() {
    let mut rng = StdRng::seed_from_u64(0xDEC0DE);
    let mut data = vec![0u8; 64 << 10];
    rng.fill(&mut data[..]);

    let mut c = Compressor::new(data.len(), CompressionLevel::Best).unwrap();
    let mut out = vec![0u8; data.len()];
    let written = c.compress(&data, &mut out);
    if written > 0 {
        assert!(written <= data.len());
        let mut d = Decompressor::new();
        let mut restored = vec![0u8; data.len()];
        d.decompress(&out[..written], &mut restored).unwrap();
        assert_eq!(restored, data);
    }
}

#[test]
fn test_offset_one_run_expansion() {
    // A long run forces offset-1 matches whose copies overlap their
    // source byte by byte.
    let mut data = b"start".to_vec();
    data.extend(std::iter::repeat(b'#').take(70_000));
    data.extend_from_slice(b"end");
    assert_roundtrip(&data, 6);
}

#[test]
fn test_structured_binary_roundtrip() {
    // Record-like data: fixed stride with slowly varying fields, the
    // sweet spot for recent-offset reuse.
    let mut data = Vec::new();
    for i in 0u32..30_000 {
        data.extend_from_slice(&(i / 7).to_le_bytes());
        data.extend_from_slice(&[0xAB, 0xCD]);
        data.extend_from_slice(&(i % 13).to_le_bytes());
    }
    for level in [2u8, 5, 8] {
        assert_roundtrip(&data, level);
    }
}

#[test]
fn test_block_boundary_sizes() {
    // Inputs straddling the literal and block caps.
    let mut rng = StdRng::seed_from_u64(7);
    for &size in &[65_534usize, 65_535, 65_536, 65_537, 131_072] {
        let mut data = vec![0u8; size];
        for b in data.iter_mut() {
            *b = if rng.gen_bool(0.9) {
                b'.'
            } else {
                rng.gen_range(b'a'..=b'z')
            };
        }
        assert_roundtrip(&data, 6);
    }
}

#[test]
fn test_bit_flip_probes_are_safe() {
    let data = b"The decoder must survive arbitrary corruption. ".repeat(200);
    let mut c = Compressor::new(data.len(), CompressionLevel::Default).unwrap();
    let mut out = vec![0u8; max_compressed_size(data.len())];
    let written = c.compress(&data, &mut out);
    assert!(written > 0);

    let mut rng = StdRng::seed_from_u64(0xF11B);
    let mut d = Decompressor::new();
    for _ in 0..100 {
        let pos = rng.gen_range(0..written);
        let bit = rng.gen_range(0..8);
        let mut mutated = out[..written].to_vec();
        mutated[pos] ^= 1 << bit;

        let mut restored = vec![0u8; data.len()];
        match d.decompress(&mutated, &mut restored) {
            Ok(n) => assert_eq!(n, data.len()),
            Err(_) => {}
        }
    }
}
