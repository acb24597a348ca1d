//! Property tests for the succinct structures and the FM-Index.

use proptest::prelude::*;
use textzip::{
    BitVector, FbbWavelet, FixedIntVec, FmIndex, RrrVector, SliceDataInput, VarIntVec,
    VecDataOutput,
};

fn bit_vector_from(bits: &[bool]) -> BitVector {
    let mut bv = BitVector::new();
    for &bit in bits {
        bv.push(bit);
    }
    bv
}

proptest! {
    #[test]
    fn rrr_rank_matches_naive(
        bits in prop::collection::vec(any::<bool>(), 0..1200),
        sample_rate in 1u32..200,
    ) {
        let rrr = RrrVector::new(&bit_vector_from(&bits), sample_rate);
        let mut ones = 0usize;
        for (i, &bit) in bits.iter().enumerate() {
            prop_assert_eq!(rrr.rank_ones(i), ones);
            prop_assert_eq!(rrr.rank_zeroes(i), i - ones);
            prop_assert_eq!(rrr.access(i).unwrap(), bit);
            if bit {
                ones += 1;
            }
        }
        prop_assert_eq!(rrr.rank_ones(bits.len()), ones);
        prop_assert_eq!(rrr.rank_ones(bits.len() + 1000), ones);
        prop_assert!(rrr.access(bits.len()).is_err());
    }

    #[test]
    fn rrr_rank_duality(
        bits in prop::collection::vec(any::<bool>(), 1..800),
        sample_rate in 1u32..64,
    ) {
        let rrr = RrrVector::new(&bit_vector_from(&bits), sample_rate);
        for pos in 0..=bits.len() {
            prop_assert_eq!(rrr.rank_ones(pos) + rrr.rank_zeroes(pos), pos);
        }
    }

    #[test]
    fn fixed_int_vec_round_trips(
        values in prop::collection::vec(0u64..(1 << 17), 1..300),
    ) {
        let width = values.iter().map(|&v| textzip::succinct::min_bits(v)).max().unwrap();
        let vec = FixedIntVec::from_slice(&values, width);
        for (i, &value) in values.iter().enumerate() {
            prop_assert_eq!(vec.get(i, width), value);
        }

        let mut out = VecDataOutput::new();
        vec.write(&mut out).unwrap();
        let bytes = out.into_vec();
        let mut input = SliceDataInput::new(&bytes);
        let restored = FixedIntVec::read(&mut input).unwrap();
        for (i, &value) in values.iter().enumerate() {
            prop_assert_eq!(restored.get(i, width), value);
        }
    }

    #[test]
    fn var_int_vec_round_trips(
        entries in prop::collection::vec((0u64..(1 << 20), 21u32..40), 1..100),
    ) {
        let total_bits: u64 = entries.iter().map(|&(_, w)| w as u64).sum();
        let mut vec = VarIntVec::new(total_bits);
        let mut cursor = 0u64;
        for &(value, width) in &entries {
            vec.set(cursor, value, width);
            cursor += width as u64;
        }
        cursor = 0;
        for &(value, width) in &entries {
            prop_assert_eq!(vec.get(cursor, width), value);
            cursor += width as u64;
        }
    }

    #[test]
    fn wavelet_rank_and_inverse_select_match_naive(
        text in prop::collection::vec(0u16..12, 1..600),
    ) {
        let wavelet = FbbWavelet::new(&text).unwrap();
        let sigma = wavelet.alphabet_size() as u16;

        for pos in (0..=text.len()).step_by(7) {
            for symbol in 0..sigma {
                let expected =
                    text[..pos].iter().filter(|&&s| s == symbol).count() as u64;
                prop_assert_eq!(wavelet.rank(pos, symbol), expected);
            }
        }
        for pos in 0..text.len() {
            let (occurrence, symbol) = wavelet.inverse_select(pos);
            prop_assert_eq!(symbol, text[pos]);
            let expected =
                text[..=pos].iter().filter(|&&s| s == symbol).count() as u64;
            prop_assert_eq!(occurrence, expected);
        }
    }

    #[test]
    fn fm_index_count_and_locate_match_naive(
        text in prop::collection::vec(1u16..8, 1..250),
        pattern in prop::collection::vec(1u16..8, 1..6),
        sample_rate in 1u32..32,
    ) {
        let fmi = FmIndex::build(&text, sample_rate, false).unwrap();

        let expected: Vec<u32> = (0..text.len().saturating_sub(pattern.len() - 1))
            .filter(|&i| text[i..i + pattern.len()] == pattern[..])
            .map(|i| i as u32)
            .collect();
        prop_assert_eq!(fmi.count(&pattern), expected.len() as u64);

        let mut dest = vec![0u32; text.len()];
        let found = fmi.locate(&pattern, &mut dest) as usize;
        let mut found: Vec<u32> = dest[..found].to_vec();
        found.sort_unstable();
        prop_assert_eq!(found, expected);
    }

    #[test]
    fn fm_index_extract_round_trips(
        text in prop::collection::vec(1u16..8, 1..250),
        sample_rate in 1u32..32,
    ) {
        let fmi = FmIndex::build(&text, sample_rate, true).unwrap();
        let mut dest = vec![0u16; text.len()];

        let written = fmi.extract(0, text.len(), &mut dest, 0).unwrap() as usize;
        prop_assert_eq!(written, text.len());
        prop_assert_eq!(&dest[..], &text[..]);

        let mid = text.len() / 2;
        let written = fmi.extract(mid / 2, mid, &mut dest, 0).unwrap() as usize;
        prop_assert_eq!(&dest[..written], &text[mid / 2..mid]);
    }

    #[test]
    fn fm_index_survives_serialization(
        text in prop::collection::vec(1u16..6, 1..150),
        pattern in prop::collection::vec(1u16..6, 1..4),
    ) {
        let fmi = FmIndex::build(&text, 4, true).unwrap();
        let mut out = VecDataOutput::new();
        fmi.write(&mut out).unwrap();
        let bytes = out.into_vec();
        let mut input = SliceDataInput::new(&bytes);
        let restored = FmIndex::read(&mut input).unwrap();

        prop_assert_eq!(restored.count(&pattern), fmi.count(&pattern));
        let mut dest = vec![0u16; text.len()];
        restored.extract(0, text.len(), &mut dest, 0).unwrap();
        prop_assert_eq!(&dest[..], &text[..]);
    }
}
