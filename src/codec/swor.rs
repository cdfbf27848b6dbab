//! Invertible sampling without replacement, the bits-back primitive.
//!
//! [`decode`] draws one element from a multiset by *decoding* from the rANS
//! state: the coded point on lane 0 selects a position among the multiset's
//! elements in sorted order, and the scaled interval of the selected symbol is
//! popped off the state. The pop removes `log2(len / multiplicity)` bits (the
//! information content of the draw), which is exactly the amount a plain
//! sequence codec would waste on the element's position. [`encode`] is the
//! bit-exact inverse: it re-inserts the symbol and pushes the same interval
//! back.
//!
//! Draw and inverse use the *same* interval per step: the symbol's occupancy
//! interval among the sorted element positions, scaled to the coding grid by
//! the same helper that [`UniformModel`](crate::model::UniformModel) uses.
//! Because a pop followed by the matching push restores the state exactly,
//!
//! ```
//! # use ansamble::{codec::swor, DefaultAnsCoder, Multiset};
//! # let multiset: Multiset<char> = "utoronto".chars().collect();
//! # let mut coder = DefaultAnsCoder::new();
//! let before = (coder.clone(), multiset.clone());
//! let (symbol, rest) = swor::decode(&mut coder, &multiset).unwrap();
//! assert_eq!(rest.len(), multiset.len() - 1);
//! let restored = swor::encode(&mut coder, symbol, &rest).unwrap();
//! assert_eq!((coder, restored), before);
//! ```
//!
//! holds for every state and every non-empty multiset that fits the coding
//! precision.

use num_traits::AsPrimitive;

use crate::{
    ans::AnsCoder,
    model::{quantile_to_index, scaled_interval},
    BitArray, CoderError, Multiset, MultisetError, Result,
};

/// The largest multiset size representable at the given coding precision.
#[inline(always)]
fn max_outcomes<const PRECISION: usize>() -> usize {
    1usize.checked_shl(PRECISION as u32).unwrap_or(usize::MAX)
}

/// Draws one element from `multiset` without replacement, consuming bits from
/// the coder (lane 0).
///
/// Returns the drawn symbol and the multiset with that one occurrence
/// removed. The draw is deterministic given the coder state; its distribution
/// over symbols is the multiset's empirical distribution (up to the
/// fixed-point grid).
///
/// # Errors
///
/// - [`CoderError::PrecisionExhausted`] if `multiset.len() > 2^PRECISION`;
///   chunk the multiset or raise the precision.
/// - [`MultisetError::IndexOutOfRange`] (wrapped) if the multiset is empty.
pub fn decode<Word, State, S, const PRECISION: usize>(
    coder: &mut AnsCoder<Word, State, PRECISION>,
    multiset: &Multiset<S>,
) -> Result<(S, Multiset<S>)>
where
    Word: BitArray + Into<State> + AsPrimitive<u64>,
    State: BitArray + AsPrimitive<Word>,
    u64: AsPrimitive<Word>,
    S: Ord + Clone,
{
    let len = multiset.len();
    if len == 0 {
        return Err(MultisetError::IndexOutOfRange { index: 0, len: 0 }.into());
    }
    let max = max_outcomes::<PRECISION>();
    if len > max {
        return Err(CoderError::PrecisionExhausted { len, max });
    }

    let index = quantile_to_index::<Word, PRECISION>(coder.quantile(0), len);
    let (rest, (start, mult), symbol) = multiset.rank_and_remove(index)?;
    coder.pop_intervals(&[scaled_interval::<Word, PRECISION>(
        start,
        start + mult,
        len,
    )])?;
    Ok((symbol, rest))
}

/// Re-inserts `symbol` into `multiset` and returns the bits that [`decode`]
/// consumed when drawing it, by pushing the symbol's scaled interval onto the
/// coder (lane 0).
///
/// This is the exact inverse of [`decode`]: for every coder state `c` and
/// non-empty multiset `m`, drawing `(s, rest) = decode(c, m)` and then calling
/// `encode(c, s, rest)` restores both the state and the multiset.
///
/// # Errors
///
/// Returns [`CoderError::PrecisionExhausted`] if the grown multiset exceeds
/// `2^PRECISION` elements.
pub fn encode<Word, State, S, const PRECISION: usize>(
    coder: &mut AnsCoder<Word, State, PRECISION>,
    symbol: S,
    multiset: &Multiset<S>,
) -> Result<Multiset<S>>
where
    Word: BitArray + Into<State> + AsPrimitive<u64>,
    State: BitArray + AsPrimitive<Word>,
    u64: AsPrimitive<Word>,
    S: Ord + Clone,
{
    let (grown, (start, mult)) = multiset.insert_and_rank(symbol);
    let len = grown.len();
    let max = max_outcomes::<PRECISION>();
    if len > max {
        return Err(CoderError::PrecisionExhausted { len, max });
    }

    coder.push_intervals(&[scaled_interval::<Word, PRECISION>(
        start,
        start + mult,
        len,
    )])?;
    Ok(grown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    use rand::RngCore;
    use rand_xoshiro::{rand_core::SeedableRng, Xoshiro256StarStar};

    use crate::{model::UniformModel, DefaultAnsCoder};

    #[test]
    fn single_draw_is_invertible() {
        let multiset: Multiset<char> = "utoronto".chars().collect();
        let mut coder = DefaultAnsCoder::new();
        let initial = coder.clone();

        let (symbol, rest) = decode(&mut coder, &multiset).unwrap();
        assert_eq!(rest.len(), 7);
        assert_ne!(coder, initial);

        let restored = encode(&mut coder, symbol, &rest).unwrap();
        assert_eq!(coder, initial);
        assert_eq!(restored, multiset);
    }

    #[test]
    fn draws_follow_the_coded_bits() {
        // Seed the coder with pseudo-random content so that successive draws
        // select varying elements, then unwind them all.
        let mut rng = Xoshiro256StarStar::seed_from_u64(99);
        let model = UniformModel::<u32, 27>::new(1 << 16);
        let mut coder = DefaultAnsCoder::new();
        coder
            .encode_iid_symbols((0..64).map(|_| rng.next_u32() as usize >> 16), &model)
            .unwrap();
        let seeded = coder.clone();

        let full: Multiset<u8> = [13, 13, 13, 42, 42, 77, 200].into_iter().collect();
        let mut multiset = full.clone();
        let mut drawn = Vec::new();
        while !multiset.is_empty() {
            let (symbol, rest) = decode(&mut coder, &multiset).unwrap();
            drawn.push(symbol);
            multiset = rest;
        }

        // Rewinding the draws in reverse restores the seeded state exactly.
        for symbol in drawn.into_iter().rev() {
            multiset = encode(&mut coder, symbol, &multiset).unwrap();
        }
        assert_eq!(coder, seeded);
        assert_eq!(multiset, full);
    }

    #[test]
    fn empty_multiset_cannot_be_drawn_from() {
        let mut coder = DefaultAnsCoder::new();
        let multiset = Multiset::<u8>::new();
        assert_eq!(
            decode(&mut coder, &multiset),
            Err(MultisetError::IndexOutOfRange { index: 0, len: 0 }.into())
        );
    }

    #[test]
    fn oversized_multiset_exhausts_precision() {
        let mut coder = AnsCoder::<u32, u64, 2>::new();
        let multiset: Multiset<u8> = [1, 2, 3, 4, 5].into_iter().collect();
        assert_eq!(
            decode(&mut coder, &multiset),
            Err(CoderError::PrecisionExhausted { len: 5, max: 4 })
        );
        let at_capacity: Multiset<u8> = [1, 2, 3, 4].into_iter().collect();
        assert_eq!(
            encode(&mut coder, 9, &at_capacity),
            Err(CoderError::PrecisionExhausted { len: 5, max: 4 })
        );
    }
}
