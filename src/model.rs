//! Entropy models in exactly invertible fixed-point arithmetic.
//!
//! An entropy model assigns each symbol a subinterval of `[0, 2^PRECISION)`
//! whose width is (proportional to) the symbol's probability mass. The
//! [`AnsCoder`](crate::AnsCoder) only ever sees these intervals, so as long as
//! a model answers its two queries consistently (symbol → interval in
//! [`EncoderModel`], coded point → symbol + interval in [`DecoderModel`]),
//! coding is exactly invertible. No floating point arithmetic is involved at
//! coding time; conversions *to* the fixed-point representation (e.g. in
//! [`CategoricalModel::from_floating_point_probabilities`]) round once, up
//! front.
//!
//! Both provided models place their interval boundaries on the same scaling
//! grid, `boundary(i) = floor(i * 2^PRECISION / total)`: [`UniformModel`] with
//! one unit slot per symbol, and the empirical distribution of a
//! [`Multiset`](crate::Multiset) (used by [`codec::swor`](crate::codec::swor))
//! with one unit slot per element. Sharing the grid is what makes sampling
//! without replacement and uniform coding interoperate bit-exactly.

use alloc::vec::Vec;
use core::marker::PhantomData;

use num_traits::AsPrimitive;

use crate::{BitArray, CoderError, Result};

/// Base trait for all entropy models: fixes the symbol type and the
/// fixed-point probability type.
///
/// `PRECISION` is the bit width of the probability grid and must match the
/// `PRECISION` of the [`AnsCoder`](crate::AnsCoder) the model is used with
/// (the type system enforces this).
pub trait EntropyModel<const PRECISION: usize> {
    /// The type of symbols the model describes.
    type Symbol;

    /// The fixed-point representation of probability masses; must be at least
    /// `PRECISION` bits wide.
    type Probability: BitArray;
}

/// A model that can be used for encoding: symbol → interval.
pub trait EncoderModel<const PRECISION: usize>: EntropyModel<PRECISION> {
    /// Returns the interval `(start, freq)` of `symbol` on the grid
    /// `[0, 2^PRECISION)`, or `None` if the symbol has zero probability mass
    /// (and therefore cannot be encoded).
    fn left_cumulative_and_probability(
        &self,
        symbol: &Self::Symbol,
    ) -> Option<(Self::Probability, Self::Probability)>;
}

/// A model that can be used for decoding: coded point → symbol + interval.
pub trait DecoderModel<const PRECISION: usize>: EntropyModel<PRECISION> {
    /// Returns the symbol whose interval contains `quantile`, together with
    /// that interval as `(symbol, start, freq)`.
    ///
    /// The caller guarantees `quantile < 2^PRECISION`; every such quantile
    /// belongs to exactly one symbol.
    fn quantile_function(
        &self,
        quantile: Self::Probability,
    ) -> (Self::Symbol, Self::Probability, Self::Probability);
}

/// Scales the count interval `[lo, hi)` out of `total` onto the fixed-point
/// grid `[0, 2^PRECISION)`.
///
/// For `total <= 2^PRECISION` every nonempty count interval maps to a
/// nonempty grid interval.
#[inline(always)]
pub(crate) fn scaled_interval<Probability, const PRECISION: usize>(
    lo: usize,
    hi: usize,
    total: usize,
) -> (Probability, Probability)
where
    Probability: BitArray,
    u64: AsPrimitive<Probability>,
{
    debug_assert!(lo < hi && hi <= total);
    let start = ((lo as u128) << PRECISION) / total as u128;
    let end = ((hi as u128) << PRECISION) / total as u128;
    ((start as u64).as_(), ((end - start) as u64).as_())
}

/// Maps a coded point back to the index of the unit slot whose scaled
/// interval contains it: the inverse of [`scaled_interval`] on unit
/// intervals `[i, i + 1)`.
#[inline(always)]
pub(crate) fn quantile_to_index<Probability, const PRECISION: usize>(
    quantile: Probability,
    total: usize,
) -> usize
where
    Probability: BitArray + AsPrimitive<u64>,
{
    let quantile = AsPrimitive::<u64>::as_(quantile) as u128;
    (((quantile + 1) * total as u128 - 1) >> PRECISION) as usize
}

/// A uniform distribution over the symbols `0..range`.
///
/// Symbol `i` gets the grid interval between `floor(i * 2^PRECISION / range)`
/// and `floor((i + 1) * 2^PRECISION / range)`; the slots differ in width by at
/// most one grid unit, so the coding overhead over `log2(range)` bits per
/// symbol vanishes as `PRECISION` grows.
///
/// # Example
///
/// ```
/// use ansamble::{model::UniformModel, DefaultAnsCoder};
///
/// let byte_model = UniformModel::<u32, 27>::new(256);
/// let mut coder = DefaultAnsCoder::new();
/// coder.encode_symbol(0x61usize, &byte_model).unwrap();
/// assert_eq!(coder.decode_symbol(&byte_model).unwrap(), 0x61);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct UniformModel<Probability, const PRECISION: usize> {
    range: usize,
    phantom: PhantomData<Probability>,
}

impl<Probability: BitArray, const PRECISION: usize> UniformModel<Probability, PRECISION> {
    /// Creates a uniform model over `0..range`.
    ///
    /// `range == 1` is permitted and codes zero bits per symbol.
    ///
    /// # Panics
    ///
    /// Panics if `range == 0` or `range > 2^PRECISION`.
    pub fn new(range: usize) -> Self {
        assert!(range >= 1, "a uniform model needs at least one symbol");
        assert!(
            range as u128 <= 1u128 << PRECISION,
            "range exceeds the coding precision"
        );
        Self {
            range,
            phantom: PhantomData,
        }
    }

    /// Returns the number of symbols, i.e. the `range` passed at construction.
    pub fn range(&self) -> usize {
        self.range
    }
}

impl<Probability: BitArray, const PRECISION: usize> EntropyModel<PRECISION>
    for UniformModel<Probability, PRECISION>
{
    type Symbol = usize;
    type Probability = Probability;
}

impl<Probability, const PRECISION: usize> EncoderModel<PRECISION>
    for UniformModel<Probability, PRECISION>
where
    Probability: BitArray,
    u64: AsPrimitive<Probability>,
{
    fn left_cumulative_and_probability(
        &self,
        symbol: &Self::Symbol,
    ) -> Option<(Probability, Probability)> {
        if *symbol < self.range {
            Some(scaled_interval::<_, PRECISION>(*symbol, *symbol + 1, self.range))
        } else {
            None
        }
    }
}

impl<Probability, const PRECISION: usize> DecoderModel<PRECISION>
    for UniformModel<Probability, PRECISION>
where
    Probability: BitArray + AsPrimitive<u64>,
    u64: AsPrimitive<Probability>,
{
    fn quantile_function(&self, quantile: Probability) -> (usize, Probability, Probability) {
        let symbol = quantile_to_index::<_, PRECISION>(quantile, self.range);
        let (start, freq) = scaled_interval::<_, PRECISION>(symbol, symbol + 1, self.range);
        (symbol, start, freq)
    }
}

/// A categorical distribution over the symbols `0..n` with explicitly given
/// probabilities, quantized to the fixed-point grid.
///
/// Quantization is *leaky*: every symbol receives a frequency of at least one
/// grid unit even if naive rounding would assign it zero, so every symbol
/// remains encodable. The grid is fully used (frequencies sum to exactly
/// `2^PRECISION`).
#[derive(Debug, Clone)]
pub struct CategoricalModel<Probability, const PRECISION: usize> {
    /// `cdf[i]` is the left boundary of symbol `i`; `cdf[n] == 2^PRECISION`.
    cdf: Vec<Probability>,
}

impl<Probability, const PRECISION: usize> CategoricalModel<Probability, PRECISION>
where
    Probability: BitArray,
    u64: AsPrimitive<Probability>,
{
    /// Quantizes the given probability vector onto the grid.
    ///
    /// The probabilities need not be normalized; only their ratios matter.
    /// Returns [`CoderError::InvalidInterval`] if any entry is negative or
    /// non-finite, or if they sum to zero, and
    /// [`CoderError::PrecisionExhausted`] if there are more symbols than grid
    /// units.
    pub fn from_floating_point_probabilities(probabilities: &[f64]) -> Result<Self> {
        let total = 1u64 << PRECISION;
        let num_symbols = probabilities.len();
        if num_symbols == 0 {
            return Err(CoderError::InvalidInterval);
        }
        if num_symbols as u128 > total as u128 {
            return Err(CoderError::PrecisionExhausted {
                len: num_symbols,
                max: total as usize,
            });
        }

        let mut sum = 0.0f64;
        for &probability in probabilities {
            if !probability.is_finite() || probability < 0.0 {
                return Err(CoderError::InvalidInterval);
            }
            sum += probability;
        }
        if !sum.is_finite() || sum <= 0.0 {
            return Err(CoderError::InvalidInterval);
        }

        // Every symbol gets one guaranteed grid unit; the remaining `free`
        // units are distributed in proportion to the probabilities. Rounding
        // a monotone cumulative sum keeps the boundaries monotone, so no
        // fix-up pass is needed.
        let free = (total - num_symbols as u64) as f64;
        let mut cdf = Vec::with_capacity(num_symbols + 1);
        let mut cumulative = 0.0f64;
        for (i, &probability) in probabilities.iter().enumerate() {
            let mut scaled = libm::round(free * (cumulative / sum));
            if scaled > free {
                scaled = free;
            }
            cdf.push((i as u64 + scaled as u64).as_());
            cumulative += probability;
        }
        cdf.push(total.as_());

        Ok(Self { cdf })
    }
}

impl<Probability: BitArray, const PRECISION: usize> CategoricalModel<Probability, PRECISION> {
    /// Returns the number of symbols.
    pub fn num_symbols(&self) -> usize {
        self.cdf.len() - 1
    }
}

impl<Probability: BitArray, const PRECISION: usize> EntropyModel<PRECISION>
    for CategoricalModel<Probability, PRECISION>
{
    type Symbol = usize;
    type Probability = Probability;
}

impl<Probability, const PRECISION: usize> EncoderModel<PRECISION>
    for CategoricalModel<Probability, PRECISION>
where
    Probability: BitArray,
{
    fn left_cumulative_and_probability(
        &self,
        symbol: &Self::Symbol,
    ) -> Option<(Probability, Probability)> {
        if *symbol < self.num_symbols() {
            let start = self.cdf[*symbol];
            Some((start, self.cdf[*symbol + 1] - start))
        } else {
            None
        }
    }
}

impl<Probability, const PRECISION: usize> DecoderModel<PRECISION>
    for CategoricalModel<Probability, PRECISION>
where
    Probability: BitArray,
{
    fn quantile_function(&self, quantile: Probability) -> (usize, Probability, Probability) {
        // `cdf[0] == 0 <= quantile < 2^PRECISION == cdf[n]`, so the partition
        // point lies in `1..=n`.
        let symbol = self.cdf.partition_point(|&boundary| boundary <= quantile) - 1;
        let start = self.cdf[symbol];
        (symbol, start, self.cdf[symbol + 1] - start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Checks that a model tiles the whole grid and that its encoder and
    /// decoder halves agree on every coded point.
    fn assert_model_consistency<M, const PRECISION: usize>(model: &M, num_symbols: usize)
    where
        M: EncoderModel<PRECISION, Symbol = usize, Probability = u32>
            + DecoderModel<PRECISION, Symbol = usize, Probability = u32>,
    {
        let total = 1u32 << PRECISION;

        let mut grid_used = 0u32;
        for symbol in 0..num_symbols {
            let (start, freq) = model.left_cumulative_and_probability(&symbol).unwrap();
            assert!(freq >= 1);
            assert_eq!(start, grid_used);
            grid_used += freq;
        }
        assert_eq!(grid_used, total);
        assert_eq!(model.left_cumulative_and_probability(&num_symbols), None);

        let mut quantile = 0u32;
        while quantile < total {
            let (symbol, start, freq) = model.quantile_function(quantile);
            assert!(start <= quantile && quantile < start + freq);
            assert_eq!(
                model.left_cumulative_and_probability(&symbol),
                Some((start, freq))
            );
            quantile += 1;
        }
    }

    #[test]
    fn uniform_tiles_the_grid() {
        for range in [1, 2, 3, 5, 7, 100, 256, 4095, 4096] {
            let model = UniformModel::<u32, 12>::new(range);
            assert_model_consistency(&model, range);
        }
    }

    #[test]
    #[should_panic]
    fn uniform_rejects_empty_range() {
        let _ = UniformModel::<u32, 12>::new(0);
    }

    #[test]
    #[should_panic]
    fn uniform_rejects_excessive_range() {
        let _ = UniformModel::<u32, 12>::new(4097);
    }

    #[test]
    fn categorical_tiles_the_grid() {
        let model =
            CategoricalModel::<u32, 12>::from_floating_point_probabilities(&[0.2, 0.3, 0.5])
                .unwrap();
        assert_model_consistency(&model, 3);

        // A tiny probability still gets a nonzero frequency (leakiness).
        let model = CategoricalModel::<u32, 12>::from_floating_point_probabilities(&[
            1e-12, 0.5, 1e-12, 0.5,
        ])
        .unwrap();
        assert_model_consistency(&model, 4);
    }

    #[test]
    fn categorical_rejects_degenerate_inputs() {
        type Model = CategoricalModel<u32, 12>;
        assert_eq!(
            Model::from_floating_point_probabilities(&[]).unwrap_err(),
            CoderError::InvalidInterval
        );
        assert_eq!(
            Model::from_floating_point_probabilities(&[0.5, f64::NAN]).unwrap_err(),
            CoderError::InvalidInterval
        );
        assert_eq!(
            Model::from_floating_point_probabilities(&[0.5, -0.1]).unwrap_err(),
            CoderError::InvalidInterval
        );
        assert_eq!(
            Model::from_floating_point_probabilities(&[0.0, 0.0]).unwrap_err(),
            CoderError::InvalidInterval
        );
        assert!(matches!(
            CategoricalModel::<u32, 2>::from_floating_point_probabilities(&[1.0; 5]).unwrap_err(),
            CoderError::PrecisionExhausted { len: 5, max: 4 }
        ));
    }

    #[test]
    fn unit_slots_invert_exactly() {
        // Every coded point inside a scaled unit slot maps back to the slot's
        // index, for totals that do and don't divide the grid.
        for total in [1usize, 2, 3, 5, 11, 100, 255, 256] {
            for index in 0..total {
                let (start, freq) = scaled_interval::<u32, 8>(index, index + 1, total);
                assert!(freq >= 1);
                for quantile in start..start + freq {
                    assert_eq!(quantile_to_index::<u32, 8>(quantile, total), index);
                }
            }
        }
    }
}
