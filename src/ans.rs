//! Vectorized entropy coding on a stack ("last in first out").
//!
//! This module provides the [`AnsCoder`], an entropy coder with near-optimal
//! compression effectiveness that implements the range variant of Asymmetric
//! Numeral Systems (rANS) \[1]. It operates as a *stack*: encoding "pushes"
//! coded intervals onto the compressed data and decoding "pops" them off in
//! reverse order. Encoding and decoding can be interleaved arbitrarily, which
//! is the property that bits-back constructions such as the
//! [`MultisetCodec`](crate::codec::MultisetCodec) rely on \[2].
//!
//! # Lanes
//!
//! The coder state is *vectorized*: it consists of `L` independent lane heads
//! and a single shared tail of fixed-width words. Every vectorized operation
//! applies one coded interval per lane within one logical step; lane heads
//! renormalize independently, but their tail traffic is interleaved in a fixed
//! lane order (ascending on push, descending on pop) so that vectorized push
//! and pop remain exact inverses. Lane parallelism is purely a throughput
//! device: a single-lane coder (the default) produces a fully conforming
//! state, and symbol-level codecs in this crate drive lane 0 only.
//!
//! # Parameters
//!
//! The generic parameters mirror the width hierarchy of the state:
//!
//! - `State`: the type of a lane head (`H = State::BITS` bits);
//! - `Word`: the type of a tail word (`W = Word::BITS` bits), with
//!   `H >= 2 * W`;
//! - `PRECISION`: the bit width `P` of the fixed-point grid on which all coded
//!   intervals live, with `0 < P < W` and `P <= H - W`.
//!
//! A non-empty lane head is kept inside `[2^(H-W), 2^H)`; the base (empty)
//! state of every lane is exactly `2^(H-W)`.
//!
//! # References
//!
//! \[1] Duda, Jarek, et al. "The use of asymmetric numeral systems as an
//! accurate replacement for Huffman coding." 2015 Picture Coding Symposium.
//!
//! \[2] Townsend, James, Thomas Bird, and David Barber. "Practical lossless
//! compression with latent variables using bits back coding." ICLR 2019.

use alloc::{vec, vec::Vec};
use core::borrow::Borrow;

use num_traits::AsPrimitive;

use crate::{
    model::{DecoderModel, EncoderModel},
    BitArray, CoderError, Result,
};

/// Entropy coder for both encoding and decoding on a stack.
///
/// See the [module-level documentation](self) for the state layout and the
/// meaning of the generic parameters. You'll usually want to use this type
/// through the alias [`DefaultAnsCoder`], which sets the parameters to sane
/// values (`Word = u32`, `State = u64`, `PRECISION = 27`).
///
/// # Example
///
/// ```
/// use ansamble::{model::UniformModel, DefaultAnsCoder};
///
/// let model = UniformModel::<u32, 27>::new(10);
/// let mut coder = DefaultAnsCoder::new();
///
/// // Encode in reverse order so that decoding yields the forward order.
/// coder.encode_iid_symbols_reverse([3, 1, 4, 1, 5], &model).unwrap();
/// let decoded = coder.decode_iid_symbols(5, &model).unwrap();
/// assert_eq!(decoded, [3, 1, 4, 1, 5]);
/// assert!(coder.is_base());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnsCoder<Word, State, const PRECISION: usize>
where
    Word: BitArray + Into<State>,
    State: BitArray + AsPrimitive<Word>,
{
    /// Invariant: `heads.len() >= 1`. Heads may drop below `2^(H-W)` only
    /// while the tail is exhausted (see [`pop_intervals`](Self::pop_intervals)).
    heads: Vec<State>,
    tail: Vec<Word>,
}

/// Type alias for an [`AnsCoder`] with sane parameters for typical use cases.
///
/// The coding precision of 27 bits supports distributions over up to `2^27`
/// outcomes (so multisets of up to ~134M elements per encode call).
pub type DefaultAnsCoder = AnsCoder<u32, u64, 27>;

/// Type alias for an [`AnsCoder`] with a smaller word size and precision.
///
/// Useful when coder states are numerous and memory-bound; supports
/// distributions over at most `2^12` outcomes.
pub type SmallAnsCoder = AnsCoder<u16, u32, 12>;

impl<Word, State, const PRECISION: usize> AnsCoder<Word, State, PRECISION>
where
    Word: BitArray + Into<State>,
    State: BitArray + AsPrimitive<Word>,
{
    /// Creates a single-lane coder in the base state.
    ///
    /// This is the usual starting point for compressing data.
    pub fn new() -> Self {
        Self::with_lanes(1)
    }

    /// Creates a coder with `lanes` parallel lanes, all in the base state.
    ///
    /// # Panics
    ///
    /// Panics if `lanes == 0` or if the generic parameters violate the
    /// constraints listed in the [module-level documentation](self).
    pub fn with_lanes(lanes: usize) -> Self {
        assert!(lanes >= 1, "an AnsCoder needs at least one lane");
        assert!(State::BITS >= 2 * Word::BITS);
        assert!(State::BITS % Word::BITS == 0);
        assert!(PRECISION > 0 && PRECISION < Word::BITS);
        assert!(PRECISION <= State::BITS - Word::BITS);

        Self {
            heads: vec![Self::base_head(); lanes],
            tail: Vec::new(),
        }
    }

    /// The base (empty) head value, `2^(State::BITS - Word::BITS)`.
    #[inline(always)]
    fn base_head() -> State {
        State::one() << (State::BITS - Word::BITS)
    }

    /// Returns the number of parallel lanes.
    pub fn num_lanes(&self) -> usize {
        self.heads.len()
    }

    /// Checks whether the coder is in the base state (every head at
    /// `2^(H-W)`, empty tail), i.e. whether it holds no encoded data.
    pub fn is_base(&self) -> bool {
        self.tail.is_empty() && self.heads.iter().all(|&head| head == Self::base_head())
    }

    /// Reads the coded point (the low `PRECISION` bits) of a lane head.
    ///
    /// This does not modify the coder. Decoding a symbol consists of mapping
    /// the returned quantile to a symbol and its interval through an entropy
    /// model (or a [`Multiset`](crate::Multiset) rank query) and then popping
    /// that interval with [`pop_intervals`](Self::pop_intervals).
    ///
    /// # Panics
    ///
    /// Panics if `lane >= self.num_lanes()`.
    #[inline(always)]
    pub fn quantile(&self, lane: usize) -> Word {
        (self.heads[lane] % (State::one() << PRECISION)).as_()
    }

    /// Pushes one `(start, freq)` interval per lane onto the coder.
    ///
    /// `intervals[k]` is applied to lane `k`; lanes are processed in ascending
    /// order and renormalization words are emitted to the shared tail in that
    /// order. `intervals` may cover fewer lanes than the coder has; the
    /// remaining lanes are untouched.
    ///
    /// Every interval must satisfy `freq >= 1` and
    /// `start + freq <= 2^PRECISION`, otherwise [`CoderError::InvalidInterval`]
    /// is returned. On error the coder is left in a valid but unspecified
    /// state; clone it beforehand if you need to roll back.
    ///
    /// # Panics
    ///
    /// Panics if `intervals.len() > self.num_lanes()`.
    pub fn push_intervals(&mut self, intervals: &[(Word, Word)]) -> Result<()> {
        assert!(intervals.len() <= self.heads.len());
        for (lane, &(start, freq)) in intervals.iter().enumerate() {
            self.push_on_lane(lane, start, freq)?;
        }
        Ok(())
    }

    /// Pops one `(start, freq)` interval per lane off the coder.
    ///
    /// This is the exact inverse of [`push_intervals`](Self::push_intervals)
    /// with the same `intervals`: lanes are processed in descending order and
    /// refill words are popped from the shared tail, mirroring the emission
    /// order of the push.
    ///
    /// Each lane's coded point must lie in the supplied interval, otherwise
    /// [`CoderError::DecodeMismatch`] is returned. Popping below the stored
    /// data is permitted as long as the head is nonzero (this is what the
    /// initial bits-back draws of a multiset encode do); a pop on a fully
    /// drained lane returns [`CoderError::StateUnderflow`].
    ///
    /// # Panics
    ///
    /// Panics if `intervals.len() > self.num_lanes()`.
    pub fn pop_intervals(&mut self, intervals: &[(Word, Word)]) -> Result<()> {
        assert!(intervals.len() <= self.heads.len());
        for (lane, &(start, freq)) in intervals.iter().enumerate().rev() {
            self.pop_on_lane(lane, start, freq)?;
        }
        Ok(())
    }

    fn push_on_lane(&mut self, lane: usize, start: Word, freq: Word) -> Result<()> {
        check_interval::<Word, PRECISION>(start, freq)?;

        let freq_state: State = freq.into();
        let mut head = self.heads[lane];

        // Emit tail words until the scaled head is guaranteed to stay below
        // `2^State::BITS`. With `PRECISION <= State::BITS - Word::BITS` this
        // loop runs at most once per push, but the condition is the general
        // one: `head >= freq << (State::BITS - PRECISION)`.
        while head >> (State::BITS - PRECISION) >= freq_state {
            self.tail.push(head.as_());
            head = head >> Word::BITS;
        }

        self.heads[lane] =
            (head / freq_state) << PRECISION | (head % freq_state + start.into());
        Ok(())
    }

    fn pop_on_lane(&mut self, lane: usize, start: Word, freq: Word) -> Result<()> {
        check_interval::<Word, PRECISION>(start, freq)?;

        let head = self.heads[lane];
        if head == State::zero() && self.tail.is_empty() {
            return Err(CoderError::StateUnderflow);
        }

        let quantile: Word = (head % (State::one() << PRECISION)).as_();
        if quantile < start || quantile - start >= freq {
            return Err(CoderError::DecodeMismatch);
        }

        let remainder: State = (quantile - start).into();
        let freq_state: State = freq.into();
        let mut head = (head >> PRECISION) * freq_state + remainder;

        // Refill from the tail until the head is back above the
        // normalization floor. If the tail runs out first the head simply
        // stays below the floor; the push arithmetic cannot re-emit in that
        // regime, so push and pop remain exact inverses.
        while head < Self::base_head() {
            match self.tail.pop() {
                Some(word) => head = head << Word::BITS | word.into(),
                None => break,
            }
        }

        self.heads[lane] = head;
        Ok(())
    }

    /// Encodes a single symbol on lane 0 using the given entropy model.
    ///
    /// Returns [`CoderError::InvalidInterval`] if `symbol` is impossible under
    /// `model` (i.e. has zero probability mass).
    pub fn encode_symbol<M>(
        &mut self,
        symbol: impl Borrow<M::Symbol>,
        model: &M,
    ) -> Result<()>
    where
        M: EncoderModel<PRECISION, Probability = Word>,
    {
        let (start, freq) = model
            .left_cumulative_and_probability(symbol.borrow())
            .ok_or(CoderError::InvalidInterval)?;
        self.push_on_lane(0, start, freq)
    }

    /// Decodes a single symbol from lane 0 using the given entropy model.
    ///
    /// This pops off the symbol that was most recently encoded on lane 0
    /// (the coder is a stack).
    pub fn decode_symbol<M>(&mut self, model: &M) -> Result<M::Symbol>
    where
        M: DecoderModel<PRECISION, Probability = Word>,
    {
        let (symbol, start, freq) = model.quantile_function(self.quantile(0));
        self.pop_on_lane(0, start, freq)?;
        Ok(symbol)
    }

    /// Encodes a sequence of symbols on lane 0, in the order given.
    ///
    /// Remember that decoding pops symbols in reverse order; if you want the
    /// decoded sequence to come out forward, use
    /// [`encode_iid_symbols_reverse`](Self::encode_iid_symbols_reverse).
    pub fn encode_iid_symbols<M, I>(&mut self, symbols: I, model: &M) -> Result<()>
    where
        M: EncoderModel<PRECISION, Probability = Word>,
        I: IntoIterator,
        I::Item: Borrow<M::Symbol>,
    {
        for symbol in symbols {
            self.encode_symbol(symbol, model)?;
        }
        Ok(())
    }

    /// Encodes a sequence of symbols on lane 0 in *reverse* order, so that
    /// [`decode_iid_symbols`](Self::decode_iid_symbols) returns them in
    /// forward order.
    pub fn encode_iid_symbols_reverse<M, I>(
        &mut self,
        symbols: I,
        model: &M,
    ) -> Result<()>
    where
        M: EncoderModel<PRECISION, Probability = Word>,
        I: IntoIterator,
        I::Item: Borrow<M::Symbol>,
        I::IntoIter: DoubleEndedIterator,
    {
        self.encode_iid_symbols(symbols.into_iter().rev(), model)
    }

    /// Decodes `amt` symbols from lane 0 with a fixed entropy model.
    pub fn decode_iid_symbols<M>(
        &mut self,
        amt: usize,
        model: &M,
    ) -> Result<Vec<M::Symbol>>
    where
        M: DecoderModel<PRECISION, Probability = Word>,
    {
        let mut symbols = Vec::with_capacity(amt);
        for _ in 0..amt {
            symbols.push(self.decode_symbol(model)?);
        }
        Ok(symbols)
    }

    /// Serializes the coder state into a stream of `Word`s.
    ///
    /// The layout is: the number of lanes `L` as a single word, then each lane
    /// head as `State::BITS / Word::BITS` big-endian words (ascending lane
    /// order), then the tail verbatim. A freshly created coder serializes to
    /// the empty-state sentinel: `L`, followed by `L` base heads, and no tail.
    ///
    /// # Panics
    ///
    /// Panics if the number of lanes does not fit into a `Word` (an absurd
    /// configuration).
    pub fn into_words(self) -> Vec<Word>
    where
        usize: AsPrimitive<Word>,
        Word: AsPrimitive<usize>,
    {
        let lanes = self.heads.len();
        let words_per_head = State::BITS / Word::BITS;
        let lanes_word: Word = lanes.as_();
        assert!(
            AsPrimitive::<usize>::as_(lanes_word) == lanes,
            "lane count does not fit into a tail word"
        );

        let mut words = Vec::with_capacity(1 + lanes * words_per_head + self.tail.len());
        words.push(lanes_word);
        for &head in &self.heads {
            for i in (0..words_per_head).rev() {
                words.push((head >> (i * Word::BITS)).as_());
            }
        }
        words.extend_from_slice(&self.tail);
        words
    }

    /// Deserializes a coder state previously produced by
    /// [`into_words`](Self::into_words).
    ///
    /// Returns [`CoderError::InvalidData`] if the stream is empty, declares
    /// zero lanes, or is too short to contain the declared lane heads.
    pub fn from_words(words: &[Word]) -> Result<Self>
    where
        Word: AsPrimitive<usize>,
    {
        let (&lanes_word, rest) = words.split_first().ok_or(CoderError::InvalidData)?;
        let lanes: usize = lanes_word.as_();
        let words_per_head = State::BITS / Word::BITS;
        if lanes == 0 || rest.len() < lanes * words_per_head {
            return Err(CoderError::InvalidData);
        }

        let (head_words, tail) = rest.split_at(lanes * words_per_head);
        let heads = head_words
            .chunks_exact(words_per_head)
            .map(|chunk| {
                chunk
                    .iter()
                    .fold(State::zero(), |head, &word| head << Word::BITS | word.into())
            })
            .collect();

        Ok(Self {
            heads,
            tail: tail.to_vec(),
        })
    }

    /// Returns the number of words that [`into_words`](Self::into_words)
    /// would produce for the current state.
    pub fn num_words(&self) -> usize {
        1 + self.heads.len() * (State::BITS / Word::BITS) + self.tail.len()
    }

    /// Returns the size of the serialized state in bits.
    ///
    /// See also [`num_valid_bits`](Self::num_valid_bits) for a finer-grained
    /// measure.
    pub fn num_bits(&self) -> usize {
        Word::BITS * self.num_words()
    }

    /// Returns the number of information-carrying bits on the coder.
    ///
    /// In contrast to [`num_bits`](Self::num_bits), this ignores the
    /// serialization framing and counts lane heads only up to their most
    /// significant set bit (exclusive). Useful for measuring small coding-rate
    /// differences that stay below the word granularity.
    pub fn num_valid_bits(&self) -> usize {
        let head_bits: usize = self
            .heads
            .iter()
            .map(|head| core::cmp::max(State::BITS - head.leading_zeros() as usize, 1) - 1)
            .sum();
        Word::BITS * self.tail.len() + head_bits
    }
}

impl<Word, State, const PRECISION: usize> Default for AnsCoder<Word, State, PRECISION>
where
    Word: BitArray + Into<State>,
    State: BitArray + AsPrimitive<Word>,
{
    fn default() -> Self {
        Self::new()
    }
}

#[inline(always)]
fn check_interval<Word: BitArray, const PRECISION: usize>(
    start: Word,
    freq: Word,
) -> Result<()> {
    // `PRECISION < Word::BITS`, so `2^PRECISION` is representable.
    let total = Word::one() << PRECISION;
    if freq == Word::zero() || freq > total || start > total - freq {
        Err(CoderError::InvalidInterval)
    } else {
        Ok(())
    }
}
