//! Symbol codecs: the contract between entropy models, composite codecs, and
//! the coder.
//!
//! A [`SymbolCodec`] transforms the state of an [`AnsCoder`] to absorb or
//! release one symbol. Implementations must satisfy three laws:
//!
//! - *Inverse law*: `decode(encode(state, s)) == (state, s)` bit-exactly, for
//!   every reachable state and every encodable symbol.
//! - *Precision bound*: every interval pushed or popped satisfies `freq >= 1`
//!   and `start + freq <= 2^PRECISION`.
//! - *Statelessness*: no hidden dependency on call history; all context lives
//!   in the coder state and the symbol.
//!
//! The two entropy models of [`crate::model`] implement the trait directly.
//! This module adds composite codecs for structured symbols ([`ByteArray`],
//! [`Sequence`], and [`VariableLengthSequence`]) and the submodules
//! [`swor`] (sampling without replacement) and the [`MultisetCodec`]
//! (re-exported from [`multiset`](self::multiset)).

use alloc::vec::Vec;

use num_traits::AsPrimitive;

use crate::{
    ans::AnsCoder,
    model::{CategoricalModel, UniformModel},
    BitArray, Result,
};

pub mod multiset;
pub mod swor;

pub use multiset::MultisetCodec;

/// A codec for a single (possibly structured) symbol, operating against an
/// [`AnsCoder`].
///
/// See the [module-level documentation](self) for the laws implementations
/// must satisfy.
pub trait SymbolCodec<Word, State, const PRECISION: usize>
where
    Word: BitArray + Into<State>,
    State: BitArray + AsPrimitive<Word>,
{
    /// The type of symbols this codec encodes and decodes.
    type Symbol;

    /// Pushes `symbol` onto the coder.
    fn encode(
        &self,
        coder: &mut AnsCoder<Word, State, PRECISION>,
        symbol: &Self::Symbol,
    ) -> Result<()>;

    /// Pops the most recently encoded symbol off the coder.
    fn decode(
        &self,
        coder: &mut AnsCoder<Word, State, PRECISION>,
    ) -> Result<Self::Symbol>;
}

impl<Word, State, const PRECISION: usize> SymbolCodec<Word, State, PRECISION>
    for UniformModel<Word, PRECISION>
where
    Word: BitArray + Into<State> + AsPrimitive<u64>,
    State: BitArray + AsPrimitive<Word>,
    u64: AsPrimitive<Word>,
{
    type Symbol = usize;

    fn encode(
        &self,
        coder: &mut AnsCoder<Word, State, PRECISION>,
        symbol: &usize,
    ) -> Result<()> {
        coder.encode_symbol(symbol, self)
    }

    fn decode(
        &self,
        coder: &mut AnsCoder<Word, State, PRECISION>,
    ) -> Result<usize> {
        coder.decode_symbol(self)
    }
}

impl<Word, State, const PRECISION: usize> SymbolCodec<Word, State, PRECISION>
    for CategoricalModel<Word, PRECISION>
where
    Word: BitArray + Into<State>,
    State: BitArray + AsPrimitive<Word>,
{
    type Symbol = usize;

    fn encode(
        &self,
        coder: &mut AnsCoder<Word, State, PRECISION>,
        symbol: &usize,
    ) -> Result<()> {
        coder.encode_symbol(symbol, self)
    }

    fn decode(
        &self,
        coder: &mut AnsCoder<Word, State, PRECISION>,
    ) -> Result<usize> {
        coder.decode_symbol(self)
    }
}

/// A codec for byte strings of bounded length.
///
/// Each byte is coded uniformly over `0..256`; the length is coded uniformly
/// over `0..=max_len` *after* the bytes, so that decoding pops the length
/// first and the codec is self-delimiting.
///
/// # Example
///
/// ```
/// use ansamble::{codec::{ByteArray, SymbolCodec}, DefaultAnsCoder};
///
/// let codec = ByteArray::<u32, 27>::new(16);
/// let mut coder = DefaultAnsCoder::new();
/// codec.encode(&mut coder, &b"ans".to_vec()).unwrap();
/// assert_eq!(codec.decode(&mut coder).unwrap(), b"ans");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ByteArray<Probability, const PRECISION: usize> {
    length_model: UniformModel<Probability, PRECISION>,
    byte_model: UniformModel<Probability, PRECISION>,
}

impl<Probability: BitArray, const PRECISION: usize> ByteArray<Probability, PRECISION> {
    /// Creates a codec for byte strings of length at most `max_len`.
    ///
    /// # Panics
    ///
    /// Panics if `max_len + 1` or `256` exceed `2^PRECISION`.
    pub fn new(max_len: usize) -> Self {
        Self {
            length_model: UniformModel::new(max_len + 1),
            byte_model: UniformModel::new(256),
        }
    }
}

impl<Word, State, const PRECISION: usize> SymbolCodec<Word, State, PRECISION>
    for ByteArray<Word, PRECISION>
where
    Word: BitArray + Into<State> + AsPrimitive<u64>,
    State: BitArray + AsPrimitive<Word>,
    u64: AsPrimitive<Word>,
{
    type Symbol = Vec<u8>;

    fn encode(
        &self,
        coder: &mut AnsCoder<Word, State, PRECISION>,
        symbol: &Vec<u8>,
    ) -> Result<()> {
        // Bytes in reverse so that decoding yields them in forward order,
        // then the length on top. An over-long string has no interval under
        // the length model and is rejected there.
        for &byte in symbol.iter().rev() {
            coder.encode_symbol(byte as usize, &self.byte_model)?;
        }
        coder.encode_symbol(symbol.len(), &self.length_model)
    }

    fn decode(
        &self,
        coder: &mut AnsCoder<Word, State, PRECISION>,
    ) -> Result<Vec<u8>> {
        let len = coder.decode_symbol(&self.length_model)?;
        let mut bytes = Vec::with_capacity(len);
        for _ in 0..len {
            bytes.push(coder.decode_symbol(&self.byte_model)? as u8);
        }
        Ok(bytes)
    }
}

/// A codec for sequences of a fixed, externally known length.
///
/// Elements are coded with the wrapped element codec; the length is *not*
/// coded, so encode and decode must agree on it out of band.
#[derive(Debug, Clone, Copy)]
pub struct Sequence<C> {
    element_codec: C,
    len: usize,
}

impl<C> Sequence<C> {
    /// Creates a codec for sequences of exactly `len` elements.
    pub fn new(element_codec: C, len: usize) -> Self {
        Self { element_codec, len }
    }
}

impl<Word, State, C, const PRECISION: usize> SymbolCodec<Word, State, PRECISION> for Sequence<C>
where
    Word: BitArray + Into<State>,
    State: BitArray + AsPrimitive<Word>,
    C: SymbolCodec<Word, State, PRECISION>,
{
    type Symbol = Vec<C::Symbol>;

    /// # Panics
    ///
    /// Panics if `symbol.len()` differs from the length fixed at construction.
    fn encode(
        &self,
        coder: &mut AnsCoder<Word, State, PRECISION>,
        symbol: &Vec<C::Symbol>,
    ) -> Result<()> {
        assert_eq!(symbol.len(), self.len, "sequence length mismatch");
        for element in symbol.iter().rev() {
            self.element_codec.encode(coder, element)?;
        }
        Ok(())
    }

    fn decode(
        &self,
        coder: &mut AnsCoder<Word, State, PRECISION>,
    ) -> Result<Vec<C::Symbol>> {
        let mut elements = Vec::with_capacity(self.len);
        for _ in 0..self.len {
            elements.push(self.element_codec.decode(coder)?);
        }
        Ok(elements)
    }
}

/// A codec for sequences of variable, bounded length.
///
/// Like [`Sequence`], but self-delimiting: the length is coded uniformly over
/// `0..=max_len` on top of the elements.
#[derive(Debug, Clone, Copy)]
pub struct VariableLengthSequence<C, Probability, const PRECISION: usize> {
    element_codec: C,
    length_model: UniformModel<Probability, PRECISION>,
}

impl<C, Probability: BitArray, const PRECISION: usize>
    VariableLengthSequence<C, Probability, PRECISION>
{
    /// Creates a codec for sequences of length at most `max_len`.
    ///
    /// # Panics
    ///
    /// Panics if `max_len + 1` exceeds `2^PRECISION`.
    pub fn new(element_codec: C, max_len: usize) -> Self {
        Self {
            element_codec,
            length_model: UniformModel::new(max_len + 1),
        }
    }
}

impl<Word, State, C, const PRECISION: usize> SymbolCodec<Word, State, PRECISION>
    for VariableLengthSequence<C, Word, PRECISION>
where
    Word: BitArray + Into<State> + AsPrimitive<u64>,
    State: BitArray + AsPrimitive<Word>,
    u64: AsPrimitive<Word>,
    C: SymbolCodec<Word, State, PRECISION>,
{
    type Symbol = Vec<C::Symbol>;

    fn encode(
        &self,
        coder: &mut AnsCoder<Word, State, PRECISION>,
        symbol: &Vec<C::Symbol>,
    ) -> Result<()> {
        for element in symbol.iter().rev() {
            self.element_codec.encode(coder, element)?;
        }
        coder.encode_symbol(symbol.len(), &self.length_model)
    }

    fn decode(
        &self,
        coder: &mut AnsCoder<Word, State, PRECISION>,
    ) -> Result<Vec<C::Symbol>> {
        let len = coder.decode_symbol(&self.length_model)?;
        let mut elements = Vec::with_capacity(len);
        for _ in 0..len {
            elements.push(self.element_codec.decode(coder)?);
        }
        Ok(elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    use crate::{CoderError, DefaultAnsCoder};

    #[test]
    fn byte_array_roundtrip() {
        let codec = ByteArray::<u32, 27>::new(32);
        let mut coder = DefaultAnsCoder::new();
        let initial = coder.clone();

        let strings: Vec<Vec<u8>> = vec![b"".to_vec(), b"a".to_vec(), b"multiset".to_vec()];
        for string in strings.iter().rev() {
            codec.encode(&mut coder, string).unwrap();
        }
        for string in &strings {
            assert_eq!(&codec.decode(&mut coder).unwrap(), string);
        }
        assert_eq!(coder, initial);
    }

    #[test]
    fn byte_array_rejects_overlong_input() {
        let codec = ByteArray::<u32, 27>::new(2);
        let mut coder = DefaultAnsCoder::new();
        assert_eq!(
            codec.encode(&mut coder, &b"too long".to_vec()),
            Err(CoderError::InvalidInterval)
        );
    }

    #[test]
    fn sequence_roundtrip() {
        let codec = Sequence::new(UniformModel::<u32, 27>::new(1000), 4);
        let mut coder = DefaultAnsCoder::new();

        let symbols = vec![0usize, 999, 500, 500];
        codec.encode(&mut coder, &symbols).unwrap();
        assert_eq!(codec.decode(&mut coder).unwrap(), symbols);
        assert!(coder.is_base());
    }

    #[test]
    fn variable_length_sequence_roundtrip() {
        let element = CategoricalModel::<u32, 27>::from_floating_point_probabilities(&[
            0.5, 0.25, 0.125, 0.125,
        ])
        .unwrap();
        let codec = VariableLengthSequence::<_, u32, 27>::new(element, 10);
        let mut coder = DefaultAnsCoder::new();
        let initial = coder.clone();

        let sequences: Vec<Vec<usize>> = vec![vec![], vec![3, 0, 0, 1, 2], vec![0]];
        for sequence in sequences.iter().rev() {
            codec.encode(&mut coder, sequence).unwrap();
        }
        for sequence in &sequences {
            assert_eq!(&codec.decode(&mut coder).unwrap(), sequence);
        }
        assert_eq!(coder, initial);
    }
}
