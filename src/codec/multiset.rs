//! The multiset codec: bits-back compression of a whole multiset.
//!
//! [`MultisetCodec`] lifts any [`SymbolCodec`] over some symbol type to a
//! codec for [`Multiset`]s of that type. Encoding alternates two moves until
//! the multiset is drained:
//!
//! 1. *draw*: [`swor::decode`] samples one element without replacement,
//!    popping its position information off the coder (bits-back);
//! 2. *code*: the symbol codec pushes the drawn symbol onto the coder.
//!
//! Each draw reclaims `log2(len / multiplicity)` bits, so over the whole
//! multiset the net output is the sequence cost minus
//! `log2(M! / (n_1! · n_2! · …))`, the ordering information a sequence codec
//! would redundantly spend. Decoding runs the two moves in reverse (pop a
//! symbol, push it back into the growing multiset via [`swor::encode`]) and
//! reconstructs a multiset with the same multiplicity for every symbol; only
//! the internal tree shape may differ.

use num_traits::AsPrimitive;

use crate::{
    ans::AnsCoder,
    codec::{swor, SymbolCodec},
    BitArray, Multiset, Result,
};

/// Codec for whole multisets, parameterized by a per-symbol codec.
///
/// # Example
///
/// Compressing a multiset of byte strings (e.g. the keys of a JSON map):
///
/// ```
/// use ansamble::{codec::{ByteArray, MultisetCodec}, DefaultAnsCoder, Multiset};
///
/// let keys: Multiset<Vec<u8>> = [&b"id"[..], b"name", b"name", b"tags"]
///     .iter()
///     .map(|key| key.to_vec())
///     .collect();
///
/// let codec = MultisetCodec::new(ByteArray::<u32, 27>::new(64));
/// let mut coder = DefaultAnsCoder::new();
/// codec.encode(&mut coder, keys.clone()).unwrap();
///
/// let decoded = codec.decode(&mut coder, keys.len()).unwrap();
/// assert_eq!(decoded, keys);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct MultisetCodec<C> {
    symbol_codec: C,
}

impl<C> MultisetCodec<C> {
    /// Creates a multiset codec from a per-symbol codec.
    pub fn new(symbol_codec: C) -> Self {
        Self { symbol_codec }
    }

    /// Returns a reference to the wrapped per-symbol codec.
    pub fn symbol_codec(&self) -> &C {
        &self.symbol_codec
    }

    /// Encodes `multiset` onto the coder.
    ///
    /// The multiset's size is *not* encoded; it must be supplied to
    /// [`decode`](Self::decode) out of band (like the sequence length of a
    /// conventional codec).
    pub fn encode<Word, State, const PRECISION: usize>(
        &self,
        coder: &mut AnsCoder<Word, State, PRECISION>,
        multiset: Multiset<C::Symbol>,
    ) -> Result<()>
    where
        Word: BitArray + Into<State> + AsPrimitive<u64>,
        State: BitArray + AsPrimitive<Word>,
        u64: AsPrimitive<Word>,
        C: SymbolCodec<Word, State, PRECISION>,
        C::Symbol: Ord + Clone,
    {
        let mut multiset = multiset;
        while !multiset.is_empty() {
            let (symbol, rest) = swor::decode(coder, &multiset)?;
            self.symbol_codec.encode(coder, &symbol)?;
            multiset = rest;
        }
        Ok(())
    }

    /// Decodes a multiset of `len` elements from the coder.
    ///
    /// Inverts [`encode`](Self::encode): afterwards the coder state is
    /// restored to what it was before the encode, and the returned multiset
    /// has the same multiplicities as the encoded one.
    pub fn decode<Word, State, const PRECISION: usize>(
        &self,
        coder: &mut AnsCoder<Word, State, PRECISION>,
        len: usize,
    ) -> Result<Multiset<C::Symbol>>
    where
        Word: BitArray + Into<State> + AsPrimitive<u64>,
        State: BitArray + AsPrimitive<Word>,
        u64: AsPrimitive<Word>,
        C: SymbolCodec<Word, State, PRECISION>,
        C::Symbol: Ord + Clone,
    {
        let mut multiset = Multiset::new();
        for _ in 0..len {
            let symbol = self.symbol_codec.decode(coder)?;
            multiset = swor::encode(coder, symbol, &multiset)?;
        }
        Ok(multiset)
    }
}
