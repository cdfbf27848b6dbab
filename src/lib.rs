//! Lossless compression of *multisets*: unordered collections with repetition.
//!
//! This crate turns any symbol-level entropy codec into a multiset-level codec
//! whose output is shorter by (approximately) the information content of the
//! ordering that a sequence codec would redundantly encode. For a multiset of
//! size `M` with element multiplicities `n_1, n_2, …`, the savings approach
//! `log2(M! / (n_1! · n_2! · …))` bits.
//!
//! # How it works
//!
//! The construction is an instance of *bits-back coding* on top of a
//! stack-shaped (last-in-first-out) entropy coder:
//!
//! 1. A vectorized range Asymmetric Numeral Systems ([rANS]) coder
//!    ([`AnsCoder`]) maintains the compressed representation as a stack of
//!    entropy-coded symbols. Because it is a stack, *decoding* from it is a
//!    legitimate operation even while compressing: it consumes previously
//!    encoded information and returns it as a "random" sample.
//! 2. A persistent count-augmented binary search tree ([`Multiset`]) stores the
//!    multiset and answers the two rank queries that ANS coding needs: symbol →
//!    cumulative interval ([`Multiset::forward_lookup`]) and coded point →
//!    symbol ([`Multiset::reverse_lookup`]).
//! 3. The [`MultisetCodec`](codec::MultisetCodec) repeatedly *samples a symbol
//!    without replacement* from the multiset by decoding from the rANS state
//!    (the bits-back step, [`codec::swor`]), then encodes the sampled symbol
//!    with a user-supplied [`SymbolCodec`](codec::SymbolCodec). Decompression
//!    runs the exact inverse and rebuilds a multiset with identical
//!    multiplicities.
//!
//! The symbols drawn in step 3 come out in an order determined by the
//! compressed bits themselves, so the order carries no information, which is
//! precisely why it costs nothing.
//!
//! # Example
//!
//! ```
//! use ansamble::{codec::MultisetCodec, model::UniformModel, DefaultAnsCoder, Multiset};
//!
//! // Four bytes, two of them equal; order is irrelevant.
//! let multiset: Multiset<usize> = [0, 255, 128, 128].into_iter().collect();
//!
//! let codec = MultisetCodec::new(UniformModel::<u32, 27>::new(256));
//! let mut coder = DefaultAnsCoder::new();
//!
//! codec.encode(&mut coder, multiset.clone()).unwrap();
//! let reconstructed = codec.decode(&mut coder, 4).unwrap();
//!
//! assert_eq!(reconstructed, multiset); // same multiplicities for every symbol
//! assert!(coder.is_base()); // decoding returned the coder to its initial state
//! ```
//!
//! # Crate layout
//!
//! - [`ans`]: the vectorized rANS coder, including serialization of coder
//!   states to plain word streams.
//! - [`multiset`]: the persistent count-augmented BST.
//! - [`model`]: fixed-point entropy models ([`UniformModel`](model::UniformModel),
//!   [`CategoricalModel`](model::CategoricalModel)) and the entropy-model
//!   traits they implement.
//! - [`codec`]: the symbol-codec contract, composite codecs
//!   ([`ByteArray`](codec::ByteArray), [`Sequence`](codec::Sequence),
//!   [`VariableLengthSequence`](codec::VariableLengthSequence)), sampling
//!   without replacement ([`codec::swor`]), and the multiset codec itself.
//!
//! All coding arithmetic is exact integer arithmetic; encoding and decoding
//! are bit-exact inverses of each other for every model and codec in this
//! crate.
//!
//! [rANS]:
//! https://en.wikipedia.org/wiki/Asymmetric_numeral_systems#Range_variants_(rANS)_and_streaming

#![no_std]
#![warn(missing_docs, rust_2018_idioms, missing_debug_implementations)]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

pub mod ans;
pub mod codec;
pub mod model;
pub mod multiset;

use core::fmt::{self, Debug, Display};

use num_traits::{PrimInt, Unsigned, WrappingAdd, WrappingSub};

pub use ans::{AnsCoder, DefaultAnsCoder, SmallAnsCoder};
pub use multiset::Multiset;

/// A trait for bit strings of fixed (and usually small) length.
///
/// Short fixed-length bit strings are the building blocks of the coder: they
/// represent tail words, lane heads, and fixed-point probabilities. The trait
/// is implemented for all primitive unsigned integer types; there is usually
/// no reason to implement it on custom types since the coder assumes that
/// `BitArray`s can be manipulated efficiently in hardware.
///
/// # Safety
///
/// This trait is marked `unsafe` so that the coder may rely on the assumption
/// that all `BitArray`s behave exactly like builtin unsigned integers and that
/// [`BitArray::BITS`] has the correct value.
pub unsafe trait BitArray:
    PrimInt + Unsigned + WrappingAdd + WrappingSub + Debug + 'static
{
    /// The (fixed) length of the `BitArray` in bits.
    ///
    /// Defaults to `8 * core::mem::size_of::<Self>()`, which is suitable for
    /// all primitive unsigned integers.
    const BITS: usize = 8 * core::mem::size_of::<Self>();
}

unsafe impl BitArray for u8 {}
unsafe impl BitArray for u16 {}
unsafe impl BitArray for u32 {}
unsafe impl BitArray for u64 {}
unsafe impl BitArray for u128 {}
unsafe impl BitArray for usize {}

/// Error type for operations on a [`Multiset`].
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultisetError {
    /// A removal or forward lookup was attempted for a symbol that is not in
    /// the multiset.
    SymbolNotPresent,

    /// A reverse lookup was attempted at an index outside `0..len`.
    IndexOutOfRange {
        /// The offending index.
        index: usize,
        /// The number of elements (with multiplicity) in the multiset.
        len: usize,
    },
}

impl Display for MultisetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SymbolNotPresent => write!(f, "symbol not present in multiset"),
            Self::IndexOutOfRange { index, len } => {
                write!(f, "index {index} out of range for multiset of size {len}")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for MultisetError {}

/// Error type for entropy coding operations.
///
/// All errors are fatal to the current codec invocation: the stack discipline
/// of the rANS coder makes partial recovery impossible, so callers that need
/// to speculate should clone the coder state beforehand.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoderError {
    /// A coded interval violated the precision bound: its frequency was zero
    /// or it extended past `2^PRECISION`. This also covers symbols that are
    /// impossible under the entropy model in use (they have no interval).
    InvalidInterval,

    /// The coded point on a lane head did not lie in the requested interval.
    /// This indicates a corrupted state, codecs applied in the wrong order, or
    /// a broken entropy model.
    DecodeMismatch,

    /// A pop was requested on a lane that holds no information at all (zero
    /// head and exhausted tail).
    StateUnderflow,

    /// A distribution over more outcomes than `2^PRECISION` was requested.
    /// Callers must chunk their data or raise the precision.
    PrecisionExhausted {
        /// The number of outcomes requested.
        len: usize,
        /// The largest supported number of outcomes, `2^PRECISION`.
        max: usize,
    },

    /// Serialized coder data was malformed (truncated, or inconsistent with
    /// its length prefix).
    InvalidData,

    /// A multiset operation failed while executing a codec.
    Multiset(MultisetError),
}

impl Display for CoderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInterval => write!(f, "coded interval violates the precision bound"),
            Self::DecodeMismatch => write!(f, "coded point lies outside the requested interval"),
            Self::StateUnderflow => write!(f, "pop from a fully drained coder lane"),
            Self::PrecisionExhausted { len, max } => write!(
                f,
                "distribution over {len} outcomes exceeds coding precision (max {max})"
            ),
            Self::InvalidData => write!(f, "malformed serialized coder state"),
            Self::Multiset(err) => write!(f, "multiset operation failed: {err}"),
        }
    }
}

impl From<MultisetError> for CoderError {
    fn from(err: MultisetError) -> Self {
        Self::Multiset(err)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CoderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Multiset(err) => Some(err),
            _ => None,
        }
    }
}

/// Shorthand for results of entropy coding operations, with [`CoderError`]
/// as the error type.
pub type Result<T> = core::result::Result<T, CoderError>;
