//! A crate implementing distributed point functions over prime fields.
//!
//! A DPF lets a client split the function that is `value` at a single point and zero everywhere
//! else into two keys. Each key alone reveals nothing about the point or the value, while the
//! two evaluations at any input sum to the function's output there.
use ark_ff::PrimeField;
use rand::{CryptoRng, RngCore};
use thiserror::Error;

/// DPF scheme based on [[BGI18]].
///
/// [BGI18]: https://eprint.iacr.org/2018/707.pdf
pub mod bgi18;
pub use bgi18::*;

pub mod data_structures;
pub use data_structures::*;

pub mod field;

pub mod prg;
pub use prg::{Engine, Node, SeedStream};


/// Largest supported domain, in bits
pub const MAX_LOG_DOMAIN: usize = 63;

/// Largest supported number of field elements output per point
pub const MAX_VALUE_LEN: usize = 256;

/// Errors raised while generating or evaluating DPF keys
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DpfError {
    /// The point, domain or value is outside of what the scheme supports
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
    /// An output buffer does not match the shape of the key's outputs
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),
}

/// Describes the interface for a distributed point function scheme over some field. Such a scheme
/// allows a sender to generate two keys which provide succinct representations of functions
/// which output additive secret shares of the point function.
///
/// Outputs are vectors in `F^n`: every key of a pair evaluates to `n` elements at each point and
/// the shares of the two keys sum to `value` at `point` and to zero elsewhere.
pub trait DPF<F: PrimeField> {
    /// A succinct representation of a function which outputs shares of the underlying point
    /// function
    type Key;

    /// Takes the description of a point function on a domain of `2^log_domain` points and
    /// outputs two `Key`s.
    fn gen<RNG: CryptoRng + RngCore>(
        engine: &Engine,
        point: u64,
        value: &[F],
        log_domain: usize,
        rng: &mut RNG,
    ) -> Result<(Self::Key, Self::Key), DpfError>;

    /// Takes a `Key` and point as input, and outputs a secret share of the point function at
    /// that point.
    fn eval(
        engine: &Engine,
        key: &Self::Key,
        point: u64,
        log_domain: usize,
    ) -> Result<Vec<F>, DpfError>;

    /// Evaluates `key` on every point of the domain. `out` must hold `2^log_domain` rows, each as
    /// wide as the key's output, and row `x` receives the share at point `x`.
    fn eval_full(
        engine: &Engine,
        key: &Self::Key,
        log_domain: usize,
        out: &mut [Vec<F>],
    ) -> Result<(), DpfError>;
}

/// Decomposes `point` into its `log_domain` bits, most significant first. This is the path from
/// the root of the evaluation tree to the leaf of `point`.
pub fn point_to_bits(log_domain: usize, point: u64) -> Result<Vec<bool>, DpfError> {
    if log_domain > MAX_LOG_DOMAIN {
        return Err(DpfError::InvalidParameters(format!(
            "domain of {} bits exceeds the maximum of {}",
            log_domain, MAX_LOG_DOMAIN
        )));
    }
    if point >> log_domain != 0 {
        return Err(DpfError::InvalidParameters(format!(
            "point {} is outside of a domain of {} bits",
            point, log_domain
        )));
    }
    Ok((0..log_domain)
        .rev()
        .map(|i| (point >> i) & 1 == 1)
        .collect())
}
