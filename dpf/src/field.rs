//! Prime fields used by the point functions and the PIR layer on top of them.
//!
//! Every share, correction value and database entry is an element of one of these fields. The
//! width of the wire encoding is a property of the field, so switching the field switches the
//! size of keys and answers.
use ark_ff::{
    fields::{Fp128, Fp64, MontBackend, MontConfig},
    BigInteger, Field, PrimeField,
};

/// Parameters for the Mersenne prime field `p = 2^127 - 1`.
#[derive(MontConfig)]
#[modulus = "170141183460469231731687303715884105727"]
#[generator = "43"]
pub struct F127Config;

/// The integers modulo `2^127 - 1`. Elements are encoded in 16 bytes.
pub type F127 = Fp128<MontBackend<F127Config, 2>>;

/// Parameters for the field `p = 2^64 - 59`, the largest 64-bit prime.
#[derive(MontConfig)]
#[modulus = "18446744073709551557"]
#[generator = "2"]
pub struct F64Config;

/// The integers modulo `2^64 - 59`. Elements are encoded in 8 bytes.
pub type F64 = Fp64<MontBackend<F64Config, 1>>;

/// The default field of the scheme
pub type FieldElement = F127;

/// Size in bytes of the fixed-width encoding of an element of `F`
#[inline]
pub fn element_size<F: PrimeField>() -> usize {
    F::zero().compressed_size()
}

/// Number of raw bytes embedded in a single element of `F` when storing byte strings. This is
/// the largest byte count whose integer value is always below the modulus, so the embedding is
/// injective (15 bytes for `F127`, 7 for `F64`).
#[inline]
pub fn chunk_bytes<F: PrimeField>() -> usize {
    (F::MODULUS_BIT_SIZE as usize - 1) / 8
}

/// Returns `(1, alpha, alpha^2, ..., alpha^n)`
pub fn power_vector_with_one<F: Field>(alpha: F, n: usize) -> Vec<F> {
    let mut out = Vec::with_capacity(n + 1);
    let mut acc = F::one();
    out.push(acc);
    for _ in 0..n {
        acc *= alpha;
        out.push(acc);
    }
    out
}

/// Embeds `bytes` into field elements, `chunk_bytes::<F>()` little-endian bytes per element. The
/// last element holds whatever is left over.
pub fn elements_from_bytes<F: PrimeField>(bytes: &[u8]) -> Vec<F> {
    bytes
        .chunks(chunk_bytes::<F>())
        .map(F::from_le_bytes_mod_order)
        .collect()
}

/// Inverse of [`elements_from_bytes`]: recovers the first `len` bytes embedded in `elems`.
/// Elements that did not come from the embedding are truncated to their low bytes.
pub fn bytes_from_elements<F: PrimeField>(elems: &[F], len: usize) -> Vec<u8> {
    let chunk = chunk_bytes::<F>();
    let mut out = Vec::with_capacity(elems.len() * chunk);
    for e in elems {
        let repr = e.into_bigint().to_bytes_le();
        out.extend_from_slice(&repr[..chunk]);
    }
    out.truncate(len);
    out
}
