//! Database layout and the in-memory database servers answer from.
//!
//! Entries are arranged in a `num_rows x num_columns` matrix. The client hides the column of the
//! entry it wants and every server answers one block per row, so rebalancing a database into a
//! square trades a longer answer for a shorter query.
use ark_ff::PrimeField;
use rand::{CryptoRng, Rng, RngCore};
use vpir_dpf::{
    field::{chunk_bytes, elements_from_bytes},
    MAX_LOG_DOMAIN, MAX_VALUE_LEN,
};

use crate::PirError;

/// A block size of zero selects the single-bit scheme, where each entry is a single bit and
/// answers carry no separate tag.
pub const SINGLE_BIT_BLOCK_LENGTH: usize = 0;

/// Shape of a database. The client and all servers must agree on it.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct DatabaseInfo {
    pub num_rows: usize,
    pub num_columns: usize,
    /// Number of field elements per entry, or [`SINGLE_BIT_BLOCK_LENGTH`]
    pub block_size: usize,
}

impl DatabaseInfo {
    pub fn new(num_rows: usize, num_columns: usize, block_size: usize) -> Result<Self, PirError> {
        let info = Self {
            num_rows,
            num_columns,
            block_size,
        };
        info.validate()?;
        Ok(info)
    }

    /// Checks that the layout can be queried
    pub fn validate(&self) -> Result<(), PirError> {
        if self.num_rows == 0 || self.num_columns == 0 {
            return Err(PirError::InvalidParameters(format!(
                "database of {} rows and {} columns is empty",
                self.num_rows, self.num_columns
            )));
        }
        if self.block_size >= MAX_VALUE_LEN {
            return Err(PirError::InvalidParameters(format!(
                "block size {} exceeds the maximum of {}",
                self.block_size,
                MAX_VALUE_LEN - 1
            )));
        }
        if self.log_columns() > MAX_LOG_DOMAIN {
            return Err(PirError::InvalidParameters(format!(
                "{} columns are too many to address",
                self.num_columns
            )));
        }
        self.num_rows
            .checked_mul(self.num_columns)
            .and_then(|n| n.checked_mul(self.block_len()))
            .ok_or_else(|| PirError::InvalidParameters("database is too large".to_string()))?;
        Ok(())
    }

    #[inline]
    pub fn is_single_bit(&self) -> bool {
        self.block_size == SINGLE_BIT_BLOCK_LENGTH
    }

    /// Number of field elements stored per entry
    #[inline]
    pub fn entry_len(&self) -> usize {
        self.block_size.max(1)
    }

    /// Number of field elements per column of a query and per row of an answer: the block and
    /// its tag, or a single element in the single-bit scheme.
    #[inline]
    pub fn block_len(&self) -> usize {
        match self.is_single_bit() {
            true => 1,
            false => self.block_size + 1,
        }
    }

    /// Number of bits needed to address a column
    #[inline]
    pub fn log_columns(&self) -> usize {
        (usize::BITS - (self.num_columns.max(1) - 1).leading_zeros()) as usize
    }

    #[inline]
    pub fn num_entries(&self) -> usize {
        self.num_rows * self.num_columns
    }

    /// Number of field elements in a query, before any compression by a DPF
    #[inline]
    pub fn query_len(&self) -> usize {
        self.num_columns * self.block_len()
    }

    /// Number of field elements in each server's answer
    #[inline]
    pub fn answer_len(&self) -> usize {
        self.num_rows * self.block_len()
    }

    /// Ensures that every participant works on the same layout
    pub fn check_consistent(infos: &[DatabaseInfo]) -> Result<(), PirError> {
        match infos.split_first() {
            Some((first, rest)) => match rest.iter().find(|info| *info != first) {
                Some(other) => Err(PirError::DimensionMismatch(format!(
                    "database layouts {:?} and {:?} differ",
                    first, other
                ))),
                None => Ok(()),
            },
            None => Ok(()),
        }
    }
}

/// Picks a layout for `num_blocks` entries: a single row when `rebalanced` is false, otherwise
/// the smallest square holding all of them. Returns `(num_rows, num_columns)`.
pub fn calculate_num_rows_and_columns(num_blocks: usize, rebalanced: bool) -> (usize, usize) {
    let num_blocks = num_blocks.max(1);
    if !rebalanced {
        return (1, num_blocks);
    }
    let mut side = (num_blocks as f64).sqrt() as usize;
    while side * side < num_blocks {
        side += 1;
    }
    while side > 1 && (side - 1) * (side - 1) >= num_blocks {
        side -= 1;
    }
    (side, side)
}

/// A database held in memory, entries stored row-major
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Database<F: PrimeField> {
    info: DatabaseInfo,
    entries: Vec<F>,
}

impl<F: PrimeField> Database<F> {
    /// Wraps `entries`, which holds `info.entry_len()` elements for each entry in row-major order.
    /// In the single-bit scheme every element must be zero or one.
    pub fn new(info: DatabaseInfo, entries: Vec<F>) -> Result<Self, PirError> {
        info.validate()?;
        if entries.len() != info.num_entries() * info.entry_len() {
            return Err(PirError::DimensionMismatch(format!(
                "{} elements for a database of {} entries of {} elements",
                entries.len(),
                info.num_entries(),
                info.entry_len()
            )));
        }
        if info.is_single_bit() && entries.iter().any(|e| !e.is_zero() && !e.is_one()) {
            return Err(PirError::InvalidParameters(
                "single-bit entries must be zero or one".to_string(),
            ));
        }
        Ok(Self { info, entries })
    }

    pub fn zero(info: DatabaseInfo) -> Result<Self, PirError> {
        info.validate()?;
        let len = info.num_entries() * info.entry_len();
        Self::new(info, vec![F::zero(); len])
    }

    /// A database of uniformly random blocks
    pub fn random_multi_bit<R: CryptoRng + RngCore>(
        rng: &mut R,
        num_rows: usize,
        num_columns: usize,
        block_size: usize,
    ) -> Result<Self, PirError> {
        if block_size == SINGLE_BIT_BLOCK_LENGTH {
            return Err(PirError::InvalidParameters(
                "multi-bit databases need a non-zero block size".to_string(),
            ));
        }
        let info = DatabaseInfo::new(num_rows, num_columns, block_size)?;
        let entries = (0..info.num_entries() * block_size)
            .map(|_| F::rand(rng))
            .collect();
        Self::new(info, entries)
    }

    /// A database of uniformly random bits
    pub fn random_single_bit<R: CryptoRng + RngCore>(
        rng: &mut R,
        num_rows: usize,
        num_columns: usize,
    ) -> Result<Self, PirError> {
        let info = DatabaseInfo::new(num_rows, num_columns, SINGLE_BIT_BLOCK_LENGTH)?;
        let entries = (0..info.num_entries())
            .map(|_| match rng.gen::<bool>() {
                true => F::one(),
                false => F::zero(),
            })
            .collect();
        Self::new(info, entries)
    }

    /// Stores `data` in entries of `block_size` elements, embedding `chunk_bytes::<F>()` bytes in
    /// each element. Entry `i` holds bytes `i * block_size * chunk_bytes::<F>()` onwards and the
    /// last entries are padded with zeros.
    pub fn from_bytes(data: &[u8], block_size: usize, rebalanced: bool) -> Result<Self, PirError> {
        if block_size == SINGLE_BIT_BLOCK_LENGTH {
            return Err(PirError::InvalidParameters(
                "byte databases need a non-zero block size".to_string(),
            ));
        }
        if block_size >= MAX_VALUE_LEN {
            return Err(PirError::InvalidParameters(format!(
                "block size {} exceeds the maximum of {}",
                block_size,
                MAX_VALUE_LEN - 1
            )));
        }
        let mut entries = elements_from_bytes::<F>(data);
        let num_blocks = entries.len().div_ceil(block_size);
        let (num_rows, num_columns) = calculate_num_rows_and_columns(num_blocks, rebalanced);
        let info = DatabaseInfo::new(num_rows, num_columns, block_size)?;
        entries.resize(info.num_entries() * block_size, F::zero());
        Self::new(info, entries)
    }

    /// Number of bytes stored in each entry of a database built with [`Database::from_bytes`]
    pub fn bytes_per_entry(&self) -> usize {
        self.info.entry_len() * chunk_bytes::<F>()
    }

    #[inline]
    pub fn info(&self) -> &DatabaseInfo {
        &self.info
    }

    /// The entry at `row` and `column`
    pub fn block(&self, row: usize, column: usize) -> Result<&[F], PirError> {
        if row >= self.info.num_rows || column >= self.info.num_columns {
            return Err(PirError::InvalidParameters(format!(
                "entry ({}, {}) is outside of a {}x{} database",
                row, column, self.info.num_rows, self.info.num_columns
            )));
        }
        let len = self.info.entry_len();
        let start = (row * self.info.num_columns + column) * len;
        Ok(&self.entries[start..start + len])
    }

    /// The entry at linear `index`, using the same row-major order as client queries
    pub fn entry(&self, index: usize) -> Result<&[F], PirError> {
        self.block(index / self.info.num_columns, index % self.info.num_columns)
    }

    /// All entries of `row` back to back
    #[inline]
    pub(crate) fn row(&self, row: usize) -> &[F] {
        let len = self.info.num_columns * self.info.entry_len();
        &self.entries[row * len..(row + 1) * len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Client, FieldElement, Scheme};
    use ark_ff::{One, Zero};
    use crate::tests::test_rng;
    use vpir_dpf::field::bytes_from_elements;

    #[test]
    fn test_layout() {
        let info = DatabaseInfo::new(3, 5, 4).unwrap();
        assert_eq!(info.block_len(), 5);
        assert_eq!(info.entry_len(), 4);
        assert_eq!(info.log_columns(), 3);
        assert_eq!(info.num_entries(), 15);
        assert_eq!(info.query_len(), 25);
        assert_eq!(info.answer_len(), 15);

        let single = DatabaseInfo::new(2, 4, SINGLE_BIT_BLOCK_LENGTH).unwrap();
        assert!(single.is_single_bit());
        assert_eq!(single.block_len(), 1);
        assert_eq!(single.entry_len(), 1);
        assert_eq!(single.log_columns(), 2);

        for (columns, bits) in [(1, 0), (2, 1), (3, 2), (4, 2), (5, 3), (1024, 10), (1025, 11)] {
            assert_eq!(DatabaseInfo::new(1, columns, 1).unwrap().log_columns(), bits);
        }

        assert!(DatabaseInfo::new(0, 4, 1).is_err());
        assert!(DatabaseInfo::new(4, 0, 1).is_err());
        assert!(DatabaseInfo::new(4, 4, MAX_VALUE_LEN).is_err());
        assert!(DatabaseInfo::new(4, 4, MAX_VALUE_LEN - 1).is_ok());

        // Block sizes whose tagged length does not fit in a usize
        for block_size in [usize::MAX, usize::MAX - 1] {
            assert!(matches!(
                DatabaseInfo::new(1, 1, block_size),
                Err(PirError::InvalidParameters(_))
            ));
            let info = DatabaseInfo {
                num_rows: 1,
                num_columns: 1,
                block_size,
            };
            assert!(matches!(
                Client::<FieldElement>::new(info, Scheme::PointFunction),
                Err(PirError::InvalidParameters(_))
            ));
        }
    }

    #[test]
    fn test_check_consistent() {
        let a = DatabaseInfo::new(2, 8, 3).unwrap();
        let b = DatabaseInfo::new(4, 4, 3).unwrap();
        assert!(DatabaseInfo::check_consistent(&[]).is_ok());
        assert!(DatabaseInfo::check_consistent(&[a, a, a]).is_ok());
        assert!(matches!(
            DatabaseInfo::check_consistent(&[a, a, b]),
            Err(PirError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn test_rows_and_columns() {
        assert_eq!(calculate_num_rows_and_columns(10, false), (1, 10));
        assert_eq!(calculate_num_rows_and_columns(16, true), (4, 4));
        assert_eq!(calculate_num_rows_and_columns(17, true), (5, 5));
        assert_eq!(calculate_num_rows_and_columns(1, true), (1, 1));
        assert_eq!(calculate_num_rows_and_columns(0, true), (1, 1));
        assert_eq!(calculate_num_rows_and_columns(0, false), (1, 1));
    }

    #[test]
    fn test_constructors() {
        let mut rng = test_rng();
        let info = DatabaseInfo::new(2, 3, 2).unwrap();

        assert!(Database::<FieldElement>::new(info, vec![FieldElement::zero(); 11]).is_err());
        let zero = Database::<FieldElement>::zero(info).unwrap();
        assert!(zero.block(1, 2).unwrap().iter().all(|e| e.is_zero()));
        assert!(zero.block(2, 0).is_err());
        assert!(zero.block(0, 3).is_err());

        let db = Database::<FieldElement>::random_multi_bit(&mut rng, 2, 3, 2).unwrap();
        assert_eq!(db.info(), &info);
        assert_eq!(db.entry(4).unwrap(), db.block(1, 1).unwrap());
        assert!(Database::<FieldElement>::random_multi_bit(&mut rng, 2, 3, 0).is_err());

        let bits = Database::<FieldElement>::random_single_bit(&mut rng, 4, 8).unwrap();
        assert!(bits.info().is_single_bit());
        for i in 0..32 {
            let e = bits.entry(i).unwrap();
            assert_eq!(e.len(), 1);
            assert!(e[0].is_zero() || e[0].is_one());
        }

        // Single-bit entries must be bits
        let single = DatabaseInfo::new(1, 2, SINGLE_BIT_BLOCK_LENGTH).unwrap();
        let two = FieldElement::from(2u64);
        assert!(Database::new(single, vec![FieldElement::one(), two]).is_err());
    }

    #[test]
    fn test_from_bytes() {
        let mut rng = test_rng();
        let data: Vec<u8> = (0..1000).map(|_| rng.gen()).collect();

        for rebalanced in [false, true] {
            let db = Database::<FieldElement>::from_bytes(&data, 4, rebalanced).unwrap();
            let per_entry = db.bytes_per_entry();
            assert_eq!(per_entry, 60);
            assert!(db.info().num_entries() * per_entry >= data.len());

            for (i, chunk) in data.chunks(per_entry).enumerate() {
                let block = db.entry(i).unwrap();
                assert_eq!(bytes_from_elements(block, chunk.len()), chunk);
            }
        }
        assert_eq!(
            Database::<FieldElement>::from_bytes(&data, 4, true).unwrap().info().num_rows,
            5
        );
        assert!(Database::<FieldElement>::from_bytes(&data, 0, false).is_err());
        for block_size in [MAX_VALUE_LEN, usize::MAX] {
            assert!(matches!(
                Database::<FieldElement>::from_bytes(b"abc", block_size, false),
                Err(PirError::InvalidParameters(_))
            ));
        }
    }
}
