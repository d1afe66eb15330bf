//! The PIR server: answers queries against its copy of the database.
use ark_ff::PrimeField;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use std::borrow::Cow;
use vpir_dpf::{Engine, BGI18};

use crate::{query::answer_to_bytes, Database, DatabaseInfo, PirError, Query};

/// A server holding one copy of the database
#[derive(Clone)]
pub struct Server<F: PrimeField> {
    engine: Engine,
    db: Database<F>,
}

impl<F: PrimeField> Server<F> {
    pub fn new(db: Database<F>) -> Self {
        Self::with_engine(Engine::new(), db)
    }

    /// A server evaluating DPF keys under `engine`
    pub fn with_engine(engine: Engine, db: Database<F>) -> Self {
        Self { engine, db }
    }

    #[inline]
    pub fn info(&self) -> &DatabaseInfo {
        self.db.info()
    }

    #[inline]
    pub fn database(&self) -> &Database<F> {
        &self.db
    }

    /// Expands `query` into `block_len` elements per column
    fn expand_query<'a>(&self, query: &'a Query<F>) -> Result<Cow<'a, [F]>, PirError> {
        let info = self.db.info();
        match query {
            Query::PointFunction(key) => {
                if key.log_domain() != info.log_columns() || key.value_len() != info.block_len() {
                    return Err(PirError::DimensionMismatch(format!(
                        "key over {} bits with {} outputs for {} columns of {} elements",
                        key.log_domain(),
                        key.value_len(),
                        info.num_columns,
                        info.block_len()
                    )));
                }
                let mut q = vec![F::zero(); info.query_len()];
                BGI18::eval_full_flat(&self.engine, key, info.log_columns(), &mut q)?;
                Ok(Cow::Owned(q))
            }
            Query::Additive(share) => {
                if share.len() != info.query_len() {
                    return Err(PirError::DimensionMismatch(format!(
                        "share of {} elements for a query of {}",
                        share.len(),
                        info.query_len()
                    )));
                }
                Ok(Cow::Borrowed(share))
            }
        }
    }

    /// Answers for a single row: the inner products of its blocks with the query.
    ///
    /// In the multi-bit scheme `out[k]` is `sum_j db[j][k] * q[j][0]` for every element `k` of
    /// the block and the tag `out[b]` is `sum_j sum_k db[j][k] * q[j][1 + k]`. In the single-bit
    /// scheme `out[0]` sums the query over the columns holding a one.
    fn answer_row(&self, row: &[F], q: &[F], out: &mut [F]) {
        let info = self.db.info();
        if info.is_single_bit() {
            out[0] = row
                .iter()
                .zip(q)
                .filter(|(bit, _)| !bit.is_zero())
                .map(|(_, q)| *q)
                .sum();
            return;
        }

        let b = info.block_size;
        let (message, tag) = out.split_at_mut(b);
        for (entry, q_j) in row.chunks_exact(b).zip(q.chunks_exact(b + 1)) {
            for (k, e) in entry.iter().enumerate() {
                if e.is_zero() {
                    continue;
                }
                message[k] += *e * q_j[0];
                tag[0] += *e * q_j[1 + k];
            }
        }
    }

    /// Answers `query` with `num_rows * block_len` elements
    pub fn answer(&self, query: &Query<F>) -> Result<Vec<F>, PirError> {
        let q = self.expand_query(query)?;
        let info = self.db.info();
        let block_len = info.block_len();
        let mut answer = vec![F::zero(); info.answer_len()];

        #[cfg(feature = "parallel")]
        let rows = answer.par_chunks_mut(block_len);
        #[cfg(not(feature = "parallel"))]
        let rows = answer.chunks_mut(block_len);

        rows.enumerate()
            .for_each(|(i, out)| self.answer_row(self.db.row(i), &q, out));
        Ok(answer)
    }

    /// Same as [`Server::answer`] for a query and answer in their wire encoding
    pub fn answer_bytes(&self, query: &[u8]) -> Result<Vec<u8>, PirError> {
        let mut reader = query;
        let query = Query::read(&mut reader, self.db.info())?;
        if !reader.is_empty() {
            return Err(PirError::DimensionMismatch(format!(
                "{} trailing bytes after the query",
                reader.len()
            )));
        }
        answer_to_bytes(&self.answer(&query)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FieldElement, SINGLE_BIT_BLOCK_LENGTH};
    use ark_ff::{One, Zero};

    #[test]
    fn test_answer_row() {
        // One row of two columns holding blocks (1, 2) and (3, 4)
        let info = DatabaseInfo::new(1, 2, 2).unwrap();
        let entries: Vec<FieldElement> = (1u64..=4).map(FieldElement::from).collect();
        let server = Server::new(Database::new(info, entries).unwrap());

        // Query (q0, q1, q2) per column
        let q: Vec<FieldElement> = (10u64..16).map(FieldElement::from).collect();
        let answer = server.answer(&Query::Additive(q)).unwrap();

        let f = |x: u64| FieldElement::from(x);
        // message[k] = 1 * 10 + 3 * 13, 2 * 10 + 4 * 13
        assert_eq!(answer[0], f(10 + 39));
        assert_eq!(answer[1], f(20 + 52));
        // tag = 1 * 11 + 2 * 12 + 3 * 14 + 4 * 15
        assert_eq!(answer[2], f(11 + 24 + 42 + 60));
    }

    #[test]
    fn test_answer_single_bit_row() {
        let info = DatabaseInfo::new(2, 3, SINGLE_BIT_BLOCK_LENGTH).unwrap();
        let (zero, one) = (FieldElement::zero(), FieldElement::one());
        let db = Database::new(info, vec![one, zero, one, zero, one, one]).unwrap();
        let server = Server::new(db);

        let q: Vec<FieldElement> = [5u64, 7, 11].into_iter().map(FieldElement::from).collect();
        let answer = server.answer(&Query::Additive(q)).unwrap();
        assert_eq!(answer, vec![FieldElement::from(16u64), FieldElement::from(18u64)]);
    }

    #[test]
    fn test_bad_queries() {
        let info = DatabaseInfo::new(2, 4, 3).unwrap();
        let server = Server::new(Database::<FieldElement>::zero(info).unwrap());

        let short = Query::Additive(vec![FieldElement::zero(); info.query_len() - 1]);
        assert!(matches!(
            server.answer(&short),
            Err(PirError::DimensionMismatch(_))
        ));

        // Trailing bytes after an otherwise valid query
        let mut bytes = vec![1u8];
        bytes.extend(vec![0u8; info.query_len() * 16 + 1]);
        assert!(matches!(
            server.answer_bytes(&bytes),
            Err(PirError::DimensionMismatch(_))
        ));
        assert!(server.answer_bytes(&bytes[..bytes.len() - 1]).is_ok());
    }
}
