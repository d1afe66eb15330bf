//! The PIR client: builds queries for an index and verifies the servers' answers.
use ark_ff::PrimeField;
use ark_serialize::CanonicalSerialize;
use rand::{CryptoRng, RngCore};
use vpir_dpf::{field::power_vector_with_one, Engine, BGI18, DPF};

use crate::{
    query::answer_from_bytes, reconstruct_shares, share_vector, DatabaseInfo, PirError, Query,
    Scheme,
};

/// What the client remembers between a query and its reconstruction
#[derive(Clone, Debug)]
struct State<F: PrimeField> {
    row: usize,
    column: usize,
    num_servers: usize,
    /// The tag key
    alpha: F,
    /// `(1, alpha, ..., alpha^block_size)`
    powers: Vec<F>,
}

/// A client retrieving entries from a database laid out as `info`.
///
/// Each call to [`Client::query`] starts a new retrieval and replaces whatever the previous one
/// left behind, and [`Client::reconstruct`] finishes it.
#[derive(Clone)]
pub struct Client<F: PrimeField> {
    engine: Engine,
    info: DatabaseInfo,
    scheme: Scheme,
    state: Option<State<F>>,
}

impl<F: PrimeField> Client<F> {
    pub fn new(info: DatabaseInfo, scheme: Scheme) -> Result<Self, PirError> {
        Self::with_engine(Engine::new(), info, scheme)
    }

    /// A client whose DPF keys are generated under `engine`. Servers must use an engine with the
    /// same PRF keys.
    pub fn with_engine(
        engine: Engine,
        info: DatabaseInfo,
        scheme: Scheme,
    ) -> Result<Self, PirError> {
        info.validate()?;
        Ok(Self {
            engine,
            info,
            scheme,
            state: None,
        })
    }

    #[inline]
    pub fn info(&self) -> &DatabaseInfo {
        &self.info
    }

    #[inline]
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Builds one query per server for the entry at `index`
    pub fn query<R: CryptoRng + RngCore>(
        &mut self,
        index: usize,
        num_servers: usize,
        rng: &mut R,
    ) -> Result<Vec<Query<F>>, PirError> {
        if index >= self.info.num_entries() {
            return Err(PirError::InvalidParameters(format!(
                "index {} is outside of a database of {} entries",
                index,
                self.info.num_entries()
            )));
        }
        self.scheme.check_num_servers(num_servers)?;

        let row = index / self.info.num_columns;
        let column = index % self.info.num_columns;

        // The tag key must be non-zero, otherwise every tag is zero
        let alpha = loop {
            let alpha = F::rand(rng);
            if !alpha.is_zero() {
                break alpha;
            }
        };

        let powers = match self.info.is_single_bit() {
            true => vec![F::one()],
            false => power_vector_with_one(alpha, self.info.block_size),
        };
        let value = match self.info.is_single_bit() {
            true => vec![alpha],
            false => powers.clone(),
        };

        let queries = match self.scheme {
            Scheme::PointFunction => {
                let (k0, k1) = BGI18::gen(
                    &self.engine,
                    column as u64,
                    &value,
                    self.info.log_columns(),
                    rng,
                )?;
                vec![Query::PointFunction(k0), Query::PointFunction(k1)]
            }
            Scheme::Additive => {
                let block_len = self.info.block_len();
                let mut target = vec![F::zero(); self.info.query_len()];
                target[column * block_len..(column + 1) * block_len].copy_from_slice(&value);
                share_vector(&target, num_servers, rng)?
                    .into_iter()
                    .map(Query::Additive)
                    .collect()
            }
        };

        self.state = Some(State {
            row,
            column,
            num_servers,
            alpha,
            powers,
        });
        Ok(queries)
    }

    /// Same as [`Client::query`] but returns each query in its wire encoding
    pub fn query_bytes<R: CryptoRng + RngCore>(
        &mut self,
        index: usize,
        num_servers: usize,
        rng: &mut R,
    ) -> Result<Vec<Vec<u8>>, PirError> {
        self.query(index, num_servers, rng)?
            .iter()
            .map(|q| {
                let mut bytes = Vec::with_capacity(q.compressed_size());
                q.serialize_compressed(&mut bytes)?;
                Ok::<_, PirError>(bytes)
            })
            .collect()
    }

    /// Combines the answers of all servers, in any order, into the requested entry.
    ///
    /// Every row of the combined answer is checked against its tag, and a single inconsistent
    /// row rejects the whole answer with [`PirError::VerificationFailure`]. In the single-bit
    /// scheme the entry is returned as `[0]` or `[1]`. The state of the last query is consumed
    /// whether or not reconstruction succeeds.
    pub fn reconstruct(&mut self, answers: &[Vec<F>]) -> Result<Vec<F>, PirError> {
        let state = self.state.take().ok_or_else(|| {
            PirError::InvalidParameters("reconstruct called without a pending query".to_string())
        })?;

        if answers.len() != state.num_servers {
            return Err(PirError::DimensionMismatch(format!(
                "{} answers for a query to {} servers",
                answers.len(),
                state.num_servers
            )));
        }
        if let Some(answer) = answers.iter().find(|a| a.len() != self.info.answer_len()) {
            return Err(PirError::DimensionMismatch(format!(
                "answer of {} elements, expected {}",
                answer.len(),
                self.info.answer_len()
            )));
        }

        let sum = reconstruct_shares(answers)?;
        match self.info.is_single_bit() {
            true => Self::reconstruct_single_bit(&state, &sum),
            false => Self::reconstruct_multi_bit(&state, &sum, self.info.block_size),
        }
    }

    /// Same as [`Client::reconstruct`] for answers in their wire encoding
    pub fn reconstruct_bytes(&mut self, answers: &[Vec<u8>]) -> Result<Vec<F>, PirError> {
        let answers = answers
            .iter()
            .map(|a| answer_from_bytes(a, self.info.answer_len()))
            .collect::<Result<Vec<_>, _>>();
        match answers {
            Ok(answers) => self.reconstruct(&answers),
            Err(e) => {
                self.state = None;
                Err(e)
            }
        }
    }

    fn reconstruct_multi_bit(
        state: &State<F>,
        sum: &[F],
        block_size: usize,
    ) -> Result<Vec<F>, PirError> {
        for row in sum.chunks_exact(block_size + 1) {
            let (message, tag) = row.split_at(block_size);
            let expected: F = message
                .iter()
                .zip(&state.powers[1..])
                .map(|(m, p)| *m * p)
                .sum();
            if expected != tag[0] {
                return Err(PirError::VerificationFailure);
            }
        }

        let start = state.row * (block_size + 1);
        Ok(sum[start..start + block_size].to_vec())
    }

    fn reconstruct_single_bit(state: &State<F>, sum: &[F]) -> Result<Vec<F>, PirError> {
        // Each row sums to alpha if the selected column of that row holds a one, zero otherwise
        let mut bits = Vec::with_capacity(sum.len());
        for v in sum {
            if v.is_zero() {
                bits.push(F::zero());
            } else if *v == state.alpha {
                bits.push(F::one());
            } else {
                return Err(PirError::VerificationFailure);
            }
        }
        Ok(vec![bits[state.row]])
    }

    /// Column of the pending query, if any
    pub fn pending_column(&self) -> Option<usize> {
        self.state.as_ref().map(|s| s.column)
    }
}
