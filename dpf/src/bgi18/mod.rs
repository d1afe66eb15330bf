use ark_ff::PrimeField;
use rand::{CryptoRng, RngCore};
use std::marker::PhantomData;

use crate::{point_to_bits, Block, DpfError, Engine, Node, Pair, DPF, MAX_LOG_DOMAIN, MAX_VALUE_LEN};

mod data_structures;
pub use data_structures::*;

/// DPF scheme based on [[BGI18]], with outputs in `F^n` for `1 <= n <= 256`.
///
/// [BGI18]: https://eprint.iacr.org/2018/707.pdf
pub struct BGI18<F: PrimeField> {
    _f: PhantomData<F>,
}

impl<F: PrimeField> BGI18<F> {
    /// Expands both parties' seeds, derives the correction word for this level and advances
    /// both parties along `keep`.
    fn gen_cor_word(
        engine: &Engine,
        keep: bool,
        bits: &mut Pair<bool>,
        seeds: &mut Pair<Block>,
    ) -> CorWord {
        let nodes = Pair::new(engine.expand(&seeds[0]), engine.expand(&seeds[1]));

        // Off the path both parties must end up with the same seed and control bit, on the path
        // the control bits must differ.
        let cw = CorWord {
            seed: nodes[0].seeds[!keep] ^ nodes[1].seeds[!keep],
            bits: Pair::new(
                nodes[0].bits[0] ^ nodes[1].bits[0] ^ !keep,
                nodes[0].bits[1] ^ nodes[1].bits[1] ^ keep,
            ),
        };

        for (i, node) in nodes.iter().enumerate() {
            // If the previous bit was set, we XOR the correction word to the subsequent node
            match bits[i] {
                true => {
                    seeds[i] = node.seeds[keep] ^ cw.seed;
                    bits[i] = node.bits[keep] ^ cw.bits[keep];
                }
                false => {
                    seeds[i] = node.seeds[keep];
                    bits[i] = node.bits[keep];
                }
            };
        }
        cw
    }

    /// `(-1)^t1 * (value - Convert(s0) + Convert(s1))`
    fn final_correction(
        engine: &Engine,
        value: &[F],
        bits: &Pair<bool>,
        seeds: &Pair<Block>,
    ) -> Vec<F> {
        let mut p1_elems = vec![F::zero(); value.len()];
        let mut p2_elems = vec![F::zero(); value.len()];
        engine.convert(&seeds[0], &mut p1_elems);
        engine.convert(&seeds[1], &mut p2_elems);

        value
            .iter()
            .zip(p1_elems)
            .zip(p2_elems)
            .map(|((v, e1), e2)| {
                let mask = *v - e1 + e2;
                match bits[1] {
                    true => -mask,
                    false => mask,
                }
            })
            .collect()
    }

    /// Ensures `key` was generated for a domain of `log_domain` bits
    fn check_key(key: &DPFKey<F>, log_domain: usize) -> Result<(), DpfError> {
        if log_domain > MAX_LOG_DOMAIN {
            return Err(DpfError::InvalidParameters(format!(
                "domain of {} bits exceeds the maximum of {}",
                log_domain, MAX_LOG_DOMAIN
            )));
        }
        if key.log_domain() != log_domain {
            return Err(DpfError::InvalidParameters(format!(
                "key has {} levels but the domain has {} bits",
                key.log_domain(),
                log_domain
            )));
        }
        Ok(())
    }

    /// Recovers this party's output share from a leaf seed and control bit
    #[inline]
    fn leaf(engine: &Engine, key: &DPFKey<F>, seed: &Block, bit: bool, out: &mut [F]) {
        engine.convert(seed, out);
        for (o, cw) in out.iter_mut().zip(key.final_cw.iter()) {
            if bit {
                *o += cw;
            }
            if key.party {
                *o = -*o;
            }
        }
    }

    /// Depth-first traversal of the whole tree, handing every leaf to `sink` in domain order.
    ///
    /// `scratch` holds one node per remaining level: the node at the head of the slice is
    /// overwritten with this level's children and stays live while both subtrees are visited
    /// using the tail. Returns `false` as soon as `sink` does, which stops the traversal.
    fn traverse<S>(
        engine: &Engine,
        key: &DPFKey<F>,
        seed: &Block,
        bit: bool,
        level: usize,
        scratch: &mut [Node],
        sink: &mut S,
    ) -> bool
    where
        S: FnMut(&Block, bool) -> bool,
    {
        let Some((node, rest)) = scratch.split_first_mut() else {
            return sink(seed, bit);
        };

        engine.expand_into(seed, node);
        if bit {
            let cw = &key.cor_words[level];
            for path in [false, true] {
                node.seeds[path] ^= cw.seed;
                node.bits[path] ^= cw.bits[path];
            }
        }

        Self::traverse(
            engine,
            key,
            &node.seeds[0],
            node.bits[0],
            level + 1,
            rest,
            sink,
        ) && Self::traverse(
            engine,
            key,
            &node.seeds[1],
            node.bits[1],
            level + 1,
            rest,
            sink,
        )
    }

    /// Evaluates `key` on the first `out.len() / key.value_len()` points of the domain, writing
    /// each output share contiguously into `out`.
    ///
    /// This is the layout servers multiply against the database with, and it lets a database
    /// whose width is not a power of two skip the unused tail of the domain. `out.len()` must be
    /// a multiple of the output length and cover at most `2^log_domain` points.
    pub fn eval_full_flat(
        engine: &Engine,
        key: &DPFKey<F>,
        log_domain: usize,
        out: &mut [F],
    ) -> Result<(), DpfError> {
        Self::check_key(key, log_domain)?;
        let width = key.value_len();
        if width == 0 || out.len() % width != 0 {
            return Err(DpfError::DimensionMismatch(format!(
                "output of {} elements is not a whole number of {}-element shares",
                out.len(),
                width
            )));
        }
        if (out.len() / width) as u128 > 1u128 << log_domain {
            return Err(DpfError::DimensionMismatch(format!(
                "{} points requested from a domain of {} bits",
                out.len() / width,
                log_domain
            )));
        }

        let mut shares = out.chunks_exact_mut(width);
        let mut scratch = vec![Node::default(); log_domain];
        Self::traverse(
            engine,
            key,
            &key.seed,
            key.control_bit,
            0,
            &mut scratch,
            &mut |seed: &Block, bit: bool| match shares.next() {
                Some(share) => {
                    Self::leaf(engine, key, seed, bit, share);
                    true
                }
                None => false,
            },
        );
        Ok(())
    }
}

impl<F: PrimeField> DPF<F> for BGI18<F> {
    type Key = DPFKey<F>;

    fn gen<RNG: CryptoRng + RngCore>(
        engine: &Engine,
        point: u64,
        value: &[F],
        log_domain: usize,
        rng: &mut RNG,
    ) -> Result<(Self::Key, Self::Key), DpfError> {
        // Validate everything before touching the randomness
        let path = point_to_bits(log_domain, point)?;
        if value.is_empty() || value.len() > MAX_VALUE_LEN {
            return Err(DpfError::InvalidParameters(format!(
                "value must hold between 1 and {} elements, got {}",
                MAX_VALUE_LEN,
                value.len()
            )));
        }

        // Randomly generate root seeds. The parties start with opposite control bits.
        let mut seeds = Pair::new(Block::random(rng), Block::random(rng));
        let t0 = seeds[0].control_bit();
        seeds[0].clear_control_bit();
        seeds[1].clear_control_bit();
        let mut bits = Pair::new(t0, !t0);
        let (root_seeds, root_bits) = (seeds, bits);

        // Iteratively generate correction words for each level of the tree
        let cor_words: Vec<CorWord> = path
            .iter()
            .map(|&keep| Self::gen_cor_word(engine, keep, &mut bits, &mut seeds))
            .collect();

        let final_cw = Self::final_correction(engine, value, &bits, &seeds);

        Ok((
            DPFKey {
                party: false,
                seed: root_seeds[0],
                control_bit: root_bits[0],
                cor_words: cor_words.clone(),
                final_cw: final_cw.clone(),
            },
            DPFKey {
                party: true,
                seed: root_seeds[1],
                control_bit: root_bits[1],
                cor_words,
                final_cw,
            },
        ))
    }

    fn eval(
        engine: &Engine,
        key: &Self::Key,
        point: u64,
        log_domain: usize,
    ) -> Result<Vec<F>, DpfError> {
        Self::check_key(key, log_domain)?;
        let path = point_to_bits(log_domain, point)?;

        // Initialize state for evaluation
        let mut seed = key.seed;
        let mut bit = key.control_bit;

        // Evaluate each bit of the path
        for (cw, &dir) in key.cor_words.iter().zip(path.iter()) {
            let mut node = engine.expand(&seed);
            if bit {
                node.seeds[dir] ^= cw.seed;
                node.bits[dir] ^= cw.bits[dir];
            }
            seed = node.seeds[dir];
            bit = node.bits[dir];
        }

        let mut out = vec![F::zero(); key.value_len()];
        Self::leaf(engine, key, &seed, bit, &mut out);
        Ok(out)
    }

    fn eval_full(
        engine: &Engine,
        key: &Self::Key,
        log_domain: usize,
        out: &mut [Vec<F>],
    ) -> Result<(), DpfError> {
        Self::check_key(key, log_domain)?;
        if out.len() as u128 != 1u128 << log_domain {
            return Err(DpfError::DimensionMismatch(format!(
                "output has {} rows but the domain has {} points",
                out.len(),
                1u128 << log_domain
            )));
        }
        if let Some(row) = out.iter().find(|row| row.len() != key.value_len()) {
            return Err(DpfError::DimensionMismatch(format!(
                "output row of width {} for a key with {} output elements",
                row.len(),
                key.value_len()
            )));
        }

        let mut rows = out.iter_mut();
        let mut scratch = vec![Node::default(); log_domain];
        Self::traverse(
            engine,
            key,
            &key.seed,
            key.control_bit,
            0,
            &mut scratch,
            &mut |seed: &Block, bit: bool| match rows.next() {
                Some(row) => {
                    Self::leaf(engine, key, seed, bit, row);
                    true
                }
                None => false,
            },
        );
        Ok(())
    }
}
