use aes::{
    cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit},
    Aes128,
};
use ark_ff::UniformRand;

use crate::{Block, Pair, BLOCK_SIZE};

/// Fixed public key of the PRF producing left children
const LEFT_KEY: [u8; BLOCK_SIZE] = [
    36, 156, 50, 234, 92, 230, 49, 9, 174, 170, 205, 160, 98, 236, 29, 243,
];

/// Fixed public key of the PRF producing right children
const RIGHT_KEY: [u8; BLOCK_SIZE] = [
    209, 12, 199, 173, 29, 74, 44, 128, 194, 224, 14, 44, 2, 201, 110, 28,
];

/// The two children of a node in the evaluation tree
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Node {
    pub seeds: Pair<Block>,
    pub bits: Pair<bool>,
}

/// Length-doubling PRG built from two fixed-key AES instances.
///
/// Each PRF is the Matyas-Meyer-Oseas compression function `AES_k(x) ^ x`. The engine holds no
/// mutable state, so a single instance can be shared by every key and thread in the process.
/// Keys generated under one engine must be evaluated under an engine with the same PRF keys.
#[derive(Clone)]
pub struct Engine {
    left: Aes128,
    right: Aes128,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// An engine keyed with the fixed public PRF keys
    pub fn new() -> Self {
        Self::with_keys(LEFT_KEY, RIGHT_KEY)
    }

    /// An engine keyed with custom PRF keys
    pub fn with_keys(left: [u8; BLOCK_SIZE], right: [u8; BLOCK_SIZE]) -> Self {
        Self {
            left: Aes128::new(&left.into()),
            right: Aes128::new(&right.into()),
        }
    }

    #[inline]
    fn mmo(aes: &Aes128, input: &Block) -> Block {
        let mut block = GenericArray::from(input.0);
        aes.encrypt_block(&mut block);
        let mut out = Block::zero();
        out.0.copy_from_slice(&block);
        out ^= *input;
        out
    }

    /// Expands `seed` into two child seeds and their control bits
    #[inline]
    pub fn expand(&self, seed: &Block) -> Node {
        let mut node = Node::default();
        self.expand_into(seed, &mut node);
        node
    }

    /// Same as [`Engine::expand`] but writes into an existing node, so that tree traversals can
    /// reuse their scratch space.
    #[inline]
    pub fn expand_into(&self, seed: &Block, node: &mut Node) {
        node.seeds[0] = Self::mmo(&self.left, seed);
        node.seeds[1] = Self::mmo(&self.right, seed);
        for i in 0..2usize {
            node.bits[i] = node.seeds[i].control_bit();
            node.seeds[i].clear_control_bit();
        }
    }

    /// Deterministically expands a leaf seed into `out.len()` field elements
    pub fn convert<F: UniformRand>(&self, seed: &Block, out: &mut [F]) {
        let mut stream = self.stream(seed);
        out.iter_mut().for_each(|e| *e = F::rand(&mut stream));
    }

    /// A counter-mode stream of pseudorandom bytes derived from `seed`
    pub fn stream(&self, seed: &Block) -> SeedStream<'_> {
        SeedStream {
            aes: &self.left,
            seed: *seed,
            ctr: 0,
        }
    }
}

/// Pseudorandom byte stream `MMO(seed ^ ctr)` for `ctr = 0, 1, ...`, with the counter XORed
/// into the first eight bytes of the seed.
pub struct SeedStream<'a> {
    aes: &'a Aes128,
    seed: Block,
    ctr: u64,
}

impl SeedStream<'_> {
    fn eval(&mut self, out: &mut [u8; BLOCK_SIZE]) {
        let mut input = self.seed;
        input.0[..8]
            .iter_mut()
            .zip(self.ctr.to_le_bytes())
            .for_each(|(b, c)| *b ^= c);
        *out = Engine::mmo(self.aes, &input).0;
        self.ctr += 1;
    }
}

impl rand::RngCore for SeedStream<'_> {
    fn next_u32(&mut self) -> u32 {
        rand_core::impls::next_u32_via_fill(self)
    }

    fn next_u64(&mut self) -> u64 {
        rand_core::impls::next_u64_via_fill(self)
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        let mut chunks = dst.chunks_exact_mut(BLOCK_SIZE);
        let mut buf = [0u8; BLOCK_SIZE];
        for chunk in &mut chunks {
            self.eval(&mut buf);
            chunk.copy_from_slice(&buf);
        }

        let leftover = chunks.into_remainder();
        if !leftover.is_empty() {
            self.eval(&mut buf);
            let len = leftover.len();
            leftover.copy_from_slice(&buf[..len]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::F127;
    use crate::tests::test_rng;

    #[test]
    fn prg_consistency() {
        // Two independently constructed engines agree on every output
        let mut rng = test_rng();
        let seed = Block::random(&mut rng);
        let prg1 = Engine::new();
        let prg2 = Engine::new();

        assert_eq!(prg1.expand(&seed), prg2.expand(&seed));

        let mut out1 = vec![F127::from(0u64); 8];
        let mut out2 = vec![F127::from(0u64); 8];
        prg1.convert(&seed, &mut out1);
        prg2.convert(&seed, &mut out2);
        assert_eq!(out1, out2);
    }

    #[test]
    fn expanded_seeds_have_cleared_bits() {
        let mut rng = test_rng();
        let prg = Engine::new();
        for _ in 0..100 {
            let node = prg.expand(&Block::random(&mut rng));
            assert!(!node.seeds[0].control_bit());
            assert!(!node.seeds[1].control_bit());
            assert_ne!(node.seeds[0], node.seeds[1]);
        }
    }

    #[test]
    fn keys_separate_engines() {
        let mut rng = test_rng();
        let seed = Block::random(&mut rng);
        let prg1 = Engine::new();
        let prg2 = Engine::with_keys([1u8; BLOCK_SIZE], [2u8; BLOCK_SIZE]);

        assert_ne!(prg1.expand(&seed).seeds, prg2.expand(&seed).seeds);
    }

    #[test]
    fn convert_prefix_is_stable() {
        // Converting into a longer buffer extends, rather than changes, a shorter conversion
        let mut rng = test_rng();
        let seed = Block::random(&mut rng);
        let prg = Engine::new();

        let mut short = vec![F127::from(0u64); 3];
        let mut long = vec![F127::from(0u64); 10];
        prg.convert(&seed, &mut short);
        prg.convert(&seed, &mut long);
        assert_eq!(short[..], long[..3]);
    }
}
