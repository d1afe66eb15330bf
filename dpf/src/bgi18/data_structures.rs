use ark_ff::PrimeField;
use ark_serialize::{
    CanonicalDeserialize as Deserialize, CanonicalSerialize as Serialize, Compress,
    SerializationError, *,
};
use ark_std::io::{Read, Write};

use crate::{data_structures::read_bit, Block, Pair, BLOCK_SIZE, MAX_LOG_DOMAIN, MAX_VALUE_LEN};

/// A per-level DPF correction word: one seed correction shared by both children and one
/// control-bit correction per child.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct CorWord {
    pub seed: Block,
    pub bits: Pair<bool>,
}

/// Size in bytes of a serialized [`CorWord`]
pub const COR_WORD_SIZE: usize = BLOCK_SIZE + 2;

/// A DPF key.
///
/// Both keys returned by a single call to `gen` hold identical correction words and final
/// correction; only `party`, `seed` and `control_bit` differ. A key pair hides exactly one
/// point and must be discarded after the query it was generated for.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DPFKey<F: PrimeField> {
    /// `false` for server 0, `true` for server 1. Server 1 negates its output share.
    pub party: bool,
    pub seed: Block,
    pub control_bit: bool,
    pub cor_words: Vec<CorWord>,
    pub final_cw: Vec<F>,
}

impl<F: PrimeField> DPFKey<F> {
    /// Number of tree levels, i.e. the log of the domain size the key was generated for
    #[inline]
    pub fn log_domain(&self) -> usize {
        self.cor_words.len()
    }

    /// Number of field elements output by each evaluation
    #[inline]
    pub fn value_len(&self) -> usize {
        self.final_cw.len()
    }

    /// Decodes a key written with `serialize_compressed`. The layout carries no lengths, so the
    /// domain size and output length agreed on out-of-band must be supplied.
    pub fn read<R: Read>(
        mut reader: R,
        log_domain: usize,
        value_len: usize,
    ) -> Result<Self, SerializationError> {
        if log_domain > MAX_LOG_DOMAIN || value_len > MAX_VALUE_LEN {
            return Err(SerializationError::InvalidData);
        }

        let mut byte = [0u8; 1];
        reader.read_exact(&mut byte)?;
        let party = read_bit(byte[0])?;
        let seed = Block::deserialize_compressed(&mut reader)?;
        reader.read_exact(&mut byte)?;
        let control_bit = read_bit(byte[0])?;

        let cor_words = (0..log_domain)
            .map(|_| CorWord::deserialize_compressed(&mut reader))
            .collect::<Result<Vec<_>, _>>()?;
        let final_cw = (0..value_len)
            .map(|_| F::deserialize_compressed(&mut reader))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            party,
            seed,
            control_bit,
            cor_words,
            final_cw,
        })
    }
}

/// Keys are written as
/// `party (1) | seed (16) | control bit (1) | log_domain x correction word (18) | final correction`
/// with every field element in its fixed-width encoding.
impl<F: PrimeField> Serialize for DPFKey<F> {
    fn serialize_with_mode<W: Write>(
        &self,
        mut writer: W,
        compress: Compress,
    ) -> Result<(), SerializationError> {
        writer.write_all(&[self.party as u8])?;
        self.seed.serialize_with_mode(&mut writer, compress)?;
        writer.write_all(&[self.control_bit as u8])?;
        for cw in self.cor_words.iter() {
            cw.serialize_with_mode(&mut writer, compress)?;
        }
        for e in self.final_cw.iter() {
            e.serialize_with_mode(&mut writer, compress)?;
        }
        Ok(())
    }

    fn serialized_size(&self, compress: Compress) -> usize {
        1 + BLOCK_SIZE
            + 1
            + self.cor_words.len() * COR_WORD_SIZE
            + self
                .final_cw
                .iter()
                .map(|e| e.serialized_size(compress))
                .sum::<usize>()
    }
}
