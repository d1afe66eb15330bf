//! A module containing data structures relevant to DPF schemes
use ark_serialize::{
    CanonicalDeserialize as Deserialize, CanonicalSerialize as Serialize, Compress,
    SerializationError, Valid, Validate,
};
use ark_std::io::{Read, Write};
use rand::{CryptoRng, RngCore};
use std::ops::{BitXor, BitXorAssign, Index, IndexMut};

/// Size in bytes of a tree seed, which is also the AES block size
pub const BLOCK_SIZE: usize = 16;

/// A 128-bit seed used while walking the evaluation tree.
///
/// The low bit of the first byte is reserved: the PRG extracts it as the control bit of a
/// freshly expanded child and then clears it, so seeds stored in keys always have it unset.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Block(pub [u8; BLOCK_SIZE]);

impl Block {
    #[inline]
    pub fn zero() -> Self {
        Self([0u8; BLOCK_SIZE])
    }

    /// Samples a uniformly random block
    pub fn random<RNG: CryptoRng + RngCore>(rng: &mut RNG) -> Self {
        let mut block = Self::zero();
        rng.fill_bytes(&mut block.0);
        block
    }

    /// Reads the control bit stored in the low bit of the first byte
    #[inline]
    pub fn control_bit(&self) -> bool {
        self.0[0] & 1 == 1
    }

    /// Clears the low bit of the first byte
    #[inline]
    pub fn clear_control_bit(&mut self) {
        self.0[0] &= 0xFE;
    }
}

impl BitXor for Block {
    type Output = Self;

    #[inline]
    fn bitxor(mut self, rhs: Self) -> Self::Output {
        self ^= rhs;
        self
    }
}

impl BitXorAssign for Block {
    #[inline]
    fn bitxor_assign(&mut self, rhs: Self) {
        self.0
            .iter_mut()
            .zip(rhs.0.iter())
            .for_each(|(a, b)| *a ^= b);
    }
}

impl Serialize for Block {
    fn serialize_with_mode<W: Write>(
        &self,
        mut writer: W,
        _: Compress,
    ) -> Result<(), SerializationError> {
        writer.write_all(&self.0)?;
        Ok(())
    }

    fn serialized_size(&self, _: Compress) -> usize {
        BLOCK_SIZE
    }
}

impl Valid for Block {
    fn check(&self) -> Result<(), SerializationError> {
        Ok(())
    }
}

impl Deserialize for Block {
    fn deserialize_with_mode<R: Read>(
        mut reader: R,
        _: Compress,
        _: Validate,
    ) -> Result<Self, SerializationError> {
        let mut block = Self::zero();
        reader.read_exact(&mut block.0)?;
        Ok(block)
    }
}

/// A container for two identical-type objects which can be indexed using `bool`
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Pair<T>([T; 2]);

impl<T> Pair<T> {
    #[inline]
    pub fn new(first: T, second: T) -> Self {
        Self([first, second])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.0.iter()
    }
}

impl<T> Index<usize> for Pair<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        assert!(index == 0 || index == 1);
        &self.0[index]
    }
}

impl<T> IndexMut<usize> for Pair<T> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        assert!(index == 0 || index == 1);
        &mut self.0[index]
    }
}

impl<T> Index<bool> for Pair<T> {
    type Output = T;

    fn index(&self, index: bool) -> &Self::Output {
        &self.0[index as usize]
    }
}

impl<T> IndexMut<bool> for Pair<T> {
    fn index_mut(&mut self, index: bool) -> &mut Self::Output {
        &mut self.0[index as usize]
    }
}

/// A `Pair<bool>` is written as two bytes, each either `0` or `1`, left bit first.
impl Serialize for Pair<bool> {
    fn serialize_with_mode<W: Write>(
        &self,
        mut writer: W,
        _: Compress,
    ) -> Result<(), SerializationError> {
        writer.write_all(&[self[0] as u8, self[1] as u8])?;
        Ok(())
    }

    fn serialized_size(&self, _: Compress) -> usize {
        2
    }
}

impl Valid for Pair<bool> {
    fn check(&self) -> Result<(), SerializationError> {
        Ok(())
    }
}

impl Deserialize for Pair<bool> {
    fn deserialize_with_mode<R: Read>(
        mut reader: R,
        _: Compress,
        _: Validate,
    ) -> Result<Self, SerializationError> {
        let mut bytes = [0u8; 2];
        reader.read_exact(&mut bytes)?;
        Ok(Pair::new(read_bit(bytes[0])?, read_bit(bytes[1])?))
    }
}

/// Decodes a byte that must hold a single bit
#[inline]
pub(crate) fn read_bit(byte: u8) -> Result<bool, SerializationError> {
    match byte {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(SerializationError::InvalidData),
    }
}

#[cfg(test)]
mod tests {
    use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
    use crate::tests::test_rng;
    use rand::Rng;

    use super::{Block, Pair, BLOCK_SIZE};

    #[test]
    fn test_pair_serialization() {
        let mut rng = test_rng();

        let mut control_bits = Pair::<bool>::default();
        control_bits[0] = rng.gen_bool(0.5);
        control_bits[1] = rng.gen_bool(0.5);

        let mut serialized_bits = Vec::new();
        control_bits.serialize_compressed(&mut serialized_bits).unwrap();
        assert_eq!(serialized_bits.len(), 2);

        let recovered_bits = Pair::<bool>::deserialize_compressed(&serialized_bits[..]).unwrap();
        assert_eq!(control_bits, recovered_bits);

        // Anything other than 0/1 is rejected
        assert!(Pair::<bool>::deserialize_compressed(&[0u8, 2u8][..]).is_err());
    }

    #[test]
    fn test_block_serialization() {
        let mut rng = test_rng();
        let block = Block::random(&mut rng);

        let mut serialized = Vec::new();
        block.serialize_compressed(&mut serialized).unwrap();
        assert_eq!(serialized.len(), BLOCK_SIZE);
        assert_eq!(Block::deserialize_compressed(&serialized[..]).unwrap(), block);

        // Truncated input
        assert!(Block::deserialize_compressed(&serialized[..BLOCK_SIZE - 1]).is_err());
    }

    #[test]
    fn test_block_xor() {
        let mut rng = test_rng();
        let a = Block::random(&mut rng);
        let b = Block::random(&mut rng);

        assert_eq!(a ^ a, Block::zero());
        assert_eq!((a ^ b) ^ b, a);

        let mut c = a;
        c.0[0] |= 1;
        assert!(c.control_bit());
        c.clear_control_bit();
        assert!(!c.control_bit());
    }
}
