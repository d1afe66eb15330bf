//! Queries sent to servers, and the byte encodings of queries and answers.
use ark_ff::PrimeField;
use ark_serialize::{CanonicalSerialize as Serialize, Compress, SerializationError};
use ark_std::io::{Read, Write};
use vpir_dpf::DPFKey;

use crate::{DatabaseInfo, PirError, Scheme};

/// The query a single server receives
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Query<F: PrimeField> {
    /// One key of a DPF pair, hiding a point of the column domain
    PointFunction(DPFKey<F>),
    /// An additive share of the selection vector, `block_len` elements per column
    Additive(Vec<F>),
}

impl<F: PrimeField> Query<F> {
    pub fn scheme(&self) -> Scheme {
        match self {
            Query::PointFunction(_) => Scheme::PointFunction,
            Query::Additive(_) => Scheme::Additive,
        }
    }

    /// Decodes a query for a database laid out as `info`. The encoding carries no lengths, which
    /// are all implied by the layout.
    pub fn read<R: Read>(mut reader: R, info: &DatabaseInfo) -> Result<Self, PirError> {
        info.validate()?;
        let mut tag = [0u8; 1];
        reader
            .read_exact(&mut tag)
            .map_err(SerializationError::from)?;
        match Scheme::from_tag(tag[0]) {
            Some(Scheme::PointFunction) => Ok(Query::PointFunction(DPFKey::read(
                reader,
                info.log_columns(),
                info.block_len(),
            )?)),
            Some(Scheme::Additive) => Ok(Query::Additive(read_elements(
                reader,
                info.query_len(),
            )?)),
            None => Err(SerializationError::InvalidData.into()),
        }
    }
}

/// A query is written as a one-byte scheme tag followed by either the DPF key or the share
/// elements in their fixed-width encoding.
impl<F: PrimeField> Serialize for Query<F> {
    fn serialize_with_mode<W: Write>(
        &self,
        mut writer: W,
        compress: Compress,
    ) -> Result<(), SerializationError> {
        writer.write_all(&[self.scheme().tag()])?;
        match self {
            Query::PointFunction(key) => key.serialize_with_mode(writer, compress),
            Query::Additive(elems) => write_elements(elems, writer, compress),
        }
    }

    fn serialized_size(&self, compress: Compress) -> usize {
        1 + match self {
            Query::PointFunction(key) => key.serialized_size(compress),
            Query::Additive(elems) => elems.iter().map(|e| e.serialized_size(compress)).sum(),
        }
    }
}

/// Writes `elems` back to back without a length prefix
pub(crate) fn write_elements<F: PrimeField, W: Write>(
    elems: &[F],
    mut writer: W,
    compress: Compress,
) -> Result<(), SerializationError> {
    for e in elems {
        e.serialize_with_mode(&mut writer, compress)?;
    }
    Ok(())
}

/// Reads exactly `len` elements written by [`write_elements`]
pub(crate) fn read_elements<F: PrimeField, R: Read>(
    mut reader: R,
    len: usize,
) -> Result<Vec<F>, SerializationError> {
    (0..len)
        .map(|_| F::deserialize_compressed(&mut reader))
        .collect()
}

/// Encodes an answer
pub(crate) fn answer_to_bytes<F: PrimeField>(answer: &[F]) -> Result<Vec<u8>, PirError> {
    let mut bytes = Vec::with_capacity(answer.len() * vpir_dpf::field::element_size::<F>());
    write_elements(answer, &mut bytes, Compress::Yes)?;
    Ok(bytes)
}

/// Decodes an answer of exactly `len` elements, rejecting trailing bytes
pub(crate) fn answer_from_bytes<F: PrimeField>(
    bytes: &[u8],
    len: usize,
) -> Result<Vec<F>, PirError> {
    let expected = len * vpir_dpf::field::element_size::<F>();
    if bytes.len() != expected {
        return Err(PirError::DimensionMismatch(format!(
            "answer of {} bytes, expected {}",
            bytes.len(),
            expected
        )));
    }
    Ok(read_elements(bytes, len)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FieldElement, SINGLE_BIT_BLOCK_LENGTH};
    use ark_ff::UniformRand;
    use crate::tests::test_rng;
    use vpir_dpf::{Engine, BGI18, DPF};

    #[test]
    fn test_query_serialization() {
        let mut rng = test_rng();
        let engine = Engine::new();

        for info in [
            DatabaseInfo::new(3, 10, 4).unwrap(),
            DatabaseInfo::new(1, 1, 2).unwrap(),
            DatabaseInfo::new(2, 4, SINGLE_BIT_BLOCK_LENGTH).unwrap(),
        ] {
            let value: Vec<FieldElement> = (0..info.block_len())
                .map(|_| FieldElement::rand(&mut rng))
                .collect();
            let (k0, _) = BGI18::gen(&engine, 0, &value, info.log_columns(), &mut rng).unwrap();
            let share: Vec<FieldElement> = (0..info.query_len())
                .map(|_| FieldElement::rand(&mut rng))
                .collect();

            for query in [Query::PointFunction(k0), Query::Additive(share)] {
                let mut bytes = Vec::new();
                query.serialize_compressed(&mut bytes).unwrap();
                assert_eq!(bytes.len(), query.compressed_size());
                assert_eq!(Query::read(&bytes[..], &info).unwrap(), query);

                // Truncated
                assert!(Query::<FieldElement>::read(&bytes[..bytes.len() - 1], &info).is_err());

                // Unknown scheme
                let mut corrupted = bytes.clone();
                corrupted[0] = 9;
                assert!(Query::<FieldElement>::read(&corrupted[..], &info).is_err());
            }
        }
    }

    #[test]
    fn test_answer_bytes() {
        let mut rng = test_rng();
        let answer: Vec<FieldElement> = (0..7).map(|_| FieldElement::rand(&mut rng)).collect();
        let bytes = answer_to_bytes(&answer).unwrap();
        assert_eq!(bytes.len(), 7 * 16);
        assert_eq!(answer_from_bytes::<FieldElement>(&bytes, 7).unwrap(), answer);

        assert!(matches!(
            answer_from_bytes::<FieldElement>(&bytes, 6),
            Err(PirError::DimensionMismatch(_))
        ));
        assert!(answer_from_bytes::<FieldElement>(&bytes[..100], 7).is_err());
    }
}
