//! Additive secret sharing of vectors of field elements.
use ark_ff::PrimeField;
use rand::{CryptoRng, RngCore};

use crate::PirError;

/// Splits `target` into `num_servers` vectors that sum coordinate-wise to `target`. Any
/// `num_servers - 1` of them are uniformly random.
pub fn share_vector<F: PrimeField, R: CryptoRng + RngCore>(
    target: &[F],
    num_servers: usize,
    rng: &mut R,
) -> Result<Vec<Vec<F>>, PirError> {
    if num_servers < 2 {
        return Err(PirError::InvalidParameters(format!(
            "cannot share among {} servers",
            num_servers
        )));
    }
    if target.is_empty() {
        return Err(PirError::InvalidParameters(
            "cannot share an empty vector".to_string(),
        ));
    }

    let mut shares: Vec<Vec<F>> = (0..num_servers - 1)
        .map(|_| (0..target.len()).map(|_| F::rand(rng)).collect())
        .collect();

    // The last share is the target minus all the others
    let mut last = target.to_vec();
    for share in shares.iter() {
        last.iter_mut().zip(share).for_each(|(l, s)| *l -= s);
    }
    shares.push(last);
    Ok(shares)
}

/// Sums `shares` coordinate-wise
pub fn reconstruct_shares<F: PrimeField>(shares: &[Vec<F>]) -> Result<Vec<F>, PirError> {
    let (first, rest) = shares
        .split_first()
        .ok_or_else(|| PirError::InvalidParameters("no shares to reconstruct".to_string()))?;

    let mut sum = first.clone();
    for share in rest {
        if share.len() != sum.len() {
            return Err(PirError::DimensionMismatch(format!(
                "share of {} elements alongside shares of {}",
                share.len(),
                sum.len()
            )));
        }
        sum.iter_mut().zip(share).for_each(|(acc, s)| *acc += s);
    }
    Ok(sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FieldElement, F64};
    use ark_ff::{UniformRand, Zero};
    use crate::tests::test_rng;

    fn test_sharing_helper<F: PrimeField>() {
        let mut rng = test_rng();

        for num_servers in 2..6 {
            let target: Vec<F> = (0..9).map(|_| F::rand(&mut rng)).collect();
            let shares = share_vector(&target, num_servers, &mut rng).unwrap();
            assert_eq!(shares.len(), num_servers);
            assert!(shares.iter().all(|s| s.len() == target.len()));
            assert_eq!(reconstruct_shares(&shares).unwrap(), target);

            // Dropping a share leaves a random-looking vector
            assert_ne!(reconstruct_shares(&shares[1..]).unwrap(), target);
        }
    }

    #[test]
    fn test_sharing() {
        test_sharing_helper::<FieldElement>();
        test_sharing_helper::<F64>();
    }

    #[test]
    fn test_bad_inputs() {
        let mut rng = test_rng();
        let target = vec![FieldElement::rand(&mut rng); 4];

        assert!(matches!(
            share_vector(&target, 1, &mut rng),
            Err(PirError::InvalidParameters(_))
        ));
        assert!(matches!(
            share_vector::<FieldElement, _>(&[], 2, &mut rng),
            Err(PirError::InvalidParameters(_))
        ));

        assert!(reconstruct_shares::<FieldElement>(&[]).is_err());
        let ragged = vec![vec![FieldElement::zero(); 4], vec![FieldElement::zero(); 3]];
        assert!(matches!(
            reconstruct_shares(&ragged),
            Err(PirError::DimensionMismatch(_))
        ));
    }
}
