use crate::{pow::meets_difficulty, unix_now, Block, LedgerError, Transaction};
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Mines a block by searching proof-of-work values in parallel until a hash
/// has at least `difficulty` leading zero hex characters. The preimage prefix
/// (previous hash, payload, timestamp) is fixed once; only the counter varies
/// per attempt. Standalone miner: `Chain::append` stays sequential.
pub fn mine_block_parallel(
    tx: Transaction,
    previous_hash: String,
    difficulty: u32,
    cancel: &AtomicBool,
) -> Result<Block, LedgerError> {
    let timestamp = unix_now();

    let mut prefix = Vec::new();
    prefix.extend_from_slice(previous_hash.as_bytes());
    prefix.extend_from_slice(&tx.canonical_bytes()?);
    prefix.extend_from_slice(timestamp.to_string().as_bytes());

    // Rayon splits the counter range across threads. The predicate also
    // fires on cancellation so every worker stops promptly.
    let found = (0u64..u64::MAX)
        .into_par_iter()
        .find_any(|counter| {
            cancel.load(Ordering::Relaxed)
                || meets_difficulty(&hash_attempt(&prefix, *counter), difficulty)
        })
        .expect("counter space exhausted (practically impossible)");

    let hash = hash_attempt(&prefix, found);
    if !meets_difficulty(&hash, difficulty) {
        return Err(LedgerError::MiningCancelled);
    }

    info!(counter = found, %hash, "mined block in parallel");

    Ok(Block {
        tx,
        previous_hash,
        timestamp,
        proof_of_work: found,
        hash,
    })
}

fn hash_attempt(prefix: &[u8], counter: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prefix);
    hasher.update(counter.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pow::leading_zero_chars;

    #[test]
    fn parallel_mine_satisfies_difficulty() {
        let block = mine_block_parallel(
            Transaction::new("Alice", "Bob", 5.0),
            "0".to_string(),
            2,
            &AtomicBool::new(false),
        )
        .unwrap();
        assert!(leading_zero_chars(block.hash()) >= 2);
        assert_eq!(block.hash(), block.compute_hash().unwrap());
    }

    #[test]
    fn parallel_mine_respects_cancellation() {
        let err = mine_block_parallel(
            Transaction::new("Alice", "Bob", 5.0),
            "0".to_string(),
            16,
            &AtomicBool::new(true),
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::MiningCancelled));
    }
}
