use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod constants;
pub mod events;
pub mod mine;

pub use constants::GENESIS_HASH;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("payload serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("chain has no blocks; genesis is missing")]
    EmptyChain,

    #[error("mining cancelled before difficulty target was met")]
    MiningCancelled,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub from: String,
    pub to: String,
    pub amount: f64,
}

impl Transaction {
    pub fn new(from: impl Into<String>, to: impl Into<String>, amount: f64) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            amount,
        }
    }

    /// Canonical byte encoding of the payload. Field order is fixed by the
    /// struct declaration, so re-serializing always yields the same bytes.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, LedgerError> {
        Ok(serde_json::to_vec(self)?)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    tx: Transaction,
    previous_hash: String,
    timestamp: u64,
    proof_of_work: u64,
    hash: String,
}

impl Block {
    /// A candidate block. `hash` is empty until `mine` runs.
    pub fn new(tx: Transaction, previous_hash: String) -> Self {
        Self {
            tx,
            previous_hash,
            timestamp: unix_now(),
            proof_of_work: 0,
            hash: String::new(),
        }
    }

    pub fn tx(&self) -> &Transaction {
        &self.tx
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn proof_of_work(&self) -> u64 {
        self.proof_of_work
    }

    /// SHA-256 over `previous_hash ‖ payload ‖ timestamp ‖ proof_of_work`,
    /// rendered as lowercase hex. Pure function of the block's fields.
    pub fn compute_hash(&self) -> Result<String, LedgerError> {
        let payload = self.tx.canonical_bytes()?;
        let mut hasher = Sha256::new();
        hasher.update(self.previous_hash.as_bytes());
        hasher.update(&payload);
        hasher.update(self.timestamp.to_string().as_bytes());
        hasher.update(self.proof_of_work.to_string().as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }

    /// Increment `proof_of_work` until the hash has `difficulty` leading zero
    /// hex characters. Blocks the calling thread; expected attempts grow as
    /// 16^difficulty. Returns the number of hashes computed.
    pub fn mine(&mut self, difficulty: u32) -> Result<u64, LedgerError> {
        self.mine_with_cancel(difficulty, &AtomicBool::new(false))
    }

    /// Like `mine`, but checks `cancel` between attempts and bails out with
    /// `LedgerError::MiningCancelled` once it is raised. The first hash is
    /// always computed, so difficulty 0 still populates `hash` and leaves
    /// `proof_of_work` untouched.
    pub fn mine_with_cancel(
        &mut self,
        difficulty: u32,
        cancel: &AtomicBool,
    ) -> Result<u64, LedgerError> {
        let mut attempts = 0u64;
        loop {
            self.hash = self.compute_hash()?;
            attempts += 1;
            if pow::meets_difficulty(&self.hash, difficulty) {
                return Ok(attempts);
            }
            if cancel.load(Ordering::Relaxed) {
                return Err(LedgerError::MiningCancelled);
            }
            self.proof_of_work += 1;
        }
    }

    #[cfg(test)]
    pub(crate) fn tx_mut(&mut self) -> &mut Transaction {
        &mut self.tx
    }

    #[cfg(test)]
    pub(crate) fn set_previous_hash(&mut self, hash: impl Into<String>) {
        self.previous_hash = hash.into();
    }

    #[cfg(test)]
    pub(crate) fn with_parts(
        tx: Transaction,
        previous_hash: &str,
        timestamp: u64,
        proof_of_work: u64,
    ) -> Self {
        Self {
            tx,
            previous_hash: previous_hash.to_string(),
            timestamp,
            proof_of_work,
            hash: String::new(),
        }
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_secs()
}

pub mod pow {
    /// Count of leading `'0'` characters in a hex digest string.
    pub fn leading_zero_chars(hash: &str) -> u32 {
        hash.bytes().take_while(|b| *b == b'0').count() as u32
    }

    pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
        leading_zero_chars(hash) >= difficulty
    }
}

pub mod chain {
    use super::*;
    use crate::events::{ChainEvent, EventSink};
    use std::sync::Arc;
    use tracing::debug;

    /// Append-only block sequence. Index 0 is genesis; blocks are owned
    /// exclusively and never mutated or removed once appended. Single-writer:
    /// callers needing concurrent appends must serialize them externally.
    pub struct Chain {
        blocks: Vec<Block>,
        difficulty: u32,
        sink: Option<Arc<dyn EventSink>>,
    }

    impl Chain {
        /// A chain holding only the genesis block, with `difficulty` applied
        /// to every future append.
        pub fn new(difficulty: u32) -> Self {
            Self {
                blocks: vec![genesis_block()],
                difficulty,
                sink: None,
            }
        }

        /// Same as `new`, with an observer for chain events.
        pub fn with_sink(difficulty: u32, sink: Arc<dyn EventSink>) -> Self {
            let chain = Self {
                blocks: vec![genesis_block()],
                difficulty,
                sink: Some(sink),
            };
            chain.emit(&ChainEvent::ChainCreated { difficulty });
            chain
        }

        pub fn difficulty(&self) -> u32 {
            self.difficulty
        }

        pub fn len(&self) -> usize {
            self.blocks.len()
        }

        pub fn is_empty(&self) -> bool {
            self.blocks.is_empty()
        }

        pub fn blocks(&self) -> &[Block] {
            &self.blocks
        }

        pub fn tip(&self) -> Option<&Block> {
            self.blocks.last()
        }

        /// Build a block carrying one transaction, mine it at the chain's
        /// difficulty, and push it. Transaction fields are opaque: no sign,
        /// range, or emptiness checks.
        pub fn append(
            &mut self,
            from: impl Into<String>,
            to: impl Into<String>,
            amount: f64,
        ) -> Result<&Block, LedgerError> {
            let tail = self.blocks.last().ok_or(LedgerError::EmptyChain)?;
            let mut block = Block::new(
                Transaction::new(from, to, amount),
                tail.hash.clone(),
            );
            let attempts = block.mine(self.difficulty)?;

            let index = self.blocks.len();
            debug!(index, attempts, hash = %block.hash, "mined block");
            self.emit(&ChainEvent::BlockMined {
                index,
                attempts,
                hash: &block.hash,
            });

            self.blocks.push(block);
            self.emit(&ChainEvent::BlockAppended { index });
            Ok(&self.blocks[index])
        }

        /// Recompute every non-genesis block's hash and check it against the
        /// stored value and the predecessor link. Read-only. Does not
        /// re-check the difficulty prefix; a chain mined at a different
        /// difficulty but internally consistent still passes.
        pub fn is_valid(&self) -> Result<bool, LedgerError> {
            let mut valid = true;
            for pair in self.blocks.windows(2) {
                let (previous, current) = (&pair[0], &pair[1]);
                if current.hash != current.compute_hash()?
                    || current.previous_hash != previous.hash
                {
                    valid = false;
                    break;
                }
            }
            self.emit(&ChainEvent::Validated { valid });
            Ok(valid)
        }

        fn emit(&self, event: &ChainEvent<'_>) {
            if let Some(sink) = &self.sink {
                sink.on_event(event);
            }
        }

        #[cfg(test)]
        pub(crate) fn block_mut(&mut self, index: usize) -> &mut Block {
            &mut self.blocks[index]
        }

        #[cfg(test)]
        pub(crate) fn empty_for_test(difficulty: u32) -> Self {
            Self {
                blocks: Vec::new(),
                difficulty,
                sink: None,
            }
        }
    }

    /// The genesis block: hash forced to the `"0"` sentinel, never mined and
    /// exempt from the difficulty requirement. The sentinel can never match
    /// a real 256-bit digest, so genesis is distinguishable structurally.
    pub fn genesis_block() -> Block {
        Block {
            tx: Transaction::new("", "", 0.0),
            previous_hash: String::new(),
            timestamp: unix_now(),
            proof_of_work: 0,
            hash: GENESIS_HASH.to_string(),
        }
    }
}
