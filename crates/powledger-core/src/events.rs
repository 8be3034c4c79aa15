//! Chain observation as an injectable sink rather than process-global
//! logging state, so the core stays testable without capturing log output.

/// One structured notification from a `Chain`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChainEvent<'a> {
    ChainCreated { difficulty: u32 },
    BlockMined { index: usize, attempts: u64, hash: &'a str },
    BlockAppended { index: usize },
    Validated { valid: bool },
}

/// Receiver for chain events. Implementations must not block: events are
/// emitted inline from `append` and `is_valid`.
pub trait EventSink: Send + Sync {
    fn on_event(&self, event: &ChainEvent<'_>);
}
