/// Hash sentinel carried by the genesis block; never matches a real digest.
pub const GENESIS_HASH: &str = "0";
pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
pub const DEFAULT_DIFFICULTY: u32 = 1;
