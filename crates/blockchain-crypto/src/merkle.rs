// blockchain-crypto/src/merkle.rs

use crate::{double_sha256, Hash};

/// Root of the transaction merkle tree in a block.
///
/// Leaves are transaction ids. Each level pairs neighbours and hashes the
/// concatenation with double SHA256; an odd node at the end of a level is
/// paired with itself. An empty block has the zero root.
pub fn merkle_root<T: AsRef<[u8]>>(leaves: &[T]) -> Hash {
    if leaves.is_empty() {
        return Hash::zero();
    }

    let mut level: Vec<Hash> = leaves.iter().map(|leaf| double_sha256(leaf.as_ref())).collect();

    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| {
                let left = pair[0];
                let right = pair.get(1).copied().unwrap_or(left);
                combine(left, right)
            })
            .collect();
    }

    level[0]
}

fn combine(left: Hash, right: Hash) -> Hash {
    let mut combined = Vec::with_capacity(64);
    combined.extend_from_slice(left.as_bytes());
    combined.extend_from_slice(right.as_bytes());
    double_sha256(&combined)
}
