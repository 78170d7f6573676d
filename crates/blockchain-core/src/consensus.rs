// blockchain-core/src/consensus.rs

use crate::block::Block;
use crate::types::BlockNumber;
use crate::BlockchainResult;

/// Decides who may propose a height and whether a block is acceptable.
///
/// `check_block` reports policy violations as `BlockchainError::Forbidden`.
pub trait ConsensusEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Address scheduled to propose `height`
    fn proposer_at(&self, height: BlockNumber) -> Option<String>;

    fn is_proposer(&self, height: BlockNumber, address: &str) -> bool {
        self.proposer_at(height).as_deref() == Some(address)
    }

    fn check_block(&self, block: &Block) -> BlockchainResult<()>;
}
