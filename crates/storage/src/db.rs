// storage/src/db.rs

use crate::{BlockCache, StorageError, StorageResult};
use blockchain_core::{
    Block, BlockNumber, BlockchainError, BlockchainResult, GenesisConfig, Ledger, LedgerMeta, Transaction,
};
use parking_lot::RwLock;
use rocksdb::{Options, WriteBatch, DB};
use std::path::{Path, PathBuf};

/// Genesis file name inside a chain's data directory
pub const GENESIS_FILE: &str = "genesis.json";

const LEDGER_DIR: &str = "ledger";
const META_GENESIS_KEY: &[u8] = b"genesis";
const META_LEDGER_KEY: &[u8] = b"ledger_meta";

/// Column families for different data types
#[derive(Debug, Clone, Copy)]
pub enum ColumnFamily {
    /// blockid -> block
    Blocks,
    /// height -> blockid
    BlockHeights,
    /// txid -> transaction
    Transactions,
    /// genesis config and trunk meta
    Meta,
}

impl ColumnFamily {
    fn as_str(&self) -> &'static str {
        match self {
            ColumnFamily::Blocks => "blocks",
            ColumnFamily::BlockHeights => "block_heights",
            ColumnFamily::Transactions => "transactions",
            ColumnFamily::Meta => "meta",
        }
    }

    fn all() -> Vec<Self> {
        vec![Self::Blocks, Self::BlockHeights, Self::Transactions, Self::Meta]
    }
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub create_if_missing: bool,
    pub max_open_files: i32,
    pub write_buffer_size: usize,
    pub max_write_buffer_number: i32,
    /// Blocks kept in the read cache
    pub block_cache_entries: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/ledger"),
            create_if_missing: true,
            max_open_files: 1024,
            write_buffer_size: 64 * 1024 * 1024, // 64 MB
            max_write_buffer_number: 3,
            block_cache_entries: 256,
        }
    }
}

/// RocksDB-backed ledger of one chain
pub struct Database {
    db: RwLock<Option<DB>>,
    genesis: GenesisConfig,
    meta: RwLock<LedgerMeta>,
    cache: BlockCache,
    config: DatabaseConfig,
}

impl Database {
    /// Open an existing ledger, or create it from `genesis`.
    ///
    /// The genesis config is only consulted on creation; afterwards the copy
    /// persisted in the meta column family wins.
    pub fn open(config: DatabaseConfig, genesis: Option<GenesisConfig>) -> StorageResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(config.create_if_missing);
        opts.create_missing_column_families(true);
        opts.set_max_open_files(config.max_open_files);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_max_write_buffer_number(config.max_write_buffer_number);
        opts.increase_parallelism(num_cpus::get() as i32);

        let cfs: Vec<_> = ColumnFamily::all().iter().map(|cf| cf.as_str()).collect();
        let db = DB::open_cf(&opts, &config.path, cfs)?;

        let (genesis, meta) = match db.get_cf(cf(&db, ColumnFamily::Meta)?, META_GENESIS_KEY)? {
            Some(bytes) => {
                let genesis: GenesisConfig = serde_json::from_slice(&bytes)
                    .map_err(|e| StorageError::Corruption(format!("genesis record: {}", e)))?;
                let meta_bytes = db
                    .get_cf(cf(&db, ColumnFamily::Meta)?, META_LEDGER_KEY)?
                    .ok_or_else(|| StorageError::Corruption("missing ledger meta".into()))?;
                (genesis, bincode::deserialize(&meta_bytes)?)
            }
            None => {
                let genesis = genesis.ok_or_else(|| {
                    StorageError::Genesis(format!("no genesis config for new ledger at {}", config.path.display()))
                })?;
                let meta = Self::write_genesis(&db, &genesis)?;
                (genesis, meta)
            }
        };

        tracing::info!(
            path = %config.path.display(),
            height = meta.trunk_height,
            crypto = %genesis.crypto,
            "ledger opened"
        );

        Ok(Self {
            db: RwLock::new(Some(db)),
            genesis,
            meta: RwLock::new(meta),
            cache: BlockCache::new(config.block_cache_entries),
            config,
        })
    }

    fn write_genesis(db: &DB, genesis: &GenesisConfig) -> StorageResult<LedgerMeta> {
        let block = genesis
            .genesis_block()
            .map_err(|e| StorageError::Genesis(e.to_string()))?;
        let meta = LedgerMeta {
            root_blockid: block.blockid.clone(),
            tip_blockid: block.blockid.clone(),
            trunk_height: 0,
        };

        let genesis_bytes = serde_json::to_vec(genesis)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        let mut batch = WriteBatch::default();
        batch.put_cf(cf(db, ColumnFamily::Meta)?, META_GENESIS_KEY, genesis_bytes);
        Self::put_block(db, &mut batch, &block, &meta)?;
        db.write(batch)?;

        tracing::info!(blockid = %block.blockid_hex(), "genesis block written");
        Ok(meta)
    }

    /// Stage a block, its index entries, its transactions and the new meta
    fn put_block(db: &DB, batch: &mut WriteBatch, block: &Block, meta: &LedgerMeta) -> StorageResult<()> {
        batch.put_cf(cf(db, ColumnFamily::Blocks)?, &block.blockid, bincode::serialize(block)?);
        batch.put_cf(
            cf(db, ColumnFamily::BlockHeights)?,
            block.height().to_be_bytes(),
            &block.blockid,
        );
        for tx in &block.transactions {
            batch.put_cf(cf(db, ColumnFamily::Transactions)?, &tx.txid, bincode::serialize(tx)?);
        }
        batch.put_cf(cf(db, ColumnFamily::Meta)?, META_LEDGER_KEY, bincode::serialize(meta)?);
        Ok(())
    }

    fn with_db<T>(&self, f: impl FnOnce(&DB) -> StorageResult<T>) -> StorageResult<T> {
        let guard = self.db.read();
        let db = guard.as_ref().ok_or(StorageError::Closed)?;
        f(db)
    }

    /// Get block by id
    pub fn get_block(&self, blockid: &[u8]) -> StorageResult<Option<Block>> {
        if let Some(block) = self.cache.get(blockid) {
            return Ok(Some(block));
        }

        let block: Option<Block> = self.with_db(|db| {
            match db.get_cf(cf(db, ColumnFamily::Blocks)?, blockid)? {
                Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
                None => Ok(None),
            }
        })?;

        if let Some(block) = &block {
            self.cache.insert(block.clone());
        }
        Ok(block)
    }

    /// Get block id by height
    pub fn get_blockid_by_height(&self, height: BlockNumber) -> StorageResult<Option<Vec<u8>>> {
        self.with_db(|db| Ok(db.get_cf(cf(db, ColumnFamily::BlockHeights)?, height.to_be_bytes())?))
    }

    pub fn get_transaction(&self, txid: &[u8]) -> StorageResult<Option<Transaction>> {
        self.with_db(|db| match db.get_cf(cf(db, ColumnFamily::Transactions)?, txid)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        })
    }

    /// Append `block` to the trunk; it must sit directly on the current tip
    pub fn append_block(&self, block: &Block) -> BlockchainResult<LedgerMeta> {
        let mut meta = self.meta.write();
        if block.height() != meta.trunk_height + 1 || block.header.pre_hash != meta.tip_blockid {
            return Err(BlockchainError::InvalidParameter(format!(
                "block {} at height {} does not extend tip {} at height {}",
                block.blockid_hex(),
                block.height(),
                hex::encode(&meta.tip_blockid),
                meta.trunk_height
            )));
        }

        let next = LedgerMeta {
            root_blockid: meta.root_blockid.clone(),
            tip_blockid: block.blockid.clone(),
            trunk_height: block.height(),
        };
        self.with_db(|db| {
            let mut batch = WriteBatch::default();
            Self::put_block(db, &mut batch, block, &next)?;
            db.write(batch)?;
            Ok(())
        })?;

        *meta = next.clone();
        self.cache.insert(block.clone());

        tracing::debug!(height = block.height(), blockid = %block.blockid_hex(), "block appended");
        Ok(next)
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }
}

impl Ledger for Database {
    fn genesis(&self) -> &GenesisConfig {
        &self.genesis
    }

    fn meta(&self) -> LedgerMeta {
        self.meta.read().clone()
    }

    fn exist_block(&self, blockid: &[u8]) -> BlockchainResult<bool> {
        Ok(self.get_block(blockid)?.is_some())
    }

    fn query_block(&self, blockid: &[u8]) -> BlockchainResult<Block> {
        self.get_block(blockid)?
            .ok_or_else(|| BlockchainError::BlockNotFound(hex::encode(blockid)))
    }

    fn query_block_by_height(&self, height: BlockNumber) -> BlockchainResult<Block> {
        let blockid = self
            .get_blockid_by_height(height)?
            .ok_or_else(|| BlockchainError::BlockNotFound(format!("height {}", height)))?;
        self.query_block(&blockid)
    }

    fn query_transaction(&self, txid: &[u8]) -> BlockchainResult<Option<Transaction>> {
        Ok(self.get_transaction(txid)?)
    }

    fn confirm_block(&self, block: &Block) -> BlockchainResult<()> {
        self.append_block(block).map(|_| ())
    }

    fn close(&self) {
        if let Some(db) = self.db.write().take() {
            if let Err(e) = db.flush() {
                tracing::warn!(err = %e, "flush on close failed");
            }
            self.cache.clear();
            tracing::info!(path = %self.config.path.display(), "ledger closed");
        }
    }
}

/// Open (or create) the ledger of `chain` under `data_dir`.
///
/// The layout is `<data_dir>/blockchain/<chain>/{genesis.json,ledger/}`.
pub fn open_ledger(data_dir: impl AsRef<Path>, chain: &str) -> StorageResult<Database> {
    let chain_dir = data_dir.as_ref().join("blockchain").join(chain);
    let genesis_path = chain_dir.join(GENESIS_FILE);

    let genesis = if genesis_path.exists() {
        Some(GenesisConfig::from_file(&genesis_path).map_err(|e| StorageError::Genesis(e.to_string()))?)
    } else {
        None
    };

    let config = DatabaseConfig {
        path: chain_dir.join(LEDGER_DIR),
        ..Default::default()
    };
    Database::open(config, genesis)
}

/// Get column family handle
fn cf(db: &DB, cf_type: ColumnFamily) -> StorageResult<&rocksdb::ColumnFamily> {
    db.cf_handle(cf_type.as_str())
        .ok_or_else(|| StorageError::DatabaseError(format!("{} CF not found", cf_type.as_str())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockchain_core::{Amount, Predistribution};
    use tempfile::TempDir;

    fn genesis() -> GenesisConfig {
        GenesisConfig {
            crypto: "default".into(),
            predistribution: vec![Predistribution { address: "alice".into(), quota: Amount::from_u64(1000) }],
            ..Default::default()
        }
    }

    fn create_test_db() -> (Database, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = DatabaseConfig {
            path: temp_dir.path().join("ledger"),
            ..Default::default()
        };
        let db = Database::open(config, Some(genesis())).unwrap();
        (db, temp_dir)
    }

    fn next_block(db: &Database) -> Block {
        let meta = db.meta();
        let mut tx = Transaction::new("alice");
        tx.seal().unwrap();
        let mut block = Block::new(meta.trunk_height + 1, meta.tip_blockid, "", vec![tx]);
        block.blockid = block.header.compute_id().unwrap();
        block
    }

    #[test]
    fn test_genesis_written_on_create() {
        let (db, _temp) = create_test_db();
        let meta = db.meta();

        assert_eq!(meta.trunk_height, 0);
        assert_eq!(meta.root_blockid, meta.tip_blockid);

        let genesis_block = db.query_block_by_height(0).unwrap();
        let coinbase = &genesis_block.transactions[0];
        assert!(db.query_transaction(&coinbase.txid).unwrap().is_some());
        assert_eq!(db.crypto_type(), "default");
    }

    #[test]
    fn test_new_ledger_needs_genesis() {
        let temp_dir = TempDir::new().unwrap();
        let config = DatabaseConfig { path: temp_dir.path().join("ledger"), ..Default::default() };
        assert!(matches!(Database::open(config, None), Err(StorageError::Genesis(_))));
    }

    #[test]
    fn test_confirm_block() {
        let (db, _temp) = create_test_db();
        let block = next_block(&db);

        db.confirm_block(&block).unwrap();

        assert_eq!(db.meta().trunk_height, 1);
        assert!(db.exist_block(&block.blockid).unwrap());
        assert_eq!(db.query_block_by_height(1).unwrap().blockid, block.blockid);
        assert!(db.query_transaction(&block.transactions[0].txid).unwrap().is_some());
    }

    #[test]
    fn test_confirm_rejects_non_extending_block() {
        let (db, _temp) = create_test_db();
        let mut block = next_block(&db);
        block.header.height = 5;

        assert!(matches!(db.confirm_block(&block), Err(BlockchainError::InvalidParameter(_))));
    }

    #[test]
    fn test_reopen_keeps_meta() {
        let temp_dir = TempDir::new().unwrap();
        let config = DatabaseConfig { path: temp_dir.path().join("ledger"), ..Default::default() };

        let db = Database::open(config.clone(), Some(genesis())).unwrap();
        let block = next_block(&db);
        db.confirm_block(&block).unwrap();
        db.close();

        let reopened = Database::open(config, None).unwrap();
        assert_eq!(reopened.meta().tip_blockid, block.blockid);
        assert_eq!(reopened.genesis().predistribution.len(), 1);
    }

    #[test]
    fn test_closed_ledger() {
        let (db, _temp) = create_test_db();
        db.close();
        assert!(matches!(db.query_block_by_height(0), Err(BlockchainError::Closed)));
    }

    #[test]
    fn test_open_ledger_layout() {
        let temp_dir = TempDir::new().unwrap();
        let chain_dir = temp_dir.path().join("blockchain").join("xuper");
        std::fs::create_dir_all(&chain_dir).unwrap();
        genesis().to_file(chain_dir.join(GENESIS_FILE)).unwrap();

        let db = open_ledger(temp_dir.path(), "xuper").unwrap();
        assert_eq!(db.path(), chain_dir.join("ledger").as_path());
        assert!(open_ledger(temp_dir.path(), "missing").is_err());
    }
}
