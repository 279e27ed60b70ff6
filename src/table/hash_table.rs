//! Cuckoo哈希表核心实现
//!
//! 固定容量的并发键值索引：桶数组持有签名+键槽索引，键值字节在
//! 扁平键槽仓库里，满桶插入走有界踢出搜索，容量耗尽返回TableFull，
//! 由调用方决定是否用更大的表重建。表不做任何扩容。

use crate::{
    error::FlowHashError,
    hash::{
        signature::{alt_tag_of, partner_bucket, primary_bucket},
        HashAlgorithm, TableHasher,
    },
    stats::{TableStats, TableStatsSnapshot},
    store::{FreeList, KeySlotStore, ReclamationClient},
    sync::ConcurrencyController,
    table::{
        bucket::BucketArray, displace, DEFAULT_DISPLACEMENT_DEPTH, DEFAULT_SLOTS_PER_BUCKET,
    },
    types::{
        ConcurrencyMode, DuplicatePolicy, Signature, SlotEntry, BULK_THREAD_POOL, MAX_DATA_LEN,
        MAX_KEY_LEN, MAX_SLOTS_PER_BUCKET,
    },
};
use rayon::prelude::*;
use std::{
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

/// 踢出搜索+应用的重试上限（路径被并发写入者破坏时）
const MAX_INSERT_ATTEMPTS: usize = 8;

/// 批量查询并行化阈值
const BULK_PARALLEL_THRESHOLD: usize = 256;

/// 哈希表配置
#[derive(Clone, Debug)]
pub struct TableConfig {
    /// 桶数量，必须是2的幂且不小于2
    pub bucket_count: usize,
    /// 每桶槽位数 (1..=8)
    pub slots_per_bucket: usize,
    /// 键长度（字节），所有键等长
    pub key_len: usize,
    /// 附加数据长度（字节）
    pub data_len: usize,
    /// 哈希算法
    pub hash_algorithm: HashAlgorithm,
    /// 哈希种子；None则建表时随机生成
    pub seed: Option<u64>,
    /// 并发模式
    pub concurrency_mode: ConcurrencyMode,
    /// 踢出搜索最大深度
    pub max_displacement_depth: usize,
    /// 重复键策略
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            bucket_count: 1024,
            slots_per_bucket: DEFAULT_SLOTS_PER_BUCKET,
            key_len: 16,
            data_len: 8,
            hash_algorithm: HashAlgorithm::AHash,
            seed: None,
            concurrency_mode: ConcurrencyMode::ReaderWriter,
            max_displacement_depth: DEFAULT_DISPLACEMENT_DEPTH,
            duplicate_policy: DuplicatePolicy::Reject,
        }
    }
}

impl TableConfig {
    /// 校验配置
    pub fn validate(&self) -> Result<(), FlowHashError> {
        if !self.bucket_count.is_power_of_two() || self.bucket_count < 2 {
            return Err(FlowHashError::InvalidConfig {
                reason: format!("桶数量必须是不小于2的2的幂: {}", self.bucket_count),
            });
        }
        if self.slots_per_bucket == 0 || self.slots_per_bucket > MAX_SLOTS_PER_BUCKET {
            return Err(FlowHashError::InvalidConfig {
                reason: format!(
                    "每桶槽位数必须在1..={}: {}",
                    MAX_SLOTS_PER_BUCKET, self.slots_per_bucket
                ),
            });
        }
        if self.key_len == 0 || self.key_len > MAX_KEY_LEN {
            return Err(FlowHashError::InvalidConfig {
                reason: format!("键长度必须在1..={}: {}", MAX_KEY_LEN, self.key_len),
            });
        }
        if self.data_len > MAX_DATA_LEN {
            return Err(FlowHashError::InvalidConfig {
                reason: format!("数据长度不能超过{}: {}", MAX_DATA_LEN, self.data_len),
            });
        }
        if self.max_displacement_depth == 0 || self.max_displacement_depth > 16 {
            return Err(FlowHashError::InvalidConfig {
                reason: format!("踢出深度必须在1..=16: {}", self.max_displacement_depth),
            });
        }
        if self.bucket_count * self.slots_per_bucket > u32::MAX as usize {
            return Err(FlowHashError::InvalidConfig {
                reason: "总槽位数超出u32索引范围".into(),
            });
        }
        Ok(())
    }
}

/// Cuckoo哈希表
pub struct CuckooTable {
    config: TableConfig,
    hasher: TableHasher,
    buckets: BucketArray,
    store: KeySlotStore,
    free_list: Arc<FreeList>,
    reclaim: ReclamationClient,
    ctrl: ConcurrencyController,
    stats: TableStats,
    size: AtomicUsize,
}

impl CuckooTable {
    /// 创建新哈希表
    pub fn new(config: TableConfig) -> Result<Self, FlowHashError> {
        config.validate()?;

        let seed = config.seed.unwrap_or_else(rand::random);
        let slot_count = (config.bucket_count * config.slots_per_bucket) as u32;
        let free_list = Arc::new(FreeList::new(slot_count));

        Ok(Self {
            hasher: TableHasher::new(config.hash_algorithm, seed),
            buckets: BucketArray::new(config.bucket_count, config.slots_per_bucket),
            store: KeySlotStore::new(slot_count as usize, config.key_len, config.data_len),
            reclaim: ReclamationClient::new(Arc::clone(&free_list), config.concurrency_mode),
            ctrl: ConcurrencyController::new(config.concurrency_mode, config.bucket_count),
            free_list,
            stats: TableStats::new(),
            size: AtomicUsize::new(0),
            config,
        })
    }

    /// 键定位：签名、备用标签、两个候选桶
    fn locate(&self, key: &[u8]) -> (Signature, u16, usize, usize) {
        let hash = self.hasher.hash_key(key);
        let signature = Signature::from_hash(hash);
        let alt_tag = alt_tag_of(signature);
        let mask = self.buckets.bucket_mask();
        let primary = primary_bucket(hash, mask) as usize;
        let alternate = partner_bucket(primary as u32, alt_tag, mask) as usize;
        (signature, alt_tag, primary, alternate)
    }

    fn check_key(&self, key: &[u8]) -> Result<(), FlowHashError> {
        if key.len() > self.config.key_len {
            return Err(FlowHashError::KeyTooLong {
                len: key.len(),
                max: self.config.key_len,
            });
        }
        if key.len() != self.config.key_len {
            return Err(FlowHashError::InvalidParam {
                reason: format!("键长度{}与建表key_len {}不符", key.len(), self.config.key_len),
            });
        }
        Ok(())
    }

    fn check_data(&self, data: &[u8]) -> Result<(), FlowHashError> {
        if data.len() != self.config.data_len {
            return Err(FlowHashError::InvalidParam {
                reason: format!(
                    "数据长度{}与建表data_len {}不符",
                    data.len(),
                    self.config.data_len
                ),
            });
        }
        Ok(())
    }

    fn table_full(&self) -> FlowHashError {
        FlowHashError::TableFull {
            capacity: self.capacity(),
            size: self.len(),
            load_factor: self.load_factor(),
        }
    }

    /// 在两个候选桶里找已存在的键（调用方须持有桶对锁）
    fn find_existing(
        &self,
        primary: usize,
        alternate: usize,
        signature: Signature,
        key: &[u8],
    ) -> Option<(usize, usize, SlotEntry)> {
        for &bucket in &[primary, alternate] {
            for (slot, entry) in self.buckets.find_signature(bucket, signature) {
                if self.store.key_eq(entry.key_index, key) {
                    return Some((bucket, slot, entry));
                }
            }
        }
        None
    }

    /// 在写版本窗口内发布条目
    fn publish(&self, bucket: usize, slot: usize, signature: Signature, alt_tag: u16, index: u32) {
        self.ctrl.write_begin(bucket);
        self.buckets.store(
            bucket,
            slot,
            SlotEntry {
                signature,
                alt_tag,
                key_index: index,
            },
        );
        self.ctrl.write_end(bucket);
    }

    /// 从空闲链表分配键槽；耗尽时先推回收器再判表满
    fn alloc_slot(&self) -> Result<u32, FlowHashError> {
        if let Some(index) = self.free_list.pop() {
            return Ok(index);
        }
        if self.ctrl.mode().defers_reclamation() {
            self.reclaim.nudge_collector();
            if let Some(index) = self.free_list.pop() {
                return Ok(index);
            }
        }
        Err(self.table_full())
    }

    /// 插入键值对，返回键槽索引
    ///
    /// 键已存在时按DuplicatePolicy处理；两个候选桶都满时触发
    /// 踢出搜索，深度上限内无增广路径返回TableFull。
    pub fn insert(&self, key: &[u8], data: &[u8]) -> Result<u32, FlowHashError> {
        self.check_key(key)?;
        self.check_data(data)?;
        let (signature, alt_tag, primary, alternate) = self.locate(key);

        for _attempt in 0..MAX_INSERT_ATTEMPTS {
            {
                let _guard = self.ctrl.lock_pair(primary, alternate);

                if let Some((bucket, _slot, entry)) =
                    self.find_existing(primary, alternate, signature, key)
                {
                    return match self.config.duplicate_policy {
                        DuplicatePolicy::Reject => {
                            self.stats.note_insert_failure();
                            Err(FlowHashError::KeyAlreadyExists)
                        }
                        DuplicatePolicy::Update => {
                            self.ctrl.write_begin(bucket);
                            self.store.write_data(entry.key_index, data);
                            self.ctrl.write_end(bucket);
                            self.stats.note_insert();
                            Ok(entry.key_index)
                        }
                    };
                }

                for &bucket in &[primary, alternate] {
                    if let Some(slot) = self.buckets.find_empty(bucket) {
                        let index = match self.alloc_slot() {
                            Ok(index) => index,
                            Err(err) => {
                                self.stats.note_insert_failure();
                                return Err(err);
                            }
                        };
                        // 键值先落仓库，条目发布后才对读者可达
                        self.store.write_record(index, key, data);
                        self.publish(bucket, slot, signature, alt_tag, index);
                        self.size.fetch_add(1, Ordering::Relaxed);
                        self.stats.note_insert();
                        return Ok(index);
                    }
                }
            } // 踢出搜索前释放桶对锁，搬移按自己的桶对逐步加锁

            match displace::find_path(
                &self.buckets,
                [primary, alternate],
                self.config.max_displacement_depth,
            ) {
                None => {
                    self.stats.note_insert_failure();
                    log_warn!(
                        "踢出搜索无增广路径: primary={}, alternate={}, 负载因子={:.3}",
                        primary,
                        alternate,
                        self.load_factor()
                    );
                    return Err(self.table_full());
                }
                Some(path) => match displace::apply_path(&self.buckets, &self.ctrl, &path) {
                    Ok(()) => {
                        self.stats.note_displacements(path.moves.len() as u64);
                        log_debug!(
                            "踢出路径应用成功: {}步, root桶={}",
                            path.moves.len(),
                            path.root_bucket
                        );
                    }
                    Err(err) if err.should_retry() => {
                        self.stats.note_path_retry();
                    }
                    Err(err) => return Err(err),
                },
            }
        }

        self.stats.note_insert_failure();
        Err(self.table_full())
    }

    /// 序列锁保护下扫描单个桶
    fn scan_bucket(&self, bucket: usize, signature: Signature, key: &[u8]) -> Option<(u32, Vec<u8>)> {
        loop {
            let snapshot = self.ctrl.read_begin(bucket);
            let mut result = None;
            for slot in 0..self.buckets.slots_per_bucket() {
                if let Some(entry) = self.buckets.load(bucket, slot) {
                    if entry.signature == signature && self.store.key_eq(entry.key_index, key) {
                        result = Some((entry.key_index, self.store.read_data(entry.key_index)));
                        break;
                    }
                }
            }
            if self.ctrl.read_validate(bucket, snapshot) {
                return result;
            }
            self.stats.note_seqlock_retry();
        }
    }

    /// 查询键对应的数据
    ///
    /// 纯读路径：序列锁重试加搬移计数重扫，从不阻塞。
    pub fn lookup(&self, key: &[u8]) -> Result<Vec<u8>, FlowHashError> {
        self.check_key(key)?;
        let (signature, _alt_tag, primary, alternate) = self.locate(key);
        let _epoch_guard = self.reclaim.pin();

        loop {
            let relocation_epoch = self.ctrl.relocation_epoch();

            if let Some((_, data)) = self.scan_bucket(primary, signature, key) {
                self.stats.note_lookup(true);
                return Ok(data);
            }
            if let Some((_, data)) = self.scan_bucket(alternate, signature, key) {
                self.stats.note_lookup(true);
                return Ok(data);
            }

            if self.ctrl.relocation_epoch() == relocation_epoch {
                self.stats.note_lookup(false);
                return Err(FlowHashError::KeyNotFound);
            }
            // 扫描期间有条目跨桶搬移，键可能正好转移到已扫过的桶，重扫
            self.stats.note_seqlock_retry();
        }
    }

    /// 批量查询 - 逐键语义与lookup一致，大批次在全局线程池上并行
    pub fn lookup_bulk(&self, keys: &[&[u8]]) -> Vec<Result<Vec<u8>, FlowHashError>> {
        if keys.len() >= BULK_PARALLEL_THRESHOLD {
            BULK_THREAD_POOL.install(|| keys.par_iter().map(|key| self.lookup(key)).collect())
        } else {
            keys.iter().map(|key| self.lookup(key)).collect()
        }
    }

    /// 删除键，返回其键槽索引
    ///
    /// 并发模式下腾空的键槽交给回收客户端延迟归还。
    pub fn delete(&self, key: &[u8]) -> Result<u32, FlowHashError> {
        self.check_key(key)?;
        let (signature, _alt_tag, primary, alternate) = self.locate(key);
        let guard = self.ctrl.lock_pair(primary, alternate);

        if let Some((bucket, slot, entry)) = self.find_existing(primary, alternate, signature, key)
        {
            self.ctrl.write_begin(bucket);
            self.buckets.clear(bucket, slot);
            self.ctrl.write_end(bucket);
            self.size.fetch_sub(1, Ordering::Relaxed);
            drop(guard);

            self.reclaim.retire(entry.key_index);
            self.stats.note_delete();
            return Ok(entry.key_index);
        }

        drop(guard);
        Err(FlowHashError::KeyNotFound)
    }

    /// 游标迭代 - 从cursor=0可重启；并发修改期间搬移的条目可能被
    /// 跳过或重复，但绝不会返回已回收槽位的陈旧字节（epoch guard
    /// 保证读取期间槽位不被复用）。
    pub fn iterate(&self, cursor: &mut usize) -> Option<(Vec<u8>, Vec<u8>)> {
        let total = self.buckets.total_slots();
        let slots_per_bucket = self.buckets.slots_per_bucket();
        let _epoch_guard = self.reclaim.pin();

        while *cursor < total {
            let bucket = *cursor / slots_per_bucket;
            let slot = *cursor % slots_per_bucket;
            *cursor += 1;

            loop {
                let snapshot = self.ctrl.read_begin(bucket);
                let copied = self.buckets.load(bucket, slot).map(|entry| {
                    (
                        self.store.read_key(entry.key_index),
                        self.store.read_data(entry.key_index),
                    )
                });
                if self.ctrl.read_validate(bucket, snapshot) {
                    if let Some(kv) = copied {
                        return Some(kv);
                    }
                    break;
                }
                self.stats.note_seqlock_retry();
            }
        }
        None
    }

    /// 迭代器适配
    pub fn iter(&self) -> CuckooTableIter<'_> {
        CuckooTableIter {
            table: self,
            cursor: 0,
        }
    }

    /// 清空所有条目
    ///
    /// 任何模式下都立即归还全部键槽；调用方保证没有并发读者。
    pub fn reset(&self) {
        self.buckets.clear_all();
        self.free_list.refill(self.store.slot_count() as u32);
        self.size.store(0, Ordering::Release);
        self.stats.note_reset();
        log_debug!("表已清空: capacity={}", self.capacity());
    }

    /// 当前条目数
    pub fn len(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 总容量（桶数 × 每桶槽位数）
    pub fn capacity(&self) -> usize {
        self.buckets.total_slots()
    }

    /// 当前负载因子
    pub fn load_factor(&self) -> f32 {
        self.len() as f32 / self.capacity() as f32
    }

    /// 配置
    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// 统计快照
    pub fn stats(&self) -> TableStatsSnapshot {
        self.stats.snapshot()
    }

    /// 导出Prometheus格式指标
    pub fn export_prometheus(&self) -> String {
        self.stats.export_prometheus()
    }
}

impl fmt::Debug for CuckooTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CuckooTable")
            .field("size", &self.len())
            .field("capacity", &self.capacity())
            .field("load_factor", &self.load_factor())
            .field("mode", &self.config.concurrency_mode)
            .finish()
    }
}

/// 表迭代器
pub struct CuckooTableIter<'a> {
    table: &'a CuckooTable,
    cursor: usize,
}

impl<'a> Iterator for CuckooTableIter<'a> {
    type Item = (Vec<u8>, Vec<u8>);

    fn next(&mut self) -> Option<Self::Item> {
        self.table.iterate(&mut self.cursor)
    }
}
