//! 核心类型定义 - 共享类型和接口

use core::fmt;
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicU64, Ordering};

/// 每个桶的槽位数上限（条目打包格式允许的范围内）
pub const MAX_SLOTS_PER_BUCKET: usize = 8;

/// 键长度上限（字节）
pub const MAX_KEY_LEN: usize = 64;

/// 附加数据长度上限（字节）
pub const MAX_DATA_LEN: usize = 128;

/// 签名类型 - 16位哈希派生标签
///
/// 签名只是概率性过滤器：签名相同不代表键相同，命中后必须
/// 在键槽存储中做完整键比较。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Signature(u16);

impl Signature {
    /// 创建新签名
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// 从64位哈希值派生签名（取高位，与主桶索引位不重叠）
    pub const fn from_hash(hash: u64) -> Self {
        Self((hash >> 16) as u16)
    }

    /// 获取签名值
    pub const fn as_u16(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}", self.0)
    }
}

/// 桶内条目 - 解包后的槽位内容
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotEntry {
    /// 条目键的签名
    pub signature: Signature,
    /// 备用桶标签：`partner = bucket ^ alt_tag`，无需重新哈希即可定位另一个候选桶
    pub alt_tag: u16,
    /// 键槽存储索引
    pub key_index: u32,
}

/// 原子条目 - 单个64位字打包 签名(16) | 备用标签(16) | 键槽索引+1(32)
///
/// 0 表示空槽位；键槽索引加一存储，使合法的索引0不会与空槽位混淆。
/// 单字发布保证读者看到的签名/标签/索引永远来自同一个条目。
#[repr(transparent)]
#[derive(Debug)]
pub struct AtomicEntry(AtomicU64);

impl AtomicEntry {
    /// 打包条目为64位整数
    fn pack_entry(entry: SlotEntry) -> u64 {
        ((entry.signature.as_u16() as u64) << 48)
            | ((entry.alt_tag as u64) << 32)
            | (entry.key_index as u64 + 1)
    }

    /// 从64位整数解包条目
    fn unpack_entry(packed: u64) -> Option<SlotEntry> {
        if packed == 0 {
            return None;
        }
        Some(SlotEntry {
            signature: Signature::new((packed >> 48) as u16),
            alt_tag: ((packed >> 32) & 0xFFFF) as u16,
            key_index: ((packed & 0xFFFF_FFFF) - 1) as u32,
        })
    }

    /// 创建空条目
    pub const fn empty() -> Self {
        Self(AtomicU64::new(0))
    }

    /// 加载条目（空槽位返回None）
    pub fn load(&self, order: Ordering) -> Option<SlotEntry> {
        Self::unpack_entry(self.0.load(order))
    }

    /// 加载原始打包字（用于踢出路径的快照校验）
    pub fn load_raw(&self, order: Ordering) -> u64 {
        self.0.load(order)
    }

    /// 发布条目
    pub fn store(&self, entry: SlotEntry, order: Ordering) {
        self.0.store(Self::pack_entry(entry), order);
    }

    /// 发布原始打包字
    pub fn store_raw(&self, packed: u64, order: Ordering) {
        self.0.store(packed, order);
    }

    /// 清空槽位
    pub fn clear(&self, order: Ordering) {
        self.0.store(0, order);
    }

    /// 检查槽位是否为空
    pub fn is_empty(&self, order: Ordering) -> bool {
        self.0.load(order) == 0
    }

    /// 打包条目为原始字（不触及原子状态）
    pub fn pack(entry: SlotEntry) -> u64 {
        Self::pack_entry(entry)
    }

    /// 从原始字解包条目
    pub fn unpack(packed: u64) -> Option<SlotEntry> {
        Self::unpack_entry(packed)
    }
}

/// 并发模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcurrencyMode {
    /// 无并发保护：调用方保证同一时刻只有一个写入者，删除立即回收槽位
    None,
    /// 读写并发：写入者按桶对加锁，读者走序列锁重试协议，删除延迟回收
    ReaderWriter,
    /// 事务内存模式：获取点预留给硬件事务，当前构建始终走锁回退路径
    Transactional,
}

impl ConcurrencyMode {
    /// 是否需要写入者互斥
    pub fn needs_writer_lock(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// 删除的槽位是否需要延迟回收
    pub fn defers_reclamation(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// 重复键策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// 插入已存在的键返回 KeyAlreadyExists
    Reject,
    /// 插入已存在的键原地更新数据
    Update,
}

/// 批量查询并行线程池
///
/// 懒初始化的全局池，batch较大时 lookup_bulk 在其上并行执行。
pub static BULK_THREAD_POOL: Lazy<rayon::ThreadPool> = Lazy::new(|| {
    rayon::ThreadPoolBuilder::new()
        .num_threads(4)
        .thread_name(|i| format!("flowhash-bulk-{}", i))
        .build()
        .expect("批量查询线程池初始化失败")
});
