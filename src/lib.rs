//! Rust并发Cuckoo哈希索引库
//!
//! 提供固定容量、多读多写的键值索引，面向流表、会话表等定长键
//! 场景。读路径基于序列锁完全无阻塞，写路径按桶对加锁，满桶
//! 插入走有界BFS踢出搜索，删除槽位经epoch延迟回收。
//!
//! ## 主要特性
//! - 读路径无锁（序列锁+搬移计数重扫）
//! - 桶对细粒度写锁，按索引升序获取，无死锁
//! - 16位签名过滤，绝大多数槽位比较不触碰键字节
//! - 可插拔哈希算法与可复现种子
//!
//! ## 快速开始
//!
//! ```rust
//! use flowhash::{CuckooTable, TableConfig};
//!
//! let table = CuckooTable::new(TableConfig {
//!     key_len: 4,
//!     data_len: 8,
//!     ..TableConfig::default()
//! }).unwrap();
//!
//! table.insert(b"key1", b"value_01").unwrap();
//! assert_eq!(table.lookup(b"key1").unwrap(), b"value_01");
//! table.delete(b"key1").unwrap();
//! ```

#![warn(clippy::all)]
#[cfg(feature = "logging")]
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        log::debug!($($arg)*)
    };
}

#[cfg(feature = "logging")]
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        log::info!($($arg)*)
    };
}

#[cfg(feature = "logging")]
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        log::warn!($($arg)*)
    };
}

#[cfg(feature = "logging")]
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        log::error!($($arg)*)
    };
}

#[cfg(not(feature = "logging"))]
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "logging"))]
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "logging"))]
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "logging"))]
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {};
}
// 核心模块导出
pub mod error;
pub mod hash;
pub mod stats;
pub mod store;
pub mod sync;
pub mod table;
pub mod types;

// 公共接口导出
pub use crate::{
    error::FlowHashError,
    hash::{HashAlgorithm, HasherFunction, TableHasher},
    stats::{TableStats, TableStatsSnapshot},
    store::{FreeList, KeySlotStore, ReclamationClient},
    sync::{BucketVersions, ConcurrencyController, PairGuard},
    table::{
        CuckooTable, CuckooTableIter, TableConfig, DEFAULT_DISPLACEMENT_DEPTH,
        DEFAULT_SLOTS_PER_BUCKET,
    },
    types::{
        ConcurrencyMode, DuplicatePolicy, Signature, SlotEntry, MAX_DATA_LEN, MAX_KEY_LEN,
        MAX_SLOTS_PER_BUCKET,
    },
};
