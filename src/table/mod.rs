//! 哈希表模块 - 桶数组、踢出引擎与公共操作

pub mod bucket;
pub mod displace;
pub mod hash_table;

pub use bucket::BucketArray;
pub use hash_table::{CuckooTable, CuckooTableIter, TableConfig};

/// 默认每桶槽位数
pub const DEFAULT_SLOTS_PER_BUCKET: usize = 4;

/// 默认踢出搜索深度
pub const DEFAULT_DISPLACEMENT_DEPTH: usize = 3;
