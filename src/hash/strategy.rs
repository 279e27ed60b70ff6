//! 哈希策略 - 按算法和种子构建键哈希函数

use ahash::RandomState;
use std::{
    hash::{BuildHasher, Hash, Hasher},
    sync::Arc,
};

/// 哈希算法选择
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    /// AHash（默认）
    AHash,
    /// XxHash64
    XxHash,
    /// 标准库 DefaultHasher
    Default,
}

/// 哈希函数特征 - 键字节序列到64位哈希的确定性映射，无副作用
pub trait HasherFunction: Send + Sync {
    fn hash_bytes(&self, data: &[u8]) -> u64;
}

impl<F> HasherFunction for F
where
    F: Fn(&[u8]) -> u64 + Send + Sync,
{
    fn hash_bytes(&self, data: &[u8]) -> u64 {
        self(data)
    }
}

/// 构建哈希函数
pub fn build_hasher(algorithm: HashAlgorithm, seed: u64) -> Arc<dyn HasherFunction> {
    match algorithm {
        HashAlgorithm::AHash => {
            let state = RandomState::with_seed(seed as usize);
            Arc::new(move |data: &[u8]| {
                let mut hasher = state.build_hasher();
                data.hash(&mut hasher);
                hasher.finish()
            })
        }
        HashAlgorithm::XxHash => Arc::new(move |data: &[u8]| {
            let mut hasher = twox_hash::XxHash64::with_seed(seed);
            data.hash(&mut hasher);
            hasher.finish()
        }),
        HashAlgorithm::Default => Arc::new(|data: &[u8]| {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            data.hash(&mut hasher);
            hasher.finish()
        }),
    }
}

/// 表哈希器 - 建表时固定的算法+种子组合
#[derive(Clone)]
pub struct TableHasher {
    inner: Arc<dyn HasherFunction>,
    algorithm: HashAlgorithm,
    seed: u64,
}

impl TableHasher {
    /// 创建新表哈希器
    pub fn new(algorithm: HashAlgorithm, seed: u64) -> Self {
        Self {
            inner: build_hasher(algorithm, seed),
            algorithm,
            seed,
        }
    }

    /// 计算键哈希
    pub fn hash_key(&self, key: &[u8]) -> u64 {
        self.inner.hash_bytes(key)
    }

    /// 算法
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// 种子
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl std::fmt::Debug for TableHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableHasher")
            .field("algorithm", &self.algorithm)
            .field("seed", &self.seed)
            .finish()
    }
}
