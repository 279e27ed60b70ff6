//! 哈希模块 - 可插拔哈希函数与签名/候选桶推导

pub mod signature;
pub mod strategy;

pub use signature::{alt_tag_of, partner_bucket, primary_bucket};
pub use strategy::{build_hasher, HashAlgorithm, HasherFunction, TableHasher};
