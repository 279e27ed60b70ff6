//! 并发控制模块 - 序列锁读协议与桶对写锁

pub mod controller;
pub mod seqlock;

pub use controller::{ConcurrencyController, PairGuard};
pub use seqlock::BucketVersions;
