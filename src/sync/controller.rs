//! 并发控制器 - 写入者桶对互斥与搬移计数
//!
//! 写入者按桶对加锁（恒按索引升序获取，避免死锁），每次操作
//! 最多持有一对锁，不同桶对可以并行。读者不经过这里的锁，只走
//! 序列锁协议；跨桶搬移额外递增全局搬移计数，双桶都未命中的
//! 读者据此判断是否需要重扫，防止搬移中的键被漏判为不存在。

use crate::{
    sync::seqlock::BucketVersions,
    types::ConcurrencyMode,
};
use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicU32, Ordering};

/// 桶锁 - 缓存行对齐，避免相邻桶锁伪共享
#[repr(align(64))]
#[derive(Debug, Default)]
struct BucketLock {
    lock: Mutex<()>,
}

/// 桶对写锁保护器
#[derive(Debug)]
pub enum PairGuard<'a> {
    /// 无并发模式：不持有任何锁
    Unlocked,
    /// 两个候选桶落在同一个桶上
    One(MutexGuard<'a, ()>),
    /// 常规：两把桶锁按索引升序持有
    Two(MutexGuard<'a, ()>, MutexGuard<'a, ()>),
}

/// 并发控制器
#[derive(Debug)]
pub struct ConcurrencyController {
    mode: ConcurrencyMode,
    versions: BucketVersions,
    locks: Box<[BucketLock]>,
    /// 跨桶搬移计数，双桶未命中的读者据此决定是否重扫
    relocations: AtomicU32,
}

impl ConcurrencyController {
    /// 创建新控制器
    pub fn new(mode: ConcurrencyMode, bucket_count: usize) -> Self {
        let lock_count = if mode.needs_writer_lock() {
            bucket_count
        } else {
            0
        };
        let locks = (0..lock_count)
            .map(|_| BucketLock::default())
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            mode,
            versions: BucketVersions::new(bucket_count),
            locks,
            relocations: AtomicU32::new(0),
        }
    }

    /// 并发模式
    pub fn mode(&self) -> ConcurrencyMode {
        self.mode
    }

    /// 获取桶对写锁
    ///
    /// Transactional模式：硬件事务的获取点在这里；可移植构建
    /// 没有可用的HTM原语，始终走协议允许的锁回退路径。
    pub fn lock_pair(&self, a: usize, b: usize) -> PairGuard<'_> {
        if !self.mode.needs_writer_lock() {
            return PairGuard::Unlocked;
        }

        if a == b {
            return PairGuard::One(self.locks[a].lock.lock());
        }

        let (low, high) = if a < b { (a, b) } else { (b, a) };
        let first = self.locks[low].lock.lock();
        let second = self.locks[high].lock.lock();
        PairGuard::Two(first, second)
    }

    /// 开始读操作
    pub fn read_begin(&self, bucket: usize) -> u32 {
        self.versions.read_begin(bucket)
    }

    /// 校验读快照
    pub fn read_validate(&self, bucket: usize, snapshot: u32) -> bool {
        self.versions.read_validate(bucket, snapshot)
    }

    /// 开始结构修改（须持有对应桶锁）
    pub fn write_begin(&self, bucket: usize) {
        self.versions.write_begin(bucket);
    }

    /// 结束结构修改
    pub fn write_end(&self, bucket: usize) {
        self.versions.write_end(bucket);
    }

    /// 当前搬移计数
    pub fn relocation_epoch(&self) -> u32 {
        self.relocations.load(Ordering::Acquire)
    }

    /// 记录一次跨桶搬移（在源桶清空之前递增）
    pub fn note_relocation(&self) {
        self.relocations.fetch_add(1, Ordering::Release);
    }
}

// 单元测试
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_unlocked_mode() {
        let ctrl = ConcurrencyController::new(ConcurrencyMode::None, 8);
        assert!(matches!(ctrl.lock_pair(0, 5), PairGuard::Unlocked));
    }

    #[test]
    fn test_same_bucket_single_lock() {
        let ctrl = ConcurrencyController::new(ConcurrencyMode::ReaderWriter, 8);
        let guard = ctrl.lock_pair(3, 3);
        assert!(matches!(guard, PairGuard::One(_)));
    }

    #[test]
    fn test_pair_excludes_overlapping_pair() {
        let ctrl = Arc::new(ConcurrencyController::new(ConcurrencyMode::ReaderWriter, 8));
        let guard = ctrl.lock_pair(2, 5);

        let blocked = {
            let ctrl = Arc::clone(&ctrl);
            thread::spawn(move || {
                // 与(2,5)共享桶5，必须等待
                let _guard = ctrl.lock_pair(5, 7);
            })
        };

        thread::sleep(std::time::Duration::from_millis(20));
        assert!(!blocked.is_finished(), "重叠桶对不应并发持锁");

        drop(guard);
        blocked.join().unwrap();
    }

    #[test]
    fn test_disjoint_pairs_parallel() {
        let ctrl = Arc::new(ConcurrencyController::new(ConcurrencyMode::ReaderWriter, 8));
        let _guard = ctrl.lock_pair(0, 1);

        let other = {
            let ctrl = Arc::clone(&ctrl);
            thread::spawn(move || {
                let _guard = ctrl.lock_pair(6, 7);
            })
        };
        other.join().unwrap();
    }

    #[test]
    fn test_lock_order_prevents_deadlock() {
        let ctrl = Arc::new(ConcurrencyController::new(ConcurrencyMode::ReaderWriter, 16));
        let mut handles = Vec::new();

        // 两个线程以相反的参数顺序反复锁同一对桶
        for &(a, b) in &[(3usize, 9usize), (9, 3)] {
            let ctrl = Arc::clone(&ctrl);
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    let _guard = ctrl.lock_pair(a, b);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_relocation_counter() {
        let ctrl = ConcurrencyController::new(ConcurrencyMode::ReaderWriter, 4);
        let before = ctrl.relocation_epoch();
        ctrl.note_relocation();
        assert_eq!(ctrl.relocation_epoch(), before + 1);
    }

    #[test]
    fn test_transactional_falls_back_to_lock() {
        let ctrl = ConcurrencyController::new(ConcurrencyMode::Transactional, 4);
        let guard = ctrl.lock_pair(0, 2);
        assert!(matches!(guard, PairGuard::Two(_, _)));
    }
}
