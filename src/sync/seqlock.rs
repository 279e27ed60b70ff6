//! 桶版本序列锁 - 无锁读操作检测并发修改
//!
//! 每个桶一个版本计数器：奇数表示结构修改进行中，偶数表示稳定。
//! 读者快照版本、执行扫描、再校验版本；不匹配则丢弃重扫。
//! 读者永不阻塞，只做有界自旋重试。

use std::sync::atomic::{fence, AtomicU32, Ordering};

/// 单次快照内的自旋上限，超过后让出CPU再取新快照
const READ_SPIN_LIMIT: usize = 64;

/// 桶版本数组
#[derive(Debug)]
pub struct BucketVersions {
    versions: Box<[AtomicU32]>,
}

impl BucketVersions {
    /// 创建新版本数组（全部初始化为稳定版本0）
    pub fn new(bucket_count: usize) -> Self {
        let versions = (0..bucket_count)
            .map(|_| AtomicU32::new(0))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self { versions }
    }

    /// 开始读操作 - 返回稳定（偶数）版本快照
    pub fn read_begin(&self, bucket: usize) -> u32 {
        let mut spins = 0;
        loop {
            let version = self.versions[bucket].load(Ordering::Acquire);
            if version & 1 == 0 {
                return version;
            }
            spins += 1;
            if spins >= READ_SPIN_LIMIT {
                std::thread::yield_now();
                spins = 0;
            } else {
                std::hint::spin_loop();
            }
        }
    }

    /// 校验读操作期间版本未变
    pub fn read_validate(&self, bucket: usize, snapshot: u32) -> bool {
        // 防止条目/数据读取被重排到版本校验之后
        fence(Ordering::Acquire);
        self.versions[bucket].load(Ordering::Relaxed) == snapshot
    }

    /// 开始结构修改 - 版本置为奇数
    ///
    /// 调用方必须已持有该桶的写锁（或处于无并发模式）。
    pub fn write_begin(&self, bucket: usize) {
        let old = self.versions[bucket].fetch_add(1, Ordering::AcqRel);
        debug_assert!(old & 1 == 0, "write_begin时版本应为偶数");
    }

    /// 结束结构修改 - 版本回到偶数
    pub fn write_end(&self, bucket: usize) {
        let old = self.versions[bucket].fetch_add(1, Ordering::Release);
        debug_assert!(old & 1 == 1, "write_end时版本应为奇数");
    }

    /// 当前版本（诊断用）
    pub fn current(&self, bucket: usize) -> u32 {
        self.versions[bucket].load(Ordering::Acquire)
    }

    /// 桶数量
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

// 单元测试
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_read_validate_stable() {
        let versions = BucketVersions::new(4);
        let snap = versions.read_begin(2);
        assert_eq!(snap, 0);
        assert!(versions.read_validate(2, snap));
    }

    #[test]
    fn test_write_invalidates_reader() {
        let versions = BucketVersions::new(4);
        let snap = versions.read_begin(1);

        versions.write_begin(1);
        versions.write_end(1);

        assert!(!versions.read_validate(1, snap));

        // 新快照应重新生效
        let snap = versions.read_begin(1);
        assert_eq!(snap, 2);
        assert!(versions.read_validate(1, snap));
    }

    #[test]
    fn test_buckets_independent() {
        let versions = BucketVersions::new(4);
        let snap = versions.read_begin(0);
        versions.write_begin(3);
        versions.write_end(3);
        assert!(versions.read_validate(0, snap), "其他桶的修改不应影响本桶读者");
    }

    #[test]
    fn test_reader_skips_odd_version() {
        let versions = Arc::new(BucketVersions::new(1));
        versions.write_begin(0);

        let reader = {
            let versions = Arc::clone(&versions);
            thread::spawn(move || versions.read_begin(0))
        };

        // 读者应自旋直到版本回到偶数
        thread::sleep(std::time::Duration::from_millis(20));
        versions.write_end(0);

        let snap = reader.join().unwrap();
        assert_eq!(snap & 1, 0);
        assert_eq!(snap, 2);
    }
}
