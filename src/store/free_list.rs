//! 空闲槽位链表 - 有序的未用键槽索引队列
//!
//! 插入从队头弹出，释放推到队尾。队列带代数计数：reset会使所有
//! 在途的延迟释放作废，避免重建后的队列被旧回收推入重复索引。

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

/// 空闲链表
#[derive(Debug)]
pub struct FreeList {
    inner: Mutex<VecDeque<u32>>,
    generation: AtomicU64,
}

impl FreeList {
    /// 创建并填满 0..slot_count 的空闲索引
    pub fn new(slot_count: u32) -> Self {
        Self {
            inner: Mutex::new((0..slot_count).collect()),
            generation: AtomicU64::new(0),
        }
    }

    /// 弹出一个空闲索引
    pub fn pop(&self) -> Option<u32> {
        self.inner.lock().pop_front()
    }

    /// 立即归还索引（非并发模式或插入回滚）
    pub fn push(&self, index: u32) {
        self.inner.lock().push_back(index);
    }

    /// 当前代数 - 延迟释放在retire时快照
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// 延迟归还：仅当代数未变时入队，reset之后的旧回收被丢弃
    pub fn push_deferred(&self, index: u32, generation: u64) {
        let mut queue = self.inner.lock();
        if self.generation.load(Ordering::Acquire) == generation {
            queue.push_back(index);
        }
    }

    /// 重建链表：换代并重新填满所有索引
    pub fn refill(&self, slot_count: u32) {
        let mut queue = self.inner.lock();
        self.generation.fetch_add(1, Ordering::AcqRel);
        queue.clear();
        queue.extend(0..slot_count);
    }

    /// 空闲数量（诊断用）
    pub fn available(&self) -> usize {
        self.inner.lock().len()
    }
}

// 单元测试
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_order_is_fifo() {
        let list = FreeList::new(4);
        assert_eq!(list.pop(), Some(0));
        assert_eq!(list.pop(), Some(1));
        list.push(0);
        // 归还的索引排在队尾
        assert_eq!(list.pop(), Some(2));
        assert_eq!(list.pop(), Some(3));
        assert_eq!(list.pop(), Some(0));
        assert_eq!(list.pop(), None);
    }

    #[test]
    fn test_deferred_push_same_generation() {
        let list = FreeList::new(2);
        let generation = list.generation();
        list.pop();
        list.pop();
        list.push_deferred(0, generation);
        assert_eq!(list.available(), 1);
    }

    #[test]
    fn test_deferred_push_stale_generation_dropped() {
        let list = FreeList::new(2);
        let stale = list.generation();
        list.pop();
        list.refill(2);
        list.push_deferred(0, stale);
        // 旧代的延迟释放被丢弃，不会出现重复索引
        assert_eq!(list.available(), 2);
    }

    #[test]
    fn test_refill_restores_all() {
        let list = FreeList::new(8);
        for _ in 0..8 {
            list.pop();
        }
        assert_eq!(list.available(), 0);
        list.refill(8);
        assert_eq!(list.available(), 8);
    }
}
