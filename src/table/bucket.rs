// src/table/bucket.rs
//! 桶数组 - 固定宽度的签名/键槽索引条目组
//!
//! 所有桶的条目放在一个扁平原子字数组里，桶b的槽位s在
//! `b * slots_per_bucket + s`。条目本身是单个64位打包字，
//! 发布和清空都是一次原子store，配合桶版本序列锁对读者可见。

use crate::types::{AtomicEntry, Signature, SlotEntry};
use std::sync::atomic::Ordering;

/// 桶数组
#[derive(Debug)]
pub struct BucketArray {
    entries: Box<[AtomicEntry]>,
    bucket_count: usize,
    slots_per_bucket: usize,
    bucket_mask: u32,
}

impl BucketArray {
    /// 创建新桶数组（bucket_count必须是2的幂）
    pub fn new(bucket_count: usize, slots_per_bucket: usize) -> Self {
        debug_assert!(bucket_count.is_power_of_two());
        let entries = (0..bucket_count * slots_per_bucket)
            .map(|_| AtomicEntry::empty())
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            entries,
            bucket_count,
            slots_per_bucket,
            bucket_mask: (bucket_count - 1) as u32,
        }
    }

    /// 桶数量
    pub fn bucket_count(&self) -> usize {
        self.bucket_count
    }

    /// 每桶槽位数
    pub fn slots_per_bucket(&self) -> usize {
        self.slots_per_bucket
    }

    /// 桶掩码（桶数-1）
    pub fn bucket_mask(&self) -> u32 {
        self.bucket_mask
    }

    /// 总槽位数
    pub fn total_slots(&self) -> usize {
        self.entries.len()
    }

    fn entry_at(&self, bucket: usize, slot: usize) -> &AtomicEntry {
        debug_assert!(bucket < self.bucket_count);
        debug_assert!(slot < self.slots_per_bucket);
        &self.entries[bucket * self.slots_per_bucket + slot]
    }

    /// 加载条目
    pub fn load(&self, bucket: usize, slot: usize) -> Option<SlotEntry> {
        self.entry_at(bucket, slot).load(Ordering::Acquire)
    }

    /// 加载原始打包字（踢出路径快照用）
    pub fn load_raw(&self, bucket: usize, slot: usize) -> u64 {
        self.entry_at(bucket, slot).load_raw(Ordering::Acquire)
    }

    /// 发布条目（调用方处于桶写版本窗口内）
    pub fn store(&self, bucket: usize, slot: usize, entry: SlotEntry) {
        self.entry_at(bucket, slot).store(entry, Ordering::Release);
    }

    /// 发布原始打包字
    pub fn store_raw(&self, bucket: usize, slot: usize, packed: u64) {
        self.entry_at(bucket, slot).store_raw(packed, Ordering::Release);
    }

    /// 清空槽位
    pub fn clear(&self, bucket: usize, slot: usize) {
        self.entry_at(bucket, slot).clear(Ordering::Release);
    }

    /// 查找桶内首个空槽位
    pub fn find_empty(&self, bucket: usize) -> Option<usize> {
        (0..self.slots_per_bucket)
            .find(|&slot| self.entry_at(bucket, slot).is_empty(Ordering::Acquire))
    }

    /// 按签名过滤桶内候选槽位
    ///
    /// 签名相同只是概率命中，调用方必须再对键槽存储做完整键比较。
    pub fn find_signature(&self, bucket: usize, signature: Signature) -> Vec<(usize, SlotEntry)> {
        let mut matches = Vec::new();
        for slot in 0..self.slots_per_bucket {
            if let Some(entry) = self.load(bucket, slot) {
                if entry.signature == signature {
                    matches.push((slot, entry));
                }
            }
        }
        matches
    }

    /// 桶内已占用槽位数
    pub fn occupied_count(&self, bucket: usize) -> usize {
        (0..self.slots_per_bucket)
            .filter(|&slot| !self.entry_at(bucket, slot).is_empty(Ordering::Acquire))
            .count()
    }

    /// 清空所有桶
    pub fn clear_all(&self) {
        for entry in self.entries.iter() {
            entry.clear(Ordering::Release);
        }
    }
}
