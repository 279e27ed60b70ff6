// src/table/displace.rs
//! Cuckoo踢出引擎 - 有界广度优先搜索与逆序搬移
//!
//! 插入时两个候选桶都满，就在"踢出一个现有条目到它的备用桶"
//! 构成的图上做广度优先搜索，深度受配置上限约束。找到一条终点
//! 有空槽位的路径后，从空槽位一端逆序应用搬移：每一步先发布到
//! 目的桶再清空来源桶，任何时刻每个存活键都能从它的某个候选桶
//! 到达。搜索用的是无锁快照，应用每一步搬移时重新按桶对加锁并
//! 校验快照，被并发写入者破坏则整条路径作废重搜。

use crate::{
    error::FlowHashError,
    hash::signature::partner_bucket,
    sync::controller::ConcurrencyController,
    table::bucket::BucketArray,
    types::AtomicEntry,
};

/// BFS队列上限 - 深度×桶宽的乘积失控时止损
const MAX_BFS_QUEUE: usize = 512;

/// 单次搬移：把src槽位的条目转移到dst槽位
#[derive(Debug, Clone, Copy)]
pub(crate) struct PathMove {
    pub src_bucket: usize,
    pub src_slot: usize,
    pub dst_bucket: usize,
    pub dst_slot: usize,
    /// 搜索时的条目快照，应用前校验
    pub snapshot: u64,
}

/// 踢出路径：应用完毕后root槽位为空
#[derive(Debug)]
pub(crate) struct CuckooPath {
    /// 搬移序列，按应用顺序排列（最深一步在前）
    pub moves: Vec<PathMove>,
    /// 腾出来的候选桶
    pub root_bucket: usize,
    /// 腾出来的槽位
    pub root_slot: usize,
}

/// BFS节点
#[derive(Debug, Clone, Copy)]
struct BfsNode {
    bucket: usize,
    /// (父节点在队列中的下标, 父桶中被踢槽位, 被踢条目快照)
    prev: Option<(usize, usize, u64)>,
    depth: usize,
}

/// 在两个候选桶出发的踢出图上搜索空槽位
///
/// 返回None表示深度上限内不存在增广路径（表满信号）。
pub(crate) fn find_path(
    buckets: &BucketArray,
    candidates: [usize; 2],
    max_depth: usize,
) -> Option<CuckooPath> {
    let mask = buckets.bucket_mask();
    let mut queue: Vec<BfsNode> = Vec::with_capacity(64);
    queue.push(BfsNode {
        bucket: candidates[0],
        prev: None,
        depth: 0,
    });
    if candidates[1] != candidates[0] {
        queue.push(BfsNode {
            bucket: candidates[1],
            prev: None,
            depth: 0,
        });
    }

    let mut head = 0;
    while head < queue.len() {
        let node = queue[head];

        if let Some(free_slot) = buckets.find_empty(node.bucket) {
            return Some(rebuild_path(&queue, head, free_slot));
        }

        if node.depth < max_depth && queue.len() < MAX_BFS_QUEUE {
            for slot in 0..buckets.slots_per_bucket() {
                let snapshot = buckets.load_raw(node.bucket, slot);
                let entry = match AtomicEntry::unpack(snapshot) {
                    Some(entry) => entry,
                    // 并发删除刚清空了槽位，下一轮重扫会直接命中
                    None => continue,
                };
                let partner = partner_bucket(node.bucket as u32, entry.alt_tag, mask) as usize;
                if partner == node.bucket {
                    continue;
                }
                if queue.len() >= MAX_BFS_QUEUE {
                    break;
                }
                queue.push(BfsNode {
                    bucket: partner,
                    prev: Some((head, slot, snapshot)),
                    depth: node.depth + 1,
                });
            }
        }

        head += 1;
    }

    None
}

/// 从终点节点回溯重建搬移序列（天然就是逆序应用的顺序）
fn rebuild_path(queue: &[BfsNode], end: usize, free_slot: usize) -> CuckooPath {
    let mut moves = Vec::new();
    let mut node = &queue[end];
    let mut dst_slot = free_slot;

    while let Some((prev_index, prev_slot, snapshot)) = node.prev {
        let prev = &queue[prev_index];
        moves.push(PathMove {
            src_bucket: prev.bucket,
            src_slot: prev_slot,
            dst_bucket: node.bucket,
            dst_slot,
            snapshot,
        });
        dst_slot = prev_slot;
        node = prev;
    }

    CuckooPath {
        moves,
        root_bucket: node.bucket,
        root_slot: dst_slot,
    }
}

/// 逆序应用踢出路径
///
/// 每一步：锁住(src,dst)桶对，校验来源条目仍等于搜索快照且目的
/// 槽位仍为空，然后在两个桶的写版本窗口内完成"先发布后清空"。
/// 校验失败返回PathInvalidated，由调用方重新搜索。
pub(crate) fn apply_path(
    buckets: &BucketArray,
    ctrl: &ConcurrencyController,
    path: &CuckooPath,
) -> Result<(), FlowHashError> {
    for mv in &path.moves {
        let _guard = ctrl.lock_pair(mv.src_bucket, mv.dst_bucket);

        if buckets.load_raw(mv.src_bucket, mv.src_slot) != mv.snapshot {
            return Err(FlowHashError::PathInvalidated);
        }
        if buckets.load_raw(mv.dst_bucket, mv.dst_slot) != 0 {
            return Err(FlowHashError::PathInvalidated);
        }

        // 在键短暂地从两个桶都可达之前递增搬移计数，
        // 双桶未命中的读者据此重扫
        ctrl.note_relocation();

        ctrl.write_begin(mv.src_bucket);
        ctrl.write_begin(mv.dst_bucket);
        buckets.store_raw(mv.dst_bucket, mv.dst_slot, mv.snapshot);
        buckets.clear(mv.src_bucket, mv.src_slot);
        ctrl.write_end(mv.dst_bucket);
        ctrl.write_end(mv.src_bucket);
    }

    Ok(())
}
