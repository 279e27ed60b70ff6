//! 回收客户端 - 基于epoch的键槽延迟回收
//!
//! 并发模式下，删除或踢出腾空的键槽索引不能立刻回到空闲链表：
//! 正在执行的读者可能仍持有该索引并在比较键字节。回收客户端把
//! 索引交给crossbeam-epoch延迟执行，等到retire时刻活跃的所有
//! 读者guard都退出后才真正归还。无并发模式下直接归还。

use crate::{store::free_list::FreeList, types::ConcurrencyMode};
use crossbeam_epoch::{self as epoch, Guard};
use std::sync::Arc;

/// 分配失败时推动回收器的pin/flush轮数
const COLLECT_NUDGES: usize = 8;

/// 回收客户端
#[derive(Debug)]
pub struct ReclamationClient {
    free_list: Arc<FreeList>,
    mode: ConcurrencyMode,
}

impl ReclamationClient {
    /// 创建新回收客户端
    pub fn new(free_list: Arc<FreeList>, mode: ConcurrencyMode) -> Self {
        Self { free_list, mode }
    }

    /// 读者/迭代器进入临界区
    pub fn pin(&self) -> Guard {
        epoch::pin()
    }

    /// 退役一个腾空的键槽索引
    ///
    /// 代数在retire时快照：此后发生的reset会让这次归还作废。
    pub fn retire(&self, index: u32) {
        if !self.mode.defers_reclamation() {
            self.free_list.push(index);
            return;
        }

        let free_list = Arc::clone(&self.free_list);
        let generation = free_list.generation();
        let guard = epoch::pin();
        guard.defer(move || free_list.push_deferred(index, generation));
        guard.flush();
    }

    /// 推动epoch回收器，尽量让挂起的归还尽快执行
    ///
    /// 分配路径在空闲链表耗尽时调用；不保证一定有索引回来，
    /// 仍然空则由调用方上报TableFull。
    pub fn nudge_collector(&self) {
        for _ in 0..COLLECT_NUDGES {
            let guard = epoch::pin();
            guard.flush();
            drop(guard);
        }
    }
}
