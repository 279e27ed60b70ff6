//! 存储模块 - 键槽仓库、空闲链表与延迟回收

pub mod free_list;
pub mod key_slots;
pub mod reclaim;

pub use free_list::FreeList;
pub use key_slots::KeySlotStore;
pub use reclaim::ReclamationClient;
