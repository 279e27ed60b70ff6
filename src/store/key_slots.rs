//! 键槽仓库 - 定长键+数据记录的扁平字节仓
//!
//! 所有键值记录放在一个连续字节区内，槽位用u32索引而不是裸指针引用
//! （便于并发访问和桶内条目的紧凑打包）。记录布局：
//! `[key_len字节键 | data_len字节数据]`，第i个记录在 `i * record_len` 偏移。
//!
//! 安全协议：
//! - 键字节只在槽位不可达（尚未发布或已回收）时写入，发布后不可变；
//! - 数据字节的原地更新只发生在持有所属桶写版本（奇数窗口）期间，
//!   读者复制数据后用版本校验丢弃撕裂副本；
//! - 槽位回收经过回收客户端，保证没有读者仍持有该索引。

use std::cell::UnsafeCell;

/// 键槽仓库
pub struct KeySlotStore {
    arena: UnsafeCell<Box<[u8]>>,
    slot_count: usize,
    key_len: usize,
    data_len: usize,
    record_len: usize,
}

// 裸字节区的并发访问由上述协议约束，仓库本身可跨线程共享
unsafe impl Send for KeySlotStore {}
unsafe impl Sync for KeySlotStore {}

impl KeySlotStore {
    /// 创建新仓库（全部字节清零）
    pub fn new(slot_count: usize, key_len: usize, data_len: usize) -> Self {
        let record_len = key_len + data_len;
        let arena = vec![0u8; slot_count * record_len].into_boxed_slice();
        Self {
            arena: UnsafeCell::new(arena),
            slot_count,
            key_len,
            data_len,
            record_len,
        }
    }

    /// 槽位数量
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// 键长度
    pub fn key_len(&self) -> usize {
        self.key_len
    }

    /// 数据长度
    pub fn data_len(&self) -> usize {
        self.data_len
    }

    fn record_offset(&self, index: u32) -> usize {
        debug_assert!((index as usize) < self.slot_count, "槽位索引越界");
        index as usize * self.record_len
    }

    fn base_ptr(&self) -> *mut u8 {
        // Box<[u8]>的数据指针在Box整个生命周期内稳定
        unsafe { (*self.arena.get()).as_mut_ptr() }
    }

    /// 写入整条记录（键+数据）
    ///
    /// 调用方保证该槽位当前不可达：没有任何桶条目引用它。
    pub fn write_record(&self, index: u32, key: &[u8], data: &[u8]) {
        debug_assert_eq!(key.len(), self.key_len);
        debug_assert_eq!(data.len(), self.data_len);
        let offset = self.record_offset(index);
        unsafe {
            let dst = self.base_ptr().add(offset);
            std::ptr::copy_nonoverlapping(key.as_ptr(), dst, self.key_len);
            std::ptr::copy_nonoverlapping(data.as_ptr(), dst.add(self.key_len), self.data_len);
        }
    }

    /// 原地更新数据字节（重复键Update策略）
    ///
    /// 调用方保证处于所属桶的写版本窗口内。
    pub fn write_data(&self, index: u32, data: &[u8]) {
        debug_assert_eq!(data.len(), self.data_len);
        let offset = self.record_offset(index) + self.key_len;
        unsafe {
            let dst = self.base_ptr().add(offset);
            std::ptr::copy_nonoverlapping(data.as_ptr(), dst, self.data_len);
        }
    }

    /// 完整键比较 - 签名命中后的最终判定
    pub fn key_eq(&self, index: u32, key: &[u8]) -> bool {
        if key.len() != self.key_len {
            return false;
        }
        let offset = self.record_offset(index);
        unsafe {
            let stored = std::slice::from_raw_parts(self.base_ptr().add(offset), self.key_len);
            stored == key
        }
    }

    /// 复制键字节
    pub fn read_key(&self, index: u32) -> Vec<u8> {
        let offset = self.record_offset(index);
        unsafe {
            std::slice::from_raw_parts(self.base_ptr().add(offset), self.key_len).to_vec()
        }
    }

    /// 复制数据字节
    pub fn read_data(&self, index: u32) -> Vec<u8> {
        let offset = self.record_offset(index) + self.key_len;
        unsafe {
            std::slice::from_raw_parts(self.base_ptr().add(offset), self.data_len).to_vec()
        }
    }
}

impl std::fmt::Debug for KeySlotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySlotStore")
            .field("slot_count", &self.slot_count)
            .field("key_len", &self.key_len)
            .field("data_len", &self.data_len)
            .finish()
    }
}

// 单元测试
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_and_read_record() {
        let store = KeySlotStore::new(16, 4, 8);
        store.write_record(3, b"abcd", b"12345678");

        assert_eq!(store.read_key(3), b"abcd");
        assert_eq!(store.read_data(3), b"12345678");
        assert!(store.key_eq(3, b"abcd"));
        assert!(!store.key_eq(3, b"abce"));
    }

    #[test]
    fn test_records_do_not_overlap() {
        let store = KeySlotStore::new(4, 4, 4);
        store.write_record(0, b"AAAA", b"0000");
        store.write_record(1, b"BBBB", b"1111");
        store.write_record(2, b"CCCC", b"2222");

        assert_eq!(store.read_key(0), b"AAAA");
        assert_eq!(store.read_data(1), b"1111");
        assert_eq!(store.read_key(2), b"CCCC");
    }

    #[test]
    fn test_in_place_data_update() {
        let store = KeySlotStore::new(4, 4, 4);
        store.write_record(1, b"flow", b"old!");
        store.write_data(1, b"new!");

        assert_eq!(store.read_key(1), b"flow", "键字节不应被数据更新触碰");
        assert_eq!(store.read_data(1), b"new!");
    }

    #[test]
    fn test_zero_data_len() {
        let store = KeySlotStore::new(4, 8, 0);
        store.write_record(0, b"8bytekey", b"");
        assert!(store.key_eq(0, b"8bytekey"));
        assert!(store.read_data(0).is_empty());
    }

    #[test]
    fn test_key_eq_length_mismatch() {
        let store = KeySlotStore::new(4, 4, 0);
        store.write_record(0, b"abcd", b"");
        assert!(!store.key_eq(0, b"abc"));
        assert!(!store.key_eq(0, b"abcde"));
    }
}
