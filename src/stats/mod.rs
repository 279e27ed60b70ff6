//! 统计模块 - 表级操作计数与Prometheus导出

use std::sync::atomic::{AtomicU64, Ordering};

/// 表统计记录器 - 全部Relaxed计数，热路径零同步开销
#[derive(Debug, Default)]
pub struct TableStats {
    inserts: AtomicU64,
    insert_failures: AtomicU64,
    lookups: AtomicU64,
    lookup_hits: AtomicU64,
    lookup_misses: AtomicU64,
    deletes: AtomicU64,
    displacements: AtomicU64,
    path_retries: AtomicU64,
    seqlock_retries: AtomicU64,
    resets: AtomicU64,
}

/// 统计快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableStatsSnapshot {
    pub inserts: u64,
    pub insert_failures: u64,
    pub lookups: u64,
    pub lookup_hits: u64,
    pub lookup_misses: u64,
    pub deletes: u64,
    pub displacements: u64,
    pub path_retries: u64,
    pub seqlock_retries: u64,
    pub resets: u64,
}

impl TableStats {
    /// 创建新记录器
    pub fn new() -> Self {
        Self::default()
    }

    pub fn note_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn note_insert_failure(&self) {
        self.insert_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn note_lookup(&self, hit: bool) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        if hit {
            self.lookup_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.lookup_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn note_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn note_displacements(&self, moves: u64) {
        self.displacements.fetch_add(moves, Ordering::Relaxed);
    }

    pub fn note_path_retry(&self) {
        self.path_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn note_seqlock_retry(&self) {
        self.seqlock_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn note_reset(&self) {
        self.resets.fetch_add(1, Ordering::Relaxed);
    }

    /// 获取统计快照
    pub fn snapshot(&self) -> TableStatsSnapshot {
        TableStatsSnapshot {
            inserts: self.inserts.load(Ordering::Relaxed),
            insert_failures: self.insert_failures.load(Ordering::Relaxed),
            lookups: self.lookups.load(Ordering::Relaxed),
            lookup_hits: self.lookup_hits.load(Ordering::Relaxed),
            lookup_misses: self.lookup_misses.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            displacements: self.displacements.load(Ordering::Relaxed),
            path_retries: self.path_retries.load(Ordering::Relaxed),
            seqlock_retries: self.seqlock_retries.load(Ordering::Relaxed),
            resets: self.resets.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数
    pub fn reset(&self) {
        self.inserts.store(0, Ordering::Relaxed);
        self.insert_failures.store(0, Ordering::Relaxed);
        self.lookups.store(0, Ordering::Relaxed);
        self.lookup_hits.store(0, Ordering::Relaxed);
        self.lookup_misses.store(0, Ordering::Relaxed);
        self.deletes.store(0, Ordering::Relaxed);
        self.displacements.store(0, Ordering::Relaxed);
        self.path_retries.store(0, Ordering::Relaxed);
        self.seqlock_retries.store(0, Ordering::Relaxed);
        self.resets.store(0, Ordering::Relaxed);
    }

    /// 导出Prometheus格式指标
    pub fn export_prometheus(&self) -> String {
        let snap = self.snapshot();
        let mut out = String::with_capacity(512);
        let metrics = [
            ("flowhash_insert_count", snap.inserts),
            ("flowhash_insert_failure_count", snap.insert_failures),
            ("flowhash_lookup_count", snap.lookups),
            ("flowhash_lookup_hit_count", snap.lookup_hits),
            ("flowhash_lookup_miss_count", snap.lookup_misses),
            ("flowhash_delete_count", snap.deletes),
            ("flowhash_displacement_count", snap.displacements),
            ("flowhash_path_retry_count", snap.path_retries),
            ("flowhash_seqlock_retry_count", snap.seqlock_retries),
            ("flowhash_reset_count", snap.resets),
        ];
        for (name, value) in metrics {
            out.push_str(&format!("# TYPE {} counter\n{} {}\n", name, name, value));
        }
        out
    }
}
