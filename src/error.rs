//! 统一错误处理 - 所有可能错误类型和恢复逻辑

/// Cuckoo哈希表可能发生的错误
#[derive(Debug, thiserror::Error)]
pub enum FlowHashError {
    #[error("表已满，无法插入新条目 (容量: {capacity}, 当前大小: {size}, 负载因子: {load_factor:.2})")]
    TableFull {
        capacity: usize,
        size: usize,
        load_factor: f32,
    },

    #[error("键过长 (长度: {len}, 上限: {max})")]
    KeyTooLong {
        len: usize,
        max: usize,
    },

    #[error("无效参数: {reason}")]
    InvalidParam {
        reason: String,
    },

    #[error("无效配置: {reason}")]
    InvalidConfig {
        reason: String,
    },

    #[error("键已存在")]
    KeyAlreadyExists,

    #[error("键不存在")]
    KeyNotFound,

    #[error("锁争用 (操作: {operation})")]
    LockContention {
        operation: String,
    },

    #[error("踢出路径在应用期间被并发写入者破坏")]
    PathInvalidated,

    #[error("无有效踢出候选")]
    NoKickCandidate,

    #[error("无效桶索引")]
    InvalidBucket,
}

impl FlowHashError {
    /// 获取错误恢复建议
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Self::TableFull { .. } => Some("删除条目或用更大容量重建表"),
            Self::KeyTooLong { .. } => Some("检查键长度是否与建表时的key_len一致"),
            Self::InvalidParam { .. } => Some("检查调用参数"),
            Self::InvalidConfig { .. } => Some("检查配置参数"),
            Self::KeyAlreadyExists => Some("检查是否需要更新策略(DuplicatePolicy::Update)"),
            Self::KeyNotFound => Some("确认键是否存在"),
            Self::LockContention { .. } => Some("减少并发或重试操作"),
            Self::PathInvalidated => Some("使用新快照重试踢出搜索"),
            Self::NoKickCandidate => Some("桶内无可踢出条目，表可能已满"),
            Self::InvalidBucket => Some("验证桶索引是否有效"),
        }
    }

    /// 判断错误是否可恢复
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidConfig { .. })
    }

    /// 判断错误是否由并发冲突引起
    pub fn is_concurrency_error(&self) -> bool {
        matches!(
            self,
            Self::LockContention { .. } | Self::PathInvalidated
        )
    }

    /// 是否需要操作重试
    pub fn should_retry(&self) -> bool {
        self.is_concurrency_error()
    }
}
