//! 签名与候选桶推导
//!
//! 主桶取哈希低位，签名取哈希高16位，备用桶通过
//! `partner = bucket ^ scramble(signature)` 推导。XOR对称性保证
//! 从任意一侧都能算出另一个候选桶，踢出引擎因此只凭条目里的
//! 备用标签就能搬移条目，不需要重新哈希键。

use crate::types::Signature;

/// 签名搅拌乘数（Murmur混合常数）
const TAG_SCRAMBLE: u32 = 0x5bd1_e995;

/// 主桶索引（bucket_mask = 桶数-1，桶数为2的幂）
pub fn primary_bucket(hash: u64, bucket_mask: u32) -> u32 {
    (hash as u32) & bucket_mask
}

/// 备用桶标签 - 由签名搅拌得到，随条目一起存进桶里
pub fn alt_tag_of(signature: Signature) -> u16 {
    let mixed = (signature.as_u16() as u32)
        .wrapping_add(1)
        .wrapping_mul(TAG_SCRAMBLE);
    ((mixed >> 16) ^ mixed) as u16
}

/// 由当前桶和备用标签推导另一个候选桶
///
/// 标签按桶掩码截断后强制非零，保证两个候选桶不同；
/// 同一标签从两侧推导互为逆运算。
pub fn partner_bucket(bucket: u32, alt_tag: u16, bucket_mask: u32) -> u32 {
    let mut tag = (alt_tag as u32) & bucket_mask;
    if tag == 0 {
        tag = 1;
    }
    (bucket ^ tag) & bucket_mask
}

// 单元测试
#[cfg(test)]
mod tests {
    use super::*;

    const MASK: u32 = 1023; // 1024桶

    #[test]
    fn test_partner_is_involution() {
        for sig in [0u16, 1, 0x00FF, 0xABCD, 0xFFFF] {
            let tag = alt_tag_of(Signature::new(sig));
            for bucket in [0u32, 1, 511, 1023] {
                let partner = partner_bucket(bucket, tag, MASK);
                assert_eq!(
                    partner_bucket(partner, tag, MASK),
                    bucket,
                    "XOR推导应是对合运算"
                );
            }
        }
    }

    #[test]
    fn test_partner_differs_from_bucket() {
        for sig in 0u16..=2048 {
            let tag = alt_tag_of(Signature::new(sig));
            let partner = partner_bucket(100, tag, MASK);
            assert_ne!(partner, 100, "两个候选桶必须不同 (sig={})", sig);
        }
    }

    #[test]
    fn test_primary_within_mask() {
        for hash in [0u64, u64::MAX, 0xDEAD_BEEF_CAFE_F00D] {
            assert!(primary_bucket(hash, MASK) <= MASK);
        }
    }

    #[test]
    fn test_tiny_table_mask() {
        // 2桶的最小表：掩码为1，partner必须仍与当前桶不同
        for sig in 0u16..=512 {
            let tag = alt_tag_of(Signature::new(sig));
            assert_eq!(partner_bucket(0, tag, 1), 1);
            assert_eq!(partner_bucket(1, tag, 1), 0);
        }
    }

    #[test]
    fn test_tag_deterministic() {
        let a = alt_tag_of(Signature::new(0x1234));
        let b = alt_tag_of(Signature::new(0x1234));
        assert_eq!(a, b);
    }
}
