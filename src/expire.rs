// src/expire.rs

//! 过期策略（惰性清理）
//!
//! 过期时间以 unix 秒保存。每条命令执行前调用一次 `sweep`，
//! 用同一个 `now` 快照清理所有到期的 key；没有后台线程。

use std::collections::{BTreeMap, HashMap};

use crate::types::Value;

/// TTL 查询结果：key 不存在
pub const TTL_MISSING: i64 = -2;
/// TTL 查询结果：key 存在但没有过期时间
pub const TTL_PERSISTENT: i64 = -1;

/// 清理所有 `expires_at <= now` 的 key，返回被删除的 key 数量。
///
/// 过期表里有、主表里没有的条目视为陈旧记录，直接丢弃，不计入返回值。
pub fn sweep(
    now: i64,
    expirations: &mut HashMap<String, i64>,
    values: &mut BTreeMap<String, Value>,
) -> usize {
    let mut evicted = 0;
    expirations.retain(|key, expires_at| {
        if !values.contains_key(key) {
            return false;
        }
        if *expires_at <= now {
            values.remove(key);
            evicted += 1;
            return false;
        }
        true
    });
    evicted
}

/// 毫秒换算为秒，向上取整（与原协议一致，精度丢失是约定行为）
pub fn millis_to_secs(millis: i64) -> i64 {
    millis.saturating_add(999).div_euclid(1000)
}

/// 剩余秒数；调用方保证 key 存在
pub fn remaining_secs(expires_at: Option<i64>, now: i64) -> i64 {
    match expires_at {
        Some(ts) => ts.saturating_sub(now),
        None => TTL_PERSISTENT,
    }
}
