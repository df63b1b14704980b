// src/store.rs

//! # 键值存储
//!
//! `Store` 持有 key → value 主表和 key → 过期时刻表，以及注入的时钟。
//! 每条命令先调用 `sweep` 做一次惰性过期清理，再执行自己的逻辑。
//!
//! 本文件实现 key 空间命令（DEL / EXISTS / EXPIRE / TTL / KEYS / RENAME ...）；
//! 字符串、哈希、列表命令分别在 `types::{string, hash, list}` 中以 `impl Store` 形式给出。
//!
//! 单线程、同步；多线程共享时由调用方自行加锁。

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;

use rand::seq::IteratorRandom;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, ServerError};
use crate::expire::{self, TTL_MISSING};
use crate::glob;
use crate::types::{MapValue, Value};

/// 状态类命令的成功标记
pub const OK: &str = "OK";

pub struct Store {
    values: BTreeMap<String, Value>,
    expirations: HashMap<String, i64>,
    clock: Box<dyn Clock>,
}

impl Default for Store {
    fn default() -> Self {
        Store::new()
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("keys", &self.values.len())
            .field("volatile", &self.expirations.len())
            .finish()
    }
}

impl Store {
    /// 使用系统时钟
    pub fn new() -> Self {
        Store::with_clock(SystemClock)
    }

    /// 注入时钟，测试中通常传入 `ManualClock`
    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Store {
            values: BTreeMap::new(),
            expirations: HashMap::new(),
            clock: Box::new(clock),
        }
    }

    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    // ---------------------------------------------------------------
    // 内部工具
    // ---------------------------------------------------------------

    /// 惰性过期：用同一个 now 快照清理到期 key，返回该快照
    pub(crate) fn sweep(&mut self) -> i64 {
        let now = self.clock.now();
        let evicted = expire::sweep(now, &mut self.expirations, &mut self.values);
        if evicted > 0 {
            debug!(evicted, now, "expired keys evicted");
        }
        now
    }

    pub(crate) fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub(crate) fn value_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.values.get_mut(key)
    }

    /// 整体替换 key 的值，并清除其过期时间
    pub(crate) fn insert_value(&mut self, key: &str, value: Value) {
        self.expirations.remove(key);
        self.values.insert(key.to_string(), value);
    }

    /// 就地写入字符串值，保留已有的过期时间
    pub(crate) fn put_scalar(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), Value::Scalar(value));
    }

    pub(crate) fn remove_key(&mut self, key: &str) -> Option<Value> {
        self.expirations.remove(key);
        self.values.remove(key)
    }

    /// 集合类型被清空后从 key 空间移除
    pub(crate) fn drop_if_empty(&mut self, key: &str) {
        if self.values.get(key).is_some_and(Value::is_empty_collection) {
            self.remove_key(key);
        }
    }

    pub(crate) fn set_expiration(&mut self, key: &str, at: i64) {
        self.expirations.insert(key.to_string(), at);
    }

    /// 仅供会自动创建的命令使用（HSET / HINCRBY / HMSET ...）
    pub(crate) fn get_or_create_map(&mut self, key: &str) -> Result<&mut MapValue> {
        let value = self
            .values
            .entry(key.to_string())
            .or_insert_with(|| Value::Map(MapValue::default()));
        match value {
            Value::Map(map) => Ok(map),
            _ => Err(ServerError::WrongType.into()),
        }
    }

    /// 仅供会自动创建的命令使用（LPUSH / RPUSH / RPOPLPUSH 目标）
    pub(crate) fn get_or_create_list(&mut self, key: &str) -> Result<&mut VecDeque<String>> {
        let value = self
            .values
            .entry(key.to_string())
            .or_insert_with(|| Value::List(VecDeque::new()));
        match value {
            Value::List(list) => Ok(list),
            _ => Err(ServerError::WrongType.into()),
        }
    }

    // ---------------------------------------------------------------
    // Key 空间命令
    // ---------------------------------------------------------------

    /// DEL key [key ...]，返回实际删除的数量
    pub fn del(&mut self, keys: &[&str]) -> usize {
        self.sweep();
        keys.iter()
            .filter(|key| self.remove_key(key).is_some())
            .count()
    }

    pub fn exists(&mut self, key: &str) -> bool {
        self.sweep();
        self.values.contains_key(key)
    }

    /// EXPIRE key seconds；key 不存在返回 false
    pub fn expire(&mut self, key: &str, seconds: i64) -> bool {
        let now = self.sweep();
        self.expire_at_instant(key, now.saturating_add(seconds))
    }

    /// PEXPIRE key millis；毫秒向上取整为秒
    pub fn pexpire(&mut self, key: &str, millis: i64) -> bool {
        let now = self.sweep();
        self.expire_at_instant(key, now.saturating_add(expire::millis_to_secs(millis)))
    }

    pub fn expireat(&mut self, key: &str, timestamp: i64) -> bool {
        self.sweep();
        self.expire_at_instant(key, timestamp)
    }

    pub fn pexpireat(&mut self, key: &str, timestamp_millis: i64) -> bool {
        self.sweep();
        self.expire_at_instant(key, expire::millis_to_secs(timestamp_millis))
    }

    fn expire_at_instant(&mut self, key: &str, at: i64) -> bool {
        if !self.values.contains_key(key) {
            return false;
        }
        self.set_expiration(key, at);
        true
    }

    /// 仅当 key 存在且带有过期时间时返回 true
    pub fn persist(&mut self, key: &str) -> bool {
        self.sweep();
        self.values.contains_key(key) && self.expirations.remove(key).is_some()
    }

    /// -2：key 不存在；-1：没有过期时间；否则为剩余秒数
    pub fn ttl(&mut self, key: &str) -> i64 {
        let now = self.sweep();
        if !self.values.contains_key(key) {
            return TTL_MISSING;
        }
        expire::remaining_secs(self.expirations.get(key).copied(), now)
    }

    /// 同 TTL，单位毫秒；精度仍为秒
    pub fn pttl(&mut self, key: &str) -> i64 {
        match self.ttl(key) {
            ttl if ttl < 0 => ttl,
            ttl => ttl.saturating_mul(1000),
        }
    }

    pub fn keys(&mut self, pattern: &str) -> Vec<String> {
        self.sweep();
        glob::filter(pattern, self.values.keys())
    }

    pub fn randomkey(&mut self) -> Option<String> {
        self.sweep();
        self.values.keys().choose(&mut rand::rng()).cloned()
    }

    pub fn dbsize(&mut self) -> usize {
        self.sweep();
        self.values.len()
    }

    /// RENAME key target：无条件覆盖 target，过期时间随值一起迁移
    pub fn rename(&mut self, key: &str, target: &str) -> Result<&'static str> {
        self.sweep();
        self.check_rename(key, target)?;
        self.move_key(key, target);
        Ok(OK)
    }

    /// RENAMENX：target 已存在时不做任何修改，返回 false
    pub fn renamenx(&mut self, key: &str, target: &str) -> Result<bool> {
        self.sweep();
        self.check_rename(key, target)?;
        if self.values.contains_key(target) {
            return Ok(false);
        }
        self.move_key(key, target);
        Ok(true)
    }

    fn check_rename(&self, key: &str, target: &str) -> Result<()> {
        if key == target {
            return Err(ServerError::SameObject.into());
        }
        if !self.values.contains_key(key) {
            return Err(ServerError::NoSuchKey.into());
        }
        Ok(())
    }

    fn move_key(&mut self, key: &str, target: &str) {
        let expires_at = self.expirations.remove(key);
        if let Some(value) = self.values.remove(key) {
            self.insert_value(target, value);
            if let Some(at) = expires_at {
                self.set_expiration(target, at);
            }
            debug!(from = key, to = target, "key renamed");
        }
    }

    /// 清空当前逻辑库
    pub fn flushdb(&mut self) -> &'static str {
        debug!(keys = self.values.len(), "flushing store");
        self.values.clear();
        self.expirations.clear();
        OK
    }

    /// 只有一个逻辑库，等同于 `flushdb`
    pub fn flushall(&mut self) -> &'static str {
        self.flushdb()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::StoreError;

    fn make_store() -> (Store, ManualClock) {
        let clock = ManualClock::new(1_000);
        (Store::with_clock(clock.clone()), clock)
    }

    #[test]
    fn del_counts_only_present_keys() {
        let (mut store, _) = make_store();
        store.set("a", "1");
        store.set("b", "2");
        assert_eq!(store.del(&["a", "b", "c"]), 2);
        assert!(!store.exists("a"));
        assert_eq!(store.get("a").unwrap(), None);
    }

    #[test]
    fn expire_then_time_passes() {
        let (mut store, clock) = make_store();
        assert!(!store.expire("missing", 10));

        store.set("k", "v");
        assert!(store.expire("k", 10));
        let ttl = store.ttl("k");
        assert!(ttl > 0 && ttl <= 10);
        assert_eq!(store.pttl("k"), 10_000);

        clock.advance(9);
        assert!(store.exists("k"));
        clock.advance(1);
        assert!(!store.exists("k"));
        assert_eq!(store.ttl("k"), TTL_MISSING);
    }

    #[test]
    fn ttl_codes() {
        let (mut store, _) = make_store();
        assert_eq!(store.ttl("nope"), -2);
        assert_eq!(store.pttl("nope"), -2);
        store.set("k", "v");
        assert_eq!(store.ttl("k"), -1);
        assert_eq!(store.pttl("k"), -1);
    }

    #[test]
    fn pexpire_rounds_up_to_seconds() {
        let (mut store, clock) = make_store();
        store.set("k", "v");
        assert!(store.pexpire("k", 1_500));
        assert_eq!(store.ttl("k"), 2);

        assert!(store.pexpireat("k", 1_000_001));
        assert_eq!(store.ttl("k"), 1);
        clock.advance(1);
        assert!(!store.exists("k"));
    }

    #[test]
    fn expireat_in_the_past_evicts_on_next_access() {
        let (mut store, _) = make_store();
        store.set("k", "v");
        assert!(store.expireat("k", 999));
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn persist_requires_key_and_expiration() {
        let (mut store, _) = make_store();
        assert!(!store.persist("k"));
        store.set("k", "v");
        assert!(!store.persist("k"));
        store.expire("k", 5);
        assert!(store.persist("k"));
        assert_eq!(store.ttl("k"), -1);
    }

    #[test]
    fn keys_skips_expired_entries() {
        let (mut store, clock) = make_store();
        for k in ["hello", "hallo", "hxllo", "hllo", "heeeello", "hillo", "hbllo"] {
            store.set(k, "x");
        }
        store.expire("hxllo", 1);
        let mut found = store.keys("h?llo");
        found.sort();
        assert_eq!(found, vec!["hallo", "hbllo", "hello", "hillo", "hxllo"]);

        clock.advance(1);
        let mut found = store.keys("h?llo");
        found.sort();
        assert_eq!(found, vec!["hallo", "hbllo", "hello", "hillo"]);
        assert_eq!(store.keys("*").len(), 6);
    }

    #[test]
    fn randomkey_returns_existing_key_or_none() {
        let (mut store, _) = make_store();
        assert_eq!(store.randomkey(), None);
        store.set("a", "1");
        store.set("b", "2");
        let k = store.randomkey().unwrap();
        assert!(k == "a" || k == "b");
    }

    #[test]
    fn rename_moves_value_and_expiration() {
        let (mut store, _) = make_store();
        store.set("src", "v");
        store.expire("src", 30);
        store.rpush("dst", &["old"]).unwrap();

        assert_eq!(store.rename("src", "dst").unwrap(), OK);
        assert!(!store.exists("src"));
        assert_eq!(store.get("dst").unwrap(), Some("v".to_string()));
        assert_eq!(store.ttl("dst"), 30);
    }

    #[test]
    fn rename_drops_target_expiration_when_source_has_none() {
        let (mut store, _) = make_store();
        store.set("src", "v");
        store.set("dst", "w");
        store.expire("dst", 30);
        store.rename("src", "dst").unwrap();
        assert_eq!(store.ttl("dst"), -1);
    }

    #[test]
    fn rename_errors() {
        let (mut store, _) = make_store();
        store.set("k", "v");
        assert_eq!(
            store.rename("k", "k").unwrap_err().to_string(),
            "ERR source and destination objects are the same"
        );
        assert_eq!(
            store.rename("missing", "x").unwrap_err(),
            StoreError::Server(ServerError::NoSuchKey)
        );
        assert_eq!(
            store.renamenx("k", "k").unwrap_err(),
            StoreError::Server(ServerError::SameObject)
        );
    }

    #[test]
    fn renamenx_refuses_existing_target() {
        let (mut store, _) = make_store();
        store.set("a", "1");
        store.set("b", "2");
        assert!(!store.renamenx("a", "b").unwrap());
        assert_eq!(store.get("a").unwrap(), Some("1".to_string()));
        assert_eq!(store.get("b").unwrap(), Some("2".to_string()));

        assert!(store.renamenx("a", "c").unwrap());
        assert!(!store.exists("a"));
        assert_eq!(store.get("c").unwrap(), Some("1".to_string()));
    }

    #[test]
    fn flush_empties_everything() {
        let (mut store, _) = make_store();
        store.set("a", "1");
        store.hset("h", "f", "v").unwrap();
        store.expire("a", 5);
        assert_eq!(store.flushall(), OK);
        assert_eq!(store.dbsize(), 0);
        assert_eq!(store.ttl("a"), -2);
    }
}
