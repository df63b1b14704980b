// src/types/string.rs

//! String 类型命令
//!
//! - SET / GET / GETSET / GETDEL，SET 支持 NX | XX 与 EX | PX 选项
//! - GETRANGE / SETRANGE / APPEND / STRLEN，按字节计算偏移
//! - INCR / DECR / INCRBY / DECRBY / INCRBYFLOAT，不存在的 key 视为 0
//! - MGET / MSET / MSETNX，MSETNX 要么全部写入，要么全部不写
//!
//! 整体覆盖（SET、MSET、GETSET）会清除过期时间；
//! 就地修改（计数、追加、SETRANGE）保留过期时间。
//!
//! 值以 `String` 保存。按字节偏移的 SETRANGE / GETRANGE 若切开多字节字符，
//! 被切开的部分按 UTF-8 有损替换为 U+FFFD；纯 ASCII 值不受影响。

use crate::error::{Result, ServerError, StoreError};
use crate::expire;
use crate::store::{OK, Store};
use crate::types::{Value, format_float};

/// 单个字符串值的最大字节数（512 MiB）
pub const MAX_STRING_LEN: usize = 512 * 1024 * 1024;

/// SET 的存在性条件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetCondition {
    /// 仅当 key 不存在
    Nx,
    /// 仅当 key 已存在
    Xx,
}

/// SET 的过期选项，EX 与 PX 互斥
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetExpiration {
    Ex(i64),
    Px(i64),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    pub condition: Option<SetCondition>,
    pub expiration: Option<SetExpiration>,
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_condition(mut self, condition: SetCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_expiration(mut self, expiration: SetExpiration) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// 解析 SET key value 之后的选项列表，例如 `["NX", "EX", "10"]`
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        let mut opts = SetOptions::new();
        let mut iter = args.iter().map(AsRef::as_ref);
        while let Some(token) = iter.next() {
            match token.to_uppercase().as_str() {
                "NX" | "XX" => {
                    if opts.condition.is_some() {
                        return Err(StoreError::invalid("NX and XX are mutually exclusive"));
                    }
                    let cond = if token.eq_ignore_ascii_case("NX") {
                        SetCondition::Nx
                    } else {
                        SetCondition::Xx
                    };
                    opts.condition = Some(cond);
                }
                "EX" | "PX" => {
                    if opts.expiration.is_some() {
                        return Err(StoreError::invalid("EX and PX are mutually exclusive"));
                    }
                    let amount = iter
                        .next()
                        .ok_or_else(|| StoreError::invalid(format!("{} requires a value", token)))?
                        .parse::<i64>()
                        .map_err(|_| ServerError::NotInteger)?;
                    let exp = if token.eq_ignore_ascii_case("EX") {
                        SetExpiration::Ex(amount)
                    } else {
                        SetExpiration::Px(amount)
                    };
                    opts.expiration = Some(exp);
                }
                _ => return Err(StoreError::invalid(format!("unknown SET option '{}'", token))),
            }
        }
        Ok(opts)
    }
}

fn parse_int(s: &str) -> Result<i64> {
    s.parse::<i64>().map_err(|_| ServerError::NotInteger.into())
}

fn parse_float(s: &str) -> Result<f64> {
    match s.parse::<f64>() {
        Ok(f) if f.is_finite() => Ok(f),
        _ => Err(ServerError::NotFloat.into()),
    }
}

/// 字节串转回 String。SETRANGE 切开多字节字符时做有损替换，
/// 此时存下的值和返回的长度都按替换后的字符串计算。
fn bytes_to_string(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes)
        .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

impl Store {
    fn scalar(&self, key: &str) -> Result<Option<&String>> {
        match self.value(key) {
            Some(Value::Scalar(s)) => Ok(Some(s)),
            Some(_) => Err(ServerError::WrongType.into()),
            None => Ok(None),
        }
    }

    pub fn get(&mut self, key: &str) -> Result<Option<String>> {
        self.sweep();
        Ok(self.scalar(key)?.cloned())
    }

    /// 无条件写入，覆盖任意类型的旧值
    pub fn set(&mut self, key: &str, value: &str) -> &'static str {
        self.sweep();
        self.insert_value(key, Value::Scalar(value.to_string()));
        OK
    }

    /// 带选项的 SET；条件不满足时返回 `Ok(None)`
    pub fn set_with(
        &mut self,
        key: &str,
        value: &str,
        opts: SetOptions,
    ) -> Result<Option<&'static str>> {
        let now = self.sweep();

        let expires_at = match opts.expiration {
            Some(SetExpiration::Ex(secs)) if secs > 0 => Some(now.saturating_add(secs)),
            Some(SetExpiration::Px(millis)) if millis > 0 => {
                Some(now.saturating_add(expire::millis_to_secs(millis)))
            }
            Some(_) => return Err(ServerError::InvalidExpireTime.into()),
            None => None,
        };

        let exists = self.value(key).is_some();
        match opts.condition {
            Some(SetCondition::Nx) if exists => return Ok(None),
            Some(SetCondition::Xx) if !exists => return Ok(None),
            _ => {}
        }

        self.insert_value(key, Value::Scalar(value.to_string()));
        if let Some(at) = expires_at {
            self.set_expiration(key, at);
        }
        Ok(Some(OK))
    }

    pub fn setnx(&mut self, key: &str, value: &str) -> bool {
        let opts = SetOptions::new().with_condition(SetCondition::Nx);
        matches!(self.set_with(key, value, opts), Ok(Some(_)))
    }

    pub fn setex(&mut self, key: &str, seconds: i64, value: &str) -> Result<&'static str> {
        let opts = SetOptions::new().with_expiration(SetExpiration::Ex(seconds));
        self.set_with(key, value, opts).map(|_| OK)
    }

    pub fn psetex(&mut self, key: &str, millis: i64, value: &str) -> Result<&'static str> {
        let opts = SetOptions::new().with_expiration(SetExpiration::Px(millis));
        self.set_with(key, value, opts).map(|_| OK)
    }

    /// 返回旧值并写入新值
    pub fn getset(&mut self, key: &str, value: &str) -> Result<Option<String>> {
        self.sweep();
        let old = self.scalar(key)?.cloned();
        self.insert_value(key, Value::Scalar(value.to_string()));
        Ok(old)
    }

    pub fn getdel(&mut self, key: &str) -> Result<Option<String>> {
        self.sweep();
        let old = self.scalar(key)?.cloned();
        if old.is_some() {
            self.remove_key(key);
        }
        Ok(old)
    }

    /// GETRANGE key start end：闭区间，负数从末尾计；
    /// 区间切开多字节字符时，首尾残缺的字节替换为 U+FFFD
    pub fn getrange(&mut self, key: &str, start: i64, end: i64) -> Result<String> {
        self.sweep();
        let Some(s) = self.scalar(key)? else {
            return Ok(String::new());
        };
        let bytes = s.as_bytes();
        let len = bytes.len() as i64;
        if len == 0 || (start < 0 && end < 0 && start > end) {
            return Ok(String::new());
        }

        let start = if start < 0 { (len + start).max(0) } else { start };
        let end = if end < 0 { (len + end).max(0) } else { end.min(len - 1) };
        if start > end {
            return Ok(String::new());
        }
        Ok(String::from_utf8_lossy(&bytes[start as usize..=end as usize]).into_owned())
    }

    /// SETRANGE key offset value：超出当前长度的部分以 NUL 字节填充；
    /// 结果超过 `MAX_STRING_LEN` 时报错且不做任何修改
    pub fn setrange(&mut self, key: &str, offset: i64, value: &str) -> Result<usize> {
        self.sweep();
        if offset < 0 {
            return Err(ServerError::OffsetOutOfRange.into());
        }
        let current = self.scalar(key)?.cloned();
        if value.is_empty() {
            return Ok(current.map_or(0, |s| s.len()));
        }

        let offset = usize::try_from(offset).map_err(|_| ServerError::StringTooLong)?;
        let needed = offset
            .checked_add(value.len())
            .filter(|n| *n <= MAX_STRING_LEN)
            .ok_or(ServerError::StringTooLong)?;
        let mut bytes = current.map(String::into_bytes).unwrap_or_default();
        if bytes.len() < needed {
            bytes.resize(needed, 0);
        }
        bytes[offset..needed].copy_from_slice(value.as_bytes());

        let s = bytes_to_string(bytes);
        let len = s.len();
        self.put_scalar(key, s);
        Ok(len)
    }

    pub fn append(&mut self, key: &str, value: &str) -> Result<usize> {
        self.sweep();
        let mut s = self.scalar(key)?.cloned().unwrap_or_default();
        if s.len().saturating_add(value.len()) > MAX_STRING_LEN {
            return Err(ServerError::StringTooLong.into());
        }
        s.push_str(value);
        let len = s.len();
        self.put_scalar(key, s);
        Ok(len)
    }

    pub fn strlen(&mut self, key: &str) -> Result<usize> {
        self.sweep();
        Ok(self.scalar(key)?.map_or(0, String::len))
    }

    pub fn incr(&mut self, key: &str) -> Result<i64> {
        self.incrby(key, 1)
    }

    pub fn decr(&mut self, key: &str) -> Result<i64> {
        self.incrby(key, -1)
    }

    pub fn decrby(&mut self, key: &str, delta: i64) -> Result<i64> {
        let delta = delta.checked_neg().ok_or(ServerError::Overflow)?;
        self.incrby(key, delta)
    }

    pub fn incrby(&mut self, key: &str, delta: i64) -> Result<i64> {
        self.sweep();
        let current = match self.scalar(key)? {
            Some(s) => parse_int(s)?,
            None => 0,
        };
        let next = current.checked_add(delta).ok_or(ServerError::Overflow)?;
        self.put_scalar(key, next.to_string());
        Ok(next)
    }

    pub fn incrbyfloat(&mut self, key: &str, delta: f64) -> Result<f64> {
        self.sweep();
        let current = match self.scalar(key)? {
            Some(s) => parse_float(s)?,
            None => 0.0,
        };
        let next = current + delta;
        if !next.is_finite() {
            return Err(ServerError::NanOrInfinity.into());
        }
        self.put_scalar(key, format_float(next));
        Ok(next)
    }

    /// 非字符串类型的 key 返回 None，而不是报错
    pub fn mget(&mut self, keys: &[&str]) -> Vec<Option<String>> {
        self.sweep();
        keys.iter()
            .map(|key| match self.value(key) {
                Some(Value::Scalar(s)) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn mset(&mut self, pairs: &[(&str, &str)]) -> &'static str {
        self.sweep();
        for (key, value) in pairs {
            self.insert_value(key, Value::Scalar(value.to_string()));
        }
        OK
    }

    /// 任意一个 key 已存在则整批放弃
    pub fn msetnx(&mut self, pairs: &[(&str, &str)]) -> bool {
        self.sweep();
        if pairs.iter().any(|(key, _)| self.value(key).is_some()) {
            return false;
        }
        for (key, value) in pairs {
            self.insert_value(key, Value::Scalar(value.to_string()));
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use anyhow::Result;

    fn make_store() -> (Store, ManualClock) {
        let clock = ManualClock::new(500);
        (Store::with_clock(clock.clone()), clock)
    }

    #[test]
    fn test_set_get_del() -> Result<()> {
        let (mut store, _) = make_store();

        // 1) set & get
        assert_eq!(store.set("foo", "bar"), "OK");
        assert_eq!(store.get("foo")?, Some("bar".to_string()));
        assert_eq!(store.ttl("foo"), -1);

        // 2) overwrite
        store.set("foo", "baz");
        assert_eq!(store.get("foo")?, Some("baz".to_string()));

        // 3) del
        assert_eq!(store.del(&["foo"]), 1);
        assert_eq!(store.get("foo")?, None);
        Ok(())
    }

    #[test]
    fn test_set_replaces_other_types() -> Result<()> {
        let (mut store, _) = make_store();
        store.rpush("k", &["a", "b"])?;
        store.set("k", "v");
        assert_eq!(store.get("k")?, Some("v".to_string()));
        Ok(())
    }

    #[test]
    fn test_get_on_list_is_wrongtype() -> Result<()> {
        let (mut store, _) = make_store();
        store.lpush("l", &["x"])?;
        assert_eq!(
            store.get("l").unwrap_err(),
            StoreError::Server(ServerError::WrongType)
        );
        Ok(())
    }

    #[test]
    fn test_set_nx_xx() -> Result<()> {
        let (mut store, _) = make_store();
        let nx = SetOptions::new().with_condition(SetCondition::Nx);
        let xx = SetOptions::new().with_condition(SetCondition::Xx);

        assert_eq!(store.set_with("k", "1", xx)?, None);
        assert!(!store.exists("k"));
        assert_eq!(store.set_with("k", "1", nx)?, Some(OK));
        assert_eq!(store.set_with("k", "2", nx)?, None);
        assert_eq!(store.set_with("k", "3", xx)?, Some(OK));
        assert_eq!(store.get("k")?, Some("3".to_string()));
        Ok(())
    }

    #[test]
    fn test_set_ex_px() -> Result<()> {
        let (mut store, clock) = make_store();
        store.set_with("a", "1", SetOptions::new().with_expiration(SetExpiration::Ex(10)))?;
        assert_eq!(store.ttl("a"), 10);

        // PX 向上取整
        store.set_with("b", "1", SetOptions::new().with_expiration(SetExpiration::Px(1_200)))?;
        assert_eq!(store.ttl("b"), 2);

        // 普通 SET 清除过期时间
        store.set("a", "2");
        assert_eq!(store.ttl("a"), -1);

        clock.advance(2);
        assert_eq!(store.get("b")?, None);

        let err = store
            .set_with("c", "1", SetOptions::new().with_expiration(SetExpiration::Ex(0)))
            .unwrap_err();
        assert_eq!(err.to_string(), "ERR invalid expire time in 'set' command");
        Ok(())
    }

    #[test]
    fn test_set_options_parse() -> Result<()> {
        let opts = SetOptions::parse(&["nx", "EX", "10"])?;
        assert_eq!(opts.condition, Some(SetCondition::Nx));
        assert_eq!(opts.expiration, Some(SetExpiration::Ex(10)));

        assert!(matches!(
            SetOptions::parse(&["EX", "1", "PX", "100"]),
            Err(StoreError::InvalidArgument(_))
        ));
        assert!(matches!(
            SetOptions::parse(&["NX", "XX"]),
            Err(StoreError::InvalidArgument(_))
        ));
        assert!(matches!(
            SetOptions::parse(&["EX"]),
            Err(StoreError::InvalidArgument(_))
        ));
        assert_eq!(
            SetOptions::parse(&["PX", "soon"]).unwrap_err(),
            StoreError::Server(ServerError::NotInteger)
        );
        Ok(())
    }

    #[test]
    fn test_setnx_setex() -> Result<()> {
        let (mut store, _) = make_store();
        assert!(store.setnx("k", "1"));
        assert!(!store.setnx("k", "2"));
        assert_eq!(store.setex("e", 5, "v")?, OK);
        assert_eq!(store.ttl("e"), 5);
        assert_eq!(store.psetex("p", 1, "v")?, OK);
        assert_eq!(store.ttl("p"), 1);
        Ok(())
    }

    #[test]
    fn test_getset_getdel() -> Result<()> {
        let (mut store, _) = make_store();
        assert_eq!(store.getset("k", "1")?, None);
        store.expire("k", 100);
        assert_eq!(store.getset("k", "2")?, Some("1".to_string()));
        assert_eq!(store.ttl("k"), -1);
        assert_eq!(store.getdel("k")?, Some("2".to_string()));
        assert!(!store.exists("k"));
        assert_eq!(store.getdel("k")?, None);
        Ok(())
    }

    #[test]
    fn test_getrange() -> Result<()> {
        let (mut store, _) = make_store();
        store.set("s", "This is a string");
        assert_eq!(store.getrange("s", 0, 3)?, "This");
        assert_eq!(store.getrange("s", -3, -1)?, "ing");
        assert_eq!(store.getrange("s", 0, -1)?, "This is a string");
        assert_eq!(store.getrange("s", 10, 100)?, "string");
        assert_eq!(store.getrange("s", 5, 3)?, "");
        assert_eq!(store.getrange("s", -1, -5)?, "");
        assert_eq!(store.getrange("missing", 0, -1)?, "");
        Ok(())
    }

    #[test]
    fn test_setrange_pads_with_nul() -> Result<()> {
        let (mut store, _) = make_store();
        store.set("s", "Hello World");
        assert_eq!(store.setrange("s", 6, "Redis")?, 11);
        assert_eq!(store.get("s")?, Some("Hello Redis".to_string()));

        assert_eq!(store.setrange("p", 3, "ab")?, 5);
        assert_eq!(store.get("p")?, Some("\0\0\0ab".to_string()));

        // 空值不创建 key
        assert_eq!(store.setrange("empty", 4, "")?, 0);
        assert!(!store.exists("empty"));

        assert_eq!(
            store.setrange("s", -1, "x").unwrap_err().to_string(),
            "ERR offset is out of range"
        );
        Ok(())
    }

    #[test]
    fn test_setrange_rejects_oversized_result() -> Result<()> {
        let (mut store, _) = make_store();
        store.set("s", "keep");
        for offset in [i64::MAX, MAX_STRING_LEN as i64] {
            assert_eq!(
                store.setrange("s", offset, "x").unwrap_err(),
                StoreError::Server(ServerError::StringTooLong)
            );
        }
        assert_eq!(
            store.setrange("new", i64::MAX, "x").unwrap_err().to_string(),
            "ERR string exceeds maximum allowed size"
        );
        // 失败时不做任何修改
        assert_eq!(store.get("s")?, Some("keep".to_string()));
        assert!(!store.exists("new"));
        Ok(())
    }

    #[test]
    fn test_split_multibyte_is_replaced() -> Result<()> {
        let (mut store, _) = make_store();
        store.set("u", "é");
        assert_eq!(store.getrange("u", 0, 0)?, "\u{FFFD}");

        // 切开 "é" 的第二个字节：残留的首字节被替换为 U+FFFD（3 字节）
        assert_eq!(store.setrange("u", 1, "x")?, 4);
        assert_eq!(store.get("u")?, Some("\u{FFFD}x".to_string()));

        store.set("a", "abcd");
        assert_eq!(store.setrange("a", 1, "é")?, 4);
        assert_eq!(store.get("a")?, Some("aéd".to_string()));
        Ok(())
    }

    #[test]
    fn test_append_strlen() -> Result<()> {
        let (mut store, _) = make_store();
        assert_eq!(store.append("k", "Hello")?, 5);
        assert_eq!(store.append("k", " World")?, 11);
        assert_eq!(store.strlen("k")?, 11);
        assert_eq!(store.strlen("nope")?, 0);
        Ok(())
    }

    #[test]
    fn test_incr_and_decr_basic() -> Result<()> {
        let (mut store, _) = make_store();

        // 不存在的 key 从 0 开始
        assert_eq!(store.incr("counter")?, 1);
        assert_eq!(store.incr("counter")?, 2);
        assert_eq!(store.decr("counter")?, 1);
        assert_eq!(store.incrby("counter", 10)?, 11);
        assert_eq!(store.decrby("counter", 12)?, -1);
        assert_eq!(store.get("counter")?, Some("-1".to_string()));
        Ok(())
    }

    #[test]
    fn test_incr_keeps_ttl() -> Result<()> {
        let (mut store, _) = make_store();
        store.set("n", "1");
        store.expire("n", 50);
        store.incr("n")?;
        assert_eq!(store.ttl("n"), 50);
        Ok(())
    }

    #[test]
    fn test_incr_errors() {
        let (mut store, _) = make_store();
        store.set("text", "abc");
        assert_eq!(
            store.incr("text").unwrap_err().to_string(),
            "ERR value is not an integer or out of range"
        );

        store.set("max", &i64::MAX.to_string());
        assert_eq!(
            store.incr("max").unwrap_err(),
            StoreError::Server(ServerError::Overflow)
        );
        assert_eq!(
            store.decrby("x", i64::MIN).unwrap_err(),
            StoreError::Server(ServerError::Overflow)
        );
    }

    #[test]
    fn test_incrbyfloat() -> Result<()> {
        let (mut store, _) = make_store();
        assert_eq!(store.incrbyfloat("f", 10.5)?, 10.5);
        assert_eq!(store.incrbyfloat("f", 0.1)?, 10.6);
        assert_eq!(store.get("f")?, Some("10.6".to_string()));
        store.set("i", "3");
        assert_eq!(store.incrbyfloat("i", 2.0)?, 5.0);
        assert_eq!(store.get("i")?, Some("5".to_string()));

        // 存储文本最多 15 位有效数字，不带二进制舍入噪声
        store.set("p", "0.1");
        store.incrbyfloat("p", 0.2)?;
        assert_eq!(store.get("p")?, Some("0.3".to_string()));

        store.set("bad", "nan");
        assert_eq!(
            store.incrbyfloat("bad", 1.0).unwrap_err(),
            StoreError::Server(ServerError::NotFloat)
        );
        Ok(())
    }

    #[test]
    fn test_mget_mset_msetnx() -> Result<()> {
        let (mut store, _) = make_store();
        assert_eq!(store.mset(&[("a", "1"), ("b", "2")]), OK);
        store.hset("h", "f", "v")?;
        assert_eq!(
            store.mget(&["a", "missing", "b", "h"]),
            vec![Some("1".to_string()), None, Some("2".to_string()), None]
        );

        // 有一个 key 已存在，整批不写
        assert!(!store.msetnx(&[("c", "3"), ("a", "x")]));
        assert!(!store.exists("c"));
        assert_eq!(store.get("a")?, Some("1".to_string()));

        assert!(store.msetnx(&[("c", "3"), ("d", "4")]));
        assert_eq!(store.mget(&["c", "d"]), vec![Some("3".to_string()), Some("4".to_string())]);
        Ok(())
    }
}
