// src/types/hash.rs

//! 支持 Hash 类型
//!
//! 每个 hash 是一个 `MapValue`：field → value，枚举顺序即插入顺序。
//! HSET / HINCRBY / HMSET 在 key 不存在时自动创建；
//! 读命令对不存在的 key 返回空结果。

use crate::error::{Result, ServerError};
use crate::store::{OK, Store};
use crate::types::{Value, format_float};

/// 保持插入顺序的 field → value 映射
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapValue {
    entries: Vec<(String, String)>,
}

impl MapValue {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, field: &str) -> Option<usize> {
        self.entries.iter().position(|(f, _)| f == field)
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.position(field).map(|i| self.entries[i].1.as_str())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.position(field).is_some()
    }

    /// 写入 field；新建返回 true，覆盖返回 false（覆盖不改变顺序）
    pub fn insert(&mut self, field: &str, value: String) -> bool {
        match self.position(field) {
            Some(i) => {
                self.entries[i].1 = value;
                false
            }
            None => {
                self.entries.push((field.to_string(), value));
                true
            }
        }
    }

    pub fn remove(&mut self, field: &str) -> Option<String> {
        self.position(field).map(|i| self.entries.remove(i).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(f, v)| (f.as_str(), v.as_str()))
    }
}

impl Store {
    /// 只读访问：不存在返回 None，类型不符报 WRONGTYPE
    fn map(&self, key: &str) -> Result<Option<&MapValue>> {
        match self.value(key) {
            Some(Value::Map(m)) => Ok(Some(m)),
            Some(_) => Err(ServerError::WrongType.into()),
            None => Ok(None),
        }
    }

    fn map_mut(&mut self, key: &str) -> Result<Option<&mut MapValue>> {
        match self.value_mut(key) {
            Some(Value::Map(m)) => Ok(Some(m)),
            Some(_) => Err(ServerError::WrongType.into()),
            None => Ok(None),
        }
    }

    /// HSET key field value
    /// 返回 true 表示新建了 field，false 表示覆盖了旧值
    pub fn hset(&mut self, key: &str, field: &str, value: &str) -> Result<bool> {
        self.sweep();
        Ok(self.get_or_create_map(key)?.insert(field, value.to_string()))
    }

    /// 仅当 field 不存在时写入
    pub fn hsetnx(&mut self, key: &str, field: &str, value: &str) -> Result<bool> {
        self.sweep();
        if self.map(key)?.is_some_and(|m| m.contains(field)) {
            return Ok(false);
        }
        Ok(self.get_or_create_map(key)?.insert(field, value.to_string()))
    }

    pub fn hget(&mut self, key: &str, field: &str) -> Result<Option<String>> {
        self.sweep();
        Ok(self
            .map(key)?
            .and_then(|m| m.get(field))
            .map(str::to_string))
    }

    /// HDEL key field [field ...]，返回删除的 field 数量
    pub fn hdel(&mut self, key: &str, fields: &[&str]) -> Result<usize> {
        self.sweep();
        let Some(map) = self.map_mut(key)? else {
            return Ok(0);
        };
        let removed = fields.iter().filter(|f| map.remove(f).is_some()).count();
        self.drop_if_empty(key);
        Ok(removed)
    }

    pub fn hexists(&mut self, key: &str, field: &str) -> Result<bool> {
        self.sweep();
        Ok(self.map(key)?.is_some_and(|m| m.contains(field)))
    }

    pub fn hlen(&mut self, key: &str) -> Result<usize> {
        self.sweep();
        Ok(self.map(key)?.map_or(0, MapValue::len))
    }

    pub fn hstrlen(&mut self, key: &str, field: &str) -> Result<usize> {
        self.sweep();
        Ok(self
            .map(key)?
            .and_then(|m| m.get(field))
            .map_or(0, str::len))
    }

    pub fn hkeys(&mut self, key: &str) -> Result<Vec<String>> {
        self.sweep();
        Ok(self
            .map(key)?
            .map(|m| m.iter().map(|(f, _)| f.to_string()).collect())
            .unwrap_or_default())
    }

    pub fn hvals(&mut self, key: &str) -> Result<Vec<String>> {
        self.sweep();
        Ok(self
            .map(key)?
            .map(|m| m.iter().map(|(_, v)| v.to_string()).collect())
            .unwrap_or_default())
    }

    pub fn hgetall(&mut self, key: &str) -> Result<Vec<(String, String)>> {
        self.sweep();
        Ok(self
            .map(key)?
            .map(|m| {
                m.iter()
                    .map(|(f, v)| (f.to_string(), v.to_string()))
                    .collect()
            })
            .unwrap_or_default())
    }

    pub fn hincrby(&mut self, key: &str, field: &str, delta: i64) -> Result<i64> {
        self.sweep();
        let current = match self.map(key)?.and_then(|m| m.get(field)) {
            Some(v) => v.parse::<i64>().map_err(|_| ServerError::HashNotInteger)?,
            None => 0,
        };
        let next = current.checked_add(delta).ok_or(ServerError::Overflow)?;
        self.get_or_create_map(key)?.insert(field, next.to_string());
        Ok(next)
    }

    pub fn hincrbyfloat(&mut self, key: &str, field: &str, delta: f64) -> Result<f64> {
        self.sweep();
        let current = match self.map(key)?.and_then(|m| m.get(field)) {
            Some(v) => match v.parse::<f64>() {
                Ok(f) if f.is_finite() => f,
                _ => return Err(ServerError::HashNotFloat.into()),
            },
            None => 0.0,
        };
        let next = current + delta;
        if !next.is_finite() {
            return Err(ServerError::NanOrInfinity.into());
        }
        self.get_or_create_map(key)?.insert(field, format_float(next));
        Ok(next)
    }

    /// HMSET key field value [field value ...]
    pub fn hmset(&mut self, key: &str, pairs: &[(&str, &str)]) -> Result<&'static str> {
        self.sweep();
        if pairs.is_empty() {
            // 不创建空 hash，但仍做类型检查
            self.map(key)?;
            return Ok(OK);
        }
        let map = self.get_or_create_map(key)?;
        for (field, value) in pairs {
            map.insert(field, value.to_string());
        }
        Ok(OK)
    }

    /// 返回与 fields 等长的结果，key 不存在时全部为 None
    pub fn hmget(&mut self, key: &str, fields: &[&str]) -> Result<Vec<Option<String>>> {
        self.sweep();
        let map = self.map(key)?;
        Ok(fields
            .iter()
            .map(|f| map.and_then(|m| m.get(f)).map(str::to_string))
            .collect())
    }
}
