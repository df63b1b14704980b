// src/types/list.rs

//! # List Type Support
//!
//! Lists are `VecDeque<String>` values, so pushes and pops at either end are O(1).
//!
//! Every index or range boundary is normalized by adding the list length when
//! negative, so `-1` is the last element.
//!
//! `LPUSH`/`RPUSH` create the list when the key is missing; `LPUSHX`/`RPUSHX`
//! never do. A list that loses its last element is removed from the key space.

use std::collections::VecDeque;

use crate::error::{Result, ServerError, StoreError};
use crate::store::{OK, Store};
use crate::types::Value;

/// Where `LINSERT` puts the new element relative to the pivot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListPosition {
    Before,
    After,
}

impl std::str::FromStr for ListPosition {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("before") {
            Ok(ListPosition::Before)
        } else if s.eq_ignore_ascii_case("after") {
            Ok(ListPosition::After)
        } else {
            Err(StoreError::invalid(format!(
                "list position must be BEFORE or AFTER, got '{}'",
                s
            )))
        }
    }
}

/// Maps a possibly negative index onto `0..len` coordinates (may still be out of range).
fn normalize(index: i64, len: usize) -> i64 {
    if index < 0 { index + len as i64 } else { index }
}

/// Resolves an inclusive `[start, stop]` range to a clipped `start..end` slice range,
/// or `None` when it selects nothing.
fn clip_range(start: i64, stop: i64, len: usize) -> Option<(usize, usize)> {
    if len == 0 {
        return None;
    }
    let start = normalize(start, len).max(0);
    let stop = normalize(stop, len).min(len as i64 - 1);
    if start > stop {
        return None;
    }
    Some((start as usize, stop as usize + 1))
}

impl Store {
    fn list(&self, key: &str) -> Result<Option<&VecDeque<String>>> {
        match self.value(key) {
            Some(Value::List(l)) => Ok(Some(l)),
            Some(_) => Err(ServerError::WrongType.into()),
            None => Ok(None),
        }
    }

    fn list_mut(&mut self, key: &str) -> Result<Option<&mut VecDeque<String>>> {
        match self.value_mut(key) {
            Some(Value::List(l)) => Ok(Some(l)),
            Some(_) => Err(ServerError::WrongType.into()),
            None => Ok(None),
        }
    }

    fn push(&mut self, key: &str, values: &[&str], head: bool, create: bool) -> Result<usize> {
        self.sweep();
        let list = if create && !values.is_empty() {
            self.get_or_create_list(key)?
        } else {
            match self.list_mut(key)? {
                Some(l) => l,
                None => return Ok(0),
            }
        };
        for v in values {
            if head {
                list.push_front(v.to_string());
            } else {
                list.push_back(v.to_string());
            }
        }
        Ok(list.len())
    }

    /// Execute LPUSH: each value goes to the head in turn, so
    /// `lpush(k, ["a", "b"])` yields `[b, a]`. Returns the new length.
    pub fn lpush(&mut self, key: &str, values: &[&str]) -> Result<usize> {
        self.push(key, values, true, true)
    }

    /// Execute RPUSH. Returns the new length.
    pub fn rpush(&mut self, key: &str, values: &[&str]) -> Result<usize> {
        self.push(key, values, false, true)
    }

    /// LPUSH only onto an existing list; 0 when the key is absent.
    pub fn lpushx(&mut self, key: &str, values: &[&str]) -> Result<usize> {
        self.push(key, values, true, false)
    }

    pub fn rpushx(&mut self, key: &str, values: &[&str]) -> Result<usize> {
        self.push(key, values, false, false)
    }

    fn pop(&mut self, key: &str, head: bool) -> Result<Option<String>> {
        self.sweep();
        let Some(list) = self.list_mut(key)? else {
            return Ok(None);
        };
        let popped = if head { list.pop_front() } else { list.pop_back() };
        self.drop_if_empty(key);
        Ok(popped)
    }

    pub fn lpop(&mut self, key: &str) -> Result<Option<String>> {
        self.pop(key, true)
    }

    pub fn rpop(&mut self, key: &str) -> Result<Option<String>> {
        self.pop(key, false)
    }

    pub fn llen(&mut self, key: &str) -> Result<usize> {
        self.sweep();
        Ok(self.list(key)?.map_or(0, VecDeque::len))
    }

    /// Returns `None` when the key is missing or the index is out of range.
    pub fn lindex(&mut self, key: &str, index: i64) -> Result<Option<String>> {
        self.sweep();
        let Some(list) = self.list(key)? else {
            return Ok(None);
        };
        let i = normalize(index, list.len());
        if i < 0 {
            return Ok(None);
        }
        Ok(list.get(i as usize).cloned())
    }

    pub fn lset(&mut self, key: &str, index: i64, value: &str) -> Result<&'static str> {
        self.sweep();
        let list = self.list_mut(key)?.ok_or(ServerError::NoSuchKey)?;
        let i = normalize(index, list.len());
        if i < 0 || i as usize >= list.len() {
            return Err(ServerError::IndexOutOfRange.into());
        }
        list[i as usize] = value.to_string();
        Ok(OK)
    }

    /// Execute LRANGE: inclusive of `stop`, clipped to the list bounds.
    /// Out-of-range requests give an empty result, never an error.
    pub fn lrange(&mut self, key: &str, start: i64, stop: i64) -> Result<Vec<String>> {
        self.sweep();
        let Some(list) = self.list(key)? else {
            return Ok(Vec::new());
        };
        Ok(match clip_range(start, stop, list.len()) {
            Some((from, to)) => list.range(from..to).cloned().collect(),
            None => Vec::new(),
        })
    }

    /// Keeps exactly the elements `lrange(key, start, stop)` would return.
    pub fn ltrim(&mut self, key: &str, start: i64, stop: i64) -> Result<&'static str> {
        self.sweep();
        let Some(list) = self.list_mut(key)? else {
            return Ok(OK);
        };
        match clip_range(start, stop, list.len()) {
            Some((from, to)) => {
                list.truncate(to);
                list.drain(..from);
            }
            None => list.clear(),
        }
        self.drop_if_empty(key);
        Ok(OK)
    }

    /// Execute LREM:
    /// - `count > 0`: remove up to `count` matches scanning from the head
    /// - `count < 0`: remove up to `|count|` matches scanning from the tail
    /// - `count == 0`: remove every match
    ///
    /// Survivors keep their relative order. Returns the number removed.
    pub fn lrem(&mut self, key: &str, count: i64, value: &str) -> Result<usize> {
        self.sweep();
        let Some(list) = self.list_mut(key)? else {
            return Ok(0);
        };

        let limit = if count == 0 {
            usize::MAX
        } else {
            count.unsigned_abs().try_into().unwrap_or(usize::MAX)
        };
        let mut removed = 0;
        if count >= 0 {
            // only advance when nothing was removed, so adjacent matches are all seen
            let mut i = 0;
            while i < list.len() && removed < limit {
                if list[i] == value {
                    list.remove(i);
                    removed += 1;
                } else {
                    i += 1;
                }
            }
        } else {
            let mut i = list.len();
            while i > 0 && removed < limit {
                i -= 1;
                if list[i] == value {
                    list.remove(i);
                    removed += 1;
                }
            }
        }

        self.drop_if_empty(key);
        Ok(removed)
    }

    /// Execute LINSERT.
    ///
    /// Returns 0 if the list does not exist, -1 if `pivot` is not found,
    /// otherwise the new length.
    pub fn linsert(
        &mut self,
        key: &str,
        position: ListPosition,
        pivot: &str,
        value: &str,
    ) -> Result<i64> {
        self.sweep();
        let Some(list) = self.list_mut(key)? else {
            return Ok(0);
        };
        let Some(at) = list.iter().position(|v| v == pivot) else {
            return Ok(-1);
        };
        let at = match position {
            ListPosition::Before => at,
            ListPosition::After => at + 1,
        };
        list.insert(at, value.to_string());
        Ok(list.len() as i64)
    }

    /// Pops the tail of `source` and pushes it onto the head of `destination`.
    /// `None` and no change when `source` is missing. Source and destination
    /// may be the same list, which rotates it.
    pub fn rpoplpush(&mut self, source: &str, destination: &str) -> Result<Option<String>> {
        self.sweep();
        if self.list(source)?.is_none() {
            return Ok(None);
        }
        if source == destination {
            // rotate in place; the key and its TTL stay untouched
            let Some(list) = self.list_mut(source)? else {
                return Ok(None);
            };
            let value = list.pop_back();
            if let Some(v) = &value {
                list.push_front(v.clone());
            }
            return Ok(value);
        }
        // type-check the destination before touching the source
        self.list(destination)?;

        let Some(value) = self.list_mut(source)?.and_then(VecDeque::pop_back) else {
            return Ok(None);
        };
        self.drop_if_empty(source);
        self.get_or_create_list(destination)?.push_front(value.clone());
        Ok(Some(value))
    }
}
