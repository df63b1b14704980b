// src/engine/reply.rs

//! 命令回复
//!
//! `Reply` 是分发器的返回值，`Display` 按 redis-cli 的样式渲染：
//! `OK`、`(integer) 1`、`"bar"`、`(nil)`、编号数组、`(error) ERR ...`

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// 状态回复，如 OK / PONG
    Status(String),
    Integer(i64),
    /// 字符串回复，None 表示 nil
    Bulk(Option<String>),
    Array(Vec<Option<String>>),
    Error(String),
}

impl Reply {
    pub fn ok() -> Self {
        Reply::Status("OK".to_string())
    }

    pub fn status(s: &str) -> Self {
        Reply::Status(s.to_string())
    }

    pub fn bulk(s: impl Into<String>) -> Self {
        Reply::Bulk(Some(s.into()))
    }

    pub fn nil() -> Self {
        Reply::Bulk(None)
    }

    pub fn flag(b: bool) -> Self {
        Reply::Integer(i64::from(b))
    }

    pub fn count(n: usize) -> Self {
        Reply::Integer(i64::try_from(n).unwrap_or(i64::MAX))
    }

    pub fn strings(items: Vec<String>) -> Self {
        Reply::Array(items.into_iter().map(Some).collect())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }
}

impl From<Option<String>> for Reply {
    fn from(v: Option<String>) -> Self {
        Reply::Bulk(v)
    }
}

/// 加引号输出；不可打印字节按 `\xNN` 转义
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let mut buf = [0u8; 4];
                for b in c.encode_utf8(&mut buf).bytes() {
                    out.push_str("\\x");
                    out.push_str(&hex::encode([b]));
                }
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn item(v: &Option<String>) -> String {
    match v {
        Some(s) => quote(s),
        None => "(nil)".to_string(),
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Status(s) => write!(f, "{}", s),
            Reply::Integer(n) => write!(f, "(integer) {}", n),
            Reply::Bulk(v) => write!(f, "{}", item(v)),
            Reply::Array(items) if items.is_empty() => write!(f, "(empty array)"),
            Reply::Array(items) => {
                let width = items.len().to_string().len();
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{:>width$}) {}", i + 1, item(v), width = width)?;
                }
                Ok(())
            }
            Reply::Error(e) => write!(f, "(error) {}", e),
        }
    }
}
