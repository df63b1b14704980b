// src/error.rs

//! 错误类型
//!
//! 三类错误，调用方可以按种类分支：
//! - `Server`：与真实协议的错误回复一致，`Display` 输出字面量文本
//! - `NotSupported`：本模拟刻意不实现的命令
//! - `InvalidArgument`：调用时参数格式错误

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Error replies defined by the protocol. The `Display` output is the exact
/// reply text, so callers may match on `to_string()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ServerError {
    #[error("ERR no such key")]
    NoSuchKey,
    #[error("ERR index out of range")]
    IndexOutOfRange,
    #[error("ERR source and destination objects are the same")]
    SameObject,
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,
    #[error("ERR value is not an integer or out of range")]
    NotInteger,
    #[error("ERR value is not a valid float")]
    NotFloat,
    #[error("ERR hash value is not an integer")]
    HashNotInteger,
    #[error("ERR hash value is not a float")]
    HashNotFloat,
    #[error("ERR increment or decrement would overflow")]
    Overflow,
    #[error("ERR increment would produce NaN or Infinity")]
    NanOrInfinity,
    #[error("ERR invalid expire time in 'set' command")]
    InvalidExpireTime,
    #[error("ERR offset is out of range")]
    OffsetOutOfRange,
    #[error("ERR string exceeds maximum allowed size")]
    StringTooLong,
    #[error("ERR syntax error")]
    Syntax,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("ERR command '{0}' is not supported by this emulation")]
    NotSupported(&'static str),

    #[error("ERR invalid argument: {0}")]
    InvalidArgument(String),
}

impl StoreError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        StoreError::InvalidArgument(msg.into())
    }

    /// 协议层面的错误文本
    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn is_not_supported(&self) -> bool {
        matches!(self, StoreError::NotSupported(_))
    }
}
