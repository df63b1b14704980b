// src/engine/unsupported.rs

//! Commands this emulation deliberately leaves out.
//!
//! Each one fails immediately with `StoreError::NotSupported`, never with a
//! partial result, so callers can tell "the real store errors here" apart from
//! "the double does not do this".

use tracing::debug;

use crate::error::{Result, StoreError};

use super::Engine;

pub const UNSUPPORTED: &[&str] = &[
    // transactions
    "MULTI",
    "EXEC",
    "DISCARD",
    "WATCH",
    "UNWATCH",
    // blocking pops
    "BLPOP",
    "BRPOP",
    "BRPOPLPUSH",
    "BLMOVE",
    // bitwise string ops
    "SETBIT",
    "GETBIT",
    "BITCOUNT",
    "BITOP",
    "BITPOS",
    "BITFIELD",
    // key introspection / iteration
    "SORT",
    "TYPE",
    "SCAN",
    "HSCAN",
    "DUMP",
    "RESTORE",
    "OBJECT",
    "MOVE",
    // live subscriptions
    "SUBSCRIBE",
    "PSUBSCRIBE",
    "UNSUBSCRIBE",
    "PUNSUBSCRIBE",
    // raw execution
    "COMMAND",
    "EVAL",
    "EVALSHA",
    "SCRIPT",
];

/// Canonical name when `command` (any case) is on the unsupported list.
pub fn lookup(command: &str) -> Option<&'static str> {
    UNSUPPORTED
        .iter()
        .copied()
        .find(|name| name.eq_ignore_ascii_case(command))
}

pub(crate) fn refuse<T>(command: &'static str) -> Result<T> {
    debug!(command, "refusing unsupported command");
    Err(StoreError::NotSupported(command))
}

impl Engine {
    pub fn multi(&mut self) -> Result<()> {
        refuse("MULTI")
    }

    pub fn exec(&mut self) -> Result<()> {
        refuse("EXEC")
    }

    pub fn discard(&mut self) -> Result<()> {
        refuse("DISCARD")
    }

    pub fn watch(&mut self, _keys: &[&str]) -> Result<()> {
        refuse("WATCH")
    }

    pub fn unwatch(&mut self) -> Result<()> {
        refuse("UNWATCH")
    }

    pub fn blpop(&mut self, _keys: &[&str], _timeout: i64) -> Result<Option<(String, String)>> {
        refuse("BLPOP")
    }

    pub fn brpop(&mut self, _keys: &[&str], _timeout: i64) -> Result<Option<(String, String)>> {
        refuse("BRPOP")
    }

    pub fn brpoplpush(
        &mut self,
        _source: &str,
        _destination: &str,
        _timeout: i64,
    ) -> Result<Option<String>> {
        refuse("BRPOPLPUSH")
    }

    pub fn setbit(&mut self, _key: &str, _offset: u64, _bit: bool) -> Result<bool> {
        refuse("SETBIT")
    }

    pub fn getbit(&mut self, _key: &str, _offset: u64) -> Result<bool> {
        refuse("GETBIT")
    }

    pub fn bitcount(&mut self, _key: &str) -> Result<usize> {
        refuse("BITCOUNT")
    }

    pub fn bitop(&mut self, _operation: &str, _destination: &str, _keys: &[&str]) -> Result<usize> {
        refuse("BITOP")
    }

    pub fn sort(&mut self, _key: &str) -> Result<Vec<String>> {
        refuse("SORT")
    }

    /// `TYPE`; named `key_type` since `type` is reserved.
    pub fn key_type(&mut self, _key: &str) -> Result<String> {
        refuse("TYPE")
    }

    pub fn scan(&mut self, _cursor: u64) -> Result<(u64, Vec<String>)> {
        refuse("SCAN")
    }

    pub fn hscan(&mut self, _key: &str, _cursor: u64) -> Result<(u64, Vec<(String, String)>)> {
        refuse("HSCAN")
    }

    pub fn dump(&mut self, _key: &str) -> Result<Vec<u8>> {
        refuse("DUMP")
    }

    pub fn object(&mut self, _subcommand: &str, _key: &str) -> Result<String> {
        refuse("OBJECT")
    }

    /// `MOVE`; there is only one logical database.
    pub fn move_to_db(&mut self, _key: &str, _db: u32) -> Result<bool> {
        refuse("MOVE")
    }

    pub fn subscribe(&mut self, _channels: &[&str]) -> Result<()> {
        refuse("SUBSCRIBE")
    }

    pub fn psubscribe(&mut self, _patterns: &[&str]) -> Result<()> {
        refuse("PSUBSCRIBE")
    }

    /// Arbitrary command execution bypassing the typed surface.
    pub fn raw_command(&mut self, _args: &[&str]) -> Result<()> {
        refuse("COMMAND")
    }
}
