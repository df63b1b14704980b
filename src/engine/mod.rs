// src/engine/mod.rs

//! # 引擎模块
//!
//! `Engine` 把 `Store`（键值命令）和 `PubSub`（消息记录）并排组合在一起，
//! 并提供文本命令分发：
//! - 接收已切分的命令（`&[String]`），命令名大小写不敏感
//! - 检查参数个数，解析数字参数
//! - 委托给 `Store` / `PubSub` 的类型化接口执行
//! - 返回 `Reply`，错误统一转换为 `Reply::Error`
//!
//! 交互 shell 和集成测试都通过 `execute` 驱动引擎。

pub mod reply;
pub mod unsupported;

pub use reply::Reply;

use tracing::debug;

use crate::clock::Clock;
use crate::error::{Result, ServerError, StoreError};
use crate::pubsub::PubSub;
use crate::store::Store;
use crate::types::{ListPosition, SetOptions, format_float};

#[derive(Debug, Default)]
pub struct Engine {
    pub store: Store,
    pub pubsub: PubSub,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Engine {
            store: Store::with_clock(clock),
            pubsub: PubSub::new(),
        }
    }

    /// 测试夹具的重置钩子：清空所有 key 以及所有频道的消息
    pub fn flushdb(&mut self) -> &'static str {
        self.pubsub.clear();
        self.store.flushdb()
    }

    /// 只有一个逻辑库，等同于 `flushdb`
    pub fn flushall(&mut self) -> &'static str {
        self.flushdb()
    }

    pub fn publish(&mut self, channel: &str, message: &str) -> usize {
        self.pubsub.publish(channel, message)
    }

    pub fn get_messages(&self, channel: &str) -> &[String] {
        self.pubsub.get_messages(channel)
    }

    /// 执行一条文本命令
    ///
    /// # 参数
    ///
    /// * `parts` - 命令名及其参数，例如 `["SET", "foo", "bar"]`
    pub fn execute(&mut self, parts: &[String]) -> Reply {
        let Some((name, args)) = parts.split_first() else {
            return Reply::Error("ERR empty command".to_string());
        };
        let cmd = name.to_uppercase();
        match self.dispatch(&cmd, args) {
            Ok(reply) => reply,
            Err(e) => {
                debug!(command = %cmd, error = %e, "command failed");
                Reply::Error(e.to_string())
            }
        }
    }

    fn dispatch(&mut self, cmd: &str, args: &[String]) -> Result<Reply> {
        if let Some(name) = unsupported::lookup(cmd) {
            return unsupported::refuse(name);
        }

        let s = &mut self.store;
        let reply = match cmd {
            // --- 连接 / 控制 ---
            "PING" => {
                at_most(cmd, args, 1)?;
                match args.first() {
                    Some(msg) => Reply::bulk(msg.as_str()),
                    None => Reply::status("PONG"),
                }
            }
            "ECHO" => {
                exact(cmd, args, 1)?;
                Reply::bulk(args[0].as_str())
            }
            "QUIT" => Reply::ok(),
            "FLUSHDB" | "FLUSHALL" => {
                exact(cmd, args, 0)?;
                Reply::status(self.flushdb())
            }

            // --- Key 空间 ---
            "DEL" => {
                at_least(cmd, args, 1)?;
                Reply::count(s.del(&strs(args)))
            }
            "EXISTS" => {
                at_least(cmd, args, 1)?;
                let n = args.iter().filter(|k| s.exists(k)).count();
                Reply::count(n)
            }
            "EXPIRE" => {
                exact(cmd, args, 2)?;
                Reply::flag(s.expire(&args[0], int(&args[1])?))
            }
            "PEXPIRE" => {
                exact(cmd, args, 2)?;
                Reply::flag(s.pexpire(&args[0], int(&args[1])?))
            }
            "EXPIREAT" => {
                exact(cmd, args, 2)?;
                Reply::flag(s.expireat(&args[0], int(&args[1])?))
            }
            "PEXPIREAT" => {
                exact(cmd, args, 2)?;
                Reply::flag(s.pexpireat(&args[0], int(&args[1])?))
            }
            "PERSIST" => {
                exact(cmd, args, 1)?;
                Reply::flag(s.persist(&args[0]))
            }
            "TTL" => {
                exact(cmd, args, 1)?;
                Reply::Integer(s.ttl(&args[0]))
            }
            "PTTL" => {
                exact(cmd, args, 1)?;
                Reply::Integer(s.pttl(&args[0]))
            }
            "KEYS" => {
                exact(cmd, args, 1)?;
                Reply::strings(s.keys(&args[0]))
            }
            "RANDOMKEY" => {
                exact(cmd, args, 0)?;
                Reply::Bulk(s.randomkey())
            }
            "DBSIZE" => {
                exact(cmd, args, 0)?;
                Reply::count(s.dbsize())
            }
            "RENAME" => {
                exact(cmd, args, 2)?;
                Reply::status(s.rename(&args[0], &args[1])?)
            }
            "RENAMENX" => {
                exact(cmd, args, 2)?;
                Reply::flag(s.renamenx(&args[0], &args[1])?)
            }

            // --- String ---
            "GET" => {
                exact(cmd, args, 1)?;
                Reply::Bulk(s.get(&args[0])?)
            }
            "SET" => {
                at_least(cmd, args, 2)?;
                let opts = SetOptions::parse(&args[2..])?;
                match s.set_with(&args[0], &args[1], opts)? {
                    Some(status) => Reply::status(status),
                    None => Reply::nil(),
                }
            }
            "SETNX" => {
                exact(cmd, args, 2)?;
                Reply::flag(s.setnx(&args[0], &args[1]))
            }
            "SETEX" => {
                exact(cmd, args, 3)?;
                Reply::status(s.setex(&args[0], int(&args[1])?, &args[2])?)
            }
            "PSETEX" => {
                exact(cmd, args, 3)?;
                Reply::status(s.psetex(&args[0], int(&args[1])?, &args[2])?)
            }
            "GETSET" => {
                exact(cmd, args, 2)?;
                Reply::Bulk(s.getset(&args[0], &args[1])?)
            }
            "GETDEL" => {
                exact(cmd, args, 1)?;
                Reply::Bulk(s.getdel(&args[0])?)
            }
            "GETRANGE" => {
                exact(cmd, args, 3)?;
                Reply::bulk(s.getrange(&args[0], int(&args[1])?, int(&args[2])?)?)
            }
            "SETRANGE" => {
                exact(cmd, args, 3)?;
                Reply::count(s.setrange(&args[0], int(&args[1])?, &args[2])?)
            }
            "APPEND" => {
                exact(cmd, args, 2)?;
                Reply::count(s.append(&args[0], &args[1])?)
            }
            "STRLEN" => {
                exact(cmd, args, 1)?;
                Reply::count(s.strlen(&args[0])?)
            }
            "INCR" => {
                exact(cmd, args, 1)?;
                Reply::Integer(s.incr(&args[0])?)
            }
            "DECR" => {
                exact(cmd, args, 1)?;
                Reply::Integer(s.decr(&args[0])?)
            }
            "INCRBY" => {
                exact(cmd, args, 2)?;
                Reply::Integer(s.incrby(&args[0], int(&args[1])?)?)
            }
            "DECRBY" => {
                exact(cmd, args, 2)?;
                Reply::Integer(s.decrby(&args[0], int(&args[1])?)?)
            }
            "INCRBYFLOAT" => {
                exact(cmd, args, 2)?;
                Reply::bulk(format_float(s.incrbyfloat(&args[0], float(&args[1])?)?))
            }
            "MGET" => {
                at_least(cmd, args, 1)?;
                Reply::Array(s.mget(&strs(args)))
            }
            "MSET" => Reply::status(s.mset(&pairs(cmd, args)?)),
            "MSETNX" => Reply::flag(s.msetnx(&pairs(cmd, args)?)),

            // --- Hash ---
            "HSET" => {
                exact(cmd, args, 3)?;
                Reply::flag(s.hset(&args[0], &args[1], &args[2])?)
            }
            "HSETNX" => {
                exact(cmd, args, 3)?;
                Reply::flag(s.hsetnx(&args[0], &args[1], &args[2])?)
            }
            "HGET" => {
                exact(cmd, args, 2)?;
                Reply::Bulk(s.hget(&args[0], &args[1])?)
            }
            "HDEL" => {
                at_least(cmd, args, 2)?;
                Reply::count(s.hdel(&args[0], &strs(&args[1..]))?)
            }
            "HEXISTS" => {
                exact(cmd, args, 2)?;
                Reply::flag(s.hexists(&args[0], &args[1])?)
            }
            "HLEN" => {
                exact(cmd, args, 1)?;
                Reply::count(s.hlen(&args[0])?)
            }
            "HSTRLEN" => {
                exact(cmd, args, 2)?;
                Reply::count(s.hstrlen(&args[0], &args[1])?)
            }
            "HKEYS" => {
                exact(cmd, args, 1)?;
                Reply::strings(s.hkeys(&args[0])?)
            }
            "HVALS" => {
                exact(cmd, args, 1)?;
                Reply::strings(s.hvals(&args[0])?)
            }
            "HGETALL" => {
                exact(cmd, args, 1)?;
                let flat = s
                    .hgetall(&args[0])?
                    .into_iter()
                    .flat_map(|(f, v)| [f, v])
                    .collect();
                Reply::strings(flat)
            }
            "HINCRBY" => {
                exact(cmd, args, 3)?;
                Reply::Integer(s.hincrby(&args[0], &args[1], int(&args[2])?)?)
            }
            "HINCRBYFLOAT" => {
                exact(cmd, args, 3)?;
                let next = s.hincrbyfloat(&args[0], &args[1], float(&args[2])?)?;
                Reply::bulk(format_float(next))
            }
            "HMSET" => {
                at_least(cmd, args, 3)?;
                Reply::status(s.hmset(&args[0], &pairs(cmd, &args[1..])?)?)
            }
            "HMGET" => {
                at_least(cmd, args, 2)?;
                Reply::Array(s.hmget(&args[0], &strs(&args[1..]))?)
            }

            // --- List ---
            "LPUSH" | "RPUSH" | "LPUSHX" | "RPUSHX" => {
                at_least(cmd, args, 2)?;
                let values = strs(&args[1..]);
                let len = match cmd {
                    "LPUSH" => s.lpush(&args[0], &values)?,
                    "RPUSH" => s.rpush(&args[0], &values)?,
                    "LPUSHX" => s.lpushx(&args[0], &values)?,
                    _ => s.rpushx(&args[0], &values)?,
                };
                Reply::count(len)
            }
            "LPOP" => {
                exact(cmd, args, 1)?;
                Reply::Bulk(s.lpop(&args[0])?)
            }
            "RPOP" => {
                exact(cmd, args, 1)?;
                Reply::Bulk(s.rpop(&args[0])?)
            }
            "LLEN" => {
                exact(cmd, args, 1)?;
                Reply::count(s.llen(&args[0])?)
            }
            "LINDEX" => {
                exact(cmd, args, 2)?;
                Reply::Bulk(s.lindex(&args[0], int(&args[1])?)?)
            }
            "LSET" => {
                exact(cmd, args, 3)?;
                Reply::status(s.lset(&args[0], int(&args[1])?, &args[2])?)
            }
            "LRANGE" => {
                exact(cmd, args, 3)?;
                Reply::strings(s.lrange(&args[0], int(&args[1])?, int(&args[2])?)?)
            }
            "LTRIM" => {
                exact(cmd, args, 3)?;
                Reply::status(s.ltrim(&args[0], int(&args[1])?, int(&args[2])?)?)
            }
            "LREM" => {
                exact(cmd, args, 3)?;
                Reply::count(s.lrem(&args[0], int(&args[1])?, &args[2])?)
            }
            "LINSERT" => {
                exact(cmd, args, 4)?;
                let position: ListPosition = args[1].parse()?;
                Reply::Integer(s.linsert(&args[0], position, &args[2], &args[3])?)
            }
            "RPOPLPUSH" => {
                exact(cmd, args, 2)?;
                Reply::Bulk(s.rpoplpush(&args[0], &args[1])?)
            }

            // --- Pub/Sub ---
            "PUBLISH" => {
                exact(cmd, args, 2)?;
                Reply::count(self.publish(&args[0], &args[1]))
            }

            other => Reply::Error(format!("ERR unknown command '{}'", other.to_lowercase())),
        };
        Ok(reply)
    }
}

fn wrong_arity(cmd: &str) -> StoreError {
    StoreError::invalid(format!(
        "wrong number of arguments for '{}' command",
        cmd.to_lowercase()
    ))
}

fn exact(cmd: &str, args: &[String], n: usize) -> Result<()> {
    if args.len() == n { Ok(()) } else { Err(wrong_arity(cmd)) }
}

fn at_least(cmd: &str, args: &[String], n: usize) -> Result<()> {
    if args.len() >= n { Ok(()) } else { Err(wrong_arity(cmd)) }
}

fn at_most(cmd: &str, args: &[String], n: usize) -> Result<()> {
    if args.len() <= n { Ok(()) } else { Err(wrong_arity(cmd)) }
}

fn int(s: &str) -> Result<i64> {
    s.parse::<i64>().map_err(|_| ServerError::NotInteger.into())
}

fn float(s: &str) -> Result<f64> {
    match s.parse::<f64>() {
        Ok(f) if f.is_finite() => Ok(f),
        _ => Err(ServerError::NotFloat.into()),
    }
}

fn strs(args: &[String]) -> Vec<&str> {
    args.iter().map(String::as_str).collect()
}

/// `k1 v1 k2 v2 ...` → `[(k1, v1), (k2, v2)]`；个数必须为非零偶数
fn pairs<'a>(cmd: &str, args: &'a [String]) -> Result<Vec<(&'a str, &'a str)>> {
    if args.is_empty() || args.len() % 2 != 0 {
        return Err(wrong_arity(cmd));
    }
    Ok(args
        .chunks_exact(2)
        .map(|kv| (kv[0].as_str(), kv[1].as_str()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::OK;

    /// 辅助：把 &str 切片转成 Vec<String>
    fn cmd(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    fn run(engine: &mut Engine, parts: &[&str]) -> Reply {
        engine.execute(&cmd(parts))
    }

    fn make_engine() -> (Engine, ManualClock) {
        let clock = ManualClock::new(1_700_000_000);
        (Engine::with_clock(clock.clone()), clock)
    }

    // 字符串命令测试
    #[test]
    fn test_string_commands() {
        let (mut e, _) = make_engine();
        assert_eq!(run(&mut e, &["SET", "key1", "value1"]), Reply::ok());
        assert_eq!(run(&mut e, &["get", "key1"]), Reply::bulk("value1"));
        assert_eq!(run(&mut e, &["GET", "nonexistence"]), Reply::nil());

        run(&mut e, &["SET", "counter", "10"]);
        assert_eq!(run(&mut e, &["INCR", "counter"]), Reply::Integer(11));
        assert_eq!(run(&mut e, &["DECRBY", "counter", "5"]), Reply::Integer(6));
        assert_eq!(run(&mut e, &["INCRBYFLOAT", "counter", "0.5"]), Reply::bulk("6.5"));
        assert_eq!(run(&mut e, &["DEL", "key1", "counter", "x"]), Reply::Integer(2));

        run(&mut e, &["SET", "f", "0.1"]);
        assert_eq!(run(&mut e, &["INCRBYFLOAT", "f", "0.2"]), Reply::bulk("0.3"));
        assert_eq!(run(&mut e, &["HINCRBYFLOAT", "h", "f", "0.1"]), Reply::bulk("0.1"));
        assert_eq!(run(&mut e, &["HINCRBYFLOAT", "h", "f", "0.2"]), Reply::bulk("0.3"));
        assert_eq!(
            run(&mut e, &["SETRANGE", "big", "9223372036854775807", "x"]),
            Reply::Error("ERR string exceeds maximum allowed size".to_string())
        );
    }

    #[test]
    fn test_set_options() {
        let (mut e, clock) = make_engine();
        assert_eq!(run(&mut e, &["SET", "k", "v", "XX"]), Reply::nil());
        assert_eq!(run(&mut e, &["SET", "k", "v", "NX", "EX", "10"]), Reply::ok());
        assert_eq!(run(&mut e, &["SET", "k", "w", "NX"]), Reply::nil());
        assert_eq!(run(&mut e, &["TTL", "k"]), Reply::Integer(10));
        assert!(run(&mut e, &["SET", "k", "v", "EX", "1", "PX", "5"]).is_error());

        clock.advance(10);
        assert_eq!(run(&mut e, &["EXISTS", "k"]), Reply::Integer(0));
    }

    #[test]
    fn test_hash_commands() {
        let (mut e, _) = make_engine();
        assert_eq!(run(&mut e, &["HSET", "h", "f", "1"]), Reply::Integer(1));
        assert_eq!(run(&mut e, &["HSET", "h", "f", "2"]), Reply::Integer(0));
        assert_eq!(run(&mut e, &["HGET", "h", "f"]), Reply::bulk("2"));
        assert_eq!(run(&mut e, &["HMSET", "h", "a", "x", "b", "y"]), Reply::ok());
        assert_eq!(
            run(&mut e, &["HGETALL", "h"]),
            Reply::strings(cmd(&["f", "2", "a", "x", "b", "y"]))
        );
        assert_eq!(
            run(&mut e, &["HMGET", "h", "a", "zz"]),
            Reply::Array(vec![Some("x".to_string()), None])
        );
        assert_eq!(run(&mut e, &["HDEL", "h", "a", "b"]), Reply::Integer(2));
        assert_eq!(run(&mut e, &["HKEYS", "h"]), Reply::strings(cmd(&["f"])));
    }

    // 列表命令测试
    #[test]
    fn test_list_commands() {
        let (mut e, _) = make_engine();
        assert_eq!(run(&mut e, &["RPUSH", "l", "hello", "bar"]), Reply::Integer(2));
        assert_eq!(
            run(&mut e, &["LINSERT", "l", "after", "hello", "world"]),
            Reply::Integer(3)
        );
        assert_eq!(
            run(&mut e, &["LRANGE", "l", "0", "-1"]),
            Reply::strings(cmd(&["hello", "world", "bar"]))
        );
        assert_eq!(run(&mut e, &["LPOP", "l"]), Reply::bulk("hello"));
        assert_eq!(run(&mut e, &["LLEN", "l"]), Reply::Integer(2));
        assert_eq!(
            run(&mut e, &["LSET", "l", "5", "x"]),
            Reply::Error("ERR index out of range".to_string())
        );
        assert!(run(&mut e, &["LINSERT", "l", "middle", "a", "b"]).is_error());
    }

    // 过期命令测试
    #[test]
    fn test_expire_commands() {
        let (mut e, clock) = make_engine();
        assert_eq!(run(&mut e, &["EXPIRE", "missing", "10"]), Reply::Integer(0));
        run(&mut e, &["SET", "temp", "value"]);
        assert_eq!(run(&mut e, &["EXPIRE", "temp", "60"]), Reply::Integer(1));
        assert_eq!(run(&mut e, &["PTTL", "temp"]), Reply::Integer(60_000));
        assert_eq!(run(&mut e, &["PERSIST", "temp"]), Reply::Integer(1));
        assert_eq!(run(&mut e, &["TTL", "temp"]), Reply::Integer(-1));

        run(&mut e, &["PEXPIRE", "temp", "1"]);
        clock.advance(1);
        assert_eq!(run(&mut e, &["TTL", "temp"]), Reply::Integer(-2));
    }

    #[test]
    fn test_rename_errors_carry_literal_text() {
        let (mut e, _) = make_engine();
        assert_eq!(
            run(&mut e, &["RENAME", "a", "b"]),
            Reply::Error("ERR no such key".to_string())
        );
        run(&mut e, &["SET", "a", "1"]);
        assert_eq!(
            run(&mut e, &["RENAME", "a", "a"]),
            Reply::Error("ERR source and destination objects are the same".to_string())
        );
        assert_eq!(run(&mut e, &["RENAME", "a", "b"]), Reply::ok());
    }

    #[test]
    fn test_unsupported_commands_are_refused() {
        let (mut e, _) = make_engine();
        for name in ["MULTI", "exec", "BLPOP", "SORT", "TYPE", "SCAN", "SUBSCRIBE"] {
            let reply = run(&mut e, &[name, "k", "0"]);
            let Reply::Error(text) = reply else {
                panic!("{} should be refused", name);
            };
            assert!(text.contains("not supported"), "{}", text);
        }
    }

    #[test]
    fn test_argument_errors() {
        let (mut e, _) = make_engine();
        assert_eq!(
            run(&mut e, &["SET", "Key"]),
            Reply::Error(
                "ERR invalid argument: wrong number of arguments for 'set' command".to_string()
            )
        );
        assert!(run(&mut e, &["GET", "key", "extra"]).is_error());
        assert!(run(&mut e, &["MSET", "a", "1", "b"]).is_error());
        assert_eq!(
            run(&mut e, &["EXPIRE", "k", "soon"]),
            Reply::Error("ERR value is not an integer or out of range".to_string())
        );
        assert_eq!(
            run(&mut e, &["NOPE"]),
            Reply::Error("ERR unknown command 'nope'".to_string())
        );
        assert!(e.execute(&[]).is_error());
    }

    #[test]
    fn test_pubsub_and_flush() {
        let (mut e, _) = make_engine();
        assert_eq!(run(&mut e, &["PUBLISH", "news", "hi"]), Reply::Integer(0));
        assert_eq!(e.get_messages("news"), ["hi"]);
        run(&mut e, &["SET", "k", "v"]);
        assert_eq!(run(&mut e, &["FLUSHALL"]), Reply::ok());
        assert!(e.get_messages("news").is_empty());
        assert_eq!(run(&mut e, &["DBSIZE"]), Reply::Integer(0));
        assert_eq!(e.flushdb(), OK);
    }

    // 控制命令测试
    #[test]
    fn test_control_commands() {
        let (mut e, _) = make_engine();
        assert_eq!(run(&mut e, &["PING"]), Reply::status("PONG"));
        assert_eq!(run(&mut e, &["PING", "hey"]), Reply::bulk("hey"));
        assert_eq!(run(&mut e, &["ECHO", "x"]), Reply::bulk("x"));
        assert_eq!(run(&mut e, &["QUIT"]), Reply::ok());
    }
}
