// src/lib.rs
//! crab_mock 库：内存版键值存储测试替身
//! clock / glob / expire / types / store / pubsub / engine / config

pub mod clock;   // 可注入时钟
pub mod config;  // JSON 配置
pub mod engine;  // 文本命令分发 + 不支持的命令
pub mod error;   // 错误类型
pub mod expire;  // 惰性过期策略
pub mod glob;    // KEYS 通配符匹配
pub mod pubsub;  // 发布消息记录
pub mod store;   // 键空间 + 值存储
pub mod types;   // String / Hash / List 命令族

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{Engine, Reply};
pub use error::{Result, ServerError, StoreError};
pub use pubsub::PubSub;
pub use store::Store;
pub use types::{ListPosition, MapValue, SetCondition, SetExpiration, SetOptions, Value};
