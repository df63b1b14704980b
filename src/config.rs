// src/config.rs
use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// 命令 shell 启动时读取的配置
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// 未设置 RUST_LOG 时使用的 tracing 过滤器
    pub log_filter: String,
    /// 冻结时钟的起始 unix 秒；设置后 shell 支持 `TICK <秒>`
    pub frozen_clock: Option<i64>,
    /// 回复前回显命令
    pub echo: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_filter: "info".to_string(),
            frozen_clock: None,
            echo: false,
        }
    }
}

/// 从指定路径读取并反序列化 JSON 配置，文件不存在时使用默认值
pub fn load<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path_ref = path.as_ref();

    if !path_ref.exists() {
        info!(path = %path_ref.display(), "config file not found, using defaults");
        return Ok(Config::default());
    }

    let data = fs::read_to_string(path_ref)
        .with_context(|| format!("Failed to read config file {:?}", path_ref))?;
    let cfg: Config = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse config file {:?}", path_ref))?;
    Ok(cfg)
}
