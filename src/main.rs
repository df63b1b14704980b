// src/main.rs
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Parser;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crab_mock::{Engine, ManualClock, Reply, config};

#[derive(Parser, Debug)]
#[command(name = "crab-mock", about = "In-memory key-value store test double shell")]
struct Args {
    /// JSON 配置文件路径
    #[arg(long, default_value = "crab-mock.json")]
    config: PathBuf,

    /// 从文件读取命令而不是 stdin
    #[arg(long)]
    script: Option<PathBuf>,
}

/// 按空白切分一行命令，双引号内的空白保留
fn split_line(line: &str) -> anyhow::Result<Vec<String>> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            '\\' if in_quotes => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    parts.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if in_quotes {
        bail!("unbalanced quotes");
    }
    if has_token {
        parts.push(current);
    }
    Ok(parts)
}

struct Shell {
    engine: Engine,
    /// 仅在 frozen_clock 配置下存在
    clock: Option<ManualClock>,
    echo: bool,
}

impl Shell {
    /// 处理一行；返回 false 表示退出
    fn handle(&mut self, parts: &[String]) -> bool {
        let Some(name) = parts.first() else {
            return true;
        };
        if self.echo {
            println!("> {}", parts.join(" "));
        }

        match name.to_uppercase().as_str() {
            "TICK" => {
                println!("{}", self.tick(&parts[1..]));
                true
            }
            "MESSAGES" => {
                let reply = match parts.get(1) {
                    Some(channel) => Reply::strings(self.engine.get_messages(channel).to_vec()),
                    None => Reply::Error("ERR usage: MESSAGES <channel>".to_string()),
                };
                println!("{}", reply);
                true
            }
            cmd => {
                let reply = self.engine.execute(parts);
                println!("{}", reply);
                cmd != "QUIT"
            }
        }
    }

    fn tick(&mut self, args: &[String]) -> Reply {
        let Some(clock) = &self.clock else {
            return Reply::Error("ERR TICK requires frozen_clock in the config".to_string());
        };
        match args {
            [secs] => match secs.parse::<i64>() {
                Ok(secs) => Reply::Integer(clock.advance(secs)),
                Err(_) => Reply::Error("ERR value is not an integer or out of range".to_string()),
            },
            _ => Reply::Error("ERR usage: TICK <seconds>".to_string()),
        }
    }

    async fn run<R: AsyncBufRead + Unpin>(&mut self, reader: R) -> anyhow::Result<()> {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            let parts = match split_line(&line) {
                Ok(parts) => parts,
                Err(e) => {
                    warn!(error = %e, "skipping malformed line");
                    println!("(error) ERR {}", e);
                    continue;
                }
            };
            if !self.handle(&parts) {
                break;
            }
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let cfg = config::load(&args.config)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.log_filter))
        .context("invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let (engine, clock) = match cfg.frozen_clock {
        Some(start) => {
            let clock = ManualClock::new(start);
            (Engine::with_clock(clock.clone()), Some(clock))
        }
        None => (Engine::new(), None),
    };
    let mut shell = Shell {
        engine,
        clock,
        echo: cfg.echo,
    };

    match &args.script {
        Some(path) => {
            info!(script = %path.display(), "running script");
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open script {:?}", path))?;
            shell.run(BufReader::new(file)).await?;
        }
        None => {
            info!("reading commands from stdin");
            shell.run(BufReader::new(tokio::io::stdin())).await?;
        }
    }
    Ok(())
}
