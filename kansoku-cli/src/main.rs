//! Kansoku CLI - コマンドラインインターフェース
//!
//! 同梱のデモプログラムをウォッチャー付きで実行し、観測結果を標準出力に書き出す。
//! ログは標準エラー出力（`RUST_LOG` で制御）。

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kansoku_core::{ResolutionPolicy, Watcher, WatcherConfig, WriterSink};
use kansoku_host::{Demo, Interpreter, ScriptFrame};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 時間間隔もステップ間隔も指定されなかった場合のダンプ間隔
const DEFAULT_INTERVAL: Duration = Duration::from_millis(200);

/// Kansoku - Line Watcher
#[derive(Parser)]
#[command(name = "kansoku")]
#[command(version = "0.1.0")]
#[command(about = "Watch expressions on source lines of a running script", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: WatchCommand,
}

#[derive(Subcommand)]
enum WatchCommand {
    /// Run a bundled demo program under the watcher
    Run {
        /// Demo program name (see `kansoku list`)
        demo: String,

        /// Dump all values every N trace events
        #[arg(long)]
        steps: Option<u64>,

        /// Dump all values every MS milliseconds (default 200 when --steps is absent)
        #[arg(long = "interval-ms")]
        interval_ms: Option<u64>,

        /// Do not print newly captured values outside the dump schedule
        #[arg(long)]
        no_dump_new: bool,

        /// Log and skip resolution errors instead of aborting the program
        #[arg(long)]
        skip_errors: bool,

        /// Watch LINE:EXPR (repeatable); defaults to the demo's watches
        #[arg(short, long = "watch", value_parser = parse_watch)]
        watches: Vec<(u32, String)>,
    },

    /// List bundled demo programs
    List,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        WatchCommand::Run {
            demo,
            steps,
            interval_ms,
            no_dump_new,
            skip_errors,
            watches,
        } => {
            let demo = Demo::from_name(&demo)
                .with_context(|| format!("Unknown demo '{}' (try `kansoku list`)", demo))?;
            let config = build_config(steps, interval_ms, !no_dump_new, skip_errors);
            run_demo(demo, config, &watches)
        }
        WatchCommand::List => {
            list_demos();
            Ok(())
        }
    }
}

/// コマンドライン引数から設定を組み立てる
fn build_config(
    steps: Option<u64>,
    interval_ms: Option<u64>,
    dump_new: bool,
    skip_errors: bool,
) -> WatcherConfig {
    let policy = if skip_errors {
        ResolutionPolicy::Skip
    } else {
        ResolutionPolicy::Propagate
    };

    let mut config = WatcherConfig::default()
        .with_dump_new(dump_new)
        .with_scope_policy(policy)
        .with_attribute_policy(policy);
    config.step_interval = steps;
    config.time_interval = interval_ms.map(Duration::from_millis);
    if steps.is_none() && interval_ms.is_none() {
        config.time_interval = Some(DEFAULT_INTERVAL);
    }
    config
}

/// デモをウォッチャー付きで実行する
fn run_demo(demo: Demo, config: WatcherConfig, watches: &[(u32, String)]) -> Result<()> {
    let mut watcher = Watcher::new(config)?;
    if watches.is_empty() {
        for (expr, line) in demo.default_watches() {
            watcher.watch(expr, *line)?;
        }
    } else {
        for (line, expr) in watches {
            watcher
                .watch(expr, *line)
                .with_context(|| format!("Cannot watch '{}' at line {}", expr, line))?;
        }
    }
    info!(
        "Running demo '{}' with {} watched lines",
        demo.name(),
        watcher.registry().line_count()
    );

    let program = demo.program();
    let mut session = watcher.start::<ScriptFrame, _>(WriterSink::stdout())?;
    let run = Interpreter::new().run(&program, Some(&mut session));

    // 実行が中断しても捕捉済みの値は出力する
    let stopped = session.stop();
    let summary = run.with_context(|| format!("Demo '{}' aborted", demo.name()))?;
    stopped?;

    eprintln!(
        "{} trace events ({} in light mode)",
        summary.events, summary.light_events
    );
    Ok(())
}

fn list_demos() {
    println!("Available demos:");
    println!();
    for demo in Demo::ALL {
        println!("  {:<12} - {}", demo.name(), demo.description());
        let watches: Vec<String> = demo
            .default_watches()
            .iter()
            .map(|(expr, line)| format!("{}:{}", line, expr))
            .collect();
        println!("  {:<12}   default watches: {}", "", watches.join(" "));
    }
    println!();
    println!("Examples:");
    println!("  kansoku run assignment");
    println!("  kansoku run counter --steps 25 --watch 6:counter.count");
}

/// `LINE:EXPR` 形式のウォッチ指定をパースする
fn parse_watch(s: &str) -> std::result::Result<(u32, String), String> {
    let (line, expr) = s
        .split_once(':')
        .ok_or_else(|| format!("Invalid watch '{}': expected LINE:EXPR", s))?;
    let line = line
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("Invalid line number '{}': {}", line, e))?;
    Ok((line, expr.trim().to_string()))
}
