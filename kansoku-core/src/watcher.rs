//! ウォッチャーのライフサイクル
//!
//! `Watcher` でウォッチを登録し、`start` でセッションを作成してホストに渡します。
//! セッション中はレジストリを借用しているため、ウォッチの追加はできません。
//! `stop` は必ず最後の全体ダンプを行います。

use crate::config::WatcherConfig;
use crate::registry::WatchRegistry;
use crate::resolver::ObservationSink;
use crate::scheduler;
use crate::tracer::FrameEventTracer;
use crate::{Frame, Result, TraceEvent, TraceHook, TraceMode};
use tracing::info;

/// ウォッチャー
#[derive(Debug, Clone)]
pub struct Watcher {
    config: WatcherConfig,
    registry: WatchRegistry,
}

impl Watcher {
    /// 新しいウォッチャーを作成する
    ///
    /// ダンプ間隔が1つも設定されていない場合は `Configuration` エラー。
    pub fn new(config: WatcherConfig) -> Result<Self> {
        scheduler::validate(config.step_interval, config.time_interval)?;
        Ok(Self {
            config,
            registry: WatchRegistry::new(),
        })
    }

    /// 指定行にウォッチ式を登録する（行番号は1始まり）
    pub fn watch(&mut self, expr: &str, line: u32) -> Result<()> {
        self.registry.register(expr, line)
    }

    pub fn registry(&self) -> &WatchRegistry {
        &self.registry
    }

    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }

    /// トレースセッションを開始する
    pub fn start<F: Frame, S: ObservationSink>(&self, sink: S) -> Result<Session<'_, F, S>> {
        info!(
            "Starting watch session: {} watches on {} lines",
            self.registry
                .watched_lines()
                .map(|line| self.registry.watches(line).len())
                .sum::<usize>(),
            self.registry.line_count()
        );
        Ok(Session {
            tracer: FrameEventTracer::new(&self.registry, &self.config, sink)?,
        })
    }
}

/// 実行中のトレースセッション
///
/// ホストのイベントコールバックとして登録する。
pub struct Session<'w, F: Frame, S> {
    tracer: FrameEventTracer<'w, F, S>,
}

impl<'w, F: Frame, S: ObservationSink> Session<'w, F, S> {
    /// 捕捉済みの全エントリをダンプする
    pub fn dump_all(&mut self) -> Result<()> {
        self.tracer.dump_all()
    }

    pub fn tracer(&self) -> &FrameEventTracer<'w, F, S> {
        &self.tracer
    }

    /// セッションを終了する
    ///
    /// 最後の全体ダンプを行い、出力先を返す。捕捉状態は破棄される。
    pub fn stop(mut self) -> Result<S> {
        self.tracer.dump_all()?;
        info!(
            "Watch session stopped after {} events ({} captured)",
            self.tracer.steps(),
            self.tracer.objects().len()
        );
        Ok(self.tracer.into_sink())
    }
}

impl<'w, F: Frame, S: ObservationSink> TraceHook<F> for Session<'w, F, S> {
    fn on_event(&mut self, frame: &F, event: TraceEvent) -> Result<TraceMode> {
        self.tracer.on_event(frame, event)
    }
}
