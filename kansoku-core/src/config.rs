//! ウォッチャーの設定

use std::time::Duration;

/// 解決エラーの扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionPolicy {
    /// エラーを呼び出し元に返す（ターゲットの実行は中断される）
    #[default]
    Propagate,
    /// 警告を記録して続行する
    Skip,
}

/// ウォッチャーの設定
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// 全体ダンプを行うイベント間隔
    pub step_interval: Option<u64>,
    /// 全体ダンプを行う時間間隔
    pub time_interval: Option<Duration>,
    /// 新たに捕捉した値を周期外でも即時出力する
    pub dump_new: bool,
    /// ルート識別子が見つからない場合の扱い
    pub scope_policy: ResolutionPolicy,
    /// 属性が見つからない場合の扱い
    pub attribute_policy: ResolutionPolicy,
}

impl WatcherConfig {
    /// ステップ間隔でダンプする設定
    pub fn every_steps(steps: u64) -> Self {
        Self::default().with_step_interval(steps)
    }

    /// 時間間隔でダンプする設定
    pub fn every(interval: Duration) -> Self {
        Self::default().with_time_interval(interval)
    }

    pub fn with_step_interval(mut self, steps: u64) -> Self {
        self.step_interval = Some(steps);
        self
    }

    pub fn with_time_interval(mut self, interval: Duration) -> Self {
        self.time_interval = Some(interval);
        self
    }

    pub fn with_dump_new(mut self, dump_new: bool) -> Self {
        self.dump_new = dump_new;
        self
    }

    pub fn with_scope_policy(mut self, policy: ResolutionPolicy) -> Self {
        self.scope_policy = policy;
        self
    }

    pub fn with_attribute_policy(mut self, policy: ResolutionPolicy) -> Self {
        self.attribute_policy = policy;
        self
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            step_interval: None,
            time_interval: None,
            dump_new: true,
            scope_policy: ResolutionPolicy::Propagate,
            attribute_policy: ResolutionPolicy::Propagate,
        }
    }
}
