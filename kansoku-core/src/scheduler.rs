//! ダンプのスケジューリング
//!
//! イベント数（ステップ間隔）または経過時間（時間間隔）で全体ダンプの
//! タイミングを判定します。時間間隔はイベント駆動で評価されるため、
//! イベントが来なければダンプも起きません。

use crate::{Result, WatchError};
use std::time::{Duration, Instant};

/// ダンプスケジューラ
#[derive(Debug, Clone)]
pub struct DumpScheduler {
    step_interval: Option<u64>,
    time_interval: Option<Duration>,
    steps: u64,
    last_dump: Instant,
}

impl DumpScheduler {
    /// 新しいスケジューラを作成する
    ///
    /// どちらの間隔も指定されていない、またはゼロの場合はエラー。
    pub fn new(step_interval: Option<u64>, time_interval: Option<Duration>) -> Result<Self> {
        validate(step_interval, time_interval)?;
        Ok(Self {
            step_interval,
            time_interval,
            steps: 0,
            last_dump: Instant::now(),
        })
    }

    /// 1イベント分進めてダンプが必要か判定する
    pub fn check(&mut self) -> bool {
        self.check_at(Instant::now())
    }

    /// 指定時刻で判定する
    ///
    /// 時間間隔の計測は時間によるダンプでのみリセットされる。
    pub fn check_at(&mut self, now: Instant) -> bool {
        self.steps += 1;

        if let Some(interval) = self.step_interval {
            if self.steps % interval == 0 {
                return true;
            }
        }

        if let Some(interval) = self.time_interval {
            if now.saturating_duration_since(self.last_dump) >= interval {
                self.last_dump = now;
                return true;
            }
        }

        false
    }

    /// これまでに処理したイベント数
    pub fn steps(&self) -> u64 {
        self.steps
    }
}

/// 間隔設定を検証する
pub(crate) fn validate(step_interval: Option<u64>, time_interval: Option<Duration>) -> Result<()> {
    match (step_interval, time_interval) {
        (None, None) => Err(WatchError::Configuration(
            "step interval or time interval must be set".to_string(),
        )),
        (Some(0), _) => Err(WatchError::Configuration(
            "step interval must be positive".to_string(),
        )),
        (_, Some(t)) if t.is_zero() => Err(WatchError::Configuration(
            "time interval must be positive".to_string(),
        )),
        _ => Ok(()),
    }
}
