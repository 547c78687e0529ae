//! ホスト実行エンジンとのインターフェース
//!
//! ホストはトレース可能なイベントごとにフレームハンドルとイベント種別を渡し、
//! 次のイベントで使うトレースモードを受け取ります。

use crate::Result;
use std::fmt;

/// トレースイベントの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent {
    /// 関数呼び出し
    Call,
    /// 新しい行の実行開始
    Line,
    /// 関数からの復帰
    Return,
    /// 例外の発生
    Exception,
}

/// 次のイベントで使うハンドラ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceMode {
    /// 捕捉処理を行う通常モード
    Full,
    /// 全ウォッチの捕捉後に使う軽量モード
    Light,
}

/// 属性アクセス
///
/// 見つからない場合は None を返す。
pub trait Member: Sized {
    fn member(&self, name: &str) -> Option<Self>;
}

/// 実行中フレームのハンドル
///
/// トレーサーは直前のフレームを保持するため、Clone は安価であること。
pub trait Frame: Clone {
    /// スコープから取り出せる値
    type Value: Member + Clone + fmt::Display;
    /// フレームの同一性
    type Id: PartialEq + fmt::Debug;

    /// 現在の行番号
    fn line(&self) -> u32;

    /// ローカル変数を参照する
    fn lookup_local(&self, name: &str) -> Option<Self::Value>;

    /// グローバル変数を参照する
    fn lookup_global(&self, name: &str) -> Option<Self::Value>;

    /// 呼び出し元フレームの識別子
    fn caller(&self) -> Option<Self::Id>;
}

/// ホストに登録するイベントコールバック
///
/// `Err` を返した場合、ホストはターゲットの実行を中断する。
pub trait TraceHook<F: Frame> {
    fn on_event(&mut self, frame: &F, event: TraceEvent) -> Result<TraceMode>;
}
