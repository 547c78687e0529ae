//! Kansoku ウォッチャーのコア機能
//!
//! このクレートは、実行中のプログラムの (行番号, 式) ウォッチを監視する
//! 状態機械を提供します。ウォッチ行が初めて実行された時点でルートオブジェクトを捕捉し、
//! ステップ数または時間間隔で捕捉済みの値を定期的に出力します。
//! ホストの実行エンジンとは `Frame` / `TraceHook` トレイトで接続します。

pub mod config;
pub mod errors;
pub mod expr;
pub mod frame;
pub mod registry;
pub mod resolver;
pub mod scheduler;
pub mod tracer;
pub mod watcher;

pub use config::{ResolutionPolicy, WatcherConfig};
pub use errors::{Result, WatchError};
pub use expr::Expression;
pub use frame::{Frame, Member, TraceEvent, TraceHook, TraceMode};
pub use registry::{ActivationSet, ObjectStore, WatchKey, WatchRegistry};
pub use resolver::{observe, resolve, MemorySink, Observation, ObservationSink, WriterSink};
pub use scheduler::DumpScheduler;
pub use tracer::FrameEventTracer;
pub use watcher::{Session, Watcher};
