//! Kansoku 参照ホスト
//!
//! このクレートは、ウォッチャーを接続できる小さなスクリプト実行エンジンを提供します。
//! 関数、代入、属性への書き込み、呼び出し、return、raise、繰り返しからなる
//! プログラムを実行し、call/line/return/exception のトレースイベントを発行します。

pub mod demos;
pub mod frame;
pub mod interpreter;
pub mod program;
pub mod value;

pub use demos::Demo;
pub use frame::{FrameId, ScriptFrame};
pub use interpreter::{Interpreter, RunSummary, ScriptError};
pub use program::{Expr, Function, Program, Stmt};
pub use value::{Object, Value};

/// ホスト操作の結果型
pub type Result<T> = anyhow::Result<T>;
