//! ウォッチャーのエラー型

use crate::expr::Expression;

/// ウォッチャーの結果型
pub type Result<T> = std::result::Result<T, WatchError>;

/// ウォッチャーで発生するエラー
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// 識別子またはドット区切りの属性チェーン以外の式
    #[error("Invalid expression '{text}': expected an identifier or a dotted attribute chain")]
    InvalidExpression { text: String },

    /// 行番号は1始まり
    #[error("Invalid line number {line}: line numbers start at 1")]
    InvalidLine { line: u32 },

    /// ダンプ間隔の設定エラー
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// ルート識別子がローカルにもグローバルにも存在しない
    #[error("Line {line}: name '{name}' not found in local or global scope")]
    ScopeResolution { line: u32, name: String },

    /// 属性チェーンの途中でメンバーが見つからない
    #[error("Line {line}: {expression} has no member '{member}'")]
    AttributeResolution {
        line: u32,
        expression: Expression,
        member: String,
    },

    /// 観測結果の出力に失敗した
    #[error("Failed to write observation: {0}")]
    Output(#[from] std::io::Error),
}
