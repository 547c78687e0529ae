//! 捕捉した値の解決と出力

use crate::{Expression, Member, Result, WatchError};
use std::fmt;
use std::io::{self, Write};

/// 観測結果の1レコード
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub line: u32,
    pub expression: Expression,
    pub value: String,
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {}) -> {}", self.line, self.expression, self.value)
    }
}

/// ルートオブジェクトから属性チェーンを辿る
///
/// 最初に見つからなかったメンバー名を `Err` で返す。
pub fn resolve<V: Member + Clone>(root: &V, tail: &[String]) -> std::result::Result<V, String> {
    let mut value = root.clone();
    for name in tail {
        value = value.member(name).ok_or_else(|| name.clone())?;
    }
    Ok(value)
}

/// ウォッチ式の値を解決して観測結果を作る
pub fn observe<V>(line: u32, expression: &Expression, root: &V) -> Result<Observation>
where
    V: Member + Clone + fmt::Display,
{
    let value = resolve(root, expression.tail()).map_err(|member| {
        WatchError::AttributeResolution {
            line,
            expression: expression.clone(),
            member,
        }
    })?;

    Ok(Observation {
        line,
        expression: expression.clone(),
        value: value.to_string(),
    })
}

/// 観測結果の出力先
pub trait ObservationSink {
    fn emit(&mut self, observation: Observation) -> Result<()>;
}

/// `io::Write` に1行ずつ書き出す
pub struct WriterSink<W: Write> {
    writer: W,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl WriterSink<io::Stdout> {
    /// 標準出力に書き出すシンク
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ObservationSink for WriterSink<W> {
    fn emit(&mut self, observation: Observation) -> Result<()> {
        writeln!(self.writer, "{}", observation)?;
        self.writer.flush()?;
        Ok(())
    }
}

/// 観測結果をメモリに溜める
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    observations: Vec<Observation>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// 出力形式の文字列として取得する
    pub fn lines(&self) -> Vec<String> {
        self.observations.iter().map(|o| o.to_string()).collect()
    }

    pub fn into_observations(self) -> Vec<Observation> {
        self.observations
    }
}

impl ObservationSink for MemorySink {
    fn emit(&mut self, observation: Observation) -> Result<()> {
        self.observations.push(observation);
        Ok(())
    }
}
