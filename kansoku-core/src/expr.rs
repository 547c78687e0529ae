//! ウォッチ式のパース
//!
//! ウォッチ式は識別子（`x`）か、任意の深さのドット区切り属性チェーン
//! （`self.foo.bar`）のみを受け付けます。関数呼び出し、添字、リテラル、
//! 演算子、複数文はすべて `InvalidExpression` になります。
//! 識別子とドットの前後には空白とタブのみ置けます（改行は不可）。
//! 予約語（`if`, `lambda`, `None` など）は識別子として扱いません。

use crate::{Result, WatchError};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// パース済みのウォッチ式
///
/// 先頭要素がルート識別子（スコープから解決）、残りが属性アクセスの列。
/// 空になることはない。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Expression {
    idents: Vec<String>,
}

impl Expression {
    /// 式テキストをパースする
    ///
    /// # Examples
    /// ```
    /// use kansoku_core::Expression;
    ///
    /// let expr = Expression::parse("self.foo").unwrap();
    /// assert_eq!(expr.root(), "self");
    /// assert_eq!(expr.tail(), ["foo".to_string()]);
    /// assert!(Expression::parse("foo()").is_err());
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || WatchError::InvalidExpression {
            text: text.to_string(),
        };

        let trimmed = text.trim_matches(is_blank);
        if trimmed.is_empty() {
            return Err(invalid());
        }

        let idents = trimmed
            .split('.')
            .map(|part| {
                let part = part.trim_matches(is_blank);
                if identifier_pattern().is_match(part) && !KEYWORDS.contains(&part) {
                    Ok(part.to_string())
                } else {
                    Err(invalid())
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { idents })
    }

    /// ルート識別子
    pub fn root(&self) -> &str {
        &self.idents[0]
    }

    /// ルート以降の属性アクセス列
    pub fn tail(&self) -> &[String] {
        &self.idents[1..]
    }

    /// 識別子の列全体
    pub fn idents(&self) -> &[String] {
        &self.idents
    }
}

/// タプル形式で表示する: `(x,)`, `(y, z)`
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let [only] = self.idents.as_slice() {
            return write!(f, "({},)", only);
        }
        write!(f, "({})", self.idents.join(", "))
    }
}

/// 識別子として使えない予約語
const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[\p{L}_][\p{L}\p{N}_]*$").expect("identifier pattern is valid")
    })
}
