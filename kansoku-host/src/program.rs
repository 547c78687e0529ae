//! スクリプトプログラムの表現

use crate::Value;
use std::collections::HashMap;

/// 式
#[derive(Debug, Clone)]
pub enum Expr {
    /// リテラル
    Lit(Value),
    /// 変数参照（ローカル、グローバルの順）
    Var(String),
    /// 属性参照: `obj.attr`
    Attr(Box<Expr>, String),
    /// オブジェクト生成: `Class()`
    New(String),
    /// 関数呼び出し
    Call(String, Vec<Expr>),
    /// 整数の加算
    Add(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn int(i: i64) -> Self {
        Expr::Lit(Value::Int(i))
    }

    pub fn str(s: &str) -> Self {
        Expr::Lit(Value::from(s))
    }

    pub fn var(name: &str) -> Self {
        Expr::Var(name.to_string())
    }

    pub fn attr(base: Expr, name: &str) -> Self {
        Expr::Attr(Box::new(base), name.to_string())
    }

    pub fn new_object(class: &str) -> Self {
        Expr::New(class.to_string())
    }

    pub fn call(function: &str, args: Vec<Expr>) -> Self {
        Expr::Call(function.to_string(), args)
    }

    pub fn add(lhs: Expr, rhs: Expr) -> Self {
        Expr::Add(Box::new(lhs), Box::new(rhs))
    }
}

/// 文
///
/// 各文は1行を占める。`Repeat` は本体を指定回数だけ再実行する。
#[derive(Debug, Clone)]
pub enum Stmt {
    /// `name = value`
    Assign { line: u32, name: String, value: Expr },
    /// `target.attr = value`
    SetAttr {
        line: u32,
        target: Expr,
        attr: String,
        value: Expr,
    },
    /// 式文
    Eval { line: u32, expr: Expr },
    /// `return value`
    Return { line: u32, value: Expr },
    /// `raise message`
    Raise { line: u32, message: String },
    /// `for _ in range(times):`
    Repeat { line: u32, times: u32, body: Vec<Stmt> },
}

impl Stmt {
    pub fn assign(line: u32, name: &str, value: Expr) -> Self {
        Stmt::Assign {
            line,
            name: name.to_string(),
            value,
        }
    }

    pub fn set_attr(line: u32, target: Expr, attr: &str, value: Expr) -> Self {
        Stmt::SetAttr {
            line,
            target,
            attr: attr.to_string(),
            value,
        }
    }

    pub fn eval(line: u32, expr: Expr) -> Self {
        Stmt::Eval { line, expr }
    }

    pub fn ret(line: u32, value: Expr) -> Self {
        Stmt::Return { line, value }
    }

    pub fn raise(line: u32, message: &str) -> Self {
        Stmt::Raise {
            line,
            message: message.to_string(),
        }
    }

    pub fn repeat(line: u32, times: u32, body: Vec<Stmt>) -> Self {
        Stmt::Repeat { line, times, body }
    }

    /// 文の行番号
    pub fn line(&self) -> u32 {
        match self {
            Stmt::Assign { line, .. }
            | Stmt::SetAttr { line, .. }
            | Stmt::Eval { line, .. }
            | Stmt::Return { line, .. }
            | Stmt::Raise { line, .. }
            | Stmt::Repeat { line, .. } => *line,
        }
    }
}

/// 関数定義
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    /// `def` の行
    pub line: u32,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
}

/// プログラム（関数定義とモジュール本体）
#[derive(Debug, Clone, Default)]
pub struct Program {
    functions: HashMap<String, Function>,
    body: Vec<Stmt>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// 関数を定義する
    pub fn def(mut self, name: &str, line: u32, params: &[&str], body: Vec<Stmt>) -> Self {
        self.functions.insert(
            name.to_string(),
            Function {
                name: name.to_string(),
                line,
                params: params.iter().map(|p| p.to_string()).collect(),
                body,
            },
        );
        self
    }

    /// モジュール本体を設定する
    pub fn body(mut self, body: Vec<Stmt>) -> Self {
        self.body = body;
        self
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn statements(&self) -> &[Stmt] {
        &self.body
    }
}
