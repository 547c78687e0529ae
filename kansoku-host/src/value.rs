//! スクリプトの値

use kansoku_core::Member;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// スクリプトの値
///
/// オブジェクトは共有参照なので、捕捉後の属性変更は後のダンプに反映される。
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Str(String),
    Object(Rc<RefCell<Object>>),
}

/// 属性を持つオブジェクト
#[derive(Debug, Clone, Default)]
pub struct Object {
    pub class: String,
    pub attrs: BTreeMap<String, Value>,
}

impl Object {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            attrs: BTreeMap::new(),
        }
    }
}

impl Value {
    /// 新しいオブジェクトを作成する
    pub fn object(class: impl Into<String>) -> Self {
        Value::Object(Rc::new(RefCell::new(Object::new(class))))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// 型名
    pub fn type_name(&self) -> String {
        match self {
            Value::None => "NoneType".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::Int(_) => "int".to_string(),
            Value::Str(_) => "str".to_string(),
            Value::Object(obj) => obj.borrow().class.clone(),
        }
    }
}

impl Member for Value {
    fn member(&self, name: &str) -> Option<Self> {
        match self {
            Value::Object(obj) => obj.borrow().attrs.get(name).cloned(),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Str(s) => write!(f, "{}", s),
            Value::Object(obj) => write!(f, "<{} object>", obj.borrow().class),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
