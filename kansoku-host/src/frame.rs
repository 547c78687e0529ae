//! 実行フレーム

use crate::Value;
use kansoku_core::Frame;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

/// 変数のスコープ
pub type Scope = Rc<RefCell<BTreeMap<String, Value>>>;

/// フレームID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub u64);

/// 実行中フレームへのハンドル
///
/// クローンは同じフレームを指す。
#[derive(Debug, Clone)]
pub struct ScriptFrame {
    inner: Rc<FrameData>,
}

#[derive(Debug)]
struct FrameData {
    id: FrameId,
    caller: Option<FrameId>,
    function: String,
    line: Cell<u32>,
    locals: Scope,
    globals: Scope,
}

impl ScriptFrame {
    /// モジュールフレーム（ローカルとグローバルが同じ）
    pub(crate) fn module(id: FrameId, globals: Scope) -> Self {
        Self {
            inner: Rc::new(FrameData {
                id,
                caller: None,
                function: "<module>".to_string(),
                line: Cell::new(0),
                locals: globals.clone(),
                globals,
            }),
        }
    }

    /// 関数フレーム
    pub(crate) fn call(
        id: FrameId,
        caller: &ScriptFrame,
        function: &str,
        line: u32,
        locals: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            inner: Rc::new(FrameData {
                id,
                caller: Some(caller.id()),
                function: function.to_string(),
                line: Cell::new(line),
                locals: Rc::new(RefCell::new(locals)),
                globals: caller.inner.globals.clone(),
            }),
        }
    }

    pub fn id(&self) -> FrameId {
        self.inner.id
    }

    pub fn function(&self) -> &str {
        &self.inner.function
    }

    pub(crate) fn set_line(&self, line: u32) {
        self.inner.line.set(line);
    }

    pub(crate) fn store(&self, name: &str, value: Value) {
        self.inner.locals.borrow_mut().insert(name.to_string(), value);
    }
}

impl Frame for ScriptFrame {
    type Value = Value;
    type Id = FrameId;

    fn line(&self) -> u32 {
        self.inner.line.get()
    }

    fn lookup_local(&self, name: &str) -> Option<Value> {
        self.inner.locals.borrow().get(name).cloned()
    }

    fn lookup_global(&self, name: &str) -> Option<Value> {
        self.inner.globals.borrow().get(name).cloned()
    }

    fn caller(&self) -> Option<FrameId> {
        self.inner.caller
    }
}
