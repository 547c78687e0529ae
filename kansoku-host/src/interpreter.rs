//! スクリプトの実行エンジン
//!
//! 文を1つずつ実行し、トレースフックにイベントを通知します。
//! イベントの順序は以下の通りです。
//!
//! - 関数に入ると `Call`（フレームの行番号は `def` の行）
//! - 各文の実行前に `Line`
//! - `raise` で `Exception`、その後に巻き戻す各フレームで `Return`
//! - フレームを抜けるときに `Return`（行番号は最後に実行した行）
//!
//! フックがエラーを返した場合は、それ以上イベントを発行せずに実行を中断します。

use crate::frame::{FrameId, Scope, ScriptFrame};
use crate::{Expr, Program, Result, Stmt, Value};
use anyhow::Context;
use kansoku_core::{Frame, Member, TraceEvent, TraceHook, TraceMode};
use std::collections::BTreeMap;
use tracing::debug;

/// スクリプト実行時のエラー
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("Line {line}: uncaught exception: {message}")]
    Uncaught { line: u32, message: String },

    #[error("Line {line}: name '{name}' is not defined")]
    Name { line: u32, name: String },

    #[error("Line {line}: '{type_name}' object has no attribute '{attr}'")]
    Attribute {
        line: u32,
        type_name: String,
        attr: String,
    },

    #[error("Line {line}: function '{name}' is not defined")]
    UnknownFunction { line: u32, name: String },

    #[error("Line {line}: {name}() takes {expected} arguments but {given} were given")]
    Arity {
        line: u32,
        name: String,
        expected: usize,
        given: usize,
    },

    #[error("Line {line}: unsupported operand types for +: '{lhs}' and '{rhs}'")]
    Operand { line: u32, lhs: String, rhs: String },

    #[error("Line {line}: integer overflow in {lhs} + {rhs}")]
    Overflow { line: u32, lhs: i64, rhs: i64 },
}

/// 実行結果
#[derive(Debug)]
pub struct RunSummary {
    /// フックに通知したイベント数
    pub events: u64,
    /// 軽量モード中に通知したイベント数
    pub light_events: u64,
    globals: Scope,
}

impl RunSummary {
    /// 実行後のグローバル変数を参照する
    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.borrow().get(name).cloned()
    }
}

/// スクリプトの実行エンジン
#[derive(Debug, Default)]
pub struct Interpreter {
    frames_created: u64,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// プログラムを実行する
    ///
    /// `hook` を渡すとトレースイベントを通知する。
    pub fn run(
        &mut self,
        program: &Program,
        hook: Option<&mut dyn TraceHook<ScriptFrame>>,
    ) -> Result<RunSummary> {
        let globals = Scope::default();
        let mut machine = Machine {
            program,
            hook,
            mode: TraceMode::Full,
            next_id: self.frames_created,
            events: 0,
            light_events: 0,
        };

        let module = machine.new_frame_id();
        let module = ScriptFrame::module(module, globals.clone());
        machine.emit(&module, TraceEvent::Call)?;

        let result = machine.exec_block(&module, program.statements());
        self.frames_created = machine.next_id;
        match result {
            Ok(_) => machine.emit(&module, TraceEvent::Return)?,
            Err(err) if is_uncaught(&err) => {
                machine.emit(&module, TraceEvent::Return)?;
                return Err(err);
            }
            Err(err) => return Err(err),
        }

        debug!(
            "Program finished: {} events ({} in light mode)",
            machine.events, machine.light_events
        );
        Ok(RunSummary {
            events: machine.events,
            light_events: machine.light_events,
            globals,
        })
    }

    /// これまでに作成したフレーム数
    pub fn frames_created(&self) -> u64 {
        self.frames_created
    }
}

/// 文の実行結果
enum Flow {
    Next,
    Return(Value),
}

struct Machine<'p, 'h> {
    program: &'p Program,
    hook: Option<&'h mut dyn TraceHook<ScriptFrame>>,
    mode: TraceMode,
    next_id: u64,
    events: u64,
    light_events: u64,
}

impl<'p, 'h> Machine<'p, 'h> {
    fn new_frame_id(&mut self) -> FrameId {
        let id = FrameId(self.next_id);
        self.next_id += 1;
        id
    }

    /// フックにイベントを通知する
    fn emit(&mut self, frame: &ScriptFrame, event: TraceEvent) -> Result<()> {
        let hook = match self.hook.as_mut() {
            Some(hook) => hook,
            None => return Ok(()),
        };

        self.events += 1;
        if self.mode == TraceMode::Light {
            self.light_events += 1;
        }

        self.mode = hook.on_event(frame, event).with_context(|| {
            format!(
                "Trace hook aborted the program at line {} in {}",
                frame.line(),
                frame.function()
            )
        })?;
        Ok(())
    }

    fn exec_block(&mut self, frame: &ScriptFrame, stmts: &[Stmt]) -> Result<Flow> {
        for stmt in stmts {
            if let Flow::Return(value) = self.exec(frame, stmt)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Next)
    }

    fn exec(&mut self, frame: &ScriptFrame, stmt: &Stmt) -> Result<Flow> {
        frame.set_line(stmt.line());
        self.emit(frame, TraceEvent::Line)?;

        match stmt {
            Stmt::Assign { line, name, value } => {
                let value = self.eval(frame, value, *line)?;
                frame.store(name, value);
            }
            Stmt::SetAttr {
                line,
                target,
                attr,
                value,
            } => {
                let value = self.eval(frame, value, *line)?;
                match self.eval(frame, target, *line)? {
                    Value::Object(obj) => {
                        obj.borrow_mut().attrs.insert(attr.clone(), value);
                    }
                    other => {
                        return Err(ScriptError::Attribute {
                            line: *line,
                            type_name: other.type_name(),
                            attr: attr.clone(),
                        }
                        .into())
                    }
                }
            }
            Stmt::Eval { line, expr } => {
                self.eval(frame, expr, *line)?;
            }
            Stmt::Return { line, value } => {
                return Ok(Flow::Return(self.eval(frame, value, *line)?));
            }
            Stmt::Raise { line, message } => {
                self.emit(frame, TraceEvent::Exception)?;
                return Err(ScriptError::Uncaught {
                    line: *line,
                    message: message.clone(),
                }
                .into());
            }
            Stmt::Repeat { line, times, body } => {
                for i in 0..*times {
                    if i > 0 {
                        frame.set_line(*line);
                        self.emit(frame, TraceEvent::Line)?;
                    }
                    if let Flow::Return(value) = self.exec_block(frame, body)? {
                        return Ok(Flow::Return(value));
                    }
                }
                // ループ終了の判定でヘッダ行に戻る
                if *times > 0 {
                    frame.set_line(*line);
                    self.emit(frame, TraceEvent::Line)?;
                }
            }
        }
        Ok(Flow::Next)
    }

    fn eval(&mut self, frame: &ScriptFrame, expr: &Expr, line: u32) -> Result<Value> {
        match expr {
            Expr::Lit(value) => Ok(value.clone()),
            Expr::Var(name) => frame
                .lookup_local(name)
                .or_else(|| frame.lookup_global(name))
                .ok_or_else(|| {
                    ScriptError::Name {
                        line,
                        name: name.clone(),
                    }
                    .into()
                }),
            Expr::Attr(base, attr) => {
                let base = self.eval(frame, base, line)?;
                base.member(attr).ok_or_else(|| {
                    ScriptError::Attribute {
                        line,
                        type_name: base.type_name(),
                        attr: attr.clone(),
                    }
                    .into()
                })
            }
            Expr::New(class) => Ok(Value::object(class.as_str())),
            Expr::Call(name, args) => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(frame, arg, line))
                    .collect::<Result<Vec<_>>>()?;
                self.call_function(frame, name, args, line)
            }
            Expr::Add(lhs, rhs) => {
                let lhs = self.eval(frame, lhs, line)?;
                let rhs = self.eval(frame, rhs, line)?;
                match (lhs.as_int(), rhs.as_int()) {
                    (Some(a), Some(b)) => a
                        .checked_add(b)
                        .map(Value::Int)
                        .ok_or_else(|| ScriptError::Overflow { line, lhs: a, rhs: b }.into()),
                    _ => Err(ScriptError::Operand {
                        line,
                        lhs: lhs.type_name(),
                        rhs: rhs.type_name(),
                    }
                    .into()),
                }
            }
        }
    }

    fn call_function(
        &mut self,
        caller: &ScriptFrame,
        name: &str,
        args: Vec<Value>,
        line: u32,
    ) -> Result<Value> {
        let program = self.program;
        let function = program
            .function(name)
            .ok_or_else(|| ScriptError::UnknownFunction {
                line,
                name: name.to_string(),
            })?;
        if function.params.len() != args.len() {
            return Err(ScriptError::Arity {
                line,
                name: name.to_string(),
                expected: function.params.len(),
                given: args.len(),
            }
            .into());
        }

        let locals: BTreeMap<String, Value> =
            function.params.iter().cloned().zip(args).collect();
        let id = self.new_frame_id();
        let frame = ScriptFrame::call(id, caller, &function.name, function.line, locals);
        self.emit(&frame, TraceEvent::Call)?;

        match self.exec_block(&frame, &function.body) {
            Ok(flow) => {
                self.emit(&frame, TraceEvent::Return)?;
                Ok(match flow {
                    Flow::Return(value) => value,
                    Flow::Next => Value::None,
                })
            }
            Err(err) if is_uncaught(&err) => {
                self.emit(&frame, TraceEvent::Return)?;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }
}

/// スクリプト内の `raise` による巻き戻し中か
fn is_uncaught(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<ScriptError>(),
        Some(ScriptError::Uncaught { .. })
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// イベントを記録するだけのフック
    #[derive(Default)]
    struct Recorder {
        events: Vec<(TraceEvent, u32, String)>,
        callers: HashMap<u64, Option<FrameId>>,
    }

    impl TraceHook<ScriptFrame> for Recorder {
        fn on_event(
            &mut self,
            frame: &ScriptFrame,
            event: TraceEvent,
        ) -> kansoku_core::Result<TraceMode> {
            self.events
                .push((event, frame.line(), frame.function().to_string()));
            self.callers.insert(frame.id().0, frame.caller());
            Ok(TraceMode::Full)
        }
    }

    fn call_program() -> Program {
        Program::new()
            .def(
                "make",
                1,
                &[],
                vec![
                    Stmt::assign(2, "foo", Expr::int(40)),
                    Stmt::ret(3, Expr::add(Expr::var("foo"), Expr::int(2))),
                ],
            )
            .body(vec![
                Stmt::assign(5, "result", Expr::call("make", vec![])),
                Stmt::eval(6, Expr::var("result")),
            ])
    }

    #[test]
    fn test_run_without_hook() {
        let summary = Interpreter::new().run(&call_program(), None).unwrap();
        assert_eq!(summary.global("result").and_then(|v| v.as_int()), Some(42));
        assert_eq!(summary.events, 0);
    }

    #[test]
    fn test_event_order() {
        let mut recorder = Recorder::default();
        Interpreter::new()
            .run(&call_program(), Some(&mut recorder))
            .unwrap();

        let events: Vec<(TraceEvent, u32, &str)> = recorder
            .events
            .iter()
            .map(|(e, l, f)| (*e, *l, f.as_str()))
            .collect();
        assert_eq!(
            events,
            [
                (TraceEvent::Call, 0, "<module>"),
                (TraceEvent::Line, 5, "<module>"),
                (TraceEvent::Call, 1, "make"),
                (TraceEvent::Line, 2, "make"),
                (TraceEvent::Line, 3, "make"),
                (TraceEvent::Return, 3, "make"),
                (TraceEvent::Line, 6, "<module>"),
                (TraceEvent::Return, 6, "<module>"),
            ]
        );
        assert_eq!(recorder.callers[&0], None);
        assert_eq!(recorder.callers[&1], Some(FrameId(0)));
    }

    #[test]
    fn test_repeat_revisits_header_line() {
        let program = Program::new().body(vec![
            Stmt::assign(1, "n", Expr::int(0)),
            Stmt::repeat(
                2,
                2,
                vec![Stmt::assign(3, "n", Expr::add(Expr::var("n"), Expr::int(1)))],
            ),
        ]);
        let mut recorder = Recorder::default();
        let summary = Interpreter::new().run(&program, Some(&mut recorder)).unwrap();

        let lines: Vec<u32> = recorder
            .events
            .iter()
            .filter(|(e, _, _)| *e == TraceEvent::Line)
            .map(|(_, l, _)| *l)
            .collect();
        assert_eq!(lines, [1, 2, 3, 2, 3, 2]);
        assert_eq!(summary.global("n").and_then(|v| v.as_int()), Some(2));
    }

    #[test]
    fn test_raise_unwinds_frames() {
        let program = Program::new()
            .def("boom", 1, &[], vec![Stmt::raise(2, "bad")])
            .body(vec![Stmt::eval(4, Expr::call("boom", vec![]))]);
        let mut recorder = Recorder::default();
        let err = Interpreter::new()
            .run(&program, Some(&mut recorder))
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ScriptError>(),
            Some(ScriptError::Uncaught { line: 2, .. })
        ));
        let tail: Vec<TraceEvent> = recorder.events.iter().rev().take(3).map(|(e, _, _)| *e).collect();
        assert_eq!(
            tail,
            [TraceEvent::Return, TraceEvent::Return, TraceEvent::Exception]
        );
    }

    #[test]
    fn test_script_errors() {
        let program = Program::new().body(vec![Stmt::eval(1, Expr::var("missing"))]);
        let err = Interpreter::new().run(&program, None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ScriptError>(),
            Some(ScriptError::Name { line: 1, .. })
        ));

        let program = Program::new()
            .def("f", 1, &["a"], vec![Stmt::ret(2, Expr::var("a"))])
            .body(vec![Stmt::eval(3, Expr::call("f", vec![]))]);
        let err = Interpreter::new().run(&program, None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ScriptError>(),
            Some(ScriptError::Arity { expected: 1, given: 0, .. })
        ));
    }

    #[test]
    fn test_add_overflow_is_script_error() {
        let program = Program::new().body(vec![Stmt::eval(
            4,
            Expr::add(Expr::int(i64::MAX), Expr::int(1)),
        )]);
        let err = Interpreter::new().run(&program, None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ScriptError>(),
            Some(ScriptError::Overflow { line: 4, rhs: 1, .. })
        ));

        let program = Program::new().body(vec![Stmt::eval(
            5,
            Expr::add(Expr::int(i64::MIN), Expr::int(-1)),
        )]);
        let err = Interpreter::new().run(&program, None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ScriptError>(),
            Some(ScriptError::Overflow { line: 5, .. })
        ));
    }
}
