//! フレームイベントトレーサー
//!
//! ホストから渡されるイベントを処理する状態機械です。
//!
//! - FULL モード: 行の境界ごとに、直前に実行された行がウォッチ対象かつ未捕捉なら
//!   ルートオブジェクトを捕捉する。処理は行の実行「後」に行うため、その行で
//!   定義された値も取得できる。
//! - LIGHT モード: 全ウォッチ行の捕捉が終わった後に切り替わる。スケジューラの
//!   判定と直前フレームの更新のみを行う。一度切り替わったら戻らない。

use crate::config::{ResolutionPolicy, WatcherConfig};
use crate::registry::{ActivationSet, ObjectStore, WatchKey, WatchRegistry};
use crate::resolver::{observe, ObservationSink};
use crate::{DumpScheduler, Expression, Frame, Result, TraceEvent, TraceMode, WatchError};
use std::fmt;
use tracing::{debug, info, trace, warn};

/// フレームイベントトレーサー
pub struct FrameEventTracer<'r, F: Frame, S> {
    registry: &'r WatchRegistry,
    scheduler: DumpScheduler,
    activated: ActivationSet,
    objects: ObjectStore<F::Value>,
    /// 直前のイベントのフレームと行番号
    prev_frame: Option<F>,
    prev_line: Option<u32>,
    mode: TraceMode,
    dump_new: bool,
    scope_policy: ResolutionPolicy,
    attribute_policy: ResolutionPolicy,
    sink: S,
}

impl<'r, F: Frame, S: ObservationSink> FrameEventTracer<'r, F, S> {
    /// 新しいトレーサーを作成する
    pub fn new(registry: &'r WatchRegistry, config: &WatcherConfig, sink: S) -> Result<Self> {
        Ok(Self {
            registry,
            scheduler: DumpScheduler::new(config.step_interval, config.time_interval)?,
            activated: ActivationSet::new(),
            objects: ObjectStore::new(),
            prev_frame: None,
            prev_line: None,
            mode: TraceMode::Full,
            dump_new: config.dump_new,
            scope_policy: config.scope_policy,
            attribute_policy: config.attribute_policy,
            sink,
        })
    }

    /// 1イベントを処理し、次に使うモードを返す
    pub fn on_event(&mut self, frame: &F, event: TraceEvent) -> Result<TraceMode> {
        match self.mode {
            TraceMode::Full => self.full_event(frame, event)?,
            TraceMode::Light => self.light_event(frame)?,
        }
        Ok(self.mode)
    }

    fn full_event(&mut self, frame: &F, event: TraceEvent) -> Result<()> {
        // 捕捉は行の境界でのみ評価する
        let fresh = if event == TraceEvent::Line {
            self.capture_previous_line(frame)?
        } else {
            Vec::new()
        };

        let dumped = self.poll_scheduler()?;
        if !dumped && self.dump_new {
            for key in &fresh {
                if let Some(object) = self.objects.get(key) {
                    emit(&mut self.sink, self.attribute_policy, key.line, &key.expression, object)?;
                }
            }
        }

        self.remember(frame);

        if self.activated.len() == self.registry.line_count() {
            info!(
                "All {} watched lines captured after {} events, switching to light tracing",
                self.activated.len(),
                self.scheduler.steps()
            );
            self.mode = TraceMode::Light;
        }
        Ok(())
    }

    fn light_event(&mut self, frame: &F) -> Result<()> {
        self.poll_scheduler()?;
        self.remember(frame);
        Ok(())
    }

    /// 直前の行が初めて実行されたウォッチ行なら、その行の式を捕捉する
    ///
    /// 新たに格納したキーを返す。
    fn capture_previous_line(&mut self, frame: &F) -> Result<Vec<WatchKey>> {
        let registry = self.registry;
        let line = match self.prev_line {
            Some(line) if registry.is_watched(line) && !self.activated.contains(line) => line,
            _ => return Ok(Vec::new()),
        };
        let prev_frame = match &self.prev_frame {
            Some(prev) => prev.clone(),
            None => return Ok(Vec::new()),
        };

        // 捕捉の成否にかかわらず再試行はしない
        self.activated.activate(line);

        // 呼び出し元が同じなら同じ呼び出しの中にいる。異なる場合は制御が
        // その呼び出しを離れている（`return foo` など）ので直前フレームで解決する
        let scope = if frame.caller() == prev_frame.caller() {
            frame
        } else {
            debug!("Line {} left its call, resolving in the previous frame", line);
            &prev_frame
        };

        let mut fresh = Vec::new();
        for expression in registry.watches(line) {
            let object = match lookup(scope, expression.root()) {
                Some(object) => object,
                None => {
                    let err = WatchError::ScopeResolution {
                        line,
                        name: expression.root().to_string(),
                    };
                    match self.scope_policy {
                        ResolutionPolicy::Propagate => return Err(err),
                        ResolutionPolicy::Skip => {
                            warn!("Skipping capture: {}", err);
                            continue;
                        }
                    }
                }
            };

            let key = WatchKey::new(line, expression.clone());
            if self.objects.insert(key.clone(), object) {
                debug!("Captured {} at line {}", expression, line);
                fresh.push(key);
            }
        }

        Ok(fresh)
    }

    /// スケジューラに問い合わせ、必要なら全体ダンプを行う
    fn poll_scheduler(&mut self) -> Result<bool> {
        if !self.scheduler.check() {
            return Ok(false);
        }
        trace!("Scheduled dump at step {}", self.scheduler.steps());
        self.dump_all()?;
        Ok(true)
    }

    fn remember(&mut self, frame: &F) {
        self.prev_line = Some(frame.line());
        self.prev_frame = Some(frame.clone());
    }

    /// 捕捉済みの全エントリを解決して出力する
    pub fn dump_all(&mut self) -> Result<()> {
        for (key, object) in self.objects.iter() {
            emit(&mut self.sink, self.attribute_policy, key.line, &key.expression, object)?;
        }
        Ok(())
    }

    /// 現在のモード
    pub fn mode(&self) -> TraceMode {
        self.mode
    }

    /// 捕捉済みの行
    pub fn activated(&self) -> &ActivationSet {
        &self.activated
    }

    /// 捕捉済みのオブジェクト
    pub fn objects(&self) -> &ObjectStore<F::Value> {
        &self.objects
    }

    /// 処理したイベント数
    pub fn steps(&self) -> u64 {
        self.scheduler.steps()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

/// ローカル、グローバルの順に名前を引く
fn lookup<F: Frame>(frame: &F, name: &str) -> Option<F::Value> {
    frame.lookup_local(name).or_else(|| frame.lookup_global(name))
}

fn emit<S, V>(
    sink: &mut S,
    policy: ResolutionPolicy,
    line: u32,
    expression: &Expression,
    object: &V,
) -> Result<()>
where
    S: ObservationSink,
    V: crate::Member + Clone + fmt::Display,
{
    match observe(line, expression, object) {
        Ok(observation) => sink.emit(observation),
        Err(err) if policy == ResolutionPolicy::Skip => {
            warn!("Skipping observation: {}", err);
            Ok(())
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Member, MemorySink};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    struct Num(i64);

    impl Member for Num {
        fn member(&self, _name: &str) -> Option<Self> {
            None
        }
    }

    impl fmt::Display for Num {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    type Scope = Rc<RefCell<HashMap<String, Num>>>;

    #[derive(Clone)]
    struct TestFrame {
        caller: Option<u32>,
        line: u32,
        locals: Scope,
        globals: Scope,
    }

    impl Frame for TestFrame {
        type Value = Num;
        type Id = u32;

        fn line(&self) -> u32 {
            self.line
        }

        fn lookup_local(&self, name: &str) -> Option<Num> {
            self.locals.borrow().get(name).cloned()
        }

        fn lookup_global(&self, name: &str) -> Option<Num> {
            self.globals.borrow().get(name).cloned()
        }

        fn caller(&self) -> Option<u32> {
            self.caller
        }
    }

    fn scope(vars: &[(&str, i64)]) -> Scope {
        Rc::new(RefCell::new(
            vars.iter().map(|(k, v)| (k.to_string(), Num(*v))).collect(),
        ))
    }

    fn at(line: u32, caller: Option<u32>, locals: &Scope, globals: &Scope) -> TestFrame {
        TestFrame {
            caller,
            line,
            locals: locals.clone(),
            globals: globals.clone(),
        }
    }

    fn registry(watches: &[(&str, u32)]) -> WatchRegistry {
        let mut registry = WatchRegistry::new();
        for (expr, line) in watches {
            registry.register(expr, *line).unwrap();
        }
        registry
    }

    fn config() -> WatcherConfig {
        WatcherConfig::every_steps(1000)
    }

    #[test]
    fn test_capture_after_line_executes() {
        let registry = registry(&[("x", 1)]);
        let mut tracer = FrameEventTracer::new(&registry, &config(), MemorySink::new()).unwrap();
        let globals = scope(&[]);
        let locals = scope(&[]);

        tracer.on_event(&at(1, None, &locals, &globals), TraceEvent::Line).unwrap();
        assert!(tracer.objects().is_empty());

        locals.borrow_mut().insert("x".to_string(), Num(5));
        let mode = tracer.on_event(&at(2, None, &locals, &globals), TraceEvent::Line).unwrap();

        assert_eq!(mode, TraceMode::Light);
        assert_eq!(tracer.sink().lines(), ["(1, (x,)) -> 5"]);
    }

    #[test]
    fn test_falls_back_to_globals() {
        let registry = registry(&[("g", 1)]);
        let mut tracer = FrameEventTracer::new(&registry, &config(), MemorySink::new()).unwrap();
        let globals = scope(&[("g", 9)]);
        let locals = scope(&[]);

        tracer.on_event(&at(1, Some(0), &locals, &globals), TraceEvent::Line).unwrap();
        tracer.on_event(&at(2, Some(0), &locals, &globals), TraceEvent::Line).unwrap();

        assert_eq!(tracer.sink().lines(), ["(1, (g,)) -> 9"]);
    }

    #[test]
    fn test_resolves_in_previous_frame_after_return() {
        let registry = registry(&[("foo", 3)]);
        let mut tracer = FrameEventTracer::new(&registry, &config(), MemorySink::new()).unwrap();
        let globals = scope(&[]);
        let callee = scope(&[("foo", 7)]);

        // 呼び出し先の `return foo`（3行目）から呼び出し元の6行目へ
        tracer.on_event(&at(3, Some(1), &callee, &globals), TraceEvent::Line).unwrap();
        tracer.on_event(&at(3, Some(1), &callee, &globals), TraceEvent::Return).unwrap();
        tracer.on_event(&at(6, None, &globals, &globals), TraceEvent::Line).unwrap();

        assert_eq!(tracer.sink().lines(), ["(3, (foo,)) -> 7"]);
    }

    #[test]
    fn test_non_line_events_do_not_capture() {
        let registry = registry(&[("x", 1)]);
        let mut tracer = FrameEventTracer::new(&registry, &config(), MemorySink::new()).unwrap();
        let vars = scope(&[("x", 1)]);

        tracer.on_event(&at(1, None, &vars, &vars), TraceEvent::Line).unwrap();
        tracer.on_event(&at(1, None, &vars, &vars), TraceEvent::Call).unwrap();
        tracer.on_event(&at(1, None, &vars, &vars), TraceEvent::Exception).unwrap();

        assert!(tracer.objects().is_empty());
        assert_eq!(tracer.mode(), TraceMode::Full);
        assert_eq!(tracer.steps(), 3);
    }

    #[test]
    fn test_each_line_captured_once() {
        let registry = registry(&[("x", 1), ("y", 5)]);
        let mut tracer = FrameEventTracer::new(&registry, &config(), MemorySink::new()).unwrap();
        let vars = scope(&[("x", 1), ("y", 2)]);

        // ループで1行目を繰り返し実行する
        for value in 1..4 {
            vars.borrow_mut().insert("x".to_string(), Num(value));
            tracer.on_event(&at(1, None, &vars, &vars), TraceEvent::Line).unwrap();
            tracer.on_event(&at(2, None, &vars, &vars), TraceEvent::Line).unwrap();
        }

        assert_eq!(tracer.activated().len(), 1);
        assert_eq!(tracer.objects().len(), 1);
        assert_eq!(tracer.mode(), TraceMode::Full);
        assert_eq!(tracer.sink().lines(), ["(1, (x,)) -> 1"]);
    }

    #[test]
    fn test_light_mode_stops_capturing() {
        let registry = registry(&[("x", 1)]);
        let mut tracer = FrameEventTracer::new(&registry, &config(), MemorySink::new()).unwrap();
        let vars = scope(&[("x", 1)]);

        tracer.on_event(&at(1, None, &vars, &vars), TraceEvent::Line).unwrap();
        tracer.on_event(&at(2, None, &vars, &vars), TraceEvent::Line).unwrap();
        assert_eq!(tracer.mode(), TraceMode::Light);

        for line in [1, 2, 1, 2] {
            let mode = tracer.on_event(&at(line, None, &vars, &vars), TraceEvent::Line).unwrap();
            assert_eq!(mode, TraceMode::Light);
        }
        assert_eq!(tracer.objects().len(), 1);
        assert_eq!(tracer.sink().observations().len(), 1);
        assert_eq!(tracer.steps(), 6);
    }

    #[test]
    fn test_empty_registry_goes_light_immediately() {
        let registry = WatchRegistry::new();
        let mut tracer = FrameEventTracer::new(&registry, &config(), MemorySink::new()).unwrap();
        let vars = scope(&[]);

        let mode = tracer.on_event(&at(1, None, &vars, &vars), TraceEvent::Call).unwrap();
        assert_eq!(mode, TraceMode::Light);
    }

    #[test]
    fn test_dump_new_disabled() {
        let registry = registry(&[("x", 1)]);
        let config = config().with_dump_new(false);
        let mut tracer = FrameEventTracer::new(&registry, &config, MemorySink::new()).unwrap();
        let vars = scope(&[("x", 4)]);

        tracer.on_event(&at(1, None, &vars, &vars), TraceEvent::Line).unwrap();
        tracer.on_event(&at(2, None, &vars, &vars), TraceEvent::Line).unwrap();
        assert_eq!(tracer.objects().len(), 1);
        assert!(tracer.sink().observations().is_empty());

        tracer.dump_all().unwrap();
        assert_eq!(tracer.sink().lines(), ["(1, (x,)) -> 4"]);
    }

    #[test]
    fn test_scheduled_dump_replaces_immediate_emit() {
        let registry = registry(&[("x", 1)]);
        let config = WatcherConfig::every_steps(2);
        let mut tracer = FrameEventTracer::new(&registry, &config, MemorySink::new()).unwrap();
        let vars = scope(&[("x", 3)]);

        tracer.on_event(&at(1, None, &vars, &vars), TraceEvent::Line).unwrap();
        tracer.on_event(&at(2, None, &vars, &vars), TraceEvent::Line).unwrap();
        // 2イベント目の定期ダンプに含まれるので即時出力はしない
        assert_eq!(tracer.sink().lines(), ["(1, (x,)) -> 3"]);

        vars.borrow_mut().insert("x".to_string(), Num(8));
        tracer.on_event(&at(3, None, &vars, &vars), TraceEvent::Line).unwrap();
        tracer.on_event(&at(4, None, &vars, &vars), TraceEvent::Line).unwrap();
        // 捕捉したのは束縛ではなく値
        assert_eq!(tracer.sink().lines(), ["(1, (x,)) -> 3", "(1, (x,)) -> 3"]);
    }

    #[test]
    fn test_missing_name_propagates() {
        let registry = registry(&[("nope", 1)]);
        let mut tracer = FrameEventTracer::new(&registry, &config(), MemorySink::new()).unwrap();
        let vars = scope(&[]);

        tracer.on_event(&at(1, None, &vars, &vars), TraceEvent::Line).unwrap();
        match tracer.on_event(&at(2, None, &vars, &vars), TraceEvent::Line) {
            Err(WatchError::ScopeResolution { line, name }) => {
                assert_eq!(line, 1);
                assert_eq!(name, "nope");
            }
            other => panic!("Expected ScopeResolution, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_name_skipped() {
        let registry = registry(&[("nope", 1), ("x", 1)]);
        let config = config().with_scope_policy(ResolutionPolicy::Skip);
        let mut tracer = FrameEventTracer::new(&registry, &config, MemorySink::new()).unwrap();
        let vars = scope(&[("x", 2)]);

        tracer.on_event(&at(1, None, &vars, &vars), TraceEvent::Line).unwrap();
        let mode = tracer.on_event(&at(2, None, &vars, &vars), TraceEvent::Line).unwrap();

        assert_eq!(mode, TraceMode::Light);
        assert_eq!(tracer.sink().lines(), ["(1, (x,)) -> 2"]);
    }
}
