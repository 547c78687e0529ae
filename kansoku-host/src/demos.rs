//! 同梱のデモプログラム

use crate::{Expr, Program, Stmt};

/// デモプログラム
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Demo {
    /// 関数内のローカル変数と属性
    Assignment,
    /// `return foo` の行のウォッチ
    Returned,
    /// ループ中に変化するオブジェクト
    Counter,
}

impl Demo {
    pub const ALL: [Demo; 3] = [Demo::Assignment, Demo::Returned, Demo::Counter];

    pub fn name(&self) -> &'static str {
        match self {
            Demo::Assignment => "assignment",
            Demo::Returned => "returned",
            Demo::Counter => "counter",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|demo| demo.name() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Demo::Assignment => "main() assigns x = 5 (line 13) and y.z = \"ok\" (line 16)",
            Demo::Returned => "make() returns foo (line 4) to the module",
            Demo::Counter => "tick(counter) runs 20 times from a loop (lines 7-8)",
        }
    }

    /// デフォルトのウォッチ (式, 行番号)
    pub fn default_watches(&self) -> &'static [(&'static str, u32)] {
        match self {
            Demo::Assignment => &[("x", 13), ("y.z", 16)],
            Demo::Returned => &[("foo", 4)],
            Demo::Counter => &[("counter.count", 6), ("c.count", 2)],
        }
    }

    pub fn program(&self) -> Program {
        match self {
            Demo::Assignment => assignment(),
            Demo::Returned => returned(),
            Demo::Counter => counter(),
        }
    }
}

// 12 def main():
// 13     x = 5
// 14     y = Holder()
// 15     y.z = "pending"
// 16     y.z = "ok"
// 17     return x
// 19 main()
// 20 finished = True
fn assignment() -> Program {
    Program::new()
        .def(
            "main",
            12,
            &[],
            vec![
                Stmt::assign(13, "x", Expr::int(5)),
                Stmt::assign(14, "y", Expr::new_object("Holder")),
                Stmt::set_attr(15, Expr::var("y"), "z", Expr::str("pending")),
                Stmt::set_attr(16, Expr::var("y"), "z", Expr::str("ok")),
                Stmt::ret(17, Expr::var("x")),
            ],
        )
        .body(vec![
            Stmt::eval(19, Expr::call("main", vec![])),
            Stmt::assign(20, "finished", Expr::Lit(true.into())),
        ])
}

// 1 def make():
// 2     foo = 40
// 3     foo = foo + 2
// 4     return foo
// 6 result = make()
// 7 result
fn returned() -> Program {
    Program::new()
        .def(
            "make",
            1,
            &[],
            vec![
                Stmt::assign(2, "foo", Expr::int(40)),
                Stmt::assign(3, "foo", Expr::add(Expr::var("foo"), Expr::int(2))),
                Stmt::ret(4, Expr::var("foo")),
            ],
        )
        .body(vec![
            Stmt::assign(6, "result", Expr::call("make", vec![])),
            Stmt::eval(7, Expr::var("result")),
        ])
}

// 1 def tick(c):
// 2     c.count = c.count + 1
// 3     return c.count
// 5 counter = Counter()
// 6 counter.count = 0
// 7 for _ in range(20):
// 8     tick(counter)
// 9 done = counter.count
// 10 done
fn counter() -> Program {
    Program::new()
        .def(
            "tick",
            1,
            &["c"],
            vec![
                Stmt::set_attr(
                    2,
                    Expr::var("c"),
                    "count",
                    Expr::add(Expr::attr(Expr::var("c"), "count"), Expr::int(1)),
                ),
                Stmt::ret(3, Expr::attr(Expr::var("c"), "count")),
            ],
        )
        .body(vec![
            Stmt::assign(5, "counter", Expr::new_object("Counter")),
            Stmt::set_attr(6, Expr::var("counter"), "count", Expr::int(0)),
            Stmt::repeat(
                7,
                20,
                vec![Stmt::eval(8, Expr::call("tick", vec![Expr::var("counter")]))],
            ),
            Stmt::assign(9, "done", Expr::attr(Expr::var("counter"), "count")),
            Stmt::eval(10, Expr::var("done")),
        ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Interpreter;

    #[test]
    fn test_demos_run() {
        for demo in Demo::ALL {
            assert_eq!(Demo::from_name(demo.name()), Some(demo));
            Interpreter::new().run(&demo.program(), None).unwrap();
        }
        assert_eq!(Demo::from_name("nope"), None);
    }

    #[test]
    fn test_counter_result() {
        let summary = Interpreter::new().run(&Demo::Counter.program(), None).unwrap();
        assert_eq!(summary.global("done").and_then(|v| v.as_int()), Some(20));
    }
}
