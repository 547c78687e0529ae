//! ウォッチ登録と捕捉済みオブジェクトの管理

use crate::{Expression, Result, WatchError};
use std::collections::{BTreeMap, BTreeSet};

/// 観測スロットのキー（行番号と式）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchKey {
    pub line: u32,
    pub expression: Expression,
}

impl WatchKey {
    pub fn new(line: u32, expression: Expression) -> Self {
        Self { line, expression }
    }
}

/// 行番号ごとのウォッチ式
///
/// トレース開始前に構築し、トレース中は読み取り専用。
/// 同じ行に複数の式（重複を含む）を登録できます。
#[derive(Debug, Clone, Default)]
pub struct WatchRegistry {
    watches: BTreeMap<u32, Vec<Expression>>,
}

impl WatchRegistry {
    /// 空のレジストリを作成する
    pub fn new() -> Self {
        Self::default()
    }

    /// 式をパースして指定行のリストに追加する
    pub fn register(&mut self, text: &str, line: u32) -> Result<()> {
        if line == 0 {
            return Err(WatchError::InvalidLine { line });
        }
        let expression = Expression::parse(text)?;
        self.watches.entry(line).or_default().push(expression);
        Ok(())
    }

    /// ウォッチが設定されている行
    pub fn watched_lines(&self) -> impl Iterator<Item = u32> + '_ {
        self.watches.keys().copied()
    }

    /// ウォッチが設定されている行の数
    pub fn line_count(&self) -> usize {
        self.watches.len()
    }

    pub fn is_watched(&self, line: u32) -> bool {
        self.watches.contains_key(&line)
    }

    /// 指定行の式（登録順）
    pub fn watches(&self, line: u32) -> &[Expression] {
        self.watches.get(&line).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.watches.is_empty()
    }
}

/// 初回捕捉を終えた行の集合
///
/// 単調増加のみ。
#[derive(Debug, Clone, Default)]
pub struct ActivationSet {
    lines: BTreeSet<u32>,
}

impl ActivationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 行を有効化済みにする。新たに追加された場合は true
    pub fn activate(&mut self, line: u32) -> bool {
        self.lines.insert(line)
    }

    pub fn contains(&self, line: u32) -> bool {
        self.lines.contains(&line)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// 捕捉したルートオブジェクトの格納庫
///
/// キーごとに高々1つ、初回捕捉時に一度だけ書き込まれる。
/// 値はホストのハンドルで、変数の束縛そのものは保持しない。
#[derive(Debug, Clone)]
pub struct ObjectStore<V> {
    objects: BTreeMap<WatchKey, V>,
}

impl<V> ObjectStore<V> {
    pub fn new() -> Self {
        Self {
            objects: BTreeMap::new(),
        }
    }

    /// オブジェクトを格納する
    ///
    /// 既にキーが存在する場合は何もせず false を返す。
    pub fn insert(&mut self, key: WatchKey, object: V) -> bool {
        match self.objects.entry(key) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(object);
                true
            }
            std::collections::btree_map::Entry::Occupied(_) => false,
        }
    }

    pub fn get(&self, key: &WatchKey) -> Option<&V> {
        self.objects.get(key)
    }

    /// 全エントリ（行番号、式の順）
    pub fn iter(&self) -> impl Iterator<Item = (&WatchKey, &V)> {
        self.objects.iter()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl<V> Default for ObjectStore<V> {
    fn default() -> Self {
        Self::new()
    }
}
