//! クラス階層の構築と線形化

use crate::entry::{EntryIndex, Tag};
use crate::EntryGraph;
use std::cell::OnceCell;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// 階層内のクラス位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(usize);

/// メソッドの分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Constructor,
    Destructor,
    Ordinary,
}

/// クラス（class_type / structure_type エントリ）
#[derive(Debug)]
pub struct Class {
    entry: EntryIndex,
    name: Option<String>,
    /// 基底クラス（出現順、先頭が主基底）
    parents: Vec<ClassId>,
    /// 派生クラス
    children: Vec<ClassId>,
    methods: OnceCell<Vec<Method>>,
}

impl Class {
    fn new(entry: EntryIndex, name: Option<String>) -> Self {
        Self {
            entry,
            name,
            parents: Vec::new(),
            children: Vec::new(),
            methods: OnceCell::new(),
        }
    }

    pub fn entry(&self) -> EntryIndex {
        self.entry
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// コンストラクタ名（表示名からテンプレート引数を除いたもの）
    ///
    /// 例: `Ctr<memoria::Types<int> >` -> `Ctr`
    pub fn constructor_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(|name| name.split('<').next().unwrap_or(name))
    }

    /// デストラクタ名
    pub fn destructor_name(&self) -> Option<String> {
        self.constructor_name().map(|ctr| format!("~{}", ctr))
    }

    pub fn parents(&self) -> &[ClassId] {
        &self.parents
    }

    pub fn children(&self) -> &[ClassId] {
        &self.children
    }
}

/// メソッド（subprogram エントリ）
#[derive(Debug)]
pub struct Method {
    entry: EntryIndex,
    owner: ClassId,
    name: Option<String>,
    /// 仮引数の型識別子（暗黙のレシーバを含む）
    parameters: OnceCell<Vec<u64>>,
}

impl Method {
    pub fn entry(&self) -> EntryIndex {
        self.entry
    }

    /// このメソッドを宣言しているクラス
    pub fn owner(&self) -> ClassId {
        self.owner
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// 所有クラスの名前と比較して分類する
    pub fn kind(&self, owner: &Class) -> MethodKind {
        let Some(name) = self.name() else {
            return MethodKind::Ordinary;
        };
        if owner.constructor_name() == Some(name) {
            MethodKind::Constructor
        } else if owner.destructor_name().as_deref() == Some(name) {
            MethodKind::Destructor
        } else {
            MethodKind::Ordinary
        }
    }
}

/// クラス階層
///
/// 前方宣言とその定義は同じ [`Class`] にまとめられる。
#[derive(Debug)]
pub struct ClassHierarchy {
    graph: EntryGraph,
    /// 最初に出現した順
    classes: Vec<Class>,
    /// 定義エントリの識別子 -> クラス
    by_id: HashMap<u64, ClassId>,
}

impl ClassHierarchy {
    /// エントリグラフからクラス階層を構築する
    pub fn build(graph: EntryGraph) -> Self {
        let mut classes = Vec::new();
        let mut by_id = HashMap::new();

        for (index, entry) in graph.iter() {
            if !entry.tag().is_class_like() {
                continue;
            }
            let Some(use_index) = resolve_class_entry(&graph, index) else {
                continue;
            };
            let id = graph[use_index].id().value();
            if by_id.contains_key(&id) {
                continue;
            }

            let name = graph.resolve_name(use_index).map(str::to_string);
            by_id.insert(id, ClassId(classes.len()));
            classes.push(Class::new(use_index, name));
        }

        let mut hierarchy = Self {
            graph,
            classes,
            by_id,
        };
        hierarchy.link_parents();
        hierarchy
    }

    /// inheritance 子エントリから親子関係を張る
    fn link_parents(&mut self) {
        let mut edges = Vec::new();

        for (i, class) in self.classes.iter().enumerate() {
            for &child in self.graph[class.entry].children() {
                let entry = &self.graph[child];
                if *entry.tag() != Tag::Inheritance {
                    continue;
                }
                let Some(base_id) = entry.type_ref() else {
                    debug!("Inheritance entry {} has no base type", entry.id());
                    continue;
                };
                match self.find(base_id) {
                    Some(parent) => edges.push((ClassId(i), parent)),
                    None => debug!(
                        "Base type 0x{:x} of {:?} is not a known class",
                        base_id, class.name
                    ),
                }
            }
        }

        for (child, parent) in edges {
            self.classes[child.0].parents.push(parent);
            self.classes[parent.0].children.push(child);
        }
    }

    /// 元になったエントリグラフ
    pub fn graph(&self) -> &EntryGraph {
        &self.graph
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn class(&self, id: ClassId) -> &Class {
        &self.classes[id.0]
    }

    /// 全クラス（最初に出現した順）
    pub fn classes(&self) -> impl Iterator<Item = (ClassId, &Class)> {
        self.classes.iter().enumerate().map(|(i, c)| (ClassId(i), c))
    }

    /// エントリ識別子からクラスを検索する（前方宣言の識別子でもよい）
    pub fn find(&self, id: u64) -> Option<ClassId> {
        let index = self.graph.find(id)?;
        let use_index = resolve_class_entry(&self.graph, index)?;
        self.by_id.get(&self.graph[use_index].id().value()).copied()
    }

    /// クラスのメソッド（初回アクセス時に構築してキャッシュする）
    pub fn methods(&self, id: ClassId) -> &[Method] {
        let class = &self.classes[id.0];
        class.methods.get_or_init(|| {
            self.graph[class.entry]
                .children()
                .iter()
                .filter(|&&child| *self.graph[child].tag() == Tag::Subprogram)
                .map(|&child| Method {
                    entry: child,
                    owner: id,
                    name: self.graph.resolve_name(child).map(str::to_string),
                    parameters: OnceCell::new(),
                })
                .collect()
        })
    }

    /// メソッドの仮引数の型識別子（暗黙のレシーバを含む）
    pub fn parameters<'a>(&self, method: &'a Method) -> &'a [u64] {
        method.parameters.get_or_init(|| {
            self.graph[method.entry]
                .children()
                .iter()
                .map(|&child| &self.graph[child])
                .filter(|entry| *entry.tag() == Tag::FormalParameter)
                .filter_map(|entry| entry.type_ref())
                .collect()
        })
    }

    /// メソッドの宣言ファイル
    pub fn decl_file(&self, method: &Method) -> Option<&str> {
        self.graph[method.entry].decl_file()
    }

    /// メソッドの宣言行（1始まり）
    pub fn decl_line(&self, method: &Method) -> Option<usize> {
        self.graph[method.entry].decl_line()
    }

    /// メソッドを所有クラスに対して分類する
    pub fn method_kind(&self, method: &Method) -> MethodKind {
        method.kind(self.class(method.owner))
    }

    /// 主基底（先頭の親）を辿って根までのクラス列を返す
    ///
    /// 先頭は指定したクラス、末尾は親を持たないクラス。2番目以降の基底は無視する。
    pub fn linearize(&self, id: ClassId) -> Vec<ClassId> {
        let mut result = vec![id];
        let mut visited = HashSet::from([id]);
        let mut current = id;

        while let Some(&parent) = self.classes[current.0].parents.first() {
            if !visited.insert(parent) {
                warn!(
                    "Inheritance cycle detected at {:?}, linearization stopped",
                    self.classes[parent.0].name
                );
                break;
            }
            result.push(parent);
            current = parent;
        }

        result
    }
}

/// class/struct エントリを、定義しているエントリに置き換える
fn resolve_class_entry(graph: &EntryGraph, index: EntryIndex) -> Option<EntryIndex> {
    let entry = graph.get(index)?;
    if !entry.tag().is_class_like() {
        return None;
    }
    match graph.definition_of(entry.id().value()) {
        Some(definition) if graph[definition].tag().is_class_like() => Some(definition),
        _ => Some(index),
    }
}
