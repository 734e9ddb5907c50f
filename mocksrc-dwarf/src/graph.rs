//! DIEエントリグラフの構築
//!
//! 1つの `.debug_info` ブロックを行ごとに解析し、深さに基づいて親子関係を張ります。
//! 全エントリの作成後、後処理で以下の2つの関係を設定します。
//!
//! - `DW_AT_specification<<id>>` を持つエントリ → 参照先の前方宣言（`declaration`）
//! - typedef の `DW_AT_type<<id>>` が指す型エントリ → そのtypedef（`typedef`）

use crate::entry::{DebugInfoEntry, EntryHead, EntryIndex, Tag};
use crate::DumpError;
use std::collections::HashMap;
use std::ops::Index;
use tracing::debug;

/// typedefを辿る名前解決の最大深さ
const MAX_NAME_DEPTH: usize = 8;

/// DIEエントリのアリーナ
#[derive(Debug, Default)]
pub struct EntryGraph {
    entries: Vec<DebugInfoEntry>,
    /// 識別子 -> エントリ
    by_id: HashMap<u64, EntryIndex>,
    /// 前方宣言の識別子 -> それを定義しているエントリ
    definitions: HashMap<u64, EntryIndex>,
}

impl EntryGraph {
    /// ブロックの行からグラフを構築する
    ///
    /// 文法に一致しない構造行や深さの飛びがあれば、部分的な結果は返さずにエラーにする
    pub fn build<S: AsRef<str>>(lines: &[S]) -> Result<Self, DumpError> {
        let mut graph = Self::default();
        // open[d] = 深さ d で最後に作成したエントリ
        let mut open: Vec<EntryIndex> = Vec::new();

        for (i, line) in lines.iter().enumerate() {
            let line = line.as_ref();
            let line_no = i + 1;
            let Some(head) = EntryHead::parse(line, line_no)? else {
                continue;
            };

            let level = head.level;
            let parent = if level == 0 {
                None
            } else {
                match open.get(level - 1) {
                    Some(&p) => Some(p),
                    None => return Err(DumpError::LevelGap { line_no, level }),
                }
            };

            let index = EntryIndex(graph.entries.len());
            let id = head.id.value();
            graph.entries.push(DebugInfoEntry::new(head, line, parent));
            if let Some(p) = parent {
                graph.entries[p.0].children.push(index);
            }

            open.truncate(level);
            open.push(index);

            if graph.by_id.insert(id, index).is_some() {
                debug!("Duplicate entry id 0x{:x} at line {}, later entry wins", id, line_no);
            }
        }

        graph.link_relations();
        Ok(graph)
    }

    /// specification / typedef 関係を設定する
    fn link_relations(&mut self) {
        let mut declarations = Vec::new();
        let mut typedefs: HashMap<EntryIndex, EntryIndex> = HashMap::new();

        for (i, entry) in self.entries.iter().enumerate() {
            let index = EntryIndex(i);

            if let Some(spec_id) = entry.specification() {
                match self.by_id.get(&spec_id) {
                    Some(&decl) => declarations.push((index, decl, spec_id)),
                    None => debug!(
                        "Entry {} refers to unknown specification 0x{:x}",
                        entry.id, spec_id
                    ),
                }
            }

            if entry.tag == Tag::Typedef {
                if let Some(target) = entry.type_ref().and_then(|id| self.by_id.get(&id)) {
                    // 同じ型に複数のtypedefがあれば後のものを使う
                    typedefs.insert(*target, index);
                }
            }
        }

        for (definition, declaration, spec_id) in declarations {
            self.entries[definition.0].declaration = Some(declaration);
            self.definitions.insert(spec_id, definition);
        }
        for (target, typedef) in typedefs {
            self.entries[target.0].typedef = Some(typedef);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: EntryIndex) -> Option<&DebugInfoEntry> {
        self.entries.get(index.0)
    }

    /// 全エントリ（ブロック内の出現順）
    pub fn iter(&self) -> impl Iterator<Item = (EntryIndex, &DebugInfoEntry)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (EntryIndex(i), e))
    }

    /// 識別子からエントリを検索する
    pub fn find(&self, id: u64) -> Option<EntryIndex> {
        self.by_id.get(&id).copied()
    }

    /// 前方宣言の識別子から、それを定義しているエントリを取得する
    pub fn definition_of(&self, id: u64) -> Option<EntryIndex> {
        self.definitions.get(&id).copied()
    }

    /// エントリの名前を解決する
    ///
    /// 優先順位: 自身の `DW_AT_name`、前方宣言の `DW_AT_name`、typedefの名前、
    /// リンケージ名（自身、前方宣言の順）
    pub fn resolve_name(&self, index: EntryIndex) -> Option<&str> {
        self.resolve_name_at_depth(index, 0)
    }

    fn resolve_name_at_depth(&self, index: EntryIndex, depth: usize) -> Option<&str> {
        if depth > MAX_NAME_DEPTH {
            return None;
        }
        let entry = &self[index];
        let declaration = entry.declaration.map(|d| &self[d]);

        if let Some(name) = entry
            .own_name()
            .or_else(|| declaration.and_then(|d| d.own_name()))
        {
            return Some(name);
        }

        if let Some(name) = entry
            .typedef
            .and_then(|td| self.resolve_name_at_depth(td, depth + 1))
        {
            return Some(name);
        }

        entry
            .linkage_name()
            .or_else(|| declaration.and_then(|d| d.linkage_name()))
    }
}

impl Index<EntryIndex> for EntryGraph {
    type Output = DebugInfoEntry;

    fn index(&self, index: EntryIndex) -> &Self::Output {
        &self.entries[index.0]
    }
}
