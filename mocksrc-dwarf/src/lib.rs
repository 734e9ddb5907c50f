//! mocksrc dwarfdump テキスト解析
//!
//! このクレートは、dwarfdumpが出力したテキストの解析機能を提供します。
//! `.debug_info` ブロックの抽出、DIEエントリグラフの構築、クラス階層の構築と線形化、
//! テンプレートインスタンス化されたターゲットクラスの探索を行います。

pub mod error;
pub mod filter;
pub mod entry;
pub mod graph;
pub mod hierarchy;
pub mod locator;

pub use error::DumpError;
pub use filter::{collect_debug_info, Block, DebugInfoBlocks, SECTION_MARKER};
pub use entry::{DebugInfoEntry, EntryId, EntryIndex, Tag};
pub use graph::EntryGraph;
pub use hierarchy::{Class, ClassHierarchy, ClassId, Method, MethodKind};
pub use locator::TargetLocator;

/// dwarfdump解析の結果型
pub type Result<T> = anyhow::Result<T>;
