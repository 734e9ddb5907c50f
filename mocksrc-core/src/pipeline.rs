//! 解析から出力までのパイプライン

use crate::config::GeneratorConfig;
use crate::emitter::MockEmitter;
use crate::srclink::SourceLinker;
use anyhow::{Context, Result};
use mocksrc_dwarf::{collect_debug_info, ClassHierarchy, ClassId, EntryGraph, TargetLocator};
use regex::{Regex, RegexBuilder};
use std::fs::{self, File};
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// 出力ファイル名
pub const OUTPUT_FILE_NAME: &str = "output.cpp";

/// 解析結果
#[derive(Debug)]
pub struct Analysis {
    pub hierarchy: ClassHierarchy,
    pub container: ClassId,
    pub iterator: ClassId,
    /// 条件に一致した `.debug_info` ブロックの数
    pub matched_blocks: usize,
}

/// モックソース生成器
#[derive(Debug)]
pub struct MockGenerator {
    config: GeneratorConfig,
    block_filter: Regex,
    container: TargetLocator,
    iterator: TargetLocator,
}

impl MockGenerator {
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        let block_filter = RegexBuilder::new(&config.block_filter)
            .case_insensitive(true)
            .build()
            .with_context(|| format!("Invalid block filter pattern: {}", config.block_filter))?;
        let container = TargetLocator::new(&config.container.label, &config.container.pattern)?;
        let iterator = TargetLocator::new(&config.iterator.label, &config.iterator.pattern)?;

        Ok(Self {
            config,
            block_filter,
            container,
            iterator,
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// dwarfdump の出力を読み、クラス階層を構築してターゲットを探す
    pub fn analyze<R: BufRead>(&self, source: R) -> Result<Analysis> {
        let blocks = collect_debug_info(source, |line| self.block_filter.is_match(line))?;
        if blocks.is_ambiguous() {
            warn!("More than one suitable .debug_info, first is used.");
        }
        let matched_blocks = blocks.len();
        let block = blocks.into_first()?;
        debug!("Selected .debug_info block with {} lines", block.len());

        let graph = EntryGraph::build(&block)?;
        let hierarchy = ClassHierarchy::build(graph);
        debug!("Found {} classes", hierarchy.len());

        let container = self.container.locate(&hierarchy)?;
        let iterator = self.iterator.locate(&hierarchy)?;

        Ok(Analysis {
            hierarchy,
            container,
            iterator,
            matched_blocks,
        })
    }

    /// `<out_dir>/output.cpp` を書き出し、そのパスを返す
    pub fn generate(&self, analysis: &Analysis, linker: &SourceLinker, out_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(out_dir)
            .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;
        let path = out_dir.join(OUTPUT_FILE_NAME);
        let file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;

        let mut writer = BufWriter::new(file);
        self.write_to(analysis, linker, &mut writer)?;
        writer
            .flush()
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    /// モックソースを任意の出力先に書き出す
    pub fn write_to<W: Write>(&self, analysis: &Analysis, linker: &SourceLinker, out: &mut W) -> Result<()> {
        MockEmitter::new(&self.config, linker).write(
            out,
            &analysis.hierarchy,
            analysis.container,
            analysis.iterator,
        )
    }

    /// 保持されたメソッドの宣言位置を一覧表示する
    pub fn print_places<W: Write>(&self, analysis: &Analysis, out: &mut W) -> Result<()> {
        let linker = SourceLinker::disabled();
        MockEmitter::new(&self.config, &linker).print_places(
            out,
            &analysis.hierarchy,
            analysis.container,
            analysis.iterator,
        )
    }
}
