//! モックソースの出力

use crate::collector::{collect_methods, CollectedMethod};
use crate::config::{EmitMode, GeneratorConfig, TargetSpec};
use crate::signature::{Extraction, SignatureExtractor};
use crate::srclink::SourceLinker;
use anyhow::{Context, Result};
use mocksrc_dwarf::{ClassHierarchy, ClassId};
use regex::{Captures, Regex};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

/// 1クラス分の出力（public / protected のメソッドブロック）
#[derive(Debug, Default)]
struct Section {
    public: Vec<String>,
    protected: Vec<String>,
}

/// コンストラクタ/デストラクタ名の置換
struct Renamer {
    pattern: Regex,
    new_name: String,
}

impl Renamer {
    fn new(old_name: &str, new_name: &str) -> Result<Self> {
        let pattern = Regex::new(&format!(
            r"(?is)^(.*?)(~?){}\s*\((.+)",
            regex::escape(old_name)
        ))
        .with_context(|| format!("Invalid rename pattern for {}", old_name))?;
        Ok(Self {
            pattern,
            new_name: new_name.to_string(),
        })
    }

    /// 最初の `~?OldName(` だけを置換する
    fn apply(&self, signature: &str) -> String {
        self.pattern
            .replacen(signature, 1, |caps: &Captures| {
                format!("{}{}{}({}", &caps[1], &caps[2], self.new_name, &caps[3])
            })
            .into_owned()
    }
}

/// モックソースの出力器
pub struct MockEmitter<'a> {
    config: &'a GeneratorConfig,
    linker: &'a SourceLinker,
    extractor: SignatureExtractor,
}

impl<'a> MockEmitter<'a> {
    pub fn new(config: &'a GeneratorConfig, linker: &'a SourceLinker) -> Self {
        Self {
            config,
            linker,
            extractor: SignatureExtractor::new(config),
        }
    }

    /// コンテナの中にイテレータを入れ子にしたクラス宣言を書き出す
    pub fn write<W: Write>(
        &self,
        out: &mut W,
        hierarchy: &ClassHierarchy,
        container: ClassId,
        iterator: ClassId,
    ) -> Result<()> {
        let iter_section = self.render_class(hierarchy, iterator, &self.config.iterator)?;
        let ctr_section = self.render_class(hierarchy, container, &self.config.container)?;

        let mut text = String::new();
        text.push_str(&format!("class {}\n{{\npublic:\n", self.config.container.header));
        text.push_str(&format!("    class {}\n    {{\n", self.config.iterator.header));
        write_section(&mut text, &iter_section, 8);
        text.push_str("    };\n\n");
        write_section(&mut text, &ctr_section, 4);
        text.push_str("};\n");

        out.write_all(text.as_bytes())
            .context("Failed to write mock source")?;
        Ok(())
    }

    /// 保持されたメソッドの名前と宣言位置を一覧表示する
    pub fn print_places<W: Write>(
        &self,
        out: &mut W,
        hierarchy: &ClassHierarchy,
        container: ClassId,
        iterator: ClassId,
    ) -> Result<()> {
        for (target, class) in [
            (&self.config.container, container),
            (&self.config.iterator, iterator),
        ] {
            writeln!(out, "=== {} ({}) ===", target.label, target.header)?;
            writeln!(out)?;
            for method in self.collect(hierarchy, class) {
                let line = method
                    .decl_line
                    .map(|l| l.to_string())
                    .unwrap_or_else(|| "?".to_string());
                writeln!(out, "{}", method.name)?;
                writeln!(out, "[{}:{}]", method.decl_file, line)?;
                writeln!(out)?;
            }
        }
        Ok(())
    }

    fn collect<'h>(&self, hierarchy: &'h ClassHierarchy, class: ClassId) -> Vec<CollectedMethod<'h>> {
        let chain = hierarchy.linearize(class);
        collect_methods(hierarchy, &chain, self.config.leaf_constructors_only)
    }

    fn render_class(
        &self,
        hierarchy: &ClassHierarchy,
        class: ClassId,
        target: &TargetSpec,
    ) -> Result<Section> {
        let renamer = match hierarchy.class(class).constructor_name() {
            Some(old_name) => Some(Renamer::new(old_name, &target.synthetic_name)?),
            None => None,
        };

        let mut section = Section::default();
        for method in self.collect(hierarchy, class) {
            self.render_method(&method, renamer.as_ref(), &mut section);
        }
        Ok(section)
    }

    /// メソッド1つ分のブロックを振り分ける（出力できないものは警告して読み飛ばす）
    fn render_method(&self, method: &CollectedMethod, renamer: Option<&Renamer>, section: &mut Section) {
        let Some(decl_line) = method.decl_line else {
            warn!("{} has no declaration line, skipped", method.name);
            return;
        };

        let source = match fs::read_to_string(method.decl_file) {
            Ok(source) => source,
            Err(e) => {
                warn!("Failed to read {} for {}: {}", method.decl_file, method.name, e);
                return;
            }
        };

        let signature = match self.extractor.extract_from_source(&source, decl_line) {
            Some(Extraction::Declaration(signature)) => signature,
            Some(Extraction::Macro { line }) => {
                match self.config.mode {
                    EmitMode::Documentation => {
                        debug!("Macro declaration of {} omitted: {}", method.name, line);
                    }
                    EmitMode::Annotated => section.public.push(format!("//!! MACRO: {}", line)),
                }
                return;
            }
            None => {
                warn!(
                    "Line {} is out of range in {} ({})",
                    decl_line, method.decl_file, method.name
                );
                return;
            }
        };

        if signature.text.trim().is_empty() {
            warn!("Empty signature for {} at {}:{}", method.name, method.decl_file, decl_line);
            return;
        }

        let mut comment = signature.comment;
        if let Some(link) = self.linker.comment_block(Path::new(method.decl_file), decl_line) {
            comment.push_str(&link);
        }

        let text = match renamer {
            Some(renamer) if method.is_special() => renamer.apply(&signature.text),
            _ => signature.text,
        };

        let block = comment + &text;
        if signature.is_public {
            section.public.push(block);
        } else {
            section.protected.push(block);
        }
    }
}

fn write_section(text: &mut String, section: &Section, indent: usize) {
    let half_indent = if indent == 4 { 0 } else { indent / 2 };
    text.push_str(&format!("{}public:\n", " ".repeat(half_indent)));
    write_blocks(text, &section.public, indent, true);
    text.push_str(&format!("{}protected:\n", " ".repeat(half_indent)));
    write_blocks(text, &section.protected, indent, false);
}

/// 各行をトリムして字下げし直す
///
/// `!!` で始まる行は常に除く。空行は `keep_blank` のときだけ（字下げだけの行として）残す。
fn write_blocks(text: &mut String, blocks: &[String], indent: usize, keep_blank: bool) {
    let pad = " ".repeat(indent);
    for block in blocks {
        for line in block.split('\n') {
            let line = line.trim();
            if line.starts_with("!!") || (line.is_empty() && !keep_blank) {
                continue;
            }
            text.push_str(&pad);
            text.push_str(line);
            text.push('\n');
        }
        text.push('\n');
    }
}
