//! `.debug_info` ブロックの抽出

use crate::{DumpError, Result};
use std::io::BufRead;

/// `.debug_info` セクションの開始を示すマーカー
pub const SECTION_MARKER: &str = ".debug_info";

/// 1つの `.debug_info` ブロック（ヘッダ行を含む行の列）
pub type Block = Vec<String>;

/// 抽出結果
#[derive(Debug, Clone, Default)]
pub struct DebugInfoBlocks {
    /// 述語に一致したブロック（入力順）
    blocks: Vec<Block>,
    /// 走査した `.debug_info` セクションの数
    sections_seen: usize,
}

impl DebugInfoBlocks {
    /// 一致したブロック
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// 走査した `.debug_info` セクションの数（0なら述語は一度も実行されていない）
    pub fn sections_seen(&self) -> usize {
        self.sections_seen
    }

    /// 複数のブロックが一致したかどうか
    pub fn is_ambiguous(&self) -> bool {
        self.blocks.len() > 1
    }

    /// 最初に一致したブロックを取得する
    ///
    /// セクションが無い場合と、一致するブロックが無い場合は別のエラーになる
    pub fn first(&self) -> std::result::Result<&Block, DumpError> {
        if self.sections_seen == 0 {
            return Err(DumpError::NoDebugInfo);
        }
        self.blocks.first().ok_or(DumpError::NoMatchingBlock)
    }

    /// 最初に一致したブロックを所有権ごと取り出す
    pub fn into_first(self) -> std::result::Result<Block, DumpError> {
        if self.sections_seen == 0 {
            return Err(DumpError::NoDebugInfo);
        }
        self.blocks.into_iter().next().ok_or(DumpError::NoMatchingBlock)
    }
}

/// 入力を `.debug_info` ブロックに分割し、述語に一致する行を含むブロックだけを残す
///
/// ブロックは `.debug_info` で始まる行から始まり、次の `.debug_info` 行か、
/// `.` で始まる別のセクション行の直前で終わる。
pub fn collect_debug_info<R, F>(source: R, mut predicate: F) -> Result<DebugInfoBlocks>
where
    R: BufRead,
    F: FnMut(&str) -> bool,
{
    let mut result = DebugInfoBlocks::default();
    let mut current: Option<Block> = None;
    let mut accepted = false;

    for line in source.lines() {
        let mut line = line?;
        if line.ends_with('\r') {
            line.pop();
        }

        if line.starts_with(SECTION_MARKER) {
            if let Some(block) = current.take() {
                if accepted {
                    result.blocks.push(block);
                }
            }
            result.sections_seen += 1;
            accepted = predicate(&line);
            current = Some(vec![line]);
        } else if let Some(block) = current.as_mut() {
            if line.starts_with('.') {
                // 別のセクションが始まった
                if accepted {
                    result.blocks.push(std::mem::take(block));
                }
                current = None;
                accepted = false;
            } else {
                if !accepted {
                    accepted = predicate(&line);
                }
                block.push(line);
            }
        }
    }

    if let Some(block) = current {
        if accepted {
            result.blocks.push(block);
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = "\
.debug_info
<0><0x0000000b><DW_TAG_compile_unit> DW_AT_name<\"a.cpp\">
<1><0x0000002d><DW_TAG_class_type> DW_AT_name<\"Alpha\">
.debug_info
<0><0x0000000b><DW_TAG_compile_unit> DW_AT_name<\"b.cpp\">
<1><0x0000002d><DW_TAG_class_type> DW_AT_name<\"Beta\">
.debug_line
<1><0x0000002d><DW_TAG_class_type> DW_AT_name<\"Beta\">
";

    #[test]
    fn test_collect_matching_block() {
        let blocks = collect_debug_info(DUMP.as_bytes(), |l| l.contains("Beta")).unwrap();
        assert_eq!(blocks.sections_seen(), 2);
        assert_eq!(blocks.len(), 1);
        let block = blocks.first().unwrap();
        assert_eq!(block[0], ".debug_info");
        assert_eq!(block.len(), 3);
        assert!(block[1].contains("b.cpp"));
    }

    #[test]
    fn test_other_section_ends_block() {
        // .debug_line 以降の行はどのブロックにも含まれない
        let blocks = collect_debug_info(DUMP.as_bytes(), |l| l.contains("Beta")).unwrap();
        assert!(blocks.blocks().iter().all(|b| !b.iter().any(|l| l.starts_with(".debug_line"))));
    }

    #[test]
    fn test_multiple_blocks_keep_order() {
        let blocks = collect_debug_info(DUMP.as_bytes(), |l| l.contains("DW_TAG_class_type")).unwrap();
        assert!(blocks.is_ambiguous());
        assert!(blocks.blocks()[0][1].contains("a.cpp"));
        assert!(blocks.blocks()[1][1].contains("b.cpp"));
    }

    #[test]
    fn test_no_match_is_distinct_from_no_section() {
        let blocks = collect_debug_info(DUMP.as_bytes(), |l| l.contains("Gamma")).unwrap();
        assert!(blocks.is_empty());
        assert_eq!(blocks.first().unwrap_err(), DumpError::NoMatchingBlock);

        let blocks = collect_debug_info("no sections here\n".as_bytes(), |_| true).unwrap();
        assert_eq!(blocks.sections_seen(), 0);
        assert_eq!(blocks.into_first().unwrap_err(), DumpError::NoDebugInfo);
    }

    #[test]
    fn test_crlf_lines() {
        let input = ".debug_info\r\n<0><0x1><DW_TAG_compile_unit> DW_AT_name<\"x\">\r\n";
        let blocks = collect_debug_info(input.as_bytes(), |l| l.ends_with('>')).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks.blocks()[0][1], "<0><0x1><DW_TAG_compile_unit> DW_AT_name<\"x\">");
    }
}
