//! dwarfdump解析のエラー型
//!
//! ここに定義されたエラーはいずれも実行全体を中断させる致命的な条件です。
//! メソッド単位の問題（宣言ファイルが無い等）はエラーにせず読み飛ばします。

use thiserror::Error;

/// dwarfdump解析の致命的なエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DumpError {
    /// `<level>` で始まるが `<level><id><DW_TAG_xxx>` の文法に一致しない行
    #[error("Malformed debug info entry at line {line_no}: {line}")]
    MalformedLine { line_no: usize, line: String },

    /// 16進数として解釈できない識別子
    #[error("Invalid entry identifier '{id}' at line {line_no}")]
    InvalidIdentifier { line_no: usize, id: String },

    /// 深さ level-1 の親エントリが存在しない
    #[error("Entry at line {line_no} has level {level} but no enclosing entry at level {}", .level - 1)]
    LevelGap { line_no: usize, level: usize },

    /// 入力に `.debug_info` セクションが一つも無い
    #[error("No .debug_info section in input")]
    NoDebugInfo,

    /// `.debug_info` はあるが、パターンに一致するブロックが無い
    #[error("No suitable .debug_info, exit.")]
    NoMatchingBlock,

    /// ターゲットクラスのパターンに一致するクラスが無い
    #[error("Target class '{target}' not found")]
    TargetNotFound { target: String },
}
