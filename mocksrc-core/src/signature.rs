//! ソーステキストからのメソッド宣言の復元
//!
//! 宣言行を起点に2回走査します。
//!
//! 1. 前方走査: 宣言行から最初の `{` または `;` までを集める（引数リストが複数行でもよい）
//! 2. 後方走査: 宣言行の直前から上に向かって、状態遷移表に従い
//!    シグネチャの前半（テンプレート宣言、戻り値型など）と直前のコメントを集める

use crate::GeneratorConfig;

/// 後方走査の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Initial,
    InsideBlockComment,
    InsideLineComment,
    AfterComment,
    Done,
}

/// 行の判定（トリム済みの行に適用する）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineTest {
    Blank,
    /// `*/` で終わる
    EndsBlockComment,
    /// `/*` で始まる
    StartsBlockComment,
    /// `//` で始まる
    StartsLineComment,
    /// `#define` で始まる、または `{` `}` `;` `:` で終わる
    Terminator,
    Any,
}

impl LineTest {
    pub fn matches(self, trimmed: &str) -> bool {
        match self {
            LineTest::Blank => trimmed.is_empty(),
            LineTest::EndsBlockComment => trimmed.ends_with("*/"),
            LineTest::StartsBlockComment => trimmed.starts_with("/*"),
            LineTest::StartsLineComment => trimmed.starts_with("//"),
            LineTest::Terminator => {
                trimmed.starts_with("#define") || trimmed.ends_with(['{', '}', ';', ':'])
            }
            LineTest::Any => true,
        }
    }
}

/// 遷移時の動作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanAction {
    /// 行を読み飛ばして上へ進む
    Skip,
    /// 同じ行を新しい状態で判定し直す
    Reexamine,
    /// 行をシグネチャの先頭に追加して上へ進む
    PrependSignature,
    /// 行をコメントの先頭に追加して上へ進む
    PrependComment,
    /// 行を消費せずに終了する
    Stop,
}

/// 状態遷移規則
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub state: ScanState,
    pub test: LineTest,
    pub next: ScanState,
    pub action: ScanAction,
}

const fn rule(state: ScanState, test: LineTest, next: ScanState, action: ScanAction) -> Rule {
    Rule {
        state,
        test,
        next,
        action,
    }
}

use LineTest as T;
use ScanAction as A;
use ScanState as S;

/// 後方走査の状態遷移表
///
/// 状態ごとに上から順に判定し、最初に一致した規則を使う。
pub const RULES: &[Rule] = &[
    rule(S::Initial, T::Blank, S::Initial, A::Skip),
    rule(S::Initial, T::EndsBlockComment, S::InsideBlockComment, A::Reexamine),
    rule(S::Initial, T::StartsLineComment, S::InsideLineComment, A::Reexamine),
    rule(S::Initial, T::Terminator, S::Done, A::Stop),
    rule(S::Initial, T::Any, S::Initial, A::PrependSignature),
    rule(S::InsideBlockComment, T::Blank, S::InsideBlockComment, A::Skip),
    rule(S::InsideBlockComment, T::StartsBlockComment, S::AfterComment, A::PrependComment),
    rule(S::InsideBlockComment, T::Any, S::InsideBlockComment, A::PrependComment),
    rule(S::InsideLineComment, T::Blank, S::InsideLineComment, A::Skip),
    // コメント行でも終端文字で終わればそこで止まる
    rule(S::InsideLineComment, T::Terminator, S::Done, A::Stop),
    rule(S::InsideLineComment, T::Any, S::InsideLineComment, A::PrependComment),
    rule(S::AfterComment, T::Blank, S::AfterComment, A::Skip),
    rule(S::AfterComment, T::EndsBlockComment, S::InsideBlockComment, A::Reexamine),
    rule(S::AfterComment, T::StartsLineComment, S::InsideLineComment, A::Reexamine),
    rule(S::AfterComment, T::Any, S::Done, A::Stop),
];

/// 状態と行から次の状態と動作を決める
///
/// `Done` には規則が無いので常に終了する
pub fn transition(state: ScanState, line: &str) -> (ScanState, ScanAction) {
    let trimmed = line.trim();
    RULES
        .iter()
        .filter(|r| r.state == state)
        .find(|r| r.test.matches(trimmed))
        .map(|r| (r.next, r.action))
        .unwrap_or((ScanState::Done, ScanAction::Stop))
}

/// 復元したメソッド宣言
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// 直前のコメント（行末の改行を含む）
    pub comment: String,
    /// シグネチャ（内部マクロは除去済み）
    pub text: String,
    /// 除去前のシグネチャに public マーカーが含まれていたか
    pub is_public: bool,
}

/// 抽出結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// 宣言行がマクロ呼び出しで始まる
    Macro { line: String },
    Declaration(Signature),
}

/// シグネチャ抽出器
#[derive(Debug, Clone)]
pub struct SignatureExtractor {
    macro_marker: String,
    public_marker: String,
    stripped_tokens: Vec<String>,
}

impl SignatureExtractor {
    pub fn new(config: &GeneratorConfig) -> Self {
        Self {
            macro_marker: config.macro_marker.clone(),
            public_marker: config.public_marker.clone(),
            stripped_tokens: config.stripped_tokens.clone(),
        }
    }

    /// ソーステキスト全体から抽出する
    pub fn extract_from_source(&self, source: &str, decl_line: usize) -> Option<Extraction> {
        let lines: Vec<&str> = source.split_inclusive('\n').collect();
        self.extract(&lines, decl_line)
    }

    /// 行（改行付き）の列から、1始まりの `decl_line` の宣言を抽出する
    ///
    /// 宣言行が範囲外なら None
    pub fn extract(&self, lines: &[&str], decl_line: usize) -> Option<Extraction> {
        let start = decl_line.checked_sub(1)?;
        let first = lines.get(start)?;

        if !self.macro_marker.is_empty() && first.starts_with(&self.macro_marker) {
            return Some(Extraction::Macro {
                line: first.trim().to_string(),
            });
        }

        let mut signature = scan_forward(&lines[start..]);
        let comment = scan_backward(&lines[..start], &mut signature);

        let is_public = !self.public_marker.is_empty() && signature.contains(&self.public_marker);
        for token in &self.stripped_tokens {
            signature = signature.replace(token.as_str(), "");
        }

        Some(Extraction::Declaration(Signature {
            comment,
            text: signature,
            is_public,
        }))
    }
}

/// 最初のエスケープされていない `{` / `;` まで集める
///
/// `{` は `{}` に、`;` はそのまま出力する。ファイル末尾に達したらそこまでを返す。
fn scan_forward(lines: &[&str]) -> String {
    let mut signature = String::new();
    let mut prev = None;

    for line in lines {
        for ch in line.chars() {
            let escaped = prev == Some('\\');
            match ch {
                '{' if !escaped => {
                    signature.push_str("{}");
                    return signature;
                }
                ';' if !escaped => {
                    signature.push(';');
                    return signature;
                }
                _ => signature.push(ch),
            }
            prev = Some(ch);
        }
    }

    signature
}

/// 宣言行より上の行（`above`）を下から走査し、コメントを返す
fn scan_backward(above: &[&str], signature: &mut String) -> String {
    let mut comment = String::new();
    let mut state = ScanState::Initial;
    let mut cursor = above.len();

    while cursor > 0 {
        let line = above[cursor - 1];
        let (next, action) = transition(state, line);
        state = next;

        match action {
            ScanAction::Skip => cursor -= 1,
            ScanAction::Reexamine => {}
            ScanAction::PrependSignature => {
                signature.insert_str(0, line);
                cursor -= 1;
            }
            ScanAction::PrependComment => {
                comment.insert_str(0, line);
                cursor -= 1;
            }
            ScanAction::Stop => break,
        }
    }

    comment
}
