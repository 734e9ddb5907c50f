//! dwarfdumpのDIE行
//!
//! 構造行は `<level><id><DW_TAG_tag>` で始まり、その後に `DW_AT_xxx<value>` 形式の
//! 属性フィールドが続きます。属性は必要になった時点で行テキストから読み取ります。

use crate::DumpError;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// `<level>` で始まる行（構造行の候補）
static LEVEL_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<\d+>").expect("valid level prefix pattern"));

/// `<level><id><DW_TAG_tag>`
static ENTRY_HEAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^<(?P<level>\d+?)><(?P<id>.+?)><DW_TAG_(?P<tag>\w+?)>")
        .expect("valid entry head pattern")
});

static NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)DW_AT_name<"(?P<name>.+?)">"#).expect("valid name pattern")
});

// DWARF 4 以降は DW_AT_linkage_name、それ以前は DW_AT_MIPS_linkage_name
static LINKAGE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)DW_AT_(?:MIPS_)?linkage_name<"(?P<name>.+?)">"#)
        .expect("valid linkage name pattern")
});

static DECL_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)DW_AT_decl_file<0x\w+?\s(?P<path>.+?)>").expect("valid decl_file pattern")
});

static DECL_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)DW_AT_decl_line<(?P<line>.+?)>").expect("valid decl_line pattern")
});

static SPECIFICATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)DW_AT_specification<<(?P<id>.+?)>>").expect("valid specification pattern")
});

static TYPE_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)DW_AT_type<<(?P<id>.+?)>>").expect("valid type pattern")
});

/// 16進数文字列をu64にパース
///
/// `0x` プレフィックスは有っても無くてもよい
///
/// # Examples
/// ```
/// use mocksrc_dwarf::entry::parse_hex;
///
/// assert_eq!(parse_hex("0x0000002d"), Some(0x2d));
/// assert_eq!(parse_hex("1a"), Some(0x1a));
/// ```
pub fn parse_hex(s: &str) -> Option<u64> {
    let s = s.trim();
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u64::from_str_radix(digits, 16).ok()
}

/// DIEのタグ
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    ClassType,
    StructureType,
    Subprogram,
    FormalParameter,
    Inheritance,
    Typedef,
    /// 上記以外（`DW_TAG_` を除いたタグ名を保持）
    Other(String),
}

impl Tag {
    /// `DW_TAG_` を除いたタグ名からタグを作成する
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "class_type" => Tag::ClassType,
            "structure_type" => Tag::StructureType,
            "subprogram" => Tag::Subprogram,
            "formal_parameter" => Tag::FormalParameter,
            "inheritance" => Tag::Inheritance,
            "typedef" => Tag::Typedef,
            other => Tag::Other(other.to_string()),
        }
    }

    /// クラスまたは構造体か
    pub fn is_class_like(&self) -> bool {
        matches!(self, Tag::ClassType | Tag::StructureType)
    }
}

/// DIE識別子（16進数文字列と整数値）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryId {
    raw: String,
    value: u64,
}

impl EntryId {
    pub fn new(raw: impl Into<String>, value: u64) -> Self {
        Self {
            raw: raw.into(),
            value,
        }
    }

    /// dumpに現れた文字列表現
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn value(&self) -> u64 {
        self.value
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// グラフ内のエントリ位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryIndex(pub(crate) usize);

impl EntryIndex {
    pub fn get(self) -> usize {
        self.0
    }
}

/// 構造行の先頭部分
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EntryHead {
    pub level: usize,
    pub id: EntryId,
    pub tag: Tag,
}

impl EntryHead {
    /// 行を解析する
    ///
    /// `<level>` で始まらない行は `Ok(None)`。`<level>` で始まるのに
    /// 文法に一致しない行はエラー。
    pub fn parse(line: &str, line_no: usize) -> std::result::Result<Option<Self>, DumpError> {
        if !LEVEL_PREFIX.is_match(line) {
            return Ok(None);
        }

        let caps = ENTRY_HEAD
            .captures(line)
            .ok_or_else(|| DumpError::MalformedLine {
                line_no,
                line: line.to_string(),
            })?;

        let level = caps["level"]
            .parse::<usize>()
            .map_err(|_| DumpError::MalformedLine {
                line_no,
                line: line.to_string(),
            })?;
        let raw_id = &caps["id"];
        let value = parse_hex(raw_id).ok_or_else(|| DumpError::InvalidIdentifier {
            line_no,
            id: raw_id.to_string(),
        })?;

        Ok(Some(Self {
            level,
            id: EntryId::new(raw_id, value),
            tag: Tag::parse(&caps["tag"]),
        }))
    }
}

/// DIEエントリ
///
/// 親子関係と、後処理で一度だけ設定される `declaration` / `typedef` 関係は
/// すべて [`EntryGraph`](crate::EntryGraph) 内のインデックスで保持する。
#[derive(Debug, Clone)]
pub struct DebugInfoEntry {
    pub(crate) level: usize,
    pub(crate) id: EntryId,
    pub(crate) tag: Tag,
    pub(crate) line: String,
    pub(crate) parent: Option<EntryIndex>,
    pub(crate) children: Vec<EntryIndex>,
    pub(crate) declaration: Option<EntryIndex>,
    pub(crate) typedef: Option<EntryIndex>,
}

impl DebugInfoEntry {
    pub(crate) fn new(head: EntryHead, line: &str, parent: Option<EntryIndex>) -> Self {
        Self {
            level: head.level,
            id: head.id,
            tag: head.tag,
            line: line.to_string(),
            parent,
            children: Vec::new(),
            declaration: None,
            typedef: None,
        }
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn id(&self) -> &EntryId {
        &self.id
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    /// 元の行テキスト
    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn parent(&self) -> Option<EntryIndex> {
        self.parent
    }

    pub fn children(&self) -> &[EntryIndex] {
        &self.children
    }

    /// このエントリが定義している前方宣言
    pub fn declaration(&self) -> Option<EntryIndex> {
        self.declaration
    }

    /// このエントリを名前付けしているtypedef
    pub fn typedef(&self) -> Option<EntryIndex> {
        self.typedef
    }

    /// `DW_AT_name` の値
    pub fn own_name(&self) -> Option<&str> {
        capture(&NAME, &self.line, "name")
    }

    /// `DW_AT_linkage_name` / `DW_AT_MIPS_linkage_name` の値
    pub fn linkage_name(&self) -> Option<&str> {
        capture(&LINKAGE_NAME, &self.line, "name")
    }

    /// 宣言ファイルのパス
    pub fn decl_file(&self) -> Option<&str> {
        capture(&DECL_FILE, &self.line, "path")
    }

    /// 宣言行（1始まり）
    pub fn decl_line(&self) -> Option<usize> {
        capture(&DECL_LINE, &self.line, "line")
            .and_then(parse_hex)
            .map(|n| n as usize)
    }

    /// `DW_AT_specification` が参照する識別子
    pub fn specification(&self) -> Option<u64> {
        capture(&SPECIFICATION, &self.line, "id").and_then(parse_hex)
    }

    /// `DW_AT_type` が参照する識別子
    pub fn type_ref(&self) -> Option<u64> {
        capture(&TYPE_REF, &self.line, "id").and_then(parse_hex)
    }
}

fn capture<'a>(re: &Regex, line: &'a str, group: &str) -> Option<&'a str> {
    re.captures(line)
        .and_then(|caps| caps.name(group))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    const METHOD_LINE: &str = "<2><0x000001a4><DW_TAG_subprogram> DW_AT_external<yes(1)> \
        DW_AT_name<\"insert\"> DW_AT_decl_file<0x00000003 /src/memoria/ctr.hpp> \
        DW_AT_decl_line<0x0000001a> DW_AT_MIPS_linkage_name<\"_ZN3Ctr6insertEi\"> \
        DW_AT_declaration<yes(1)>";

    fn entry(line: &str) -> DebugInfoEntry {
        let head = EntryHead::parse(line, 1).unwrap().unwrap();
        DebugInfoEntry::new(head, line, None)
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("0x0000002d"), Some(0x2d));
        assert_eq!(parse_hex("0X2D"), Some(0x2d));
        assert_eq!(parse_hex("ff"), Some(0xff));
        assert_eq!(parse_hex("0xzz"), None);
    }

    #[test]
    fn test_parse_head() {
        let head = EntryHead::parse(METHOD_LINE, 1).unwrap().unwrap();
        assert_eq!(head.level, 2);
        assert_eq!(head.id.as_str(), "0x000001a4");
        assert_eq!(head.id.value(), 0x1a4);
        assert_eq!(head.tag, Tag::Subprogram);
    }

    #[test]
    fn test_non_structural_line_is_skipped() {
        assert_eq!(EntryHead::parse("COMPILE_UNIT<header overall offset = 0x00000000>:", 1), Ok(None));
        assert_eq!(EntryHead::parse("", 2), Ok(None));
    }

    #[test]
    fn test_malformed_line() {
        let err = EntryHead::parse("<1><0x0000002d> DW_AT_name<\"x\">", 7).unwrap_err();
        assert!(matches!(err, DumpError::MalformedLine { line_no: 7, .. }));

        let err = EntryHead::parse("<1><zzz><DW_TAG_typedef>", 8).unwrap_err();
        assert_eq!(err, DumpError::InvalidIdentifier { line_no: 8, id: "zzz".to_string() });
    }

    #[test]
    fn test_tag_parse() {
        assert_eq!(Tag::parse("class_type"), Tag::ClassType);
        assert_eq!(Tag::parse("STRUCTURE_TYPE"), Tag::StructureType);
        assert_eq!(Tag::parse("member"), Tag::Other("member".to_string()));
        assert!(Tag::StructureType.is_class_like());
        assert!(!Tag::Typedef.is_class_like());
    }

    #[test]
    fn test_attributes() {
        let e = entry(METHOD_LINE);
        assert_eq!(e.own_name(), Some("insert"));
        assert_eq!(e.linkage_name(), Some("_ZN3Ctr6insertEi"));
        assert_eq!(e.decl_file(), Some("/src/memoria/ctr.hpp"));
        assert_eq!(e.decl_line(), Some(26));
        assert_eq!(e.specification(), None);
        assert_eq!(e.type_ref(), None);
    }

    #[test]
    fn test_reference_attributes() {
        let e = entry("<1><0x00000300><DW_TAG_subprogram> DW_AT_specification<<0x000001a4>> DW_AT_type<<0x00000050>>");
        assert_eq!(e.specification(), Some(0x1a4));
        assert_eq!(e.type_ref(), Some(0x50));
        assert_eq!(e.own_name(), None);
    }

    #[test]
    fn test_template_name() {
        let e = entry("<1><0x0000002d><DW_TAG_class_type> DW_AT_name<\"Ctr<memoria::Types<int> >\"> DW_AT_byte_size<0x00000010>");
        assert_eq!(e.own_name(), Some("Ctr<memoria::Types<int> >"));
    }

    #[test]
    fn test_dwarf4_linkage_name() {
        let e = entry("<2><0x00000040><DW_TAG_subprogram> DW_AT_linkage_name<\"_ZN1A3fooEv\">");
        assert_eq!(e.linkage_name(), Some("_ZN1A3fooEv"));
    }
}
