//! 生成設定

/// コンテナクラス名のデフォルトパターン
pub const DEFAULT_CONTAINER_PATTERN: &str = r"Ctr<memoria::CtrTypesT<memoria::CtrTF<memoria::[^<>:,]+<>, memoria::[^<>:,]+, memoria::Vector>::Types>\s*>";

/// イテレータクラス名のデフォルトパターン
pub const DEFAULT_ITERATOR_PATTERN: &str = r"Iter<memoria::BTreeIterTypes<memoria::IterTypesT<memoria::CtrTF<memoria::SmallProfile<>, memoria::DynVector, memoria::Vector>::Types> > >";

/// ソースリンクのデフォルトのベースURL
pub const DEFAULT_LINK_BASE: &str = "https://bitbucket.org/vsmirnov/memoria/src";

/// 出力モード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmitMode {
    /// ドキュメント生成用（マクロで宣言されたメソッドは出力しない）
    #[default]
    Documentation,
    /// マクロで宣言されたメソッドを `//!! MACRO:` コメントとして残す
    Annotated,
}

/// 探索対象のクラス
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    /// ログ・エラー用のラベル
    pub label: String,
    /// クラス名のパターン（先頭一致、大文字小文字を区別しない）
    pub pattern: String,
    /// コンストラクタ/デストラクタの置換後の名前
    pub synthetic_name: String,
    /// 出力するクラス宣言の名前
    pub header: String,
}

impl TargetSpec {
    pub fn container() -> Self {
        Self {
            label: "container".to_string(),
            pattern: DEFAULT_CONTAINER_PATTERN.to_string(),
            synthetic_name: "Vector".to_string(),
            header: "Vector<SimpleProfile>".to_string(),
        }
    }

    pub fn iterator() -> Self {
        Self {
            label: "iterator".to_string(),
            pattern: DEFAULT_ITERATOR_PATTERN.to_string(),
            synthetic_name: "Iterator".to_string(),
            header: "Iterator<SimpleProfile>".to_string(),
        }
    }
}

/// ソースリンク設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLinkConfig {
    pub enabled: bool,
    pub base_url: String,
    /// 固定のリビジョン（Noneなら `hg id` で解決する）
    pub revision: Option<String>,
}

impl Default for SourceLinkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: DEFAULT_LINK_BASE.to_string(),
            revision: None,
        }
    }
}

/// モックソース生成の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// `.debug_info` ブロックを選ぶパターン（行のどこに一致してもよい）
    pub block_filter: String,
    pub container: TargetSpec,
    pub iterator: TargetSpec,
    /// コンストラクタは最派生クラスのものだけを残す
    pub leaf_constructors_only: bool,
    /// この文字列で始まる宣言行はマクロとして扱う
    pub macro_marker: String,
    /// シグネチャにこの文字列が含まれるメソッドはpublic
    pub public_marker: String,
    /// シグネチャから取り除く内部マクロ
    pub stripped_tokens: Vec<String>,
    pub mode: EmitMode,
    pub source_links: SourceLinkConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            block_filter: quoted_filter(DEFAULT_CONTAINER_PATTERN),
            container: TargetSpec::container(),
            iterator: TargetSpec::iterator(),
            leaf_constructors_only: true,
            macro_marker: "MEMORIA_".to_string(),
            public_marker: "MEMORIA_PUBLIC".to_string(),
            stripped_tokens: vec![
                "M_PARAMS".to_string(),
                "M_TYPE::".to_string(),
                "MEMORIA_PUBLIC".to_string(),
            ],
            mode: EmitMode::default(),
            source_links: SourceLinkConfig::default(),
        }
    }
}

impl GeneratorConfig {
    /// コンテナのパターンを差し替える（ブロックの選択パターンも追従する）
    pub fn with_container_pattern(mut self, pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        self.block_filter = quoted_filter(&pattern);
        self.container.pattern = pattern;
        self
    }

    pub fn with_iterator_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.iterator.pattern = pattern.into();
        self
    }

    pub fn with_mode(mut self, mode: EmitMode) -> Self {
        self.mode = mode;
        self
    }
}

/// `DW_AT_name<"...">` の値の先頭に一致させるためのパターン
fn quoted_filter(pattern: &str) -> String {
    format!("\"{}", pattern)
}
