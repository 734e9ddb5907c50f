//! テンプレートインスタンス化されたターゲットクラスの探索

use crate::{ClassHierarchy, ClassId, DumpError, Result};
use regex::{Regex, RegexBuilder};
use tracing::debug;

/// クラス名のパターンでターゲットクラスを探す
#[derive(Debug, Clone)]
pub struct TargetLocator {
    /// エラーメッセージ用のラベル
    label: String,
    /// 名前の先頭に固定したパターン
    pattern: Regex,
}

impl TargetLocator {
    /// ロケータを作成する
    ///
    /// パターンは大文字小文字を区別せず、クラス名の先頭から一致させる
    pub fn new(label: impl Into<String>, pattern: &str) -> Result<Self> {
        let pattern = RegexBuilder::new(&format!("^(?:{})", pattern))
            .case_insensitive(true)
            .build()?;
        Ok(Self {
            label: label.into(),
            pattern,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// クラス名がパターンに一致するか
    pub fn is_match(&self, name: &str) -> bool {
        self.pattern.is_match(name)
    }

    /// 最初に一致したクラスを返す
    pub fn locate(&self, hierarchy: &ClassHierarchy) -> std::result::Result<ClassId, DumpError> {
        let found = hierarchy
            .classes()
            .find(|(_, class)| class.name().is_some_and(|name| self.is_match(name)))
            .map(|(id, _)| id);

        match found {
            Some(id) => {
                debug!(
                    "Located {} class: {:?}",
                    self.label,
                    hierarchy.class(id).name()
                );
                Ok(id)
            }
            None => Err(DumpError::TargetNotFound {
                target: self.label.clone(),
            }),
        }
    }
}
