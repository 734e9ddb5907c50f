//! ソースリポジトリへのリンク生成
//!
//! リビジョンは外部コマンド（`hg id`）で取得するため、実行中に一度だけ解決して保持する。

use crate::config::SourceLinkConfig;
use std::cell::OnceCell;
use std::env;
use std::path::{Component, Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

/// ソースリンクのコンテキスト
#[derive(Debug)]
pub struct SourceLinker {
    /// 絶対パスに正規化済み
    project_root: PathBuf,
    base_url: String,
    enabled: bool,
    revision: OnceCell<Option<String>>,
}

impl SourceLinker {
    pub fn new(project_root: impl Into<PathBuf>, config: &SourceLinkConfig) -> Self {
        let revision = match &config.revision {
            Some(rev) => OnceCell::from(Some(rev.clone())),
            None => OnceCell::new(),
        };
        Self {
            project_root: normalize(&project_root.into()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            enabled: config.enabled,
            revision,
        }
    }

    /// リンクを生成しないコンテキスト
    pub fn disabled() -> Self {
        Self {
            project_root: PathBuf::new(),
            base_url: String::new(),
            enabled: false,
            revision: OnceCell::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// リビジョン（初回呼び出し時に解決する）
    pub fn revision(&self) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        self.revision
            .get_or_init(|| resolve_revision(&self.project_root))
            .as_deref()
    }

    /// `\srclink{...}` コマンドを生成する
    ///
    /// `line` はリンク先に埋め込む行番号
    pub fn link(&self, decl_file: &Path, line: usize) -> Option<String> {
        let revision = self.revision()?;
        let relative = relative_path(&normalize(decl_file), &self.project_root);

        Some(format!(
            "\\srclink{{{}/{}/{}#cl-{}, {}}}",
            self.base_url,
            revision,
            relative.to_string_lossy(),
            line,
            revision
        ))
    }

    /// メソッドのコメントに追加するリンクブロック
    pub fn comment_block(&self, decl_file: &Path, decl_line: usize) -> Option<String> {
        self.link(decl_file, decl_line.saturating_sub(1))
            .map(|link| format!("\n/**\n\n*\n* {}\n*/\n", link))
    }
}

/// 絶対パスにして `.` と `..` を字句的に取り除く（シンボリックリンクは辿らない）
fn normalize(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(normalized.components().next_back(), Some(Component::Normal(_))) {
                    normalized.pop();
                } else if !normalized.has_root() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// `base` から見た `path` の相対パス（どちらも正規化済み）
///
/// `base` の外にあるファイルは `..` で遡る。同じパスなら `.`
fn relative_path(path: &Path, base: &Path) -> PathBuf {
    let mut path_components = path.components().peekable();
    let mut base_components = base.components().peekable();
    while let (Some(p), Some(b)) = (path_components.peek(), base_components.peek()) {
        if p != b {
            break;
        }
        path_components.next();
        base_components.next();
    }

    let mut relative: PathBuf = base_components.map(|_| Component::ParentDir).collect();
    relative.extend(path_components);
    if relative.as_os_str().is_empty() {
        relative.push(".");
    }
    relative
}

/// `hg id -i --debug` でリビジョンを取得する
fn resolve_revision(project_root: &Path) -> Option<String> {
    let output = Command::new("hg")
        .args(["id", "-i", "--debug", "--cwd"])
        .arg(project_root)
        .output();

    match output {
        Ok(output) if output.status.success() => {
            let revision = String::from_utf8_lossy(&output.stdout).trim().to_string();
            debug!("Resolved source revision {}", revision);
            Some(revision).filter(|r| !r.is_empty())
        }
        Ok(output) => {
            warn!(
                "hg id failed in {}: {}; source links disabled",
                project_root.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
            None
        }
        Err(e) => {
            warn!("Failed to run hg: {}; source links disabled", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linker() -> SourceLinker {
        let config = SourceLinkConfig {
            enabled: true,
            base_url: "https://example.org/repo/src/".to_string(),
            revision: Some("abc123".to_string()),
        };
        SourceLinker::new("/work/memoria", &config)
    }

    #[test]
    fn test_link_relative_to_project_root() {
        let link = linker().link(Path::new("/work/memoria/include/ctr.hpp"), 41).unwrap();
        assert_eq!(
            link,
            "\\srclink{https://example.org/repo/src/abc123/include/ctr.hpp#cl-41, abc123}"
        );
    }

    #[test]
    fn test_comment_block_uses_previous_line() {
        let block = linker()
            .comment_block(Path::new("/work/memoria/ctr.hpp"), 10)
            .unwrap();
        assert_eq!(
            block,
            "\n/**\n\n*\n* \\srclink{https://example.org/repo/src/abc123/ctr.hpp#cl-9, abc123}\n*/\n"
        );
    }

    #[test]
    fn test_disabled_linker() {
        let linker = SourceLinker::disabled();
        assert_eq!(linker.revision(), None);
        assert_eq!(linker.link(Path::new("/a.hpp"), 1), None);

        let config = SourceLinkConfig {
            enabled: false,
            revision: Some("abc".to_string()),
            ..SourceLinkConfig::default()
        };
        assert_eq!(SourceLinker::new("/", &config).revision(), None);
    }

    #[test]
    fn test_path_outside_root_goes_up() {
        let link = linker().link(Path::new("/usr/include/vector"), 3).unwrap();
        assert!(link.contains("abc123/../../usr/include/vector#cl-3"));
    }

    #[test]
    fn test_parent_segments_are_normalized() {
        let config = SourceLinkConfig {
            enabled: true,
            base_url: "https://x/src".to_string(),
            revision: Some("r1".to_string()),
        };
        let expected = "\\srclink{https://x/src/r1/include/ctr.hpp#cl-9, r1}";

        let linker = SourceLinker::new("/work/memoria", &config);
        assert_eq!(
            linker.link(Path::new("/work/memoria/build/../include/ctr.hpp"), 9).unwrap(),
            expected
        );

        let linker = SourceLinker::new("/work/memoria/build/..", &config);
        assert_eq!(
            linker.link(Path::new("/work/memoria/include/ctr.hpp"), 9).unwrap(),
            expected
        );

        let linker = SourceLinker::new("/work/memoria/./", &config);
        assert_eq!(
            linker.link(Path::new("/work/memoria/include/./ctr.hpp"), 9).unwrap(),
            expected
        );
    }

    #[test]
    fn test_relative_root_uses_current_dir() {
        let config = SourceLinkConfig {
            enabled: true,
            base_url: "https://x/src".to_string(),
            revision: Some("r1".to_string()),
        };
        let cwd = env::current_dir().unwrap();
        let linker = SourceLinker::new("nested/..", &config);
        assert_eq!(
            linker.link(&cwd.join("include/ctr.hpp"), 1).unwrap(),
            "\\srclink{https://x/src/r1/include/ctr.hpp#cl-1, r1}"
        );
    }

    #[test]
    fn test_normalize_and_relative_path() {
        assert_eq!(normalize(Path::new("/a/b/../c/./d")), PathBuf::from("/a/c/d"));
        assert_eq!(normalize(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(
            relative_path(Path::new("/a/b/c.hpp"), Path::new("/a/x/y")),
            PathBuf::from("../../b/c.hpp")
        );
        assert_eq!(relative_path(Path::new("/a"), Path::new("/a")), PathBuf::from("."));
    }

    #[test]
    fn test_configured_revision_is_used() {
        assert_eq!(linker().revision(), Some("abc123"));
    }
}
