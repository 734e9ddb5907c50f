//! mocksrc コア機能
//!
//! dwarfdump の出力から復元したクラス階層をもとに、コンテナとイテレータの
//! 継承チェーンを1つのクラス宣言にまとめたモックソースを生成します。
//! メソッド宣言とコメントは元のソースファイルから復元します。

pub mod config;
pub mod collector;
pub mod signature;
pub mod srclink;
pub mod emitter;
pub mod pipeline;

pub use config::{EmitMode, GeneratorConfig, SourceLinkConfig, TargetSpec};
pub use collector::{collect_methods, CollectedMethod};
pub use signature::{Extraction, Signature, SignatureExtractor};
pub use srclink::SourceLinker;
pub use emitter::MockEmitter;
pub use pipeline::{Analysis, MockGenerator, OUTPUT_FILE_NAME};

/// コア機能の結果型
pub type Result<T> = anyhow::Result<T>;
