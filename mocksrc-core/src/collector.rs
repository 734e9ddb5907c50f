//! 継承チェーンをまたいだメソッドの統合

use mocksrc_dwarf::{ClassHierarchy, ClassId, Method, MethodKind};
use std::collections::HashMap;
use tracing::debug;

/// 統合後のメソッド
#[derive(Debug, Clone, Copy)]
pub struct CollectedMethod<'h> {
    pub method: &'h Method,
    pub name: &'h str,
    pub kind: MethodKind,
    pub decl_file: &'h str,
    pub decl_line: Option<usize>,
}

impl CollectedMethod<'_> {
    /// コンストラクタまたはデストラクタか
    pub fn is_special(&self) -> bool {
        matches!(self.kind, MethodKind::Constructor | MethodKind::Destructor)
    }
}

/// 線形化されたクラス列（最派生クラスが先頭）のメソッドを統合する
///
/// 基底クラスから順に (名前, レシーバを除いた引数型) をキーとして登録し、
/// 同じキーは派生クラスのメソッドで上書きする。宣言ファイルが無いメソッドは除外する。
/// 結果はコンストラクタ/デストラクタが先、各グループ内は名前順。
pub fn collect_methods<'h>(
    hierarchy: &'h ClassHierarchy,
    chain: &[ClassId],
    leaf_constructors_only: bool,
) -> Vec<CollectedMethod<'h>> {
    let allowed_ctr = chain
        .first()
        .and_then(|&leaf| hierarchy.class(leaf).constructor_name());

    let mut merged: Vec<CollectedMethod<'h>> = Vec::new();
    let mut positions: HashMap<(&'h str, &'h [u64]), usize> = HashMap::new();

    for &class_id in chain.iter().rev() {
        for method in hierarchy.methods(class_id) {
            let Some(name) = method.name() else {
                debug!("Skipping unnamed method entry {:?}", method.entry());
                continue;
            };
            let kind = hierarchy.method_kind(method);

            // 中間クラスのコンストラクタは継承されない
            if leaf_constructors_only && kind == MethodKind::Constructor && allowed_ctr != Some(name) {
                continue;
            }

            let Some(decl_file) = hierarchy.decl_file(method) else {
                continue;
            };

            let parameters = hierarchy.parameters(method);
            let key = (name, parameters.get(1..).unwrap_or(&[]));
            let collected = CollectedMethod {
                method,
                name,
                kind,
                decl_file,
                decl_line: hierarchy.decl_line(method),
            };

            match positions.get(&key) {
                Some(&i) => merged[i] = collected,
                None => {
                    positions.insert(key, merged.len());
                    merged.push(collected);
                }
            }
        }
    }

    merged.sort_by_key(|m| (!m.is_special(), m.name));
    merged
}
