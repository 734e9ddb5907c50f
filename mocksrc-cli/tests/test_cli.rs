//! mocksrc バイナリの結合テスト

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

const HEADER: &str = "\
class Ctr {
public:
    /// Creates a vector
    MEMORIA_PUBLIC Ctr();

    void compact();
};

class Iter {
public:
    MEMORIA_PUBLIC bool next();
};
";

/// `@ROOT@` はプロジェクトのルートに置き換える
const DUMP: &str = "\
.debug_info

COMPILE_UNIT<header overall offset = 0x00000000>:
<0><0x0000000b><DW_TAG_compile_unit> DW_AT_name<\"main.cpp\">
<1><0x00000010><DW_TAG_class_type> DW_AT_name<\"Ctr<int>\">
<2><0x00000018><DW_TAG_subprogram> DW_AT_name<\"Ctr\"> DW_AT_decl_file<0x00000001 @ROOT@/vector.hpp> DW_AT_decl_line<0x00000004>
<2><0x00000020><DW_TAG_subprogram> DW_AT_name<\"compact\"> DW_AT_decl_file<0x00000001 @ROOT@/vector.hpp> DW_AT_decl_line<0x00000006>
<1><0x00000030><DW_TAG_class_type> DW_AT_name<\"Iter<int>\">
<2><0x00000038><DW_TAG_subprogram> DW_AT_name<\"next\"> DW_AT_decl_file<0x00000001 @ROOT@/vector.hpp> DW_AT_decl_line<0x0000000b>

.debug_str
";

const EXPECTED: &str = "\
class Vector<SimpleProfile>
{
public:
    class Iterator<SimpleProfile>
    {
    public:
        bool next();

    protected:
    };

public:
    /// Creates a vector
    Vector();

protected:
    void compact();

};
";

fn setup() -> (TempDir, std::path::PathBuf) {
    let root = TempDir::new().expect("create temp dir");
    fs::write(root.path().join("vector.hpp"), HEADER).expect("write header");
    let dump = root.path().join("dump.txt");
    fs::write(&dump, DUMP.replace("@ROOT@", &root.path().display().to_string()))
        .expect("write dump");
    (root, dump)
}

fn mocksrc(root: &Path, args: &[&str]) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_mocksrc"));
    command
        .args([
            "--container-pattern",
            r"Ctr<\w+>",
            "--iterator-pattern",
            r"Iter<\w+>",
            "--no-source-links",
        ])
        .args(args)
        .current_dir(root)
        .env_remove("RUST_LOG");
    command
}

fn run(root: &Path, args: &[&str]) -> Output {
    mocksrc(root, args).output().expect("run mocksrc")
}

#[test]
fn test_writes_output_file() {
    let (root, dump) = setup();
    let out_dir = root.path().join("doc_src");
    let output = run(
        root.path(),
        &[
            "-o",
            out_dir.to_str().unwrap(),
            root.path().to_str().unwrap(),
            dump.to_str().unwrap(),
        ],
    );

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let text = fs::read_to_string(out_dir.join("output.cpp")).expect("read output.cpp");
    assert_eq!(text, EXPECTED);
}

#[test]
fn test_default_output_dir() {
    let (root, dump) = setup();
    let output = run(root.path(), &[".", dump.to_str().unwrap()]);

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(root.path().join("src").join("output.cpp").exists());
}

#[test]
fn test_reads_stdin() {
    let (root, dump) = setup();
    let mut child = mocksrc(root.path(), &["-p", ".", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn mocksrc");

    let input = fs::read(&dump).expect("read dump");
    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(&input)
        .expect("write stdin");
    let output = child.wait_with_output().expect("wait mocksrc");

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8(output.stdout).unwrap();
    let header = root.path().join("vector.hpp");
    assert_eq!(
        stdout,
        format!(
            "=== container (Vector<SimpleProfile>) ===\n\nCtr\n[{0}:4]\n\ncompact\n[{0}:6]\n\n\
             === iterator (Iterator<SimpleProfile>) ===\n\nnext\n[{0}:11]\n\n",
            header.display()
        )
    );
    assert!(!root.path().join("src").exists());
}

#[test]
fn test_no_matching_block_fails() {
    let (root, dump) = setup();
    let text = fs::read_to_string(&dump).unwrap().replace("Ctr<int>", "Other<int>");
    fs::write(&dump, text).unwrap();
    let output = run(root.path(), &[".", dump.to_str().unwrap()]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No suitable .debug_info, exit."), "{}", stderr);
    assert!(!root.path().join("src").exists());
}

#[test]
fn test_missing_arguments_print_usage() {
    let root = TempDir::new().unwrap();
    let output = run(root.path(), &["."]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Usage"));
}
