use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::tempdir;

fn write_file(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn write_package(root: &Path) {
    write_file(
        &root.join("hata/__init__.py"),
        "\"\"\"Hata.\"\"\"\nfrom .guild import *\n",
    );
    write_file(
        &root.join("hata/guild.py"),
        concat!(
            "__all__ = ('Guild',)\n",
            "\n",
            "class Guild:\n",
            "    \"\"\"Represents a guild, see ``Channel``.\"\"\"\n",
            "    def get_channel(self, channel_id):\n",
            "        \"\"\"Returns the channel.\"\"\"\n",
        ),
    );
    write_file(&root.join("hata/ignored.py"), "class Ignored:\n    pass\n");
    write_file(&root.join("hata/.hidden.py"), "class Hidden:\n    pass\n");
    write_file(&root.join(".docmapignore"), "ignored.py\n");
}

#[test]
fn cli_map_respects_docmapignore_and_hidden() {
    let dir = tempdir().unwrap();
    write_package(dir.path());

    let output = Command::new(env!("CARGO_BIN_EXE_docmap"))
        .args(["map", "hata", "--root", dir.path().to_str().unwrap(), "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let v: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let names: Vec<&str> = v["children"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();

    assert!(names.contains(&"guild"));
    assert!(names.contains(&"Guild"));
    assert!(!names.contains(&"ignored"));
    assert!(!names.contains(&".hidden"));
}

#[test]
fn cli_search_finds_misspelled_names() {
    let dir = tempdir().unwrap();
    write_package(dir.path());

    let output = Command::new(env!("CARGO_BIN_EXE_docmap"))
        .args([
            "search",
            "get_chanel",
            "-m",
            "hata",
            "--root",
            dir.path().to_str().unwrap(),
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.lines().next(), Some("hata.guild.Guild.get_channel"));
}

#[test]
fn cli_doc_reports_unresolved_references() {
    let dir = tempdir().unwrap();
    write_package(dir.path());

    let output = Command::new(env!("CARGO_BIN_EXE_docmap"))
        .args([
            "doc",
            "hata.Guild",
            "--root",
            dir.path().to_str().unwrap(),
            "--html",
            "--json",
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let v: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(v["path"], "hata.guild.Guild");
    assert_eq!(v["kind"], "type");
    assert!(v["html"].as_str().unwrap().contains("<code>Channel</code>"));
    let warnings = v["warnings"].as_array().unwrap();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].as_str().unwrap().starts_with("DocWarning at hata.guild.Guild:"));
}

#[test]
fn cli_highlight_applies_classes() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("snippet.py");
    write_file(&file, "x = 'a'\n");

    let output = Command::new(env!("CARGO_BIN_EXE_docmap"))
        .args([
            "highlight",
            file.to_str().unwrap(),
            "--class",
            "string=hl-str",
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("<span class=\"hl-str\">&#39;a&#39;</span>"));
}

#[test]
fn cli_highlight_rejects_unknown_token_type() {
    let output = Command::new(env!("CARGO_BIN_EXE_docmap"))
        .args(["highlight", "--class", "nope=x", "--json"])
        .stdin(std::process::Stdio::null())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr).unwrap();
    let v: serde_json::Value = serde_json::from_str(stderr.trim()).unwrap();
    assert!(v["error"].as_str().unwrap().contains("unknown token type"));
}

#[test]
fn cli_json_error_output_is_valid_json_even_with_quotes_in_path() {
    let dir = tempdir().unwrap();

    let bad_path = dir.path().join("does-not-exist-\"quoted\"");

    let output = Command::new(env!("CARGO_BIN_EXE_docmap"))
        .args(["map", "hata", "--root", bad_path.to_str().unwrap(), "--json"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(3));

    let stderr = String::from_utf8(output.stderr).unwrap();
    let _: serde_json::Value = serde_json::from_str(stderr.trim()).unwrap();
}
