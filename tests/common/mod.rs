#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use feed_loader::{FileFormat, SqliteStore};
use tempfile::{TempDir, tempdir};

pub const CATALOG_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<catalog>
  <item>
    <entity_id>340</entity_id>
    <sku>20</sku>
    <price>41.6000</price>
    <name>X</name>
  </item>
</catalog>
"#;

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Path of the SQLite database used by this workspace.
    pub fn database(&self) -> PathBuf {
        self.temp_dir.path().join("feed.db")
    }

    pub fn open_store(&self) -> SqliteStore {
        SqliteStore::open(&self.database()).expect("open sqlite store")
    }
}

/// Builds an XML feed with one `<item>` per entry of `items`.
pub fn xml_feed(root: &str, items: &[&[(&str, &str)]]) -> String {
    let mut xml = format!("<{root}>\n");
    for item in items {
        xml.push_str("  <item>");
        for (name, value) in item.iter() {
            xml.push_str(&format!("<{name}>{value}</{name}>"));
        }
        xml.push_str("</item>\n");
    }
    xml.push_str(&format!("</{root}>\n"));
    xml
}

pub fn parse_xml(xml: &str) -> feed_loader::Feed {
    FileFormat::Xml
        .parse_bytes("feed", xml.as_bytes().to_vec())
        .expect("parse xml feed")
}
