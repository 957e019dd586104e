//! Product records as producers submit them.
//!
//! Field names on the wire are `Model`, `Brand`, `Size` and the optional
//! `FolderData`; the collector stores whatever JSON arrives and does not
//! require this shape.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Folder name used when uploaded paths carry no directory component
pub const DEFAULT_FOLDER_NAME: &str = "UploadedFolder";

/// One product submitted by a producer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProductRecord {
    pub model: String,
    pub brand: String,
    pub size: Size,
    /// Descriptive folder listing; never checked against real files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_data: Option<FolderData>,
}

/// Physical dimensions. All fields are finite; the unit is unspecified.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Size {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

/// Folder metadata: a root name plus subfolder path -> file names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderData {
    pub folder_name: String,
    pub files: BTreeMap<String, Vec<String>>,
}

impl FolderData {
    /// Build folder metadata from relative upload paths.
    ///
    /// Backslashes count as separators. Files without a directory land under
    /// the `""` key; the rest are keyed by their full parent path. The root
    /// name is the first segment of the first path, or `UploadedFolder` when
    /// that path has no directory. Returns `None` for an empty list.
    pub fn from_paths<I, S>(paths: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut folder_name = None;
        let mut files: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for path in paths {
            let rel_path = path.as_ref().replace('\\', "/");

            let (subfolder, file_name) = match rel_path.rsplit_once('/') {
                Some((parent, name)) => (parent.to_string(), name.to_string()),
                None => (String::new(), rel_path.clone()),
            };

            if folder_name.is_none() {
                folder_name = Some(match rel_path.split_once('/') {
                    Some((root, _)) => root.to_string(),
                    None => DEFAULT_FOLDER_NAME.to_string(),
                });
            }

            files.entry(subfolder).or_default().push(file_name);
        }

        folder_name.map(|folder_name| FolderData { folder_name, files })
    }

    /// Total number of files across all subfolders
    pub fn file_count(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn sample() -> ProductRecord {
        ProductRecord {
            model: "Rodigo".to_string(),
            brand: "LP".to_string(),
            size: Size {
                length: 10.0,
                width: 5.0,
                height: 2.0,
            },
            folder_data: None,
        }
    }

    #[test]
    fn test_wire_field_names() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(
            value,
            json!({
                "Model": "Rodigo",
                "Brand": "LP",
                "Size": {"Length": 10.0, "Width": 5.0, "Height": 2.0}
            })
        );
    }

    #[test]
    fn test_field_order_on_wire() {
        let text = serde_json::to_string(&sample()).unwrap();
        assert_eq!(
            text,
            r#"{"Model":"Rodigo","Brand":"LP","Size":{"Length":10.0,"Width":5.0,"Height":2.0}}"#
        );
    }

    #[test]
    fn test_folder_data_optional() {
        let record: ProductRecord = serde_json::from_str(
            r#"{"Model":"Andre","Brand":"VH","Size":{"Length":1,"Width":2,"Height":3}}"#,
        )
        .unwrap();
        assert!(record.folder_data.is_none());
        assert_eq!(record.size.height, 3.0);
    }

    #[test]
    fn test_roundtrip_with_awkward_floats_and_deep_folders() {
        let mut record = sample();
        record.size = Size {
            length: 0.1 + 0.2,
            width: f64::MAX,
            height: -1.0e-300,
        };
        record.folder_data = FolderData::from_paths([
            "Root/a.txt",
            "Root/x/y/z/w/deep.bin",
            "Root/x/y/z/w/deeper.bin",
            "Root/x/other.txt",
        ]);

        let text = serde_json::to_string(&record).unwrap();
        let back: ProductRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_from_paths_groups_by_parent() {
        let folder = FolderData::from_paths([
            "Photos/front.jpg",
            "Photos/back.jpg",
            "Photos/raw/front.cr2",
        ])
        .unwrap();

        assert_eq!(folder.folder_name, "Photos");
        assert_eq!(folder.files["Photos"], vec!["front.jpg", "back.jpg"]);
        assert_eq!(folder.files["Photos/raw"], vec!["front.cr2"]);
        assert_eq!(folder.file_count(), 3);
    }

    #[test]
    fn test_from_paths_backslashes() {
        let folder = FolderData::from_paths(["Docs\\spec\\a.pdf"]).unwrap();
        assert_eq!(folder.folder_name, "Docs");
        assert_eq!(folder.files["Docs/spec"], vec!["a.pdf"]);
    }

    #[test]
    fn test_from_paths_flat_files() {
        let folder = FolderData::from_paths(["a.txt", "dir/b.txt"]).unwrap();
        assert_eq!(folder.folder_name, DEFAULT_FOLDER_NAME);
        assert_eq!(folder.files[""], vec!["a.txt"]);
        assert_eq!(folder.files["dir"], vec!["b.txt"]);
    }

    #[test]
    fn test_from_paths_empty() {
        assert!(FolderData::from_paths(Vec::<String>::new()).is_none());
    }

    #[test]
    fn test_folder_data_wire_shape() {
        let folder = FolderData::from_paths(["Root/a.txt"]).unwrap();
        let value: Value = serde_json::to_value(&folder).unwrap();
        assert_eq!(value, json!({"folder_name": "Root", "files": {"Root": ["a.txt"]}}));
    }
}
