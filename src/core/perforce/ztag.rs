//! Tagged (`-ztag`) Perforce output and the validated records built from it.
//!
//! Every record type checks its required fields up front and fails with
//! `MalformedOutput` instead of handing partially-filled values to callers.

use crate::core::error::{Result, SourceBridgeError};
use std::collections::BTreeMap;
use std::path::PathBuf;

const TAG_PREFIX: &str = "... ";

/// One `-ztag` record: ordered `key → value` pairs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagRecord {
    fields: BTreeMap<String, String>,
}

impl TagRecord {
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn require(&self, command: &str, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| SourceBridgeError::malformed_output(command, key))
    }

    /// Values of `<prefix>0`, `<prefix>1`, ... in order
    pub fn indexed(&self, prefix: &str) -> Vec<String> {
        (0..)
            .map_while(|i| self.get(&format!("{prefix}{i}")).map(str::to_string))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Split tagged output into records. Blank lines separate records; lines without
/// the tag prefix continue the previous value.
pub fn parse_ztag(output: &str) -> Vec<TagRecord> {
    let mut records = Vec::new();
    let mut current = TagRecord::default();
    let mut last_key: Option<String> = None;

    for line in output.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                records.push(std::mem::take(&mut current));
            }
            last_key = None;
            continue;
        }

        if let Some(tagged) = line.strip_prefix(TAG_PREFIX) {
            let (key, value) = tagged.split_once(' ').unwrap_or((tagged, ""));
            // a repeated key starts a new record even without a separator
            if current.fields.contains_key(key) {
                records.push(std::mem::take(&mut current));
            }
            current.fields.insert(key.to_string(), value.to_string());
            last_key = Some(key.to_string());
        } else if let Some(key) = &last_key {
            if let Some(value) = current.fields.get_mut(key) {
                value.push('\n');
                value.push_str(line);
            }
        }
    }

    if !current.is_empty() {
        records.push(current);
    }
    records
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerInfo {
    pub user_name: String,
    pub client_name: String,
    pub client_host: String,
    pub server_version: Option<String>,
}

impl ServerInfo {
    pub fn from_record(record: &TagRecord) -> Result<Self> {
        Ok(Self {
            user_name: record.require("info", "userName")?.to_string(),
            client_name: record.require("info", "clientName")?.to_string(),
            client_host: record.get("clientHost").unwrap_or_default().to_string(),
            server_version: record.get("serverVersion").map(str::to_string),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DepotRecord {
    pub name: String,
    pub depot_type: Option<String>,
}

impl DepotRecord {
    pub fn from_record(record: &TagRecord) -> Result<Self> {
        Ok(Self {
            name: record.require("depots", "name")?.to_string(),
            depot_type: record.get("type").map(str::to_string),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientRecord {
    pub client: String,
    pub root: PathBuf,
    pub host: Option<String>,
    pub owner: Option<String>,
}

impl ClientRecord {
    pub fn from_record(record: &TagRecord) -> Result<Self> {
        Ok(Self {
            client: record.require("clients", "client")?.to_string(),
            root: PathBuf::from(record.require("clients", "Root")?),
            host: record.get("Host").map(str::to_string),
            owner: record.get("Owner").map(str::to_string),
        })
    }
}

/// Editable client form (`p4 client -o` / `p4 client -i`)
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSpec {
    pub client: String,
    pub owner: String,
    pub host: String,
    pub root: PathBuf,
    pub options: Option<String>,
    pub view: Vec<String>,
}

impl ClientSpec {
    pub fn from_record(record: &TagRecord) -> Result<Self> {
        Ok(Self {
            client: record.require("client", "Client")?.to_string(),
            owner: record.get("Owner").unwrap_or_default().to_string(),
            host: record.get("Host").unwrap_or_default().to_string(),
            root: PathBuf::from(record.require("client", "Root")?),
            options: record.get("Options").map(str::to_string),
            view: record.indexed("View"),
        })
    }

    pub fn to_form(&self) -> String {
        let mut form = format!(
            concat!(
                "Client:\t{}\n\nOwner:\t{}\n\nHost:\t{}\n\n",
                "Description:\n\tManaged by source-bridge\n\nRoot:\t{}\n\n",
            ),
            self.client,
            self.owner,
            self.host,
            self.root.display()
        );
        if let Some(options) = &self.options {
            form.push_str(&format!("Options:\t{options}\n\n"));
        }
        form.push_str("View:\n");
        for line in &self.view {
            form.push_str(&format!("\t{line}\n"));
        }
        form
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub depot_file: String,
    pub action: String,
    pub change: Option<String>,
}

impl FileRecord {
    pub fn from_record(record: &TagRecord) -> Result<Self> {
        Ok(Self {
            depot_file: record.require("files", "depotFile")?.to_string(),
            action: record.require("files", "action")?.to_string(),
            change: record.get("change").map(str::to_string),
        })
    }

    /// `delete` and `move/delete` heads are gone at this revision
    pub fn is_deleted(&self) -> bool {
        self.action.ends_with("delete")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    pub change: String,
    pub user: Option<String>,
    pub description: Option<String>,
}

impl ChangeRecord {
    pub fn from_record(record: &TagRecord) -> Result<Self> {
        Ok(Self {
            change: record.require("changes", "change")?.to_string(),
            user: record.get("user").map(str::to_string),
            description: record.get("desc").map(str::to_string),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhereRecord {
    pub depot_file: String,
    pub path: PathBuf,
}

impl WhereRecord {
    pub fn from_record(record: &TagRecord) -> Result<Self> {
        Ok(Self {
            depot_file: record.require("where", "depotFile")?.to_string(),
            path: PathBuf::from(record.require("where", "path")?),
        })
    }
}

/// `(year, release)` from `p4 -V`, e.g. `Rev. P4/LINUX26X86_64/2022.1/2305383 (2022/06/02).`
pub fn parse_cli_version(output: &str) -> Option<(u32, u32)> {
    let line = output.lines().find(|line| line.starts_with("Rev. "))?;
    let release = line.split('/').nth(2)?;
    let (year, minor) = release.split_once('.')?;
    Some((year.trim().parse().ok()?, minor.trim().parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILES_OUTPUT: &str = "\
... depotFile //depot/src/main.c
... rev 3
... change 120
... action edit

... depotFile //depot/src/old.c
... rev 2
... change 118
... action delete

... depotFile //depot/src/moved.c
... rev 1
... change 119
... action move/delete
";

    #[test]
    fn test_parse_records() {
        let records = parse_ztag(FILES_OUTPUT);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].get("depotFile"), Some("//depot/src/main.c"));
        assert_eq!(records[2].get("action"), Some("move/delete"));
    }

    #[test]
    fn test_deleted_heads() {
        let files: Vec<FileRecord> = parse_ztag(FILES_OUTPUT)
            .iter()
            .map(FileRecord::from_record)
            .collect::<Result<_>>()
            .unwrap();
        let deleted: Vec<bool> = files.iter().map(FileRecord::is_deleted).collect();
        assert_eq!(deleted, vec![false, true, true]);
    }

    #[test]
    fn test_multiline_values() {
        let output = "... change 7\n... desc Fix the thing\nand another line\n";
        let records = parse_ztag(output);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("desc"), Some("Fix the thing\nand another line"));
    }

    #[test]
    fn test_repeated_key_splits_records() {
        let output = "... name depot\n... type local\n... name specs\n... type spec\n";
        let records = parse_ztag(output);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("name"), Some("specs"));
    }

    #[test]
    fn test_missing_required_field_fails_fast() {
        let record = TagRecord::from_pairs([("userName", "alice")]);
        let err = ServerInfo::from_record(&record).unwrap_err();
        assert!(matches!(
            err,
            SourceBridgeError::MalformedOutput { ref field, .. } if field == "clientName"
        ));
    }

    #[test]
    fn test_client_spec_views_and_form() {
        let record = TagRecord::from_pairs([
            ("Client", "sb_alice_box"),
            ("Owner", "alice"),
            ("Host", "box"),
            ("Root", "/home/alice/.config/source-bridge/perforce"),
            ("Options", "allwrite clobber"),
            ("View0", "//depot/... //sb_alice_box/depot/..."),
            ("View1", "//tools/... //sb_alice_box/tools/..."),
        ]);
        let spec = ClientSpec::from_record(&record).unwrap();
        assert_eq!(spec.view.len(), 2);

        let form = spec.to_form();
        assert!(form.contains("Client:\tsb_alice_box\n"));
        assert!(form.contains("Options:\tallwrite clobber\n"));
        assert!(form.ends_with(concat!(
            "View:\n",
            "\t//depot/... //sb_alice_box/depot/...\n",
            "\t//tools/... //sb_alice_box/tools/...\n",
        )));
    }

    #[test]
    fn test_cli_version() {
        let output = "Perforce - The Fast Software Configuration Management System.\n\
                      Copyright 1995-2022 Perforce Software.\n\
                      Rev. P4/LINUX26X86_64/2022.1/2305383 (2022/06/02).\n";
        assert_eq!(parse_cli_version(output), Some((2022, 1)));
        assert_eq!(parse_cli_version("garbage"), None);
    }
}
