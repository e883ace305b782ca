//! Perforce workspace management.
//!
//! [`PerforceManager`] owns one managed client (workspace) per user and host,
//! rooted at a fixed local directory. Each depot the user selects becomes one view
//! line `//<depot>/... //<client>/<depot>/...` and one tracked repository at
//! `<root>/<depot>`.
//!
//! All operations on the workspace are serialised through one async lock: the
//! client spec and the files under the root are shared state on the server and on
//! disk, and interleaved view changes and syncs would corrupt both.

pub mod transport;
pub mod ztag;

use crate::core::error::{Result, SourceBridgeError};
use crate::core::registry::RepoRegistry;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use transport::{P4Output, P4Transport};
use ztag::{
    ChangeRecord, ClientRecord, ClientSpec, DepotRecord, FileRecord, ServerInfo, WhereRecord,
};

pub use transport::CliTransport;

const CLIENT_PREFIX: &str = "source-bridge";
const DEFAULT_OPTIONS: &str = "allwrite clobber nocompress unlocked nomodtime normdir";
const NOT_IN_CLIENT_VIEW: &str = "not in client view";

#[derive(Debug, Clone, PartialEq)]
pub struct PerforceWorkspace {
    pub client_name: String,
    pub owner: String,
    pub host: String,
    pub root: PathBuf,
    pub views: Vec<String>,
}

impl PerforceWorkspace {
    fn view_line(&self, depot: &str) -> String {
        format!("//{depot}/... //{}/{depot}/...", self.client_name)
    }

    fn client_path(&self, depot: &str) -> String {
        format!("//{}/{depot}/...", self.client_name)
    }

    fn spec(&self, options: Option<String>) -> ClientSpec {
        ClientSpec {
            client: self.client_name.clone(),
            owner: self.owner.clone(),
            host: self.host.clone(),
            root: self.root.clone(),
            options,
            view: self.views.iter().map(|depot| self.view_line(depot)).collect(),
        }
    }
}

/// A depot installed as a view, ready for `RepoRegistry::add`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewMapping {
    pub local_path: PathBuf,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchResult {
    pub is_success: bool,
    pub reason: Option<String>,
}

pub struct PerforceManager {
    transport: Arc<dyn P4Transport>,
    registry: Arc<RepoRegistry>,
    workspace: tokio::sync::Mutex<PerforceWorkspace>,
    options: Option<String>,
}

impl PerforceManager {
    /// Connect, then reuse or create the managed client rooted at `root`
    pub async fn connect(
        transport: Arc<dyn P4Transport>,
        registry: Arc<RepoRegistry>,
        root: impl Into<PathBuf>,
    ) -> Result<Self> {
        let root = root.into();
        let info = Self::test_connection(transport.as_ref()).await?;
        let client_name = managed_client_name(&info);

        let existing = if info.client_name == client_name {
            log::debug!("Current client {client_name} is the managed client");
            true
        } else {
            let output = transport
                .run(None, &["clients", "-u", &info.user_name, "-E", &client_name], None)
                .await?;
            output
                .records
                .iter()
                .map(ClientRecord::from_record)
                .collect::<Result<Vec<_>>>()?
                .iter()
                .any(|client| client.client == client_name)
        };

        let form = single(
            transport.run(None, &["client", "-o", &client_name], None).await?,
            "client",
        )?;
        let spec = ClientSpec::from_record(&form)?;

        let views = if existing {
            spec.view
                .iter()
                .filter_map(|line| view_depot(line))
                .collect()
        } else {
            Vec::new()
        };

        let workspace = PerforceWorkspace {
            client_name: client_name.clone(),
            owner: info.user_name.clone(),
            host: info.client_host.clone(),
            root: root.clone(),
            views,
        };
        let options = Some(spec.options.clone().unwrap_or_else(|| DEFAULT_OPTIONS.to_string()));

        if !existing || spec.root != root {
            log::info!("Writing managed client {client_name} rooted at {}", root.display());
            let form = workspace.spec(options.clone()).to_form();
            transport.run(None, &["client", "-i"], Some(&form)).await?;
        }
        tokio::fs::create_dir_all(&root).await?;

        Ok(Self {
            transport,
            registry,
            workspace: tokio::sync::Mutex::new(workspace),
            options,
        })
    }

    /// Run `p4 info` and validate the answer
    pub async fn test_connection(transport: &dyn P4Transport) -> Result<ServerInfo> {
        let output = transport.run(None, &["info"], None).await?;
        ServerInfo::from_record(&single(output, "info")?)
    }

    pub async fn workspace(&self) -> PerforceWorkspace {
        self.workspace.lock().await.clone()
    }

    /// Replace the client's views with `views`. Depots the server does not know are
    /// dropped. Every tracked repository under the workspace root is removed before
    /// the new views are installed.
    pub async fn change_views(
        &self,
        views: &[String],
        should_sync: bool,
    ) -> Result<Vec<ViewMapping>> {
        let mut workspace = self.workspace.lock().await;

        let known = self.depots().await?;
        let mut resolved: Vec<String> = Vec::new();
        for requested in views {
            let name = depot_name(requested);
            match known.iter().find(|depot| depot.name.eq_ignore_ascii_case(name)) {
                Some(depot) if !resolved.contains(&depot.name) => resolved.push(depot.name.clone()),
                Some(_) => {}
                None => log::debug!("Depot '{name}' not found on server, skipping"),
            }
        }

        workspace.views.clear();
        self.save_client(&workspace).await?;

        let removed = self.registry.remove_under(&workspace.root).await?;
        if removed > 0 {
            log::info!("Removed {removed} repositories under {}", workspace.root.display());
        }

        workspace.views = resolved;
        self.save_client(&workspace).await?;

        let mut mappings = Vec::new();
        for depot in &workspace.views {
            let client_path = workspace.client_path(depot);
            let args: Vec<&str> = if should_sync {
                vec!["sync", "-f", client_path.as_str()]
            } else {
                vec!["sync", "-m", "1", client_path.as_str()]
            };
            self.run(&workspace, &args, None).await?;

            let local_path = workspace.root.join(depot);
            tokio::fs::create_dir_all(&local_path).await?;
            mappings.push(ViewMapping {
                local_path,
                id: depot.clone(),
            });
        }

        Ok(mappings)
    }

    /// Force-sync one file at `label` and return its content. Files outside the
    /// client view fail at once. With `retry`, a file that vanished between the sync
    /// and the read is synced and read once more.
    pub async fn get_specific_file(
        &self,
        depot_path: &str,
        label: &str,
        retry: bool,
    ) -> Result<String> {
        let workspace = self.workspace.lock().await;
        let revision = with_revision(depot_path, label);
        let mut retries_left = usize::from(retry);

        loop {
            let synced = self.run(&workspace, &["sync", "-f", &revision], None).await;
            match synced {
                Ok(output) if output.mentions(NOT_IN_CLIENT_VIEW) => {
                    return Err(SourceBridgeError::not_in_client_view(depot_path));
                }
                Err(SourceBridgeError::Perforce { message })
                    if message.contains(NOT_IN_CLIENT_VIEW) =>
                {
                    return Err(SourceBridgeError::not_in_client_view(depot_path));
                }
                Err(e) => return Err(e),
                Ok(_) => {}
            }

            let local = self.where_local(&workspace, depot_path).await?;
            match tokio::fs::read_to_string(&local).await {
                Ok(content) => return Ok(content),
                Err(e) if retries_left > 0 && e.kind() == std::io::ErrorKind::NotFound => {
                    log::warn!("{} vanished after sync, retrying", local.display());
                    retries_left -= 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Files of `depot` at `label`, relative to the depot, without deleted heads
    pub async fn get_depot_file_tree(&self, depot: &str, label: &str) -> Result<Vec<String>> {
        let workspace = self.workspace.lock().await;
        let depot = depot_name(depot);
        let path = with_revision(&format!("//{depot}/..."), label);
        let output = self.run(&workspace, &["files", &path], None).await?;

        let prefix = format!("//{depot}/");
        let mut files = Vec::new();
        for record in &output.records {
            let file = FileRecord::from_record(record)?;
            if file.is_deleted() {
                continue;
            }
            let relative = file.depot_file.strip_prefix(&prefix).unwrap_or(&file.depot_file);
            files.push(relative.to_string());
        }
        Ok(files)
    }

    /// Sync the whole workspace to a changelist. Failure is an expected outcome
    /// (unknown or inaccessible change) and is reported, not raised.
    pub async fn switch_changelist(&self, change: &str) -> SwitchResult {
        let workspace = self.workspace.lock().await;
        let target = format!("//{}/...@{change}", workspace.client_name);
        match self.run(&workspace, &["sync", &target], None).await {
            Ok(_) => SwitchResult {
                is_success: true,
                reason: None,
            },
            Err(e) => {
                log::info!("Switch to changelist {change} failed: {e}");
                SwitchResult {
                    is_success: false,
                    reason: Some(e.to_string()),
                }
            }
        }
    }

    /// Latest change synced into the user's workspace that contains `path`
    pub async fn get_changelist_for_file(&self, path: &Path) -> Result<Option<String>> {
        let workspace = self.workspace.lock().await;
        let output = self
            .transport
            .run(None, &["clients", "-u", &workspace.owner], None)
            .await?;

        let clients = output
            .records
            .iter()
            .map(ClientRecord::from_record)
            .collect::<Result<Vec<_>>>()?;
        let Some(owner) = clients
            .iter()
            .filter(|client| path.starts_with(&client.root))
            .max_by_key(|client| client.root.components().count())
        else {
            log::debug!("No workspace of {} contains {}", workspace.owner, path.display());
            return Ok(None);
        };

        let have = format!("//{}/...#have", owner.client);
        let output = self
            .transport
            .run(Some(&owner.client), &["changes", "-m", "1", "-s", "submitted", &have], None)
            .await?;
        match output.records.first() {
            Some(record) => Ok(Some(ChangeRecord::from_record(record)?.change)),
            None => Ok(None),
        }
    }

    async fn depots(&self) -> Result<Vec<DepotRecord>> {
        let output = self.transport.run(None, &["depots"], None).await?;
        output.records.iter().map(DepotRecord::from_record).collect()
    }

    async fn save_client(&self, workspace: &PerforceWorkspace) -> Result<()> {
        let form = workspace.spec(self.options.clone()).to_form();
        self.transport.run(None, &["client", "-i"], Some(&form)).await?;
        Ok(())
    }

    async fn where_local(
        &self,
        workspace: &PerforceWorkspace,
        depot_path: &str,
    ) -> Result<PathBuf> {
        let output = self.run(workspace, &["where", depot_path], None).await?;
        let record = single(output, "where")?;
        Ok(WhereRecord::from_record(&record)?.path)
    }

    async fn run(
        &self,
        workspace: &PerforceWorkspace,
        args: &[&str],
        input: Option<&str>,
    ) -> Result<P4Output> {
        self.transport
            .run(Some(&workspace.client_name), args, input)
            .await
    }
}

fn single(output: P4Output, command: &str) -> Result<ztag::TagRecord> {
    output
        .records
        .into_iter()
        .next()
        .ok_or_else(|| SourceBridgeError::malformed_output(command, "record"))
}

fn managed_client_name(info: &ServerInfo) -> String {
    let host = if info.client_host.is_empty() {
        "localhost"
    } else {
        info.client_host.as_str()
    };
    format!("{CLIENT_PREFIX}_{}_{host}", info.user_name)
        .chars()
        .map(|c| if c.is_whitespace() || c == '/' || c == '@' { '_' } else { c })
        .collect()
}

/// `//depot/...`, `//depot` and `depot` all name `depot`
fn depot_name(view: &str) -> &str {
    let trimmed = view.trim().trim_start_matches('/');
    trimmed
        .split('/')
        .next()
        .unwrap_or(trimmed)
}

/// Depot of a view line `//depot/... //client/depot/...`
fn view_depot(line: &str) -> Option<String> {
    let depot_side = line.split_whitespace().next()?;
    let name = depot_name(depot_side.trim_start_matches(['-', '+']));
    (!name.is_empty()).then(|| name.to_string())
}

/// Append a revision specifier unless `label` is empty or already carries one
fn with_revision(path: &str, label: &str) -> String {
    match label {
        "" => path.to_string(),
        l if l.starts_with('@') || l.starts_with('#') => format!("{path}{l}"),
        l => format!("{path}@{l}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::RegistryOptions;
    use crate::core::state::NewRepository;
    use crate::core::store::JsonStore;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use tempfile::TempDir;
    use ztag::TagRecord;

    /// In-memory Perforce server answering the commands the manager issues
    struct FakeServer {
        root: PathBuf,
        current_client: String,
        depots: Vec<String>,
        files: Vec<(String, String)>,
        contents: HashMap<String, String>,
        /// Depot files whose first sync leaves nothing on disk
        flaky: Mutex<Vec<String>>,
        clients_for_user: Vec<(String, String)>,
        calls: Mutex<Vec<String>>,
        forms: Mutex<Vec<String>>,
    }

    impl FakeServer {
        fn new(root: &Path) -> Self {
            Self {
                root: root.to_path_buf(),
                current_client: "someone-else".to_string(),
                depots: vec!["valid-depot".to_string(), "tools".to_string()],
                files: Vec::new(),
                contents: HashMap::new(),
                flaky: Mutex::new(Vec::new()),
                clients_for_user: Vec::new(),
                calls: Mutex::new(Vec::new()),
                forms: Mutex::new(Vec::new()),
            }
        }

        fn calls_starting_with(&self, prefix: &str) -> usize {
            self.calls.lock().iter().filter(|c| c.starts_with(prefix)).count()
        }

        fn local_path(&self, depot_file: &str) -> PathBuf {
            self.root.join(depot_file.trim_start_matches('/'))
        }

        fn records(records: Vec<TagRecord>) -> Result<P4Output> {
            Ok(P4Output {
                records,
                messages: Vec::new(),
            })
        }
    }

    #[async_trait]
    impl P4Transport for FakeServer {
        async fn run(
            &self,
            _client: Option<&str>,
            args: &[&str],
            input: Option<&str>,
        ) -> Result<P4Output> {
            self.calls.lock().push(args.join(" "));
            match args {
                ["info"] => Self::records(vec![TagRecord::from_pairs([
                    ("userName", "alice"),
                    ("clientName", self.current_client.as_str()),
                    ("clientHost", "box"),
                ])]),
                ["clients", "-u", _, "-E", _] => Self::records(Vec::new()),
                ["clients", "-u", _] => Self::records(
                    self.clients_for_user
                        .iter()
                        .map(|(client, root)| {
                            TagRecord::from_pairs([
                                ("client", client.as_str()),
                                ("Root", root.as_str()),
                            ])
                        })
                        .collect(),
                ),
                ["client", "-o", name] => Self::records(vec![TagRecord::from_pairs([
                    ("Client", *name),
                    ("Owner", "alice"),
                    ("Root", "/tmp/default-root"),
                ])]),
                ["client", "-i"] => {
                    self.forms.lock().push(input.unwrap_or_default().to_string());
                    Self::records(Vec::new())
                }
                ["depots"] => Self::records(
                    self.depots
                        .iter()
                        .map(|d| TagRecord::from_pairs([("name", d.as_str()), ("type", "local")]))
                        .collect(),
                ),
                ["files", _] => Self::records(
                    self.files
                        .iter()
                        .map(|(file, action)| {
                            TagRecord::from_pairs([
                                ("depotFile", file.as_str()),
                                ("action", action.as_str()),
                            ])
                        })
                        .collect(),
                ),
                ["sync", "-f", revision] if revision.starts_with("//excluded") => Ok(P4Output {
                    records: Vec::new(),
                    messages: vec![format!("{revision} - file(s) not in client view.")],
                }),
                ["sync", "-f", revision] if !revision.contains("/...") => {
                    let depot_file = revision.split(['@', '#']).next().unwrap_or(*revision);
                    let mut flaky = self.flaky.lock();
                    if let Some(pos) = flaky.iter().position(|f| f == depot_file) {
                        flaky.remove(pos);
                        return Self::records(Vec::new());
                    }
                    if let Some(content) = self.contents.get(depot_file) {
                        let path = self.local_path(depot_file);
                        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
                        std::fs::write(path, content).unwrap();
                    }
                    Self::records(Vec::new())
                }
                ["sync", target] if target.ends_with("@999") => {
                    Err(SourceBridgeError::perforce("Change 999 unknown."))
                }
                ["sync", ..] => Self::records(Vec::new()),
                ["where", depot_file] => Self::records(vec![TagRecord::from_pairs([
                    ("depotFile", *depot_file),
                    ("path", self.local_path(depot_file).to_str().unwrap()),
                ])]),
                ["changes", ..] => Self::records(vec![TagRecord::from_pairs([("change", "4242")])]),
                other => Err(SourceBridgeError::perforce(format!("unexpected {other:?}"))),
            }
        }
    }

    async fn manager_with(
        server: FakeServer,
        root: &Path,
    ) -> (PerforceManager, Arc<FakeServer>, Arc<RepoRegistry>) {
        let server = Arc::new(server);
        let registry = Arc::new(
            RepoRegistry::load(Arc::new(JsonStore::in_memory()), RegistryOptions::default())
                .unwrap(),
        );
        let manager = PerforceManager::connect(server.clone(), Arc::clone(&registry), root)
            .await
            .unwrap();
        (manager, server, registry)
    }

    #[tokio::test]
    async fn test_connect_creates_managed_client() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("perforce");
        let (manager, server, _) = manager_with(FakeServer::new(dir.path()), &root).await;

        let workspace = manager.workspace().await;
        assert_eq!(workspace.client_name, "source-bridge_alice_box");
        assert_eq!(workspace.root, root);
        assert!(root.exists());

        let forms = server.forms.lock();
        assert_eq!(forms.len(), 1);
        assert!(forms[0].contains("Client:\tsource-bridge_alice_box"));
        assert!(forms[0].contains(&format!("Root:\t{}", root.display())));
    }

    #[tokio::test]
    async fn test_change_views_drops_unknown_depots_and_stale_records() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("perforce");
        let (manager, server, registry) = manager_with(FakeServer::new(dir.path()), &root).await;

        registry
            .add(NewRepository::new(root.join("old-depot")).with_id("old-depot"))
            .await
            .unwrap();
        registry
            .add(NewRepository::new(dir.path().join("elsewhere")).with_id("elsewhere"))
            .await
            .unwrap();

        let views = vec!["valid-depot".to_string(), "missing-depot".to_string()];
        let mappings = manager.change_views(&views, true).await.unwrap();

        assert_eq!(
            mappings,
            vec![ViewMapping {
                local_path: root.join("valid-depot"),
                id: "valid-depot".to_string(),
            }]
        );
        assert!(registry.get_repo_by_id("old-depot").is_none());
        assert!(registry.get_repo_by_id("elsewhere").is_some());
        assert_eq!(
            server.calls_starting_with("sync -f //source-bridge_alice_box/valid-depot/..."),
            1
        );

        let forms = server.forms.lock();
        let last = forms.last().unwrap();
        assert!(last.contains("//valid-depot/... //source-bridge_alice_box/valid-depot/..."));
        assert!(!last.contains("missing-depot"));
    }

    #[tokio::test]
    async fn test_change_views_without_sync_fetches_structure_only() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("perforce");
        let (manager, server, _) = manager_with(FakeServer::new(dir.path()), &root).await;

        manager
            .change_views(&["//tools/...".to_string()], false)
            .await
            .unwrap();
        assert_eq!(server.calls_starting_with("sync -m 1 //source-bridge_alice_box/tools/..."), 1);
        assert_eq!(manager.workspace().await.views, vec!["tools".to_string()]);
    }

    #[tokio::test]
    async fn test_get_specific_file_reads_synced_content() {
        let dir = TempDir::new().unwrap();
        let mut server = FakeServer::new(dir.path());
        server
            .contents
            .insert("//valid-depot/src/a.c".to_string(), "int main;".to_string());
        let (manager, _, _) = manager_with(server, &dir.path().join("perforce")).await;

        let content = manager
            .get_specific_file("//valid-depot/src/a.c", "12", true)
            .await
            .unwrap();
        assert_eq!(content, "int main;");
    }

    #[tokio::test]
    async fn test_get_specific_file_retries_once_after_vanishing() {
        let dir = TempDir::new().unwrap();
        let mut server = FakeServer::new(dir.path());
        server
            .contents
            .insert("//valid-depot/b.c".to_string(), "b".to_string());
        server.flaky.lock().push("//valid-depot/b.c".to_string());
        let (manager, server, _) = manager_with(server, &dir.path().join("perforce")).await;

        let content = manager.get_specific_file("//valid-depot/b.c", "", true).await.unwrap();
        assert_eq!(content, "b");
        assert_eq!(server.calls_starting_with("sync -f //valid-depot/b.c"), 2);
    }

    #[tokio::test]
    async fn test_get_specific_file_without_retry_propagates() {
        let dir = TempDir::new().unwrap();
        let mut server = FakeServer::new(dir.path());
        server
            .contents
            .insert("//valid-depot/b.c".to_string(), "b".to_string());
        server.flaky.lock().push("//valid-depot/b.c".to_string());
        let (manager, _, _) = manager_with(server, &dir.path().join("perforce")).await;

        let err = manager
            .get_specific_file("//valid-depot/b.c", "", false)
            .await
            .unwrap_err();
        assert!(matches!(err, SourceBridgeError::Io(_)));
    }

    #[tokio::test]
    async fn test_get_specific_file_outside_view_fails_without_retry() {
        let dir = TempDir::new().unwrap();
        let (manager, server, _) =
            manager_with(FakeServer::new(dir.path()), &dir.path().join("perforce")).await;

        let err = manager
            .get_specific_file("//excluded/x.c", "", true)
            .await
            .unwrap_err();
        assert!(matches!(err, SourceBridgeError::NotInClientView { .. }));
        assert_eq!(server.calls_starting_with("sync -f //excluded"), 1);
    }

    #[tokio::test]
    async fn test_depot_file_tree_skips_deleted_heads() {
        let dir = TempDir::new().unwrap();
        let mut server = FakeServer::new(dir.path());
        server.files = vec![
            ("//valid-depot/src/main.c".to_string(), "edit".to_string()),
            ("//valid-depot/src/gone.c".to_string(), "delete".to_string()),
            ("//valid-depot/README".to_string(), "add".to_string()),
        ];
        let (manager, server, _) = manager_with(server, &dir.path().join("perforce")).await;

        let files = manager.get_depot_file_tree("valid-depot", "@120").await.unwrap();
        assert_eq!(files, vec!["src/main.c".to_string(), "README".to_string()]);
        assert_eq!(server.calls_starting_with("files //valid-depot/...@120"), 1);
    }

    #[tokio::test]
    async fn test_switch_changelist_reports_failure() {
        let dir = TempDir::new().unwrap();
        let (manager, _, _) =
            manager_with(FakeServer::new(dir.path()), &dir.path().join("perforce")).await;

        assert!(manager.switch_changelist("120").await.is_success);
        let failed = manager.switch_changelist("999").await;
        assert!(!failed.is_success);
        assert!(failed.reason.unwrap().contains("999"));
    }

    #[tokio::test]
    async fn test_changelist_for_file_picks_innermost_workspace() {
        let dir = TempDir::new().unwrap();
        let mut server = FakeServer::new(dir.path());
        server.clients_for_user = vec![
            ("outer".to_string(), "/work".to_string()),
            ("inner".to_string(), "/work/game".to_string()),
        ];
        let (manager, server, _) = manager_with(server, &dir.path().join("perforce")).await;

        let change = manager
            .get_changelist_for_file(Path::new("/work/game/src/a.c"))
            .await
            .unwrap();
        assert_eq!(change.as_deref(), Some("4242"));
        assert_eq!(server.calls_starting_with("changes -m 1 -s submitted //inner/...#have"), 1);

        let none = manager
            .get_changelist_for_file(Path::new("/elsewhere/a.c"))
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_depot_names_and_revisions() {
        assert_eq!(depot_name("//depot/..."), "depot");
        assert_eq!(depot_name("depot"), "depot");
        assert_eq!(view_depot("//depot/... //ws/depot/...").as_deref(), Some("depot"));
        assert_eq!(with_revision("//d/a.c", ""), "//d/a.c");
        assert_eq!(with_revision("//d/a.c", "12"), "//d/a.c@12");
        assert_eq!(with_revision("//d/a.c", "#head"), "//d/a.c#head");
    }
}
