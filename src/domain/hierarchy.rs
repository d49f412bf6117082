use crate::domain::{SessionRecord, relative_time};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use time::OffsetDateTime;

pub const DEFAULT_ANCHOR: &str = "Git";
pub const FALLBACK_ORGANIZATION: &str = "other";
pub const UNKNOWN_BRANCH: &str = "unknown";
pub const ORPHAN_AGENTS_BRANCH: &str = "(agents)";
const ROOT_LABEL: &str = "Sessions";
const SESSION_ID_LABEL_CHARS: usize = 8;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct NodeId(usize);

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Root,
    Organization {
        session_count: usize,
    },
    Repository {
        session_count: usize,
        agent_count: usize,
        project_path: PathBuf,
    },
    Branch,
    Session(Arc<SessionRecord>),
    Agent(Arc<SessionRecord>),
}

impl NodeKind {
    pub fn session(&self) -> Option<&Arc<SessionRecord>> {
        match self {
            Self::Session(record) | Self::Agent(record) => Some(record),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HierarchyNode {
    pub label: String,
    pub kind: NodeKind,
    pub children: Vec<NodeId>,
    pub expanded: bool,
}

impl HierarchyNode {
    fn new(label: String, kind: NodeKind) -> Self {
        Self {
            label,
            kind,
            children: Vec::new(),
            expanded: false,
        }
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Organization → repository → branch → session → agent tree, stored as an arena.
#[derive(Clone, Debug, PartialEq)]
pub struct Hierarchy {
    nodes: Vec<HierarchyNode>,
}

impl Default for Hierarchy {
    fn default() -> Self {
        Self::empty()
    }
}

impl Hierarchy {
    pub fn empty() -> Self {
        let mut root = HierarchyNode::new(ROOT_LABEL.to_string(), NodeKind::Root);
        root.expanded = true;
        Self { nodes: vec![root] }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &HierarchyNode {
        &self.nodes[id.0]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn set_expanded(&mut self, id: NodeId, expanded: bool) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.expanded = expanded;
        }
    }

    /// Session and agent leaves reachable from the root.
    pub fn leaf_count(&self) -> usize {
        let mut count = 0usize;
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            if node.kind.session().is_some() {
                count += 1;
            }
            stack.extend(node.children.iter().copied());
        }
        count
    }

    /// Points every leaf backed by the same log file at `record`, relabelling it.
    /// Returns how many leaves changed.
    pub fn replace_session(&mut self, record: &Arc<SessionRecord>, now: OffsetDateTime) -> usize {
        let mut replaced = 0usize;
        for node in &mut self.nodes {
            let same_file = node
                .kind
                .session()
                .is_some_and(|existing| existing.log_path == record.log_path);
            if !same_file {
                continue;
            }

            if matches!(node.kind, NodeKind::Agent(_)) {
                node.label = agent_label(record);
                node.kind = NodeKind::Agent(Arc::clone(record));
            } else {
                node.label = session_label(record, now);
                node.kind = NodeKind::Session(Arc::clone(record));
            }
            replaced += 1;
        }
        replaced
    }

    fn push(&mut self, node: HierarchyNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.0].children.push(child);
    }
}

/// Session files found in one project directory.
#[derive(Clone, Debug, Default)]
pub struct ProjectSessions {
    pub project_path: PathBuf,
    pub sessions: Vec<SessionRecord>,
    pub agents: Vec<SessionRecord>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RepoLocation {
    pub organization: String,
    pub repository: String,
}

pub fn locate_repository(project_path: &Path, anchor: &str) -> RepoLocation {
    let parts: Vec<String> = project_path
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect();

    if let Some(anchor_idx) = parts.iter().position(|part| part == anchor) {
        if let Some(organization) = parts.get(anchor_idx + 1) {
            let rest = &parts[anchor_idx + 2..];
            let repository = if rest.is_empty() {
                organization.clone()
            } else {
                rest.join("/")
            };
            return RepoLocation {
                organization: organization.clone(),
                repository,
            };
        }
    }

    let tail_start = parts.len().saturating_sub(2);
    RepoLocation {
        organization: FALLBACK_ORGANIZATION.to_string(),
        repository: parts[tail_start..].join("/"),
    }
}

/// `main` and `master` lead, everything else is alphabetical.
pub fn compare_branch_labels(a: &str, b: &str) -> Ordering {
    let rank = |label: &str| if label == "main" || label == "master" { 0 } else { 1 };
    rank(a).cmp(&rank(b)).then_with(|| a.cmp(b))
}

pub fn agent_in_session_window(
    agent: &SessionRecord,
    session: &SessionRecord,
    now: OffsetDateTime,
) -> bool {
    let agent_start = agent.metadata.start.unwrap_or(OffsetDateTime::UNIX_EPOCH);
    let session_start = session.metadata.start.unwrap_or(OffsetDateTime::UNIX_EPOCH);
    let session_end = session.metadata.end.unwrap_or(now);
    agent_start >= session_start && agent_start <= session_end
}

pub fn session_label(record: &SessionRecord, now: OffsetDateTime) -> String {
    let id = record
        .metadata
        .session_id
        .as_deref()
        .unwrap_or(&record.id);
    let short: String = id.chars().take(SESSION_ID_LABEL_CHARS).collect();
    let mut label = format!("{short} ({}m)", record.metadata.message_count);
    if let Some(start) = record.metadata.start {
        label.push(' ');
        label.push_str(&relative_time(start, now));
    }
    label
}

pub fn agent_label(record: &SessionRecord) -> String {
    format!("{} ({}m)", record.display_id(), record.metadata.message_count)
}

struct RepoGroup {
    name: String,
    project_path: PathBuf,
    branches: Vec<(String, Vec<Arc<SessionRecord>>)>,
    agents: Vec<Arc<SessionRecord>>,
}

impl RepoGroup {
    fn session_count(&self) -> usize {
        self.branches.iter().map(|(_, sessions)| sessions.len()).sum()
    }

    fn is_empty(&self) -> bool {
        self.session_count() == 0 && self.agents.is_empty()
    }
}

struct OrgGroup {
    name: String,
    repos: Vec<RepoGroup>,
}

impl OrgGroup {
    fn session_count(&self) -> usize {
        self.repos.iter().map(RepoGroup::session_count).sum()
    }
}

fn find_or_push<T>(items: &mut Vec<T>, matches: impl Fn(&T) -> bool, make: impl FnOnce() -> T) -> &mut T {
    let idx = match items.iter().position(matches) {
        Some(idx) => idx,
        None => {
            items.push(make());
            items.len() - 1
        }
    };
    &mut items[idx]
}

pub fn build_hierarchy(
    projects: Vec<ProjectSessions>,
    anchor: &str,
    now: OffsetDateTime,
) -> Hierarchy {
    let mut organizations: Vec<OrgGroup> = Vec::new();

    for project in projects {
        let location = locate_repository(&project.project_path, anchor);
        let org = find_or_push(
            &mut organizations,
            |org| org.name == location.organization,
            || OrgGroup {
                name: location.organization.clone(),
                repos: Vec::new(),
            },
        );
        let repo = find_or_push(
            &mut org.repos,
            |repo| repo.name == location.repository,
            || RepoGroup {
                name: location.repository.clone(),
                project_path: project.project_path.clone(),
                branches: Vec::new(),
                agents: Vec::new(),
            },
        );

        for session in project.sessions {
            let branch = session
                .metadata
                .branch
                .clone()
                .unwrap_or_else(|| UNKNOWN_BRANCH.to_string());
            let (_, sessions) = find_or_push(
                &mut repo.branches,
                |(label, _)| *label == branch,
                || (branch.clone(), Vec::new()),
            );
            sessions.push(Arc::new(session));
        }
        repo.agents.extend(project.agents.into_iter().map(Arc::new));
    }

    for org in &mut organizations {
        org.repos.retain(|repo| !repo.is_empty());
        org.repos.sort_by_key(|repo| std::cmp::Reverse(repo.session_count()));
    }
    organizations.retain(|org| !org.repos.is_empty());
    organizations.sort_by_key(|org| std::cmp::Reverse(org.session_count()));

    let mut hierarchy = Hierarchy::empty();
    let root = hierarchy.root();
    for org in organizations {
        let org_node = hierarchy.push(HierarchyNode::new(
            org.name.clone(),
            NodeKind::Organization {
                session_count: org.session_count(),
            },
        ));
        hierarchy.attach(root, org_node);

        for repo in org.repos {
            let repo_node = push_repository(&mut hierarchy, repo, now);
            hierarchy.attach(org_node, repo_node);
        }
    }

    hierarchy
}

fn push_repository(hierarchy: &mut Hierarchy, repo: RepoGroup, now: OffsetDateTime) -> NodeId {
    let repo_node = hierarchy.push(HierarchyNode::new(
        repo.name.clone(),
        NodeKind::Repository {
            session_count: repo.session_count(),
            agent_count: repo.agents.len(),
            project_path: repo.project_path.clone(),
        },
    ));

    let mut branch_nodes: Vec<(String, NodeId)> = Vec::new();
    let mut attached: HashSet<PathBuf> = HashSet::new();

    for (label, mut sessions) in repo.branches {
        sessions.sort_by(|a, b| b.metadata.start.cmp(&a.metadata.start));
        let branch_node = hierarchy.push(HierarchyNode::new(label.clone(), NodeKind::Branch));

        for session in sessions {
            let session_node = hierarchy.push(HierarchyNode::new(
                session_label(&session, now),
                NodeKind::Session(Arc::clone(&session)),
            ));
            for agent in &repo.agents {
                if !agent_in_session_window(agent, &session, now) {
                    continue;
                }
                let agent_node = hierarchy.push(HierarchyNode::new(
                    agent_label(agent),
                    NodeKind::Agent(Arc::clone(agent)),
                ));
                hierarchy.attach(session_node, agent_node);
                attached.insert(agent.log_path.clone());
            }
            hierarchy.attach(branch_node, session_node);
        }
        branch_nodes.push((label, branch_node));
    }

    let orphans: Vec<&Arc<SessionRecord>> = repo
        .agents
        .iter()
        .filter(|agent| !attached.contains(&agent.log_path))
        .collect();
    if !orphans.is_empty() {
        let branch_node = hierarchy.push(HierarchyNode::new(
            ORPHAN_AGENTS_BRANCH.to_string(),
            NodeKind::Branch,
        ));
        for agent in orphans {
            let agent_node = hierarchy.push(HierarchyNode::new(
                agent_label(agent),
                NodeKind::Agent(Arc::clone(agent)),
            ));
            hierarchy.attach(branch_node, agent_node);
        }
        branch_nodes.push((ORPHAN_AGENTS_BRANCH.to_string(), branch_node));
    }

    branch_nodes.sort_by(|a, b| compare_branch_labels(&a.0, &b.0));
    for (_, branch_node) in branch_nodes {
        hierarchy.attach(repo_node, branch_node);
    }

    repo_node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SessionMetadata;
    use time::Duration;

    fn ts(secs: i64) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(1_800_000_000 + secs).expect("ts")
    }

    fn record(file: &str, branch: Option<&str>, start: i64, end: i64, count: usize) -> SessionRecord {
        SessionRecord::new(
            PathBuf::from(format!("/logs/p/{file}.jsonl")),
            SessionMetadata {
                project_path: Some(PathBuf::from("/home/u/Git/acme/widget")),
                branch: branch.map(str::to_string),
                session_id: None,
                start: Some(ts(start)),
                end: Some(ts(end)),
                message_count: count,
            },
            Vec::new(),
            0,
        )
    }

    fn labels(hierarchy: &Hierarchy, id: NodeId) -> Vec<String> {
        hierarchy
            .children(id)
            .iter()
            .map(|child| hierarchy.node(*child).label.clone())
            .collect()
    }

    #[test]
    fn locates_repository_under_anchor() {
        let location = locate_repository(Path::new("/home/u/Git/acme/tools/widget"), "Git");
        assert_eq!(location.organization, "acme");
        assert_eq!(location.repository, "tools/widget");

        let bare = locate_repository(Path::new("/home/u/Git/acme"), "Git");
        assert_eq!(bare.organization, "acme");
        assert_eq!(bare.repository, "acme");
    }

    #[test]
    fn falls_back_to_last_two_components() {
        let location = locate_repository(Path::new("/srv/work/widget"), "Git");
        assert_eq!(location.organization, "other");
        assert_eq!(location.repository, "work/widget");

        let trailing_anchor = locate_repository(Path::new("/home/u/Git"), "Git");
        assert_eq!(trailing_anchor.organization, "other");
        assert_eq!(trailing_anchor.repository, "u/Git");
    }

    #[test]
    fn orders_main_and_master_first() {
        let mut branches = vec!["feature-x", "main", "develop"];
        branches.sort_by(|a, b| compare_branch_labels(a, b));
        assert_eq!(branches, vec!["main", "develop", "feature-x"]);

        let mut branches = vec!["zeta", "master", "alpha", "main"];
        branches.sort_by(|a, b| compare_branch_labels(a, b));
        assert_eq!(branches, vec!["main", "master", "alpha", "zeta"]);
    }

    #[test]
    fn attaches_agents_inside_session_window() {
        let session = record("s1", Some("main"), 0, 600, 4);
        let inside = record("agent-a1", None, 120, 180, 2);
        let before = record("agent-b2", None, -600, -500, 1);

        let hierarchy = build_hierarchy(
            vec![ProjectSessions {
                project_path: PathBuf::from("/home/u/Git/acme/widget"),
                sessions: vec![session],
                agents: vec![inside, before],
            }],
            DEFAULT_ANCHOR,
            ts(1_000),
        );

        let org = hierarchy.children(hierarchy.root())[0];
        let repo = hierarchy.children(org)[0];
        assert_eq!(labels(&hierarchy, repo), vec!["main", "(agents)"]);

        let main = hierarchy.children(repo)[0];
        let session = hierarchy.children(main)[0];
        assert_eq!(labels(&hierarchy, session), vec!["a1 (2m)"]);

        let orphans = hierarchy.children(repo)[1];
        assert_eq!(labels(&hierarchy, orphans), vec!["b2 (1m)"]);
        assert_eq!(hierarchy.leaf_count(), 3);
    }

    #[test]
    fn agent_matching_several_sessions_attaches_to_each() {
        let first = record("s1", Some("main"), 0, 600, 1);
        let second = record("s2", Some("dev"), 100, 700, 1);
        let agent = record("agent-a1", None, 200, 300, 1);
        assert!(agent_in_session_window(&agent, &first, ts(0)));
        assert!(agent_in_session_window(&agent, &second, ts(0)));

        let hierarchy = build_hierarchy(
            vec![ProjectSessions {
                project_path: PathBuf::from("/home/u/Git/acme/widget"),
                sessions: vec![first, second],
                agents: vec![agent],
            }],
            DEFAULT_ANCHOR,
            ts(1_000),
        );
        let org = hierarchy.children(hierarchy.root())[0];
        let repo = hierarchy.children(org)[0];
        assert_eq!(labels(&hierarchy, repo), vec!["main", "dev"]);
        assert_eq!(hierarchy.leaf_count(), 4);
    }

    #[test]
    fn sorts_sessions_newest_first_and_groups_by_count() {
        let now = ts(10_000);
        let hierarchy = build_hierarchy(
            vec![
                ProjectSessions {
                    project_path: PathBuf::from("/home/u/Git/solo/tool"),
                    sessions: vec![record("old", Some("main"), 0, 10, 1)],
                    agents: Vec::new(),
                },
                ProjectSessions {
                    project_path: PathBuf::from("/home/u/Git/acme/widget"),
                    sessions: vec![
                        record("older", None, 0, 10, 1),
                        record("newer", None, 3_600, 3_700, 2),
                    ],
                    agents: Vec::new(),
                },
                ProjectSessions {
                    project_path: PathBuf::from("/home/u/Git/empty/none"),
                    sessions: Vec::new(),
                    agents: Vec::new(),
                },
            ],
            DEFAULT_ANCHOR,
            now,
        );

        assert_eq!(labels(&hierarchy, hierarchy.root()), vec!["acme", "solo"]);
        let acme = hierarchy.children(hierarchy.root())[0];
        assert_eq!(
            hierarchy.node(acme).kind,
            NodeKind::Organization { session_count: 2 }
        );
        let repo = hierarchy.children(acme)[0];
        let unknown = hierarchy.children(repo)[0];
        assert_eq!(hierarchy.node(unknown).label, UNKNOWN_BRANCH);
        assert_eq!(
            labels(&hierarchy, unknown),
            vec!["newer (2m) 1h ago", "older (1m) 2h ago"]
        );
    }

    #[test]
    fn session_label_prefers_session_id() {
        let mut session = record("file-id", None, 0, 0, 3);
        session.metadata.session_id = Some("0123456789abcdef".to_string());
        let now = ts(0) + Duration::minutes(3);
        assert_eq!(session_label(&session, now), "01234567 (3m) 3m ago");
    }

    #[test]
    fn replacing_a_record_updates_every_leaf_for_that_file() {
        let first = record("s1", Some("main"), 0, 600, 1);
        let second = record("s2", Some("dev"), 100, 700, 1);
        let agent = record("agent-a1", None, 200, 300, 1);
        let mut hierarchy = build_hierarchy(
            vec![ProjectSessions {
                project_path: PathBuf::from("/home/u/Git/acme/widget"),
                sessions: vec![first, second],
                agents: vec![agent],
            }],
            DEFAULT_ANCHOR,
            ts(1_000),
        );

        let mut grown = record("agent-a1", None, 200, 900, 5);
        grown.file_size_bytes = 512;
        assert_eq!(hierarchy.replace_session(&Arc::new(grown), ts(1_000)), 2);

        let org = hierarchy.children(hierarchy.root())[0];
        let repo = hierarchy.children(org)[0];
        for branch in hierarchy.children(repo).to_vec() {
            let session = hierarchy.children(branch)[0];
            let agent = hierarchy.children(session)[0];
            let node = hierarchy.node(agent);
            assert_eq!(node.label, "a1 (5m)");
            assert_eq!(node.kind.session().map(|r| r.file_size_bytes), Some(512));
        }

        let unknown = record("missing", None, 0, 0, 1);
        assert_eq!(hierarchy.replace_session(&Arc::new(unknown), ts(1_000)), 0);
    }

    #[test]
    fn projects_with_same_location_merge() {
        let hierarchy = build_hierarchy(
            vec![
                ProjectSessions {
                    project_path: PathBuf::from("/a/Git/acme/widget"),
                    sessions: vec![record("s1", Some("main"), 0, 1, 1)],
                    agents: Vec::new(),
                },
                ProjectSessions {
                    project_path: PathBuf::from("/b/Git/acme/widget"),
                    sessions: vec![record("s2", Some("main"), 5, 6, 1)],
                    agents: Vec::new(),
                },
            ],
            DEFAULT_ANCHOR,
            ts(100),
        );
        let acme = hierarchy.children(hierarchy.root())[0];
        assert_eq!(hierarchy.children(acme).len(), 1);
        assert_eq!(hierarchy.leaf_count(), 2);
    }
}
