//! Bitbucket Cloud webhook payload and REST API response shapes.
//!
//! Fields that the provider may omit or send as `null` are `Option`s, so
//! malformed payloads are detected while interpreting rather than while
//! deserializing.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters escaped in a branch name used as URL path. `/` is kept, nested
/// branch names like `feature/x` are addressed as nested path segments.
const BRANCH_PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'+')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Repository identity the service is configured for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoSpec {
    pub owner: String,
    pub name: String,
}

impl RepoSpec {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    pub fn api_path(&self) -> String {
        format!("repositories/{}/{}", self.owner, self.name)
    }

    pub fn branch_path(&self, branch: &str) -> String {
        format!(
            "{}/refs/branches/{}",
            self.api_path(),
            utf8_percent_encode(branch, BRANCH_PATH)
        )
    }

    /// Bitbucket's diffstat spec lists the destination commit first.
    pub fn diffstat_path(&self, from_hash: &str, to_hash: &str) -> String {
        format!("{}/diffstat/{}..{}", self.api_path(), to_hash, from_hash)
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct PushPayload {
    pub repository: Option<Repository>,
    pub push: Option<Push>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Repository {
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Push {
    pub changes: Vec<ChangeEntry>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ChangeEntry {
    #[serde(default)]
    pub old: Option<Ref>,
    #[serde(default)]
    pub new: Option<Ref>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Ref {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub name: Option<String>,
    pub target: Option<Target>,
}

impl Ref {
    pub fn is_branch(&self) -> bool {
        self.kind.as_deref() == Some("branch")
    }

    pub fn hash(&self) -> Option<&str> {
        self.target.as_ref()?.hash.as_deref()
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Target {
    pub hash: Option<String>,
}

/// `GET /repositories/{owner}/{repo}`
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RepositoryInfo {
    pub mainbranch: MainBranch,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct MainBranch {
    pub name: String,
}

/// `GET /repositories/{owner}/{repo}/refs/branches/{name}`
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Branch {
    pub target: Target,
}

/// One page of `GET /repositories/{owner}/{repo}/diffstat/{spec}`
#[derive(Debug, Clone, serde::Deserialize)]
pub struct DiffstatPage {
    #[serde(default)]
    pub values: Vec<Diffstat>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Diffstat {
    #[serde(default)]
    pub old: Option<DiffstatFile>,
    #[serde(default)]
    pub new: Option<DiffstatFile>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct DiffstatFile {
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_push_with_created_branch_and_tag() {
        let payload: PushPayload = serde_json::from_str(
            r#"{
                "repository": {"full_name": "acme/widgets", "name": "widgets"},
                "push": {"changes": [
                    {"old": null, "new": {"type": "branch", "name": "feature", "target": {"hash": "abc"}}},
                    {"new": {"type": "tag", "name": "v1.0", "target": {"hash": "def"}}, "closed": false}
                ]}
            }"#,
        )
        .unwrap();

        let changes = &payload.push.as_ref().unwrap().changes;
        assert_eq!(changes.len(), 2);
        assert!(changes[0].old.is_none());
        let new = changes[0].new.as_ref().unwrap();
        assert!(new.is_branch());
        assert_eq!(new.hash(), Some("abc"));
        assert!(!changes[1].new.as_ref().unwrap().is_branch());
        assert_eq!(
            payload.repository.unwrap().full_name.as_deref(),
            Some("acme/widgets")
        );
    }

    #[test]
    fn repo_paths() {
        let repo = RepoSpec::new("acme", "widgets");
        assert_eq!(repo.full_name(), "acme/widgets");
        assert_eq!(
            repo.branch_path("feature/x"),
            "repositories/acme/widgets/refs/branches/feature/x"
        );
        assert_eq!(
            repo.branch_path("fix#12"),
            "repositories/acme/widgets/refs/branches/fix%2312"
        );
        assert_eq!(
            repo.branch_path("50%off+more?"),
            "repositories/acme/widgets/refs/branches/50%25off%2Bmore%3F"
        );

        let uri: actix_web::http::Uri =
            format!("https://api.test/2.0/{}", repo.branch_path("fix#12"))
                .parse()
                .unwrap();
        assert_eq!(
            uri.path(),
            "/2.0/repositories/acme/widgets/refs/branches/fix%2312"
        );
        assert_eq!(
            repo.diffstat_path("c1", "c2"),
            "repositories/acme/widgets/diffstat/c2..c1"
        );
    }

    #[test]
    fn push_may_be_absent() {
        let payload: PushPayload =
            serde_json::from_str(r#"{"repository": {"full_name": "acme/widgets"}}"#).unwrap();
        assert!(payload.push.is_none());
    }

    #[test]
    fn diffstat_page_without_next() {
        let page: DiffstatPage = serde_json::from_str(
            r#"{"values": [{"status": "added", "old": null, "new": {"path": "a.rs"}}], "pagelen": 500}"#,
        )
        .unwrap();
        assert!(page.next.is_none());
        assert!(page.values[0].old.is_none());
        assert_eq!(page.values[0].new.as_ref().unwrap().path, "a.rs");
    }
}
