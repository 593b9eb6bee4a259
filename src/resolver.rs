use crate::{
    bitbucket::{Branch, ChangeEntry, Ref, RepoSpec, RepositoryInfo},
    client::{Client, Transport},
    error::{Error, Result},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRange {
    pub from_hash: String,
    pub to_hash: String,
    pub branch_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefSide<'a> {
    pub name: &'a str,
    pub hash: &'a str,
}

impl<'a> RefSide<'a> {
    fn of(r: &'a Ref) -> Option<Self> {
        Some(Self {
            name: r.name.as_deref()?,
            hash: r.hash()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchChange<'a> {
    Created { new: RefSide<'a> },
    Removed { old: RefSide<'a> },
    Updated { old: RefSide<'a>, new: RefSide<'a> },
    Invalid,
}

pub fn classify(entry: &ChangeEntry) -> BranchChange<'_> {
    match (entry.old.as_ref(), entry.new.as_ref()) {
        (None, None) => BranchChange::Invalid,
        (None, Some(new)) => RefSide::of(new).map_or(BranchChange::Invalid, |new| {
            BranchChange::Created { new }
        }),
        (Some(old), None) => RefSide::of(old).map_or(BranchChange::Invalid, |old| {
            BranchChange::Removed { old }
        }),
        (Some(old), Some(new)) => match (RefSide::of(old), RefSide::of(new)) {
            (Some(old), Some(new)) => BranchChange::Updated { old, new },
            _ => BranchChange::Invalid,
        },
    }
}

pub fn branch_name(entry: &ChangeEntry) -> &str {
    entry
        .new
        .as_ref()
        .and_then(|r| r.name.as_deref())
        .or_else(|| entry.old.as_ref().and_then(|r| r.name.as_deref()))
        .unwrap_or("unknown")
}

/// Commits bounding the diff for one change. A removed branch has nothing to
/// diff, so both sides are `None`.
pub async fn resolve<T: Transport>(
    change: BranchChange<'_>,
    client: &Client<T>,
    repo: &RepoSpec,
) -> Result<(Option<String>, Option<String>)> {
    match change {
        BranchChange::Updated { old, new } => {
            Ok((Some(old.hash.to_string()), Some(new.hash.to_string())))
        }
        BranchChange::Created { new } => {
            let info: RepositoryInfo = client.get(&client.endpoint(&repo.api_path())).await?;
            let main = info.mainbranch.name;
            tracing::debug!(
                branch = new.name,
                main = main.as_str(),
                "Branch {} was created, diffing against {}",
                new.name,
                main,
            );
            let from_hash = branch_head(client, repo, &main).await?;
            let to_hash = branch_head(client, repo, new.name).await?;
            Ok((from_hash, to_hash))
        }
        BranchChange::Removed { old } => {
            tracing::debug!(branch = old.name, "Branch {} was removed", old.name);
            Ok((None, None))
        }
        BranchChange::Invalid => Err(Error::bad_format(
            "change entry lacks a branch name or target hash",
        )),
    }
}

async fn branch_head<T: Transport>(
    client: &Client<T>,
    repo: &RepoSpec,
    branch: &str,
) -> Result<Option<String>> {
    let branch: Branch = client
        .get(&client.endpoint(&repo.branch_path(branch)))
        .await?;
    Ok(branch.target.hash)
}
