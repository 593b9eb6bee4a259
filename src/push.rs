use crate::{
    bitbucket::{ChangeEntry, PushPayload, RepoSpec},
    client::{Client, Transport},
    error::{Error, Result},
    resolver::{self, BranchChange, CommitRange},
};

/// Rejects payloads that were not sent for the configured repository.
pub fn validate_origin(payload: &PushPayload, repo: &RepoSpec) -> Result<()> {
    let full_name = payload
        .repository
        .as_ref()
        .and_then(|r| r.full_name.as_deref())
        .ok_or_else(|| Error::bad_format("`repository.full_name` is missing"))?;

    let expected = repo.full_name();
    if full_name != expected {
        return Err(Error::bad_format(format!(
            "payload is for repository `{}`, expected `{}`",
            full_name, expected
        )));
    }
    Ok(())
}

/// Turns the branch changes of a push into commit ranges, in payload order.
///
/// Tag changes are skipped and so are removed branches. The first malformed
/// entry or failed lookup aborts the whole batch.
pub async fn interpret<T: Transport>(
    changes: &[ChangeEntry],
    client: &Client<T>,
    repo: &RepoSpec,
) -> Result<Vec<CommitRange>> {
    let mut ranges = Vec::new();

    for (idx, entry) in changes.iter().enumerate() {
        if entry.old.is_none() && entry.new.is_none() {
            return Err(Error::bad_format(format!(
                "change #{} has neither `old` nor `new`",
                idx
            )));
        }

        let branch_name = resolver::branch_name(entry);
        if entry.old.iter().chain(&entry.new).any(|r| !r.is_branch()) {
            tracing::info!(reference = branch_name, "Skipping non-branch change");
            continue;
        }

        let change = resolver::classify(entry);
        if change == BranchChange::Invalid {
            return Err(Error::bad_format(format!(
                "change #{} for `{}` lacks a name or target hash",
                idx, branch_name
            )));
        }

        match resolver::resolve(change, client, repo).await? {
            (Some(from_hash), Some(to_hash)) => ranges.push(CommitRange {
                from_hash,
                to_hash,
                branch_name: branch_name.to_string(),
            }),
            _ => {
                tracing::info!(
                    branch = branch_name,
                    "No commit range for branch {}, skipping",
                    branch_name
                );
            }
        }
    }

    Ok(ranges)
}
