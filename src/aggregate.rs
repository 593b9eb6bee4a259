use std::collections::BTreeMap;

use tracing::Instrument as _;

use crate::{
    bitbucket::{PushPayload, RepoSpec},
    client::{Client, Transport},
    diffstat::{self, ChangedPaths},
    error::{Error, Result},
    push,
    resolver::CommitRange,
};

/// Branch name to every path changed on it by the push.
pub type ChangedPathsByBranch = BTreeMap<String, ChangedPaths>;

pub async fn aggregate<T: Transport>(
    ranges: &[CommitRange],
    client: &Client<T>,
    repo: &RepoSpec,
    max_pages: Option<u32>,
) -> Result<ChangedPathsByBranch> {
    let mut result = ChangedPathsByBranch::new();
    for range in ranges {
        let span = tracing::debug_span!(
            "diffstat",
            branch = range.branch_name.as_str(),
            from = range.from_hash.as_str(),
            to = range.to_hash.as_str(),
        );
        let paths =
            diffstat::fetch(client, repo, &range.from_hash, &range.to_hash, max_pages)
                .instrument(span)
                .await?;
        result
            .entry(range.branch_name.clone())
            .or_default()
            .extend(paths);
    }
    Ok(result)
}

/// Validates a push payload and computes the changed paths of every branch it
/// touches.
pub async fn changed_paths<T: Transport>(
    payload: &PushPayload,
    client: &Client<T>,
    repo: &RepoSpec,
    max_pages: Option<u32>,
) -> Result<ChangedPathsByBranch> {
    push::validate_origin(payload, repo)?;
    let event = payload
        .push
        .as_ref()
        .ok_or_else(|| Error::bad_format("`push` is missing"))?;
    let ranges = push::interpret(&event.changes, client, repo).await?;
    tracing::debug!("Resolved {} commit ranges", ranges.len());
    aggregate(&ranges, client, repo, max_pages).await
}
