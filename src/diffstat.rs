use std::collections::BTreeSet;

use color_eyre::eyre;

use crate::{
    bitbucket::{DiffstatPage, RepoSpec},
    client::{Client, Transport},
    error::Result,
};

pub type ChangedPaths = BTreeSet<String>;

/// Collects every path touched between two commits, following the `next`
/// links of the diffstat endpoint until the last page, or failing once more
/// than `max_pages` pages were requested.
pub async fn fetch<T: Transport>(
    client: &Client<T>,
    repo: &RepoSpec,
    from_hash: &str,
    to_hash: &str,
    max_pages: Option<u32>,
) -> Result<ChangedPaths> {
    let mut paths = ChangedPaths::new();
    let mut url = client.endpoint(&repo.diffstat_path(from_hash, to_hash));
    let mut page_no = 0u32;

    loop {
        page_no += 1;
        if let Some(max) = max_pages {
            if page_no > max {
                return Err(eyre::eyre!(
                    "diffstat {}..{} has more than {} pages",
                    to_hash,
                    from_hash,
                    max
                )
                .into());
            }
        }

        let page: DiffstatPage = client.get(&url).await?;
        let before = paths.len();
        extract_paths(&page, &mut paths);
        tracing::debug!(
            url = url.as_str(),
            page = page_no,
            new_paths = paths.len() - before,
            "Fetched diffstat page"
        );

        match page.next {
            Some(next) => url = next,
            None => break,
        }
    }

    Ok(paths)
}

/// Both sides of a diffstat record count, so a rename yields two paths.
pub fn extract_paths(page: &DiffstatPage, paths: &mut ChangedPaths) {
    for stat in &page.values {
        paths.extend(stat.old.iter().map(|f| f.path.clone()));
        paths.extend(stat.new.iter().map(|f| f.path.clone()));
    }
}
