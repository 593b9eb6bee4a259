use actix_web::web;
use tracing::Instrument as _;

use crate::{
    aggregate::{self, ChangedPathsByBranch},
    bitbucket::{PushPayload, RepoSpec},
    client::Client,
    config::Config,
    error::Error,
    http::Webhook,
};

pub async fn push_hook(
    Webhook(payload): Webhook<PushPayload>,
    config: web::Data<Config>,
) -> Result<web::Json<ChangedPathsByBranch>, Error> {
    let repo = RepoSpec::new(config.repo_owner.as_str(), config.repo_name.as_str());
    let span = tracing::info_span!(
        "push hook",
        repo.owner = repo.owner.as_str(),
        repo.name = repo.name.as_str(),
        changes = payload.push.as_ref().map_or(0, |push| push.changes.len()),
    );

    async move {
        let client = Client::from_config(&config);
        match aggregate::changed_paths(&payload, &client, &repo, config.max_pages).await {
            Ok(paths) => {
                for (branch, changed) in &paths {
                    tracing::info!(
                        branch = branch.as_str(),
                        "{} changed paths on {}: {:?}",
                        changed.len(),
                        branch,
                        changed,
                    );
                }
                Ok(web::Json(paths))
            }
            Err(err) => {
                tracing::error!("Failed to compute changed paths: {}", err);
                Err(err)
            }
        }
    }
    .instrument(span)
    .await
}
