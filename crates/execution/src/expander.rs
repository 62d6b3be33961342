//! Fan-out over the assets linked to a shot.

use std::future::Future;

use futures::stream::{self, StreamExt};
use pipedeps_core::{DependencyRecord, EntityRef, SourceCategory, TaskType};
use pipedeps_storage::{EntityGateway, GatewayError};
use tracing::{debug, info, warn};

use crate::dependency::ResolverConfig;
use crate::error::{BranchError, BranchFailure};
use crate::selector::VersionSelector;

/// Records and failures gathered from a shot's linked assets.
#[derive(Debug, Default)]
pub struct AssetExpansion {
    /// One record per asset that resolved, in breakdown order
    pub records: Vec<DependencyRecord>,
    /// One entry per asset whose lookup failed
    pub failures: Vec<BranchFailure>,
}

/// Resolves the preferred deliverable of every asset linked to a shot.
pub struct AssetDependencyExpander<'g, G: ?Sized> {
    gateway: &'g G,
    config: &'g ResolverConfig,
}

impl<'g, G: EntityGateway + ?Sized> AssetDependencyExpander<'g, G> {
    /// Create an expander.
    pub fn new(gateway: &'g G, config: &'g ResolverConfig) -> Self {
        Self { gateway, config }
    }

    /// Look up `preference` on each asset linked to `shot`.
    ///
    /// Assets are independent branches: a failing asset becomes a failure
    /// entry and the others carry on. Assets with nothing to offer are
    /// skipped without a failure.
    pub async fn expand(&self, shot: &EntityRef, preference: &[TaskType]) -> AssetExpansion {
        let linked = match with_timeout(self.config, self.gateway.get_linked_entities(shot)).await {
            Ok(linked) => linked,
            Err(error) => {
                warn!("Could not list assets linked to {}: {}", shot, error);
                return AssetExpansion {
                    records: Vec::new(),
                    failures: vec![BranchFailure {
                        category: SourceCategory::AssetDependency,
                        entity: shot.clone(),
                        error,
                    }],
                };
            }
        };

        if linked.is_empty() {
            info!("{} has no linked assets", shot.code);
            return AssetExpansion::default();
        }
        info!("{} has {} linked assets", shot.code, linked.len());

        let outcomes: Vec<_> = stream::iter(linked)
            .map(|link| async move {
                let outcome = with_timeout(self.config, self.resolve_asset(&link, preference)).await;
                (link, outcome)
            })
            .buffered(self.config.concurrency())
            .collect()
            .await;

        let mut expansion = AssetExpansion::default();
        for (link, outcome) in outcomes {
            match outcome {
                Ok(Some(record)) => expansion.records.push(record),
                Ok(None) => {}
                Err(error) => {
                    warn!("Lookup for linked asset {} failed: {}", link, error);
                    expansion.failures.push(BranchFailure {
                        category: SourceCategory::AssetDependency,
                        entity: link,
                        error,
                    });
                }
            }
        }
        expansion
    }

    async fn resolve_asset(
        &self,
        link: &EntityRef,
        preference: &[TaskType],
    ) -> Result<Option<DependencyRecord>, BranchError> {
        let Some(asset) = self.gateway.get_entity(link).await? else {
            warn!("Linked asset {} not found", link);
            return Ok(None);
        };

        let selector = VersionSelector::new(self.gateway);
        let Some(selection) = selector.select(link, preference).await? else {
            warn!("No {} task with an acceptable version on {}", format_chain(preference), link.code);
            return Ok(None);
        };

        debug!("{} resolved to {} {}", asset.code, selection.task.step, selection.version.code);
        let record = selection
            .into_record(self.gateway, SourceCategory::AssetDependency, asset)
            .await?;
        Ok(Some(record))
    }
}

/// Bound a branch by the configured timeout.
pub(crate) async fn with_timeout<T, E>(
    config: &ResolverConfig,
    branch: impl Future<Output = Result<T, E>>,
) -> Result<T, BranchError>
where
    E: Into<BranchError>,
{
    match config.branch_timeout {
        Some(limit) => match tokio::time::timeout(limit, branch).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(GatewayError::Timeout(limit).into()),
        },
        None => branch.await.map_err(Into::into),
    }
}

fn format_chain(chain: &[TaskType]) -> String {
    chain.iter().map(TaskType::as_str).collect::<Vec<_>>().join("/")
}
