//! Dependency resolution for tasks.
//!
//! Resolves, for one task, the upstream stage output it consumes and, for
//! shot tasks, the current deliverable of every linked asset. Each lookup
//! is an independent branch; branch failures are reported as warnings next
//! to whatever did resolve.

use std::sync::Arc;
use std::time::Duration;

use pipedeps_core::{
    DependencyRecord, EntityType, SourceCategory, Task, TaskId, TaskType,
};
use pipedeps_storage::EntityGateway;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{BranchError, BranchFailure, ResolveError};
use crate::expander::{with_timeout, AssetDependencyExpander, AssetExpansion};
use crate::rules::{Rule, RuleTable};
use crate::selector::{VersionSelector, Visited};

/// Configuration for the resolver.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Linked-asset lookups allowed in flight at once
    pub max_concurrency: usize,
    /// Give up on a branch after this long (None = wait forever)
    pub branch_timeout: Option<Duration>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            branch_timeout: None,
        }
    }
}

impl ResolverConfig {
    /// Set the concurrency limit.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Set the per-branch timeout.
    pub fn with_branch_timeout(mut self, timeout: Duration) -> Self {
        self.branch_timeout = Some(timeout);
        self
    }

    /// Effective concurrency limit; zero means one.
    pub fn concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }
}

/// Everything a task depends on.
#[derive(Debug, Serialize)]
pub struct Resolution {
    /// Task that was resolved
    pub task: TaskId,

    /// Its normalized type
    pub task_type: TaskType,

    /// Number of upstream-task records
    pub upstream_count: usize,

    /// Number of asset-dependency records
    pub asset_dependency_count: usize,

    /// Upstream records first, then asset records in breakdown order
    pub records: Vec<DependencyRecord>,

    /// Branches that failed and produced no record
    pub warnings: Vec<BranchFailure>,
}

impl Resolution {
    fn new(task: TaskId, task_type: TaskType, records: Vec<DependencyRecord>, warnings: Vec<BranchFailure>) -> Self {
        let count = |category| records.iter().filter(|r| r.category == category).count();
        Self {
            task,
            task_type,
            upstream_count: count(SourceCategory::UpstreamTask),
            asset_dependency_count: count(SourceCategory::AssetDependency),
            records,
            warnings,
        }
    }

    /// Record count for one category.
    pub fn count(&self, category: SourceCategory) -> usize {
        match category {
            SourceCategory::UpstreamTask => self.upstream_count,
            SourceCategory::AssetDependency => self.asset_dependency_count,
        }
    }

    /// Upstream-task records.
    pub fn upstream(&self) -> impl Iterator<Item = &DependencyRecord> {
        self.records.iter().filter(|r| r.category == SourceCategory::UpstreamTask)
    }

    /// Asset-dependency records.
    pub fn asset_dependencies(&self) -> impl Iterator<Item = &DependencyRecord> {
        self.records.iter().filter(|r| r.category == SourceCategory::AssetDependency)
    }

    /// True when no branch failed.
    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Resolves task dependencies against an entity gateway.
pub struct DependencyResolver<G> {
    gateway: G,
    rules: Arc<RuleTable>,
    config: ResolverConfig,
}

impl<G: EntityGateway> DependencyResolver<G> {
    /// Create a resolver with the built-in pipeline rules.
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            rules: Arc::new(RuleTable::pipeline()),
            config: ResolverConfig::default(),
        }
    }

    /// Use a different rule table.
    pub fn with_rules(mut self, rules: impl Into<Arc<RuleTable>>) -> Self {
        self.rules = rules.into();
        self
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Get a reference to the gateway.
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Get the rule table in use.
    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Resolve the dependencies of `task`.
    pub async fn resolve(&self, task: &Task) -> Result<Resolution, ResolveError> {
        self.resolve_with_cancel(task, &CancellationToken::new()).await
    }

    /// Resolve the dependencies of `task`, giving up as soon as `cancel`
    /// fires. Lookups still in flight are dropped along with anything they
    /// already found.
    pub async fn resolve_with_cancel(
        &self,
        task: &Task,
        cancel: &CancellationToken,
    ) -> Result<Resolution, ResolveError> {
        let task_type = task.task_type()?;
        let rule = self
            .rules
            .get(&task_type)
            .ok_or_else(|| ResolveError::UnknownTaskType(task_type.clone()))?;

        info!("Resolving dependencies for task {} ({} on {})", task.id, task_type, task.entity);

        let lookups = async {
            tokio::join!(
                self.resolve_upstream(task, &task_type, rule),
                self.resolve_assets(task, rule),
            )
        };

        let (upstream, assets) = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Resolution of task {} cancelled", task.id);
                return Err(ResolveError::Cancelled);
            }
            outcome = lookups => outcome,
        };

        let mut records = Vec::new();
        let mut warnings = Vec::new();
        match upstream {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(error) => {
                warn!("Upstream lookup for task {} failed: {}", task.id, error);
                warnings.push(BranchFailure {
                    category: SourceCategory::UpstreamTask,
                    entity: task.entity.clone(),
                    error,
                });
            }
        }
        records.extend(assets.records);
        warnings.extend(assets.failures);

        let resolution = Resolution::new(task.id, task_type, records, warnings);
        info!(
            "Found {} upstream and {} asset dependencies for task {} ({} warnings)",
            resolution.upstream_count,
            resolution.asset_dependency_count,
            task.id,
            resolution.warnings.len()
        );
        Ok(resolution)
    }

    async fn resolve_upstream(
        &self,
        task: &Task,
        task_type: &TaskType,
        rule: &Rule,
    ) -> Result<Option<DependencyRecord>, BranchError> {
        if rule.upstream_chain.is_empty() {
            debug!("No upstream stages for {}", task_type);
            return Ok(None);
        }

        with_timeout(&self.config, async {
            // The requesting stage itself must never be walked again.
            let mut visited = Visited::new();
            visited.insert((task.entity.id, task_type.clone()));

            let selector = VersionSelector::new(&self.gateway);
            let Some(selection) = selector
                .select_unvisited(&task.entity, &rule.upstream_chain, &mut visited)
                .await?
            else {
                debug!("No upstream output for {} on {}", task_type, task.entity.code);
                return Ok(None);
            };

            let Some(entity) = self.gateway.get_entity(&task.entity).await? else {
                warn!("Owning entity {} of task {} not found", task.entity, task.id);
                return Ok(None);
            };

            let record = selection
                .into_record(&self.gateway, SourceCategory::UpstreamTask, entity)
                .await?;
            Ok::<_, BranchError>(Some(record))
        })
        .await
    }

    async fn resolve_assets(&self, task: &Task, rule: &Rule) -> AssetExpansion {
        if !rule.needs_linked_assets {
            return AssetExpansion::default();
        }

        match task.entity.entity_type {
            EntityType::Shot => {
                AssetDependencyExpander::new(&self.gateway, &self.config)
                    .expand(&task.entity, &rule.asset_preference_chain)
                    .await
            }
            EntityType::Asset => {
                debug!("{} is an asset; linked assets do not apply", task.entity.code);
                AssetExpansion::default()
            }
        }
    }
}
