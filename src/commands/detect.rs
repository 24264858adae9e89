use crate::areas::repository::Repository;
use crate::artifacts::detect::change::ChangeClassifier;
use crate::artifacts::detect::file::Diff;
use crate::artifacts::detect::filter::{FilterOptions, FilterPipeline};
use crate::artifacts::detect::glob::GlobSetMatcher;
use crate::artifacts::detect::grouping::{GroupStrategy, GroupingEngine};
use crate::artifacts::detect::resolver::RevisionResolver;
use crate::artifacts::detect::snapshot::SnapshotSource;
use crate::artifacts::detect::work_tree::WorkTree;

pub const DEFAULT_BRANCH: &str = "main";

#[derive(Debug, Clone)]
pub struct DetectOptions {
    pub default_branch: String,
    pub merge_base: Option<String>,
    pub group_strategy: GroupStrategy,
    pub filters: FilterOptions,
}

impl Default for DetectOptions {
    fn default() -> Self {
        DetectOptions {
            default_branch: DEFAULT_BRANCH.to_string(),
            merge_base: None,
            group_strategy: GroupStrategy::default(),
            filters: FilterOptions::default(),
        }
    }
}

impl Repository {
    pub fn detect(&self, options: &DetectOptions) -> anyhow::Result<Diff> {
        detect(self, self.workspace(), options)
    }
}

/// Resolve, classify, group and filter in one pass
pub fn detect(
    source: &dyn SnapshotSource,
    work_tree: &dyn WorkTree,
    options: &DetectOptions,
) -> anyhow::Result<Diff> {
    let snapshots = RevisionResolver::new(source, tracing::debug_span!("resolve"))
        .resolve(&options.default_branch, options.merge_base.as_deref())?;

    let raw_changes = source.diff_trees(&snapshots.base, &snapshots.current)?;
    let changes = ChangeClassifier::new(tracing::debug_span!("classify")).classify(raw_changes);

    let matcher = GlobSetMatcher::new();
    let diff = GroupingEngine::new(&matcher, work_tree, tracing::debug_span!("group"))
        .group(&changes, &options.group_strategy);

    Ok(FilterPipeline::new(&matcher, tracing::debug_span!("filter")).apply(diff, &options.filters))
}
