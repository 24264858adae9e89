use crate::artifacts::branch::INVALID_BRANCH_NAME_REGEX;
use derive_new::new;
use std::sync::LazyLock;

const REFS_PREFIX: &str = "refs/";
pub const HEADS_PREFIX: &str = "refs/heads/";
pub const REMOTES_PREFIX: &str = "refs/remotes/";

static INVALID_BRANCH_NAME: LazyLock<Result<regex::Regex, regex::Error>> =
    LazyLock::new(|| regex::Regex::new(INVALID_BRANCH_NAME_REGEX));

/// Full path of a ref relative to the git directory (`HEAD`, `refs/heads/main`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord, new)]
pub struct SymRefName(String);

impl SymRefName {
    pub fn is_detached_head(&self) -> bool {
        self.0 == "HEAD"
    }

    pub fn as_ref_path(&self) -> &str {
        &self.0
    }

    /// Short branch name when this ref lives under `refs/heads/`
    pub fn branch_name(&self) -> Option<&str> {
        self.0.strip_prefix(HEADS_PREFIX)
    }
}

/// A ref name as typed by a user, validated with git's ref name rules
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct BranchName(String);

impl BranchName {
    pub fn try_parse(name: String) -> anyhow::Result<Self> {
        if name.is_empty() {
            anyhow::bail!("branch name cannot be empty");
        }

        let re = INVALID_BRANCH_NAME
            .as_ref()
            .map_err(|err| anyhow::anyhow!("invalid branch name regex: {err}"))?;

        if re.is_match(&name) {
            anyhow::bail!("invalid branch name: {}", name);
        } else {
            Ok(Self(name))
        }
    }

    /// Candidate ref paths in the order `git rev-parse` tries them
    ///
    /// The bare name is only looked up directly for full ref paths and pseudo-refs
    /// (`HEAD`, `ORIG_HEAD`, ...), so files like `.git/config` never shadow a branch.
    pub fn lookup_candidates(&self) -> Vec<String> {
        let name = &self.0;
        let mut candidates = Vec::with_capacity(6);

        if name.starts_with(REFS_PREFIX) || is_pseudo_ref(name) {
            candidates.push(name.clone());
        }
        candidates.extend([
            format!("{REFS_PREFIX}{name}"),
            format!("refs/tags/{name}"),
            format!("{HEADS_PREFIX}{name}"),
            format!("{REMOTES_PREFIX}{name}"),
            format!("{REMOTES_PREFIX}{name}/HEAD"),
        ]);

        candidates
    }
}

fn is_pseudo_ref(name: &str) -> bool {
    name.chars().all(|c| c.is_ascii_uppercase() || c == '_')
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
