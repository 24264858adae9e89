use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::branch::{ANCESTOR_REGEX, PARENT_REGEX, REF_ALIASES};
use crate::artifacts::objects::OBJECT_ID_LENGTH;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Context;
use std::sync::LazyLock;

static PARENT: LazyLock<Result<regex::Regex, regex::Error>> =
    LazyLock::new(|| regex::Regex::new(PARENT_REGEX));
static ANCESTOR: LazyLock<Result<regex::Regex, regex::Error>> =
    LazyLock::new(|| regex::Regex::new(ANCESTOR_REGEX));

/// Shortest abbreviated object id accepted on the command line
const MIN_ABBREVIATED_OID_LENGTH: usize = 4;

/// A revision expression naming a commit.
///
/// Supports:
/// - Ref names: `main`, `origin/main`, `v1.0`, `HEAD`
/// - Aliases: `@` (resolves to `HEAD`)
/// - Full or abbreviated object ids (4-40 hex characters), tried when no ref matches
/// - Parent notation: `<revision>^`
/// - Ancestor notation: `<revision>~<n>`
///
/// Suffixes nest, so `main^^` and `HEAD~2^` are valid. Refs pointing at annotated tags are
/// peeled down to the tagged commit.
#[derive(Debug, Clone)]
pub enum Revision {
    /// A ref name, or an object id when no ref of that name exists
    Ref(BranchName),
    /// The Nth first-parent ancestor of a revision (e.g. HEAD~3)
    Ancestor(Box<Revision>, usize),
    /// The first parent of a revision (e.g. HEAD^)
    Parent(Box<Revision>),
}

impl Revision {
    pub fn resolve(&self, repository: &Repository) -> anyhow::Result<ObjectId> {
        match self {
            Revision::Ref(branch_name) => {
                let name = branch_name.as_ref();

                if let Some(oid) = repository.refs().read_ref(branch_name)? {
                    return Self::peel(&oid, name, repository);
                }

                if Self::looks_like_oid(name) {
                    Self::resolve_oid(name, repository)
                } else {
                    anyhow::bail!(
                        "ambiguous argument '{name}': unknown revision or path not in the working tree"
                    )
                }
            }
            Revision::Parent(base_revision) => {
                Self::resolve_commit_parent(&base_revision.resolve(repository)?, repository)
            }
            Revision::Ancestor(base_revision, generations) => {
                let mut oid = base_revision.resolve(repository)?;
                for _ in 0..*generations {
                    oid = Self::resolve_commit_parent(&oid, repository)?;
                }

                Ok(oid)
            }
        }
    }

    fn peel(oid: &ObjectId, name: &str, repository: &Repository) -> anyhow::Result<ObjectId> {
        repository
            .database()
            .peel_to_commit(oid)?
            .with_context(|| format!("{name} does not point at a commit"))
    }

    fn resolve_commit_parent(oid: &ObjectId, repository: &Repository) -> anyhow::Result<ObjectId> {
        let commit = repository
            .database()
            .parse_object_as_commit(oid)?
            .with_context(|| format!("object {oid} is not a commit"))?;

        commit
            .parent()
            .cloned()
            .with_context(|| format!("commit {} has no parent", oid.to_short_oid()))
    }

    fn resolve_oid(oid_str: &str, repository: &Repository) -> anyhow::Result<ObjectId> {
        if oid_str.len() == OBJECT_ID_LENGTH {
            let oid = ObjectId::try_parse(oid_str.to_ascii_lowercase())?;
            Self::validate_oid_is_commit(&oid, repository)?;
            return Ok(oid);
        }

        let matches = repository.database().find_objects_by_prefix(oid_str)?;

        match matches.as_slice() {
            [] => anyhow::bail!(
                "ambiguous argument '{oid_str}': unknown revision or path not in the working tree"
            ),
            [oid] => {
                Self::validate_oid_is_commit(oid, repository)?;
                Ok(oid.clone())
            }
            _ => {
                let commit_matches = matches
                    .iter()
                    .filter(|oid| {
                        repository
                            .database()
                            .get_object_type(oid)
                            .is_ok_and(|object_type| object_type == ObjectType::Commit)
                    })
                    .collect::<Vec<_>>();

                match commit_matches.as_slice() {
                    [] => anyhow::bail!(
                        "ambiguous argument '{oid_str}': unknown revision or path not in the working tree"
                    ),
                    [oid] => Ok((*oid).clone()),
                    _ => {
                        let mut error_msg = format!(
                            "short SHA1 {oid_str} is ambiguous\nhint: The candidates are:"
                        );
                        for oid in &commit_matches {
                            error_msg.push_str(&format!("\nhint:   {} commit", oid.to_short_oid()));
                        }
                        anyhow::bail!(error_msg)
                    }
                }
            }
        }
    }

    fn validate_oid_is_commit(oid: &ObjectId, repository: &Repository) -> anyhow::Result<()> {
        let obj_type = repository
            .database()
            .get_object_type(oid)
            .with_context(|| format!("object {oid} not found"))?;

        if obj_type != ObjectType::Commit {
            anyhow::bail!(
                "object {} is a {}, not a commit",
                oid.to_short_oid(),
                obj_type
            );
        }

        Ok(())
    }

    pub fn try_parse(revision: &str) -> anyhow::Result<Revision> {
        let parent = PARENT
            .as_ref()
            .map_err(|err| anyhow::anyhow!("invalid parent regex: {err}"))?;
        let ancestor = ANCESTOR
            .as_ref()
            .map_err(|err| anyhow::anyhow!("invalid ancestor regex: {err}"))?;

        if let Some(caps) = parent.captures(revision) {
            let base_revision = Self::try_parse(&caps[1])?;

            Ok(Revision::Parent(Box::new(base_revision)))
        } else if let Some(caps) = ancestor.captures(revision) {
            let generations: usize = caps[2]
                .parse()
                .with_context(|| format!("failed to parse generations in revision: {revision}"))?;
            let base_revision = Self::try_parse(&caps[1])?;

            Ok(Revision::Ancestor(Box::new(base_revision), generations))
        } else {
            let resolved_name = *REF_ALIASES.get(revision).unwrap_or(&revision);
            let branch_name = BranchName::try_parse(resolved_name.to_string())?;
            Ok(Revision::Ref(branch_name))
        }
    }

    fn looks_like_oid(s: &str) -> bool {
        (MIN_ABBREVIATED_OID_LENGTH..=OBJECT_ID_LENGTH).contains(&s.len())
            && s.chars().all(|c| c.is_ascii_hexdigit())
    }
}
