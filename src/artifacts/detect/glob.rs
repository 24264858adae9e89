//! Glob matching seam
//!
//! Grouping and filtering only ever ask "does this pattern match this path". Patterns
//! use `/` as a separator that `*` and `?` never cross, `**` spans any number of
//! segments and `{a,b}` alternates. A pattern ending in `/**` also matches its base
//! directory, so `kubernetes/**` matches `kubernetes` itself.

use anyhow::Context;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub trait GlobMatcher {
    /// Whether `candidate` matches `pattern`; malformed patterns are errors
    fn matches(&self, pattern: &str, candidate: &str) -> anyhow::Result<bool>;
}

const RECURSIVE_SUFFIX: &str = "/**";

/// [`GlobMatcher`] backed by `globset`, compiling each pattern once
#[derive(Debug, Default)]
pub struct GlobSetMatcher {
    compiled: RefCell<HashMap<String, Rc<[globset::GlobMatcher]>>>,
}

impl GlobSetMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn compile(pattern: &str) -> anyhow::Result<Rc<[globset::GlobMatcher]>> {
        let mut sources = vec![pattern];
        if let Some(base) = pattern.strip_suffix(RECURSIVE_SUFFIX)
            && !base.is_empty()
        {
            sources.push(base);
        }

        sources
            .into_iter()
            .map(|source| {
                globset::GlobBuilder::new(source)
                    .literal_separator(true)
                    .build()
                    .map(|glob| glob.compile_matcher())
                    .with_context(|| format!("invalid glob pattern {pattern:?}"))
            })
            .collect()
    }

    fn matchers(&self, pattern: &str) -> anyhow::Result<Rc<[globset::GlobMatcher]>> {
        if let Some(matchers) = self.compiled.borrow().get(pattern) {
            return Ok(matchers.clone());
        }

        let matchers = Self::compile(pattern)?;
        self.compiled
            .borrow_mut()
            .insert(pattern.to_string(), matchers.clone());

        Ok(matchers)
    }
}

impl GlobMatcher for GlobSetMatcher {
    fn matches(&self, pattern: &str, candidate: &str) -> anyhow::Result<bool> {
        Ok(self
            .matchers(pattern)?
            .iter()
            .any(|matcher| matcher.is_match(candidate)))
    }
}
