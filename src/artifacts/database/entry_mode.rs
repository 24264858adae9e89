//! Tree entry modes
//!
//! Git records a mode next to every tree entry. Only the mode's kind matters for change
//! detection: trees are descended into, everything else is a leaf whose id or mode change
//! counts as a modification.

#[derive(Debug, Clone, Copy, Eq, Ord, Default, PartialEq, PartialOrd, Hash)]
pub enum FileMode {
    #[default]
    Regular,
    Executable,
}

#[derive(Debug, Clone, Copy, Eq, Ord, Default, PartialEq, PartialOrd, Hash)]
pub enum EntryMode {
    File(FileMode),
    Symlink,
    /// Submodule commit pointer
    Gitlink,
    #[default]
    Directory,
}

impl EntryMode {
    pub fn as_str(&self) -> &str {
        match self {
            EntryMode::File(FileMode::Regular) => "100644",
            EntryMode::File(FileMode::Executable) => "100755",
            EntryMode::Symlink => "120000",
            EntryMode::Gitlink => "160000",
            EntryMode::Directory => "40000",
        }
    }

    pub fn is_tree(&self) -> bool {
        matches!(self, EntryMode::Directory)
    }

    /// Parse the octal mode of a tree entry
    ///
    /// Old repositories carry group-writable blobs (`100664`); git reads them as regular files.
    pub fn from_octal_str(mode: &str) -> anyhow::Result<Self> {
        let bits = u32::from_str_radix(mode, 8)
            .map_err(|_| anyhow::anyhow!("Invalid entry mode {mode:?}"))?;

        match bits & 0o170000 {
            0o040000 => Ok(EntryMode::Directory),
            0o120000 => Ok(EntryMode::Symlink),
            0o160000 => Ok(EntryMode::Gitlink),
            0o100000 if bits & 0o111 != 0 => Ok(EntryMode::File(FileMode::Executable)),
            0o100000 => Ok(EntryMode::File(FileMode::Regular)),
            _ => Err(anyhow::anyhow!("Invalid entry mode {mode:?}")),
        }
    }
}

impl TryFrom<&str> for EntryMode {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> anyhow::Result<Self> {
        Self::from_octal_str(value)
    }
}
