use crate::areas::repository::Repository;
use crate::artifacts::detect::change::Kind;
use crate::artifacts::detect::file::Diff;
use colored::{ColoredString, Colorize};
use std::io::Write;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Plain,
    Json,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    pub format: OutputFormat,
    /// Print group directories instead of files
    pub dirname: bool,
    /// Prefix files with their status letter
    pub name_status: bool,
    pub color: bool,
}

impl Repository {
    pub fn print_diff(&self, diff: &Diff, opts: &OutputOptions) -> anyhow::Result<()> {
        match opts.format {
            OutputFormat::Json => {
                let mut writer = self.writer();
                serde_json::to_writer_pretty(&mut *writer, diff)?;
                writeln!(writer)?;
            }
            OutputFormat::Plain if opts.dirname => {
                for dir in &diff.dirs {
                    writeln!(self.writer(), "{}", dir.path)?;
                }
            }
            OutputFormat::Plain if opts.name_status => {
                for file in &diff.files {
                    writeln!(
                        self.writer(),
                        "{}\t{}",
                        Self::status_letter(file.kind, opts.color),
                        file.path
                    )?;
                }
            }
            OutputFormat::Plain => {
                for file in &diff.files {
                    writeln!(self.writer(), "{}", file.path)?;
                }
            }
        }

        Ok(())
    }

    fn status_letter(kind: Kind, color: bool) -> ColoredString {
        let letter = kind.status_letter();
        if !color {
            return letter.normal().clear();
        }

        match kind {
            Kind::Added => letter.green(),
            Kind::Deleted => letter.red(),
            Kind::Modified => letter.yellow(),
            Kind::Unknown => letter.normal(),
        }
    }
}
