use changed_objects::areas::repository::Repository;
use changed_objects::artifacts::detect::change::Kind;
use changed_objects::artifacts::detect::filter::{DirExistFilter, FilterOptions, KindFilter};
use changed_objects::artifacts::detect::grouping::GroupStrategy;
use changed_objects::commands::detect::{DEFAULT_BRANCH, DetectOptions};
use changed_objects::commands::output::{OutputFormat, OutputOptions};
use clap::{Parser, ValueEnum};
use is_terminal::IsTerminal;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_ENV: &str = "LOG";

#[derive(Parser)]
#[command(
    name = "changed-objects",
    version,
    about = "List the files and directories changed between git snapshots",
    long_about = "Compares HEAD with its parent on the default branch, with the remote-tracking \
    default branch elsewhere, or with a merge base, then groups the changed files into \
    directories for selective CI runs.",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
"
)]
struct Cli {
    #[arg(index = 1, help = "Only report paths starting with one of these prefixes")]
    prefixes: Vec<String>,
    #[arg(
        long,
        default_value = DEFAULT_BRANCH,
        env = "CHANGED_OBJECTS_DEFAULT_BRANCH",
        help = "The default branch of the repository"
    )]
    default_branch: String,
    #[arg(long, help = "Compare with the merge base of this revision and the current branch")]
    merge_base: Option<String>,
    #[arg(long = "type", value_enum, help = "Only report changes of this kind (repeatable)")]
    types: Vec<ChangeType>,
    #[arg(long = "ignore", help = "Drop paths matching this glob (repeatable)")]
    ignores: Vec<String>,
    #[arg(
        long = "group-by",
        conflicts_with = "group_by_marker",
        help = "Group changes at the shallowest ancestor matching this glob (repeatable)"
    )]
    group_by: Vec<String>,
    #[arg(long, help = "Group changes at the nearest ancestor holding a file matching this glob")]
    group_by_marker: Option<String>,
    #[arg(long, value_enum, default_value_t = DirExist::All, help = "Filter by existence of the parent directory")]
    dir_exist: DirExist,
    #[arg(short, long, value_enum, default_value_t = Output::Plain, help = "Output format")]
    output: Output,
    #[arg(long, help = "Print group directories instead of files")]
    dirname: bool,
    #[arg(long, conflicts_with = "dirname", help = "Prefix files with their status letter")]
    name_status: bool,
    #[arg(short = 'C', long = "repo", help = "Run as if started in this directory")]
    repo: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ChangeType {
    Added,
    Deleted,
    Modified,
}

impl From<ChangeType> for KindFilter {
    fn from(change_type: ChangeType) -> Self {
        match change_type {
            ChangeType::Added => KindFilter::from(Kind::Added),
            ChangeType::Deleted => KindFilter::from(Kind::Deleted),
            ChangeType::Modified => KindFilter::from(Kind::Modified),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DirExist {
    True,
    False,
    All,
}

impl From<DirExist> for DirExistFilter {
    fn from(dir_exist: DirExist) -> Self {
        match dir_exist {
            DirExist::True => DirExistFilter::Exists,
            DirExist::False => DirExistFilter::Missing,
            DirExist::All => DirExistFilter::All,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Output {
    Plain,
    Json,
}

impl From<Output> for OutputFormat {
    fn from(output: Output) -> Self {
        match output {
            Output::Plain => OutputFormat::Plain,
            Output::Json => OutputFormat::Json,
        }
    }
}

impl Cli {
    fn detect_options(&self) -> DetectOptions {
        let group_strategy = match &self.group_by_marker {
            Some(marker) => GroupStrategy::Marker(marker.clone()),
            None => GroupStrategy::from_patterns(self.group_by.clone()),
        };

        DetectOptions {
            default_branch: self.default_branch.clone(),
            merge_base: self.merge_base.clone(),
            group_strategy,
            filters: FilterOptions {
                prefixes: self.prefixes.clone(),
                ignores: self.ignores.clone(),
                kinds: self
                    .types
                    .iter()
                    .fold(KindFilter::empty(), |kinds, change_type| {
                        kinds | KindFilter::from(*change_type)
                    }),
                dir_exist: self.dir_exist.into(),
            },
        }
    }

    fn output_options(&self) -> OutputOptions {
        OutputOptions {
            format: self.output.into(),
            dirname: self.dirname,
            name_status: self.name_status,
            color: std::io::stdout().is_terminal(),
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let path = match &cli.repo {
        Some(repo) => repo.clone(),
        None => std::env::current_dir()?,
    };
    tracing::info!(path = %path.display(), "detecting changes");

    let repository = Repository::open(&path, Box::new(std::io::stdout()))?;
    let diff = repository.detect(&cli.detect_options())?;
    repository.print_diff(&diff, &cli.output_options())?;

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    if let Err(err) = run(&cli) {
        eprintln!("[ERROR] {err:#}");
        std::process::exit(1);
    }
}
