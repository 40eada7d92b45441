//! garnison - records, statistics and PDF reports for a training center.
//!
//! Talks to the center's Strapi backend; see `garnison --help`.

mod app;
mod output;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use garnison_core::{FilterField, FilterSpec};

use app::App;

#[derive(Parser)]
#[command(name = "garnison", version)]
#[command(about = "Training-center records, instructor statistics and PDF reports", long_about = None)]
struct Cli {
    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in to the Strapi backend
    Login {
        #[arg(short, long)]
        username: Option<String>,
        /// Keep the password in the OS keychain
        #[arg(long)]
        remember: bool,
    },
    /// Forget the saved session
    Logout {
        /// Also remove the password from the keychain
        #[arg(long)]
        forget: bool,
    },
    /// List records of one collection
    List {
        #[arg(value_enum)]
        entity: Entity,
        #[command(flatten)]
        filters: FilterArgs,
        /// Sort people by: nom, matricule, grade, specialite
        #[arg(long)]
        sort: Option<String>,
        #[arg(long)]
        desc: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Remarks grouped by day
    Remarks {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Instructor statistics for a day (2024-03-04), month (2024-03) or year (2024)
    Stats {
        #[arg(short, long)]
        period: String,
        #[arg(long)]
        json: bool,
    },
    /// Render a PDF report
    Export {
        #[command(subcommand)]
        report: ExportCommand,
        /// Output directory (defaults to the configured one)
        #[arg(short, long, global = true)]
        output: Option<PathBuf>,
    },
    /// Create remarks from a JSON file holding an array of drafts
    SubmitRemarks {
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum ExportCommand {
    /// One sheet per trainee with remarks, consultations, punishments, permissions
    Trainees {
        #[command(flatten)]
        filters: FilterArgs,
        /// Only these ids (comma separated)
        #[arg(long, value_delimiter = ',')]
        ids: Vec<i64>,
    },
    /// One sheet per instructor with their remarks
    Instructors {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, value_delimiter = ',')]
        ids: Vec<i64>,
    },
    /// Remarks grouped by day
    Remarks {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value = "LISTE DES REMARQUES")]
        title: String,
    },
    /// Instructor statistics table
    Stats {
        #[arg(short, long)]
        period: String,
    },
    /// Certificate for the instructor with the most positive remarks
    Certificate {
        #[arg(short, long)]
        period: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Entity {
    Trainees,
    Instructors,
    Subjects,
    Remarks,
    Consultations,
    Specialties,
}

/// Filters shared by listing and export commands
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Free-text search (names, matricule, title or content)
    #[arg(short, long)]
    query: Option<String>,
    #[arg(long)]
    specialty: Option<String>,
    #[arg(long)]
    grade: Option<String>,
    /// Remark date, YYYY-MM-DD
    #[arg(long)]
    date: Option<String>,
    /// Remark type: positive or negative
    #[arg(long = "type")]
    kind: Option<String>,
    #[arg(long)]
    brigade: Option<String>,
    /// Instructor id
    #[arg(long)]
    instructor: Option<String>,
    /// Category id (specialty of a person or subject, subject of a remark)
    #[arg(long)]
    category: Option<String>,
}

impl FilterArgs {
    pub fn to_spec(&self) -> FilterSpec {
        FilterSpec::new()
            .query(self.query.as_deref().unwrap_or(""))
            .with_opt(FilterField::Specialty, self.specialty.as_deref())
            .with_opt(FilterField::Grade, self.grade.as_deref())
            .with_opt(FilterField::Date, self.date.as_deref())
            .with_opt(FilterField::Type, self.kind.as_deref())
            .with_opt(FilterField::Brigade, self.brigade.as_deref())
            .with_opt(FilterField::Instructor, self.instructor.as_deref())
            .with_opt(FilterField::Category, self.category.as_deref())
    }
}

/// Initialize the tracing subscriber. `RUST_LOG` overrides the default
/// `warn` level. The returned guard flushes the log file on drop.
fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("Invalid log file path: {}", path.display()))?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();
    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_file.as_deref())?;
    info!("garnison starting");

    let mut app = App::new()?;
    match cli.command {
        Commands::Login { username, remember } => app.login(username, remember).await,
        Commands::Logout { forget } => app.logout(forget),
        Commands::List {
            entity,
            filters,
            sort,
            desc,
            json,
        } => app.list(entity, &filters.to_spec(), sort.as_deref(), desc, json).await,
        Commands::Remarks { filters } => app.remarks(&filters.to_spec()).await,
        Commands::Stats { period, json } => app.stats(&period, json).await,
        Commands::Export { report, output } => {
            let request = match report {
                ExportCommand::Trainees { filters, ids } => {
                    app.trainee_sheets(&filters.to_spec(), &ids).await?
                }
                ExportCommand::Instructors { filters, ids } => {
                    app.instructor_sheets(&filters.to_spec(), &ids).await?
                }
                ExportCommand::Remarks { filters, title } => {
                    app.remarks_list(&filters.to_spec(), title).await?
                }
                ExportCommand::Stats { period } => app.statistics(&period).await?,
                ExportCommand::Certificate { period } => app.certificate(&period).await?,
            };
            app.export(&request, output).await
        }
        Commands::SubmitRemarks { file } => app.submit_remarks(&file).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_export_with_filters() {
        let cli = Cli::try_parse_from([
            "garnison", "export", "trainees", "--specialty", "Transmissions", "--ids", "1,2", "-o", "out",
        ])
        .unwrap();
        match cli.command {
            Commands::Export {
                report: ExportCommand::Trainees { filters, ids },
                output,
            } => {
                assert_eq!(ids, vec![1, 2]);
                assert_eq!(filters.specialty.as_deref(), Some("Transmissions"));
                assert_eq!(output, Some(PathBuf::from("out")));
            }
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn test_filter_args_build_spec() {
        let args = FilterArgs {
            query: Some("ben".into()),
            kind: Some("positif".into()),
            ..Default::default()
        };
        let expected = FilterSpec::new()
            .query("ben")
            .with(FilterField::Type, "positive");
        assert_eq!(args.to_spec(), expected);
        assert!(FilterArgs::default().to_spec().is_empty());
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
