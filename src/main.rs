use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use runview::compare::{CompareMode, CompareOptions, TransitionTally};
use runview::config::ViewerConfig;
use runview::query::{SortDirection, SortOrder};
use runview::store::{LoadError, LoadReport, ResultStore, RunSummary};
use runview::view::{Rows, View, ViewState};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "runview",
    about = "Browse and compare SPARQL test-suite run reports",
    version,
    long_about = None
)]
struct Cli {
    /// Configuration file (defaults to $RUNVIEW_CONFIG, then ./runview.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory of *.json run files
    #[arg(long, global = true)]
    results: Option<PathBuf>,

    /// HTTP directory listing of run files (overrides --results)
    #[arg(long, global = true)]
    index_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Bind address
        #[arg(long)]
        bind: Option<String>,

        /// Static front-end directory, served under /www
        #[arg(long)]
        www: Option<PathBuf>,
    },

    /// List loaded runs with their aggregate counts
    Runs {
        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Show the tests of one run
    Show {
        /// Run name (file name without .json)
        run: String,

        #[command(flatten)]
        table: TableArgs,
    },

    /// Compare two runs and list the tests whose outcome changed
    Compare {
        /// First (baseline) run
        first: String,

        /// Second run
        second: String,

        /// Comparison mode: status or field
        #[arg(long)]
        mode: Option<CompareMode>,

        #[command(flatten)]
        table: TableArgs,
    },
}

#[derive(Args)]
struct TableArgs {
    /// Keep only these statuses (repeatable)
    #[arg(long)]
    status: Vec<String>,

    /// Keep only these error types (repeatable)
    #[arg(long)]
    error_type: Vec<String>,

    /// Keep only these test types (repeatable)
    #[arg(long = "type")]
    type_name: Vec<String>,

    /// Keep only these groups (repeatable)
    #[arg(long)]
    group: Vec<String>,

    /// Keyword search over name, status, error type, type and group
    #[arg(long, default_value = "")]
    search: String,

    /// Field to sort by
    #[arg(long)]
    sort: Option<String>,

    /// Sort descending
    #[arg(long, requires = "sort")]
    desc: bool,

    /// JSON output for machine parsing
    #[arg(long)]
    json: bool,
}

impl TableArgs {
    fn narrows(&self) -> bool {
        !(self.status.is_empty()
            && self.error_type.is_empty()
            && self.type_name.is_empty()
            && self.group.is_empty())
    }

    fn configure(&self, state: &mut ViewState) {
        state.search = self.search.clone();
        state.sort = self.sort.as_ref().map(|key| SortOrder {
            key: key.clone(),
            direction: if self.desc {
                SortDirection::Descending
            } else {
                SortDirection::Ascending
            },
        });
    }

    /// Render, narrowing the observed whitelists by the values given on the command line.
    fn render(
        &self,
        state: &mut ViewState,
        store: &ResultStore,
        options: &CompareOptions,
    ) -> Result<View> {
        self.configure(state);
        let view = state.render(store, options)?;
        if !self.narrows() {
            return Ok(view);
        }

        let mut constraints = view.constraints;
        let overrides = [
            (&self.status, &mut constraints.statuses),
            (&self.error_type, &mut constraints.error_types),
            (&self.type_name, &mut constraints.types),
            (&self.group, &mut constraints.groups),
        ];
        for (values, whitelist) in overrides {
            if !values.is_empty() {
                *whitelist = values.iter().cloned().collect::<BTreeSet<_>>();
            }
        }
        state.constraints = Some(constraints);
        Ok(state.render(store, options)?)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config lookup logs its fallbacks before the configured subscriber exists.
    let mut config = tracing::subscriber::with_default(bootstrap_subscriber(), || {
        ViewerConfig::resolve(cli.config.as_deref())
    })?;
    if let Some(dir) = cli.results {
        config.results.dir = dir;
        config.results.index_url = None;
    }
    if let Some(url) = cli.index_url {
        config.results.index_url = Some(url);
    }

    init_tracing(&config);

    match cli.command {
        Commands::Serve { bind, www } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            if let Some(www) = www {
                config.server.www_dir = Some(www);
            }
            tracing::info!(bind = %config.server.bind, "Starting runview server");
            runview::serve(&config).await?;
        }
        Commands::Runs { json } => {
            let (store, report) = runview::load_results(&config.results).await?;
            let runs = store.summaries();
            if json {
                let output = RunsOutput {
                    runs: &runs,
                    load_complete: report.is_complete(),
                    load_failures: &report.failed,
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
                return Ok(());
            }
            if runs.is_empty() {
                println!("No runs found.");
            } else {
                println!(
                    "{:<30} | {:>6} | {:>6} | {:>8} | {:>6} | {:>10}",
                    "Run", "Tests", "Passed", "Intended", "Failed", "Not tested"
                );
                println!(
                    "{:-<30}-|-{:-<6}-|-{:-<6}-|-{:-<8}-|-{:-<6}-|-{:-<10}",
                    "", "", "", "", "", ""
                );
                for run in &runs {
                    let i = &run.info;
                    println!(
                        "{:<30} | {:>6} | {:>6} | {:>8} | {:>6} | {:>10}",
                        run.name, i.tests, i.passed, i.passed_failed, i.failed, i.not_tested
                    );
                }
            }
            print_load_failures(&report);
        }
        Commands::Show { run, table } => {
            let (store, report) = runview::load_results(&config.results).await?;
            let mut state = ViewState::new(&store);
            state.select_run(&run);
            let view = table.render(&mut state, &store, &config.compare.options())?;
            print_view(&view, &report, table.json)?;
        }
        Commands::Compare {
            first,
            second,
            mode,
            table,
        } => {
            let (store, report) = runview::load_results(&config.results).await?;
            let mut options = config.compare.options();
            if let Some(mode) = mode {
                options.mode = mode;
            }
            let mut state = ViewState::new(&store);
            state.select_run(&first);
            state.toggle_compared_run(&second);
            let view = table.render(&mut state, &store, &options)?;
            print_view(&view, &report, table.json)?;
        }
    }

    Ok(())
}

/// `--json` output of `runs`.
#[derive(Serialize)]
struct RunsOutput<'a> {
    runs: &'a [RunSummary],
    load_complete: bool,
    load_failures: &'a [LoadError],
}

/// `--json` output of `show` and `compare`: the view plus the load outcome.
#[derive(Serialize)]
struct ViewOutput<'a> {
    #[serde(flatten)]
    view: &'a View,
    load_complete: bool,
    load_failures: &'a [LoadError],
}

fn bootstrap_subscriber() -> impl tracing::Subscriber + Send + Sync {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish()
}

fn init_tracing(config: &ViewerConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print_view(view: &View, report: &LoadReport, json: bool) -> Result<()> {
    if json {
        let output = ViewOutput {
            view,
            load_complete: report.is_complete(),
            load_failures: &report.failed,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match &view.rows {
        Rows::Single(records) => {
            println!("{:<40} | {:<16} | {:<24} | {:<20}", "Test", "Status", "Error", "Group");
            println!("{:-<40}-|-{:-<16}-|-{:-<24}-|-{:-<20}", "", "", "", "");
            for r in records {
                let status = r.status.as_ref().map(|s| s.as_str()).unwrap_or("-");
                println!(
                    "{:<40} | {:<16} | {:<24} | {:<20}",
                    r.name,
                    status,
                    r.error_type.as_str(),
                    r.group
                );
            }
        }
        Rows::Compared(records) => {
            println!("{:<40} | {:<22} | {:<22}", "Test", "First", "Second");
            println!("{:-<40}-|-{:-<22}-|-{:-<22}", "", "", "");
            for r in records {
                println!(
                    "{:<40} | {:<22} | {:<22}",
                    r.get("name").unwrap_or_default(),
                    r.primary("status").unwrap_or("-"),
                    r.secondary("status").unwrap_or("-")
                );
            }
        }
    }

    println!("\n{} test(s)", view.rows.len());
    if let Some(tally) = &view.tally {
        print_tally(tally);
    }
    if !view.is_complete() {
        println!("\nWarning: {} malformed record(s) skipped:", view.skipped.len());
        for err in &view.skipped {
            println!(" - {}", err);
        }
    }
    print_load_failures(report);
    Ok(())
}

fn print_load_failures(report: &LoadReport) {
    if report.is_complete() {
        return;
    }
    println!("\nWarning: {} run file(s) could not be loaded:", report.failed.len());
    for err in &report.failed {
        println!(" - {}", err);
    }
}

fn print_tally(tally: &TransitionTally) {
    println!("\n=== Transitions ===");
    for (transition, count) in &tally.transitions {
        println!("{:<40} : {}", transition.to_string(), count);
    }
    for (status, count) in &tally.added {
        println!("{:<40} : {}", format!("only in first ({status})"), count);
    }
    println!("{:<40} : {}", "only in second", tally.deleted);
    println!("{:<40} : {}", "error type only", tally.error_type_only);
    println!("{:<40} : {}", "unchanged", tally.unchanged);
}
