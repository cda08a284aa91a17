use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use salesdash::{
    config::Settings,
    export,
    fetch::{self, remote::RemoteSource, Source},
    filter::FilterParams,
    pipeline::Dashboard,
    report,
    versions::VersionStore,
};
use std::{
    fs::{self, File},
    io::BufWriter,
    path::PathBuf,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Sales reporting dashboard over a CSV of transactions.
#[derive(Parser, Debug)]
#[command(name = "salesdash")]
struct Args {
    /// YAML settings file
    #[arg(long, default_value = "salesdash.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clean, filter and summarise a data file
    Report(ReportArgs),
    /// Save a CSV as a new data version
    Upload {
        /// CSV file to store
        file: PathBuf,
    },
    /// List selectable data files, default first then newest version
    Versions,
}

#[derive(clap::Args, Debug)]
struct ReportArgs {
    /// Read this CSV directly
    #[arg(long, conflicts_with_all = ["version", "url"])]
    file: Option<PathBuf>,

    /// Pick a saved version (defaults to the first selectable file)
    #[arg(long, conflicts_with = "url")]
    version: Option<String>,

    /// Fetch the CSV over HTTP (overrides `remote_url` in settings)
    #[arg(long)]
    url: Option<String>,

    /// First day to include (YYYY-MM-DD); defaults to the earliest sale
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last day to include (YYYY-MM-DD); defaults to the latest sale
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Only these regions (repeatable); all when omitted
    #[arg(long = "region")]
    regions: Vec<String>,

    /// Only these categories (repeatable); all when omitted
    #[arg(long = "category")]
    categories: Vec<String>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Write the filtered rows as CSV
    #[arg(long)]
    export_csv: Option<PathBuf>,

    /// Write the filtered rows as Parquet
    #[arg(long)]
    export_parquet: Option<PathBuf>,
}

impl ReportArgs {
    fn narrows(&self) -> bool {
        self.start.is_some()
            || self.end.is_some()
            || !self.regions.is_empty()
            || !self.categories.is_empty()
    }

    /// Apply the user's narrowing on top of the "everything" selection.
    fn params(&self, all: FilterParams) -> FilterParams {
        let mut p = all;
        if let Some(s) = self.start {
            p.range.start = s;
        }
        if let Some(e) = self.end {
            p.range.end = e;
        }
        if !self.regions.is_empty() {
            p.regions = self.regions.iter().cloned().collect();
        }
        if !self.categories.is_empty() {
            p.categories = self.categories.iter().cloned().collect();
        }
        p
    }

    fn source(&self, settings: &Settings, store: &VersionStore) -> Result<Source> {
        if let Some(f) = &self.file {
            return Ok(Source::Local(f.clone()));
        }
        if self.version.is_none() {
            if let Some(url) = self.url.as_ref().or(settings.remote_url.as_ref()) {
                return Ok(Source::Remote(url.clone()));
            }
        }
        Ok(Source::Local(store.resolve(self.version.as_deref())?))
    }
}

async fn run_report(args: ReportArgs, settings: &Settings, store: &VersionStore) -> Result<()> {
    let source = args.source(settings, store)?;
    info!(source = %source.label(), "loading data");

    let remote = match &source {
        Source::Remote(url) => Some(RemoteSource::new(
            reqwest::Client::new(),
            url,
            settings.cache_ttl(),
        )?),
        _ => None,
    };
    let raw = fetch::load(&source, remote.as_ref()).await?;

    let mut dash = Dashboard::new(settings.columns.clone(), settings.report_options());
    let mut run = dash.run(&raw, None)?;
    if args.narrows() {
        match FilterParams::all(&run.table) {
            Some(all) => run = dash.run(&raw, Some(args.params(all)))?,
            None => warn!("no dated rows; filter options ignored"),
        }
    }
    run.report.source = Some(source.label());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&run.report)?);
    } else {
        print!("{}", report::render_text(&run.report));
    }

    let rows = run.filtered.rows();
    if let Some(path) = &args.export_csv {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        export::write_csv(BufWriter::new(file), rows)?;
        info!(path = %path.display(), rows = rows.len(), "exported csv");
    }
    if let Some(path) = &args.export_parquet {
        export::write_parquet(path, rows)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // ─── 2) settings + version store ─────────────────────────────────
    let args = Args::parse();
    let settings = Settings::load(&args.config)?;
    let store = VersionStore::new(&settings.versions_dir, &settings.default_file)?;

    // ─── 3) dispatch ─────────────────────────────────────────────────
    match args.command {
        Command::Report(r) => run_report(r, &settings, &store).await?,
        Command::Upload { file } => {
            let bytes = fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
            // must at least parse as CSV before it is kept
            fetch::table_from_bytes(&bytes)?;
            let path = store.save_upload(&bytes, Local::now().naive_local())?;
            println!("Disimpan: {}", path.display());
        }
        Command::Versions => {
            let opts = store.options()?;
            if opts.is_empty() {
                println!("Belum ada file data yang tersedia.");
            }
            for o in opts {
                println!("{}", o);
            }
        }
    }
    Ok(())
}
