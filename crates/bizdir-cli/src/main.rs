use std::io;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use bizdir_crawler::{
    crawl_site, scrap_url, CrawlerConfig, HttpFetcher, OnError, PageLocation, PageSelection,
    Scrapable, Throttle, Url,
};
use bizdir_scraper::writer::DEFAULT_CSV_FILE;
use bizdir_scraper::{
    AddisBizConfig, AddisBizScraper, BusinessRecord, CsvWriterConfig, FieldSet, FileMode,
    RecordWriter,
};
use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};
use tokio::runtime;

/// Business directory scraper
#[derive(Debug, Parser)]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: SubCommand,
}

#[derive(Debug, clap::Subcommand)]
pub enum SubCommand {
    #[command(name = "crawl")]
    Crawl(CrawlArgs),
    #[command(name = "scrap")]
    Scrap(ScrapArgs),
    #[command(hide = true)]
    Completion,
}

/// Crawl category listings and scrap every business they link to
#[derive(Debug, clap::Args)]
pub struct CrawlArgs {
    /// Category URL to crawl, may be repeated
    #[arg(long = "url", short)]
    pub urls: Vec<String>,
    /// Listing pages to visit, e.g. `1,4,6` or `1-3`
    #[arg(long, short)]
    pub pages: Option<PageSelection>,
    /// Comma separated fields to export
    #[arg(long, short)]
    pub fields: Option<FieldSet>,
    /// Path to the output file that will contain scraped records, stdout if missing
    #[arg(long, short, num_args = 0..=1, default_missing_value = DEFAULT_CSV_FILE)]
    pub output_file: Option<PathBuf>,
    /// How to open the output file
    #[arg(value_enum, long)]
    pub file_mode: Option<FileMode>,
    /// CSV field delimiter
    #[arg(long, default_value_t = ',')]
    pub delimiter: char,
    /// Don't write the header row
    #[arg(long)]
    pub no_headers: bool,
    /// Optional scraper yaml configuration file
    #[arg(env = "BIZDIR_SCRAPER_CONFIG", long)]
    pub scraper_config: Option<PathBuf>,
    /// Optional default crawler yaml configuration file
    #[arg(env = "BIZDIR_CRAWLER_CONFIG", long)]
    pub crawler_config: Option<PathBuf>,
    /// Override crawler's user agent
    #[arg(long)]
    pub user_agent: Option<String>,
    /// Override crawler's request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
    /// Override crawler's number of attempts per page
    #[arg(long)]
    pub retries: Option<usize>,
    /// Override crawler's pause between attempts in seconds
    #[arg(long)]
    pub retry_delay: Option<f32>,
    /// Override crawler's maximum concurrent detail page downloads
    #[arg(long, conflicts_with = "delay")]
    pub concurrent_downloads: Option<NonZeroUsize>,
    /// Override crawler's pause after each download in seconds
    #[arg(long)]
    pub delay: Option<f32>,
    /// Override crawler's download error handling strategy
    #[arg(value_enum, long)]
    pub on_dl_error: Option<OnError>,
    /// Override crawler's scrap error handling strategy
    #[arg(value_enum, long)]
    pub on_scrap_error: Option<OnError>,
    /// No SIGINT handling, records scraped so far are lost on interruption
    #[arg(long)]
    pub no_sigint: bool,
    /// When quiet no logs are outputted
    #[arg(long, short)]
    pub quiet: bool,
}

impl TryFrom<&CrawlArgs> for CrawlerConfig {
    type Error = anyhow::Error;

    fn try_from(args: &CrawlArgs) -> Result<Self, Self::Error> {
        let mut conf = if let Some(file) = args.crawler_config.as_ref().map(fs_err::File::open) {
            serde_yaml::from_reader(file?)?
        } else {
            CrawlerConfig::default()
        };
        if let Some(user_agent) = &args.user_agent {
            conf.user_agent = user_agent.to_string();
        }
        if let Some(timeout) = args.timeout {
            conf.timeout = timeout;
        }
        if let Some(retries) = args.retries {
            conf.retries = retries;
        }
        if let Some(retry_delay) = args.retry_delay {
            conf.retry_delay = retry_delay;
        }
        if let Some(concurrent_downloads) = args.concurrent_downloads {
            conf.throttle = Some(Throttle::Concurrent(concurrent_downloads));
        }
        if let Some(delay) = args.delay {
            conf.throttle = Some(Throttle::Delay(delay));
        }
        if let Some(on_dl_error) = args.on_dl_error {
            conf.on_dl_error = on_dl_error;
        }
        if let Some(on_scrap_error) = args.on_scrap_error {
            conf.on_scrap_error = on_scrap_error;
        }
        if args.no_sigint {
            conf.handle_sigint = false;
        }
        Ok(conf)
    }
}

impl TryFrom<&CrawlArgs> for AddisBizConfig {
    type Error = anyhow::Error;

    fn try_from(args: &CrawlArgs) -> Result<Self, Self::Error> {
        let mut conf = if let Some(file) = args.scraper_config.as_ref().map(fs_err::File::open) {
            serde_yaml::from_reader(file?)?
        } else {
            AddisBizConfig::default()
        };
        if !args.urls.is_empty() {
            conf.urls = args.urls.clone();
        }
        if let Some(pages) = &args.pages {
            conf.pages = pages.clone();
        }
        if let Some(fields) = &args.fields {
            conf.fields = fields.clone();
        }
        Ok(conf)
    }
}

fn write_records<W: io::Write>(
    mut wtr: RecordWriter<W>,
    records: &[BusinessRecord],
) -> anyhow::Result<usize> {
    let n = wtr.write_all(records)?;
    wtr.flush()?;
    Ok(n)
}

/// Destination of crawled records, opened before crawling.
enum Output {
    Stdout(RecordWriter<io::Stdout>),
    File {
        wtr: RecordWriter<fs_err::File>,
        path: PathBuf,
        created: bool,
    },
}

impl Output {
    fn open(args: &CrawlArgs, fields: FieldSet) -> anyhow::Result<Self> {
        let csv_conf = CsvWriterConfig {
            delimiter: args.delimiter,
            headers: !args.no_headers,
            ..Default::default()
        };
        match &args.output_file {
            Some(path) => {
                let created = !path.exists();
                let mode = args.file_mode.unwrap_or_default();
                let wtr = RecordWriter::create(path, mode, &csv_conf, fields)?;
                Ok(Self::File {
                    wtr,
                    path: path.clone(),
                    created,
                })
            }
            None => Ok(Self::Stdout(RecordWriter::from_writer(
                io::stdout(),
                &csv_conf,
                fields,
            )?)),
        }
    }

    fn write(self, records: &[BusinessRecord]) -> anyhow::Result<usize> {
        match self {
            Self::Stdout(wtr) => write_records(wtr, records),
            Self::File { wtr, .. } => write_records(wtr, records),
        }
    }

    /// Drops the output, removing the file if this run created it.
    fn discard(self) -> anyhow::Result<()> {
        if let Self::File {
            wtr,
            path,
            created: true,
        } = self
        {
            drop(wtr);
            fs_err::remove_file(path)?;
        }
        Ok(())
    }
}

pub fn crawl(args: CrawlArgs) -> anyhow::Result<()> {
    let crawler_conf: CrawlerConfig = (&args).try_into()?;
    let scraper_conf: AddisBizConfig = (&args).try_into()?;
    let output = Output::open(&args, scraper_conf.fields.clone())?;

    let rt = runtime::Builder::new_multi_thread().enable_all().build()?;
    let outcome = match rt.block_on(crawl_site::<AddisBizScraper>(&crawler_conf, &scraper_conf)) {
        Ok(outcome) => outcome,
        Err(e) => {
            output.discard()?;
            return Err(e);
        }
    };

    if outcome.records.is_empty() {
        log::warn!("No data was scraped");
        output.discard()?;
    } else {
        let n = output.write(&outcome.records)?;
        log::info!(
            "Wrote {n} businesses from {} listing pages and {} detail pages",
            outcome.pages_visited,
            outcome.details_visited
        );
    }

    if outcome.cancelled {
        anyhow::bail!("Interrupted");
    }
    Ok(())
}

/// Scrap a single business page and print its record to stdout
#[derive(Debug, clap::Args)]
#[command(group = clap::ArgGroup::new("page").required(true))]
pub struct ScrapArgs {
    /// A local html page to scrap
    #[arg(group = "page", long)]
    pub file: Option<PathBuf>,
    /// A distant html page to scrap
    #[arg(group = "page", long)]
    pub url: Option<String>,
    /// Custom user agent to download the page
    #[arg(long, conflicts_with = "file")]
    pub ua: Option<String>,
    /// Comma separated fields to print
    #[arg(long, short, default_value_t = FieldSet::all())]
    pub fields: FieldSet,
    /// CSV field delimiter
    #[arg(long, default_value_t = ',')]
    pub delimiter: char,
}

pub fn scrap(args: ScrapArgs) -> anyhow::Result<()> {
    let scraper = AddisBizScraper::new(&AddisBizConfig {
        fields: args.fields.clone(),
        ..Default::default()
    })?;

    let record = if let Some(url) = args.url {
        let url = Url::parse(&url)?;
        let mut conf = CrawlerConfig::default();
        if let Some(ua) = args.ua {
            conf.user_agent = ua;
        }
        let fetcher = HttpFetcher::new(&conf)?;
        let rt = runtime::Builder::new_current_thread().enable_all().build()?;
        rt.block_on(scrap_url(&scraper, &fetcher, &url))?
    } else if let Some(path) = args.file {
        let page = fs_err::read_to_string(&path)?;
        scraper.scrap_page(&page, &PageLocation::Path(path))
    } else {
        anyhow::bail!("Missing `url` or `file`");
    };

    let Some(record) = record else {
        anyhow::bail!("No business entity found");
    };
    let csv_conf = CsvWriterConfig {
        delimiter: args.delimiter,
        ..Default::default()
    };
    write_records(
        RecordWriter::from_writer(io::stdout(), &csv_conf, args.fields)?,
        &[record],
    )?;
    Ok(())
}

fn init_logger(filters: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filters)).init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.cmd {
        SubCommand::Crawl(args) => {
            if !args.quiet {
                init_logger("bizdir_crawler=info,bizdir_scraper=warn");
            }
            crawl(args)
        }
        SubCommand::Scrap(args) => {
            init_logger("bizdir_crawler=warn,bizdir_scraper=warn");
            scrap(args)
        }
        SubCommand::Completion => {
            generate(Shell::Bash, &mut Args::command(), "bizdir", &mut io::stdout());
            Ok(())
        }
    }
}
