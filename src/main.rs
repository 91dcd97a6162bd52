use anyhow::Context;
use clap::Parser;
use report_capture::export::{ExportFormat, Exporter, JsonFileGenerator};
use report_capture::metrics::{JsonDirMetrics, MetricsSource, NoMetrics};
use report_capture::notify::LogNotifier;
use report_capture::{CaptureConfig, SceneSurface};
use std::path::PathBuf;

/// Capture every report chart and export the report bundle
#[derive(Parser, Debug)]
#[command(name = "report-capture", version, about)]
struct Cli {
    /// Scene file describing the charts to capture
    #[arg(long)]
    scene: Option<PathBuf>,

    /// Capture from a live report page in headless Chrome instead of a scene
    #[cfg(feature = "cdp")]
    #[arg(long)]
    page_url: Option<String>,

    /// Directory holding `<category>.json` metrics files
    #[arg(long)]
    metrics_dir: Option<PathBuf>,

    /// Base URL serving metrics at `<url>/<category>`
    #[cfg(feature = "http")]
    #[arg(long)]
    metrics_url: Option<String>,

    /// JSON capture configuration
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
    format: ExportFormat,

    /// Output file (defaults to `report.<format>`)
    #[arg(long, short)]
    out: Option<PathBuf>,

    /// Override the per-category settlement delay
    #[arg(long)]
    category_settle_ms: Option<u64>,

    /// Override the per-chart settlement delay
    #[arg(long)]
    chart_settle_ms: Option<u64>,
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<CaptureConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                CaptureConfig::from_json(&text)?
            }
            None => CaptureConfig::default(),
        };
        if let Some(ms) = self.category_settle_ms {
            config.category_settle_ms = ms;
        }
        if let Some(ms) = self.chart_settle_ms {
            config.chart_settle_ms = ms;
        }
        Ok(config)
    }

    fn metrics_source(&self) -> anyhow::Result<Box<dyn MetricsSource>> {
        #[cfg(feature = "http")]
        {
            if let Some(url) = &self.metrics_url {
                let source = report_capture::metrics::HttpMetricsSource::new(url.clone(), 30000)?;
                return Ok(Box::new(source));
            }
        }
        let source: Box<dyn MetricsSource> = match &self.metrics_dir {
            Some(dir) => Box::new(JsonDirMetrics::new(dir.clone())),
            None => Box::new(NoMetrics),
        };
        Ok(source)
    }
}

#[cfg(feature = "cdp")]
async fn export_from_page(
    url: &str,
    exporter: &Exporter,
    metrics: &dyn MetricsSource,
    format: ExportFormat,
) -> anyhow::Result<Vec<u8>> {
    use report_capture::cdp::{CdpConfig, CdpSurface};

    let mut surface = CdpSurface::new(CdpConfig {
        page_url: url.to_string(),
        ..Default::default()
    })?;
    let bytes = exporter
        .run(&mut surface, metrics, &JsonFileGenerator, &LogNotifier, format)
        .await;
    surface.close()?;
    Ok(bytes?)
}

async fn export(cli: &Cli, exporter: &Exporter, metrics: &dyn MetricsSource) -> anyhow::Result<Vec<u8>> {
    #[cfg(feature = "cdp")]
    {
        if let Some(url) = &cli.page_url {
            return export_from_page(url, exporter, metrics, cli.format).await;
        }
    }

    let path = cli.scene.as_ref().context("--scene is required")?;
    let text = std::fs::read_to_string(path).with_context(|| format!("reading scene {}", path.display()))?;
    let mut surface = SceneSurface::from_json(&text)?;
    let bytes = exporter
        .run(&mut surface, metrics, &JsonFileGenerator, &LogNotifier, cli.format)
        .await?;
    Ok(bytes)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.load_config()?;
    let exporter = Exporter::new(config)?;
    let metrics = cli.metrics_source()?;

    let bytes = export(&cli, &exporter, metrics.as_ref()).await?;

    let out = cli
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("report.{}", cli.format.extension())));
    std::fs::write(&out, bytes).with_context(|| format!("writing {}", out.display()))?;
    log::info!("Wrote {}", out.display());
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run(cli)) {
        eprintln!("report-capture failed: {:#}", e);
        std::process::exit(1);
    }
}
