use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use proofstamp::config::Config;
use proofstamp::logging::LogFormat;
use proofstamp::watermark::{
    CaptureFields, FontLoader, SeededCodes, Theme, WatermarkRequest, Watermarker,
};

/// Proofstamp - stamp photos with a proof-of-capture overlay
#[derive(Parser, Debug)]
#[command(name = "proofstamp")]
#[command(version, about, long_about = None)]
struct Args {
    /// Source photo
    #[arg(short, long)]
    input: PathBuf,

    /// Destination; the extension picks the format (png, jpg, webp)
    #[arg(short, long)]
    output: PathBuf,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overlay theme (card or banner), overriding the configuration
    #[arg(long)]
    theme: Option<Theme>,

    #[arg(long)]
    location: Option<String>,

    #[arg(long)]
    temperature: Option<String>,

    #[arg(long)]
    weather: Option<String>,

    /// Date text, defaults to today as 2024年05月01日
    #[arg(long)]
    date: Option<String>,

    /// Time text, defaults to now as HH:MM
    #[arg(long)]
    time: Option<String>,

    #[arg(long)]
    weekday: Option<String>,

    /// Ribbon label
    #[arg(long, alias = "header-left")]
    category: Option<String>,

    /// Header title
    #[arg(long, alias = "header-right")]
    group: Option<String>,

    /// Use this security code instead of generating one
    #[arg(long)]
    security_code: Option<String>,

    /// Seed for reproducible security codes
    #[arg(long)]
    seed: Option<u64>,

    /// Write the computed layout as JSON ("-" for stdout)
    #[arg(long)]
    layout_json: Option<PathBuf>,

    /// Log output format (text or json)
    #[arg(long, default_value = "text")]
    log_format: LogFormat,
}

impl Args {
    fn fields(&self) -> CaptureFields {
        let mut fields = CaptureFields::new();
        if let Some(time) = &self.time {
            fields.set_time(time.as_str());
        }
        if let Some(date) = &self.date {
            fields.set_date(date.as_str());
        }
        if let Some(weekday) = &self.weekday {
            fields.set_weekday(weekday.as_str());
        }
        if let Some(location) = &self.location {
            fields.set_location(location.as_str());
        }
        if let Some(temperature) = &self.temperature {
            fields.set_temperature(temperature.as_str());
        }
        if let Some(weather) = &self.weather {
            fields.set_weather(weather.as_str());
        }
        if let Some(category) = &self.category {
            fields.set_category_label(category.as_str());
        }
        if let Some(group) = &self.group {
            fields.set_group_label(group.as_str());
        }
        if let Some(code) = &self.security_code {
            fields.set_security_code(code.as_str());
        }
        fields
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => Config::from_file(path).map_err(anyhow::Error::msg)?,
        None => Config::default(),
    };
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    tracing::info!(
        config_file = %args
            .config
            .as_ref()
            .map_or_else(|| "<defaults>".to_string(), |p| p.display().to_string()),
        theme = config.theme.as_str(),
        fonts = config.fonts.len(),
        assets = config.assets.dir.is_some(),
        "Configuration loaded successfully"
    );

    let loader = FontLoader::new();
    let mut watermarker = Watermarker::from_config(config, &loader);
    if let Some(seed) = args.seed {
        watermarker = watermarker.with_codes(SeededCodes::new(seed));
    }

    let mut request = WatermarkRequest::new(&args.input, &args.output);
    request.fields = args.fields();
    request.theme = args.theme;

    let report = watermarker.apply(&request)?;

    if let Some(path) = &args.layout_json {
        let json = serde_json::to_string_pretty(&report.layout)?;
        if path.as_os_str() == "-" {
            println!("{}", json);
        } else {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write layout to {}", path.display()))?;
        }
    }

    tracing::info!(
        output = %report.output.display(),
        security_code = %report.security_code,
        overflow = report.layout.overflow,
        "Done"
    );
    Ok(())
}

fn main() {
    let args = Args::parse();

    if let Err(e) = proofstamp::logging::init_subscriber(args.log_format) {
        eprintln!("Failed to initialize logging subsystem: {}", e);
    }

    if let Err(e) = run(&args) {
        tracing::error!(error = %format!("{:#}", e), "Watermarking failed");
        std::process::exit(1);
    }
}
