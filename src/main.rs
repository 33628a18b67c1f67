use anyhow::{Context, Result};
use clap::Parser;
use stockaudit::{
    cli::{Cli, OutputFormat},
    config::AnalysisConfig,
    csv_output, ingest,
    json_output::JsonOutput,
    pipeline::Pipeline,
    report::{DataQualitySection, TextReport},
};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Load the configuration file (or defaults) and apply command-line overrides
fn load_config(args: &Cli) -> Result<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    if let Some(z) = args.z_threshold {
        config.z_threshold = z;
    }
    if let Some(k) = args.iqr_multiplier {
        config.iqr_multiplier = k;
    }
    Ok(config)
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    let pipeline = Pipeline::new(load_config(&args)?).context("invalid configuration")?;

    let records = ingest::load_records(&args.input, args.input_format)
        .with_context(|| format!("failed to read records from {}", args.input.display()))?;

    if args.validate_only {
        let inconsistencies = pipeline.validate(&records);
        match args.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&inconsistencies)?),
            OutputFormat::Text | OutputFormat::Csv => {
                print!("{}", DataQualitySection(&inconsistencies))
            }
        }
        return Ok(());
    }

    let analysis = pipeline.run(&records);
    match args.format {
        OutputFormat::Text => print!("{}", TextReport::new(&analysis, &records)),
        OutputFormat::Json => println!("{}", JsonOutput::new(&analysis).to_json()?),
        OutputFormat::Csv => print!("{}", csv_output::scores_to_csv(&records, &analysis.scores)),
    }

    Ok(())
}
