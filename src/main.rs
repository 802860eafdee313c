use anyhow::{Context, Result};
use clap::Parser;
use pitwall::aggregate::{aggregate, AggregateOptions, GroupKey};
use pitwall::benchmark::benchmark_against_best;
use pitwall::cli::{
    Cli, Command, CorrelateArgs, GroupArgs, OutputFormat, QueryArgs, SectorArgs, TestArgs,
};
use pitwall::config::AnalysisConfig;
use pitwall::correlation::{paired_columns, pearson};
use pitwall::dataset::Dataset;
use pitwall::filter::FilterSpec;
use pitwall::hypothesis::{compare_samples, Direction};
use pitwall::json_output::JsonOutput;
use pitwall::kpi::TrackCharacter;
use pitwall::outlier::{apply_screens, ScreenResult};
use pitwall::sectors::{
    deltas_by_sector_type, load_laps, session_deficits, sessions_in, DeficitMeasure, LapSchema,
};
use pitwall::table::Table;
use pitwall::{csv_output, report};
use std::collections::BTreeSet;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Load the KPI export and parse the shared filter expressions
fn load_query(query: &QueryArgs) -> Result<(Dataset, FilterSpec)> {
    let dataset = query
        .kpi
        .load(&query.file)
        .with_context(|| format!("Failed to read {} export {}", query.kpi, query.file.display()))?;
    let filter = FilterSpec::from_exprs(&query.filters).context("Invalid --filter expression")?;
    Ok((dataset, filter))
}

fn aggregate_options(args: &GroupArgs, config: &AnalysisConfig) -> AggregateOptions {
    let kpi = args.query.kpi;
    let options = AggregateOptions::from_config(config, kpi.metrics()).with_scale(kpi.scale());
    match args.group_by {
        Some(facet) => options.grouped_by(GroupKey::Facet(facet)),
        None => options,
    }
}

fn run_stats(args: &GroupArgs, config: &AnalysisConfig, format: OutputFormat) -> Result<String> {
    let (dataset, filter) = load_query(&args.query)?;
    let rows = aggregate(&dataset, &filter, &aggregate_options(args, config))?;

    Ok(match format {
        OutputFormat::Text => format!(
            "{}Filter: {}\n\n{}",
            report::format_exclusions(&dataset.exclusions()),
            filter,
            report::format_group_table(&rows, args.query.kpi.unit(), config.precision)
        ),
        OutputFormat::Json => {
            let mut output = JsonOutput::new()
                .with_kpi(args.query.kpi.name())
                .with_filters(filter.describe())
                .with_exclusions(dataset.exclusions());
            output.set_statistics(rows);
            output.to_json()?
        }
        OutputFormat::Csv => csv_output::group_statistics_csv(&rows)?,
    })
}

fn run_benchmark(
    args: &GroupArgs,
    config: &AnalysisConfig,
    format: OutputFormat,
) -> Result<String> {
    let (dataset, filter) = load_query(&args.query)?;
    let options = aggregate_options(args, config);
    let rows = aggregate(&dataset, &filter, &options)?;
    let table = benchmark_against_best(
        &rows,
        &options.metrics,
        config.precision,
        config.percent_precision,
    )
    .with_context(|| format!("Cannot benchmark {} ({})", args.query.kpi, filter))?;

    Ok(match format {
        OutputFormat::Text => format!(
            "{}Filter: {}\n\n{}",
            report::format_exclusions(&dataset.exclusions()),
            filter,
            report::format_benchmark_table(&table, args.query.kpi.unit(), config.precision)
        ),
        OutputFormat::Json => {
            let mut output = JsonOutput::new()
                .with_kpi(args.query.kpi.name())
                .with_filters(filter.describe())
                .with_exclusions(dataset.exclusions());
            output.set_statistics(rows);
            output.set_benchmark(table);
            output.to_json()?
        }
        OutputFormat::Csv => csv_output::benchmark_csv(&table)?,
    })
}

fn format_screen(label: &str, screen: &ScreenResult) -> String {
    if screen.removed.is_empty() {
        String::new()
    } else {
        format!("Removed from {}: {:?}\n", label, screen.removed)
    }
}

fn run_test(args: &TestArgs, config: &AnalysisConfig, format: OutputFormat) -> Result<String> {
    let kpi = args.query.kpi;
    let (dataset, filter) = load_query(&args.query)?;
    let (default_a, default_b) = kpi.comparison_groups();
    let expr_a = args.group_a.clone().unwrap_or(default_a);
    let expr_b = args.group_b.clone().unwrap_or(default_b);

    let sample = |expr: &str| -> Result<Vec<f64>> {
        let spec = filter
            .clone()
            .with_expr(expr)
            .with_context(|| format!("Invalid group expression '{}'", expr))?;
        let view = spec.apply(&dataset)?;
        Ok(view
            .observations()
            .iter()
            .map(|obs| obs.value / kpi.scale())
            .collect())
    };
    let screen_a = apply_screens(&sample(&expr_a)?, args.zscore, args.drops_a());
    let screen_b = apply_screens(&sample(&expr_b)?, args.zscore, args.drops_b());

    let direction = args.direction.unwrap_or_else(|| kpi.hypothesis_direction());
    let pair = compare_samples(&screen_a.kept, &screen_b.kept, direction, config)
        .with_context(|| format!("Cannot compare '{}' with '{}'", expr_a, expr_b))?
        .with_labels(expr_a.as_str(), expr_b.as_str());

    Ok(match format {
        OutputFormat::Text => format!(
            "{}Filter: {}\n{}{}\n{}",
            report::format_exclusions(&dataset.exclusions()),
            filter,
            format_screen(&expr_a, &screen_a),
            format_screen(&expr_b, &screen_b),
            pair.to_report_string()
        ),
        OutputFormat::Json => {
            let mut output = JsonOutput::new()
                .with_kpi(kpi.name())
                .with_filters(filter.describe())
                .with_exclusions(dataset.exclusions());
            if args.screens_requested() {
                output.set_screens(screen_a, screen_b);
            }
            output.set_test(pair);
            output.to_json()?
        }
        OutputFormat::Csv => csv_output::test_pair_csv(&pair)?,
    })
}

fn run_correlate(
    args: &CorrelateArgs,
    config: &AnalysisConfig,
    format: OutputFormat,
) -> Result<String> {
    let table = Table::from_path(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let subject = args
        .subject
        .as_deref()
        .map(|id| (args.subject_column.as_str(), id));
    let (x, y) = paired_columns(&table, &args.x, &args.y, subject)?;
    let correlation = pearson(&x, &y)
        .with_context(|| format!("Cannot correlate '{}' with '{}'", args.x, args.y))?;

    Ok(match format {
        OutputFormat::Text => {
            report::format_correlation(&correlation, config.significance_level)
        }
        OutputFormat::Json => {
            let mut output = JsonOutput::new();
            output.set_correlation(correlation);
            output.to_json()?
        }
        OutputFormat::Csv => csv_output::correlation_csv(&correlation)?,
    })
}

fn run_sectors(
    args: &SectorArgs,
    config: &AnalysisConfig,
    format: OutputFormat,
) -> Result<String> {
    let table = Table::from_path(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let field: BTreeSet<String> = args.field_teams().into_iter().collect();
    let laps = load_laps(&table, &LapSchema::default(), &field)?;
    let sessions = sessions_in(&laps.laps);
    let deficits = session_deficits(&laps.laps, &args.target, &sessions);

    let pair = if args.test {
        let measure = if args.percent {
            DeficitMeasure::Percent
        } else {
            DeficitMeasure::Seconds
        };
        let groups = deltas_by_sector_type(&deficits, measure);
        let technical = groups.get(&TrackCharacter::Technical).cloned().unwrap_or_default();
        let power = groups.get(&TrackCharacter::Power).cloned().unwrap_or_default();
        let pair = compare_samples(&technical, &power, Direction::Greater, config)
            .context("Cannot compare technical and power sector deficits")?
            .with_labels("technical sectors", "power sectors");
        Some(pair)
    } else {
        None
    };

    Ok(match format {
        OutputFormat::Text => {
            let mut text = report::format_deficits(&deficits);
            if let Some(pair) = &pair {
                text.push('\n');
                text.push_str(&pair.to_report_string());
            }
            text
        }
        OutputFormat::Json => {
            let mut output = JsonOutput::new().with_kpi("sector-delta");
            output.set_deficits(deficits);
            if let Some(pair) = pair {
                output.set_test(pair);
            }
            output.to_json()?
        }
        OutputFormat::Csv => csv_output::deficits_csv(&deficits)?,
    })
}

fn write_output(path: Option<&Path>, rendered: &str) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            print!("{}", rendered);
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(cli.debug);

    let config = cli.analysis_config().context("Invalid analysis configuration")?;

    let rendered = match &cli.command {
        Command::Stats(args) => run_stats(args, &config, cli.format)?,
        Command::Benchmark(args) => run_benchmark(args, &config, cli.format)?,
        Command::Test(args) => run_test(args, &config, cli.format)?,
        Command::Correlate(args) => run_correlate(args, &config, cli.format)?,
        Command::Sectors(args) => run_sectors(args, &config, cli.format)?,
    };

    write_output(cli.output.as_deref(), &rendered)
}
