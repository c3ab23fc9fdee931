use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use qds_battery_lab::{
    analyze_with, run_population, simulate_discharge, summarize_population, DischargeConfig,
    DischargeSummary, LabConfig, PopulationConfig, PopulationSummary, ResidualStats,
    ResidualThresholds,
};

const DEFAULT_CONFIG_FILE: &str = "qds_battery_lab.json";

#[derive(Debug, Parser)]
#[command(name = "qds_battery_lab")]
#[command(about = "Battery-health degradation under white and AR(1) noise")]
struct Cli {
    /// JSON configuration; defaults to ./qds_battery_lab.json when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Monte Carlo lifetimes under white vs. colored noise.
    Lifetime(LifetimeArgs),
    /// Single discharge curve with residual analysis.
    Discharge(DischargeArgs),
}

#[derive(Debug, Args)]
struct LifetimeArgs {
    #[arg(long)]
    base_drain: Option<f64>,
    #[arg(long)]
    noise_amplitude: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    rho: Option<f64>,
    #[arg(long)]
    units: Option<usize>,
    #[arg(long)]
    max_steps: Option<usize>,
    #[arg(long, allow_hyphen_values = true)]
    fail_threshold: Option<f64>,
    #[arg(long)]
    bins: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Debug, Args)]
struct DischargeArgs {
    #[arg(long)]
    duration_hours: Option<f64>,
    #[arg(long)]
    drain_rate: Option<f64>,
    #[arg(long)]
    noise_amplitude: Option<f64>,
    #[arg(long)]
    tau_minutes: Option<f64>,
    #[arg(long)]
    resolution_minutes: Option<f64>,
    #[arg(long)]
    seed: Option<u64>,
    /// Boost the noise amplitude into a more chaotic regime.
    #[arg(long, default_value_t = false)]
    chaotic: bool,
}

#[derive(Debug, Serialize)]
struct LifetimeReport {
    config: PopulationConfig,
    summary: PopulationSummary,
    white_sample: Vec<f64>,
    colored_sample: Vec<f64>,
}

#[derive(Debug, Serialize)]
struct DischargeReport {
    config: DischargeConfig,
    time_hours: Vec<f64>,
    health: Vec<f64>,
    summary: DischargeSummary,
    residual: ResidualStats,
    interpretation: &'static str,
}

fn main() {
    if let Err(error) = try_main() {
        eprintln!("qds_battery_lab failed: {error:#}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = load_config(cli.config.as_deref())?;
    let report = match cli.command {
        Command::Lifetime(args) => {
            let population = args.apply(config.population);
            serde_json::to_string_pretty(&lifetime_report(population)?)?
        }
        Command::Discharge(args) => {
            let discharge = args.apply(config.discharge);
            serde_json::to_string_pretty(&discharge_report(discharge, &config.residual)?)?
        }
    };

    println!("{report}");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(path: Option<&Path>) -> Result<LabConfig> {
    let config = if let Some(path) = path {
        LabConfig::from_json_file(path)
            .with_context(|| format!("failed to load config: {}", path.display()))?
    } else if Path::new(DEFAULT_CONFIG_FILE).exists() {
        LabConfig::from_json_file(Path::new(DEFAULT_CONFIG_FILE))
            .with_context(|| format!("failed to load config: {DEFAULT_CONFIG_FILE}"))?
    } else {
        LabConfig::default()
    };
    config.validate()?;
    Ok(config)
}

fn lifetime_report(config: PopulationConfig) -> Result<LifetimeReport> {
    info!(units = config.unit_count, seed = config.seed, "running lifetime simulation");
    let result = run_population(&config).context("population run failed")?;
    let summary = summarize_population(&result, config.histogram_bins)?;

    Ok(LifetimeReport {
        config,
        summary,
        white_sample: result.white.sample_trajectory,
        colored_sample: result.colored.sample_trajectory,
    })
}

fn discharge_report(
    config: DischargeConfig,
    thresholds: &ResidualThresholds,
) -> Result<DischargeReport> {
    info!(seed = config.seed, "running discharge simulation");
    let trajectory = simulate_discharge(&config).context("discharge run failed")?;
    let residual = analyze_with(&trajectory, thresholds);

    Ok(DischargeReport {
        summary: trajectory.summary(),
        time_hours: trajectory.time().to_vec(),
        health: trajectory.health().to_vec(),
        interpretation: residual.pattern.description(),
        residual,
        config,
    })
}

impl LifetimeArgs {
    fn apply(self, mut config: PopulationConfig) -> PopulationConfig {
        if let Some(v) = self.base_drain {
            config.base_drain_per_step = v;
        }
        if let Some(v) = self.noise_amplitude {
            config.noise_amplitude = v;
        }
        if let Some(v) = self.rho {
            config.rho = v;
        }
        if let Some(v) = self.units {
            config.unit_count = v;
        }
        if let Some(v) = self.max_steps {
            config.max_steps = v;
        }
        if let Some(v) = self.fail_threshold {
            config.fail_threshold = v;
        }
        if let Some(v) = self.bins {
            config.histogram_bins = v;
        }
        if let Some(v) = self.seed {
            config.seed = v;
        }
        config
    }
}

impl DischargeArgs {
    fn apply(self, mut config: DischargeConfig) -> DischargeConfig {
        if let Some(v) = self.duration_hours {
            config.duration_hours = v;
        }
        if let Some(v) = self.drain_rate {
            config.drain_rate_per_hour = v;
        }
        if let Some(v) = self.noise_amplitude {
            config.noise_amplitude = v;
        }
        if let Some(v) = self.tau_minutes {
            config.correlation_tau_minutes = v;
        }
        if let Some(v) = self.resolution_minutes {
            config.step_resolution_minutes = v;
        }
        if let Some(v) = self.seed {
            config.seed = v;
        }
        if self.chaotic {
            config.chaotic()
        } else {
            config
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn lifetime_accepts_negative_rho() {
        let cli = Cli::try_parse_from(["qds_battery_lab", "lifetime", "--rho", "-0.5"])
            .expect("negative rho parses");
        let Command::Lifetime(args) = cli.command else {
            panic!("expected lifetime subcommand");
        };
        assert_eq!(args.rho, Some(-0.5));
        assert_eq!(args.apply(Default::default()).rho, -0.5);
    }
}
