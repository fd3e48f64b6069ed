//! Main CLI application for the SAT planner

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use satplan::{
    config::{CliOverrides, Settings},
    planner::{HorizonSearch, PlanValidator, SearchOptions, SearchOutcome, Solution},
    problem::{create_example_problems, load_problem_from_file},
    sat::SatEncoder,
    utils::{ColorOutput, PlanFormatter},
};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "satplan")]
#[command(about = "Bounded-horizon classical planner backed by a SAT solver")]
#[command(version = "0.1.0")]
struct Cli {
    /// Log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for the shortest plan of a problem
    Solve {
        /// Configuration file path
        #[arg(short, long, default_value = "config/default.yaml")]
        config: PathBuf,

        /// Problem file (overrides config)
        #[arg(short, long)]
        problem: Option<PathBuf>,

        /// First horizon to try (overrides config)
        #[arg(long)]
        min_horizon: Option<usize>,

        /// Last horizon to try (overrides config)
        #[arg(long)]
        max_horizon: Option<usize>,

        /// Budget for the whole search in seconds (overrides config)
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Output directory (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Show fluent values at every step
        #[arg(long)]
        show_trace: bool,
    },

    /// Write the CNF instance of one horizon
    Encode {
        /// Problem file
        #[arg(short, long)]
        problem: PathBuf,

        /// Horizon to encode
        #[arg(long)]
        horizon: usize,

        /// Output file; stdout when absent
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show problem statistics and encoding size per horizon
    Analyze {
        /// Configuration file path
        #[arg(short, long, default_value = "config/default.yaml")]
        config: PathBuf,

        /// Problem file
        #[arg(short, long)]
        problem: PathBuf,
    },

    /// Check a saved plan against its problem
    Validate {
        /// Problem file
        #[arg(short, long)]
        problem: PathBuf,

        /// Saved solution (JSON)
        #[arg(long)]
        plan: PathBuf,

        /// Show the states visited by the plan
        #[arg(long)]
        show_states: bool,
    },

    /// Create example configuration and problem files
    Setup {
        /// Directory to create files in
        #[arg(short, long, default_value = ".")]
        directory: PathBuf,

        /// Force overwrite existing files
        #[arg(short, long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Solve {
            config,
            problem,
            min_horizon,
            max_horizon,
            timeout,
            output,
            show_trace,
        } => {
            let overrides = CliOverrides {
                min_horizon,
                max_horizon,
                timeout_seconds: timeout,
                problem_file: problem,
                output_dir: output,
                show_trace,
            };
            solve_command(config, overrides, cli.verbose > 0)
        }
        Commands::Encode { problem, horizon, output } => encode_command(problem, horizon, output),
        Commands::Analyze { config, problem } => analyze_command(config, problem),
        Commands::Validate {
            problem,
            plan,
            show_states,
        } => validate_command(problem, plan, show_states),
        Commands::Setup { directory, force } => setup_command(directory, force),
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(config_path: &PathBuf) -> Result<Settings> {
    if config_path.exists() {
        Settings::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))
    } else {
        println!(
            "{}",
            ColorOutput::warning(&format!("Config file {} not found, using defaults", config_path.display()))
        );
        Ok(Settings::default())
    }
}

fn solve_command(config_path: PathBuf, overrides: CliOverrides, verbose: bool) -> Result<()> {
    println!("{}", ColorOutput::info("Starting SAT planner"));

    let mut settings = load_settings(&config_path)?;
    settings.merge_with_cli(&overrides);
    settings.validate().context("Configuration validation failed")?;

    let problem = load_problem_from_file(&settings.input.problem_file)
        .with_context(|| format!("Failed to load problem from {}", settings.input.problem_file.display()))?;

    if verbose {
        println!("{}", problem.statistics());
        println!(
            "Horizons {}..={}, budget {}s",
            settings.search.min_horizon, settings.search.max_horizon, settings.solver.timeout_seconds
        );
        println!();
    }

    let start_time = Instant::now();
    let mut search = HorizonSearch::new(&problem, SearchOptions::from_settings(&settings));
    let outcome = search.run().context("Horizon search failed")?;

    match outcome {
        SearchOutcome::Found(solution) => {
            println!(
                "{}",
                ColorOutput::success(&format!(
                    "Found a plan of {} actions at horizon {} in {:.3}s",
                    solution.plan.len(),
                    solution.horizon,
                    start_time.elapsed().as_secs_f64()
                ))
            );
            println!("\n{}", PlanFormatter::format_solution(&solution, &problem, settings.output.show_trace));

            if verbose {
                println!("{}", PlanFormatter::format_attempts(&solution.attempts));
            }

            let path = PlanFormatter::save_plan(&solution, &problem, &settings.output.output_directory, settings.output.format)
                .context("Failed to save plan")?;
            println!("{}", ColorOutput::success(&format!("Plan saved to {}", path.display())));
        }
        SearchOutcome::Exhausted { attempts } => {
            println!(
                "{}",
                ColorOutput::warning(&format!("No plan found up to horizon {}", settings.search.max_horizon))
            );
            if verbose {
                println!("\n{}", PlanFormatter::format_attempts(&attempts));
            }
        }
    }

    Ok(())
}

fn encode_command(problem_path: PathBuf, horizon: usize, output: Option<PathBuf>) -> Result<()> {
    if horizon == 0 {
        anyhow::bail!("Horizon must be at least 1");
    }

    let problem = load_problem_from_file(&problem_path)
        .with_context(|| format!("Failed to load problem from {}", problem_path.display()))?;
    let encoding = SatEncoder::new(&problem).encode(horizon);

    match output {
        Some(path) => {
            let file = std::fs::File::create(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            encoding
                .instance
                .write_to(std::io::BufWriter::new(file))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{}", encoding.statistics(&problem));
            println!("{}", ColorOutput::success(&format!("CNF written to {}", path.display())));
        }
        None => {
            encoding
                .instance
                .write_to(std::io::stdout().lock())
                .context("Failed to write CNF to stdout")?;
        }
    }

    Ok(())
}

fn analyze_command(config_path: PathBuf, problem_path: PathBuf) -> Result<()> {
    println!("{}", ColorOutput::info("Analyzing problem..."));

    let settings = load_settings(&config_path)?;
    let problem = load_problem_from_file(&problem_path)
        .with_context(|| format!("Failed to load problem from {}", problem_path.display()))?;

    println!("{}", problem.statistics());

    let encoder = SatEncoder::new(&problem);
    println!("{}", ColorOutput::header("Encoding size per horizon:"));
    for horizon in settings.search.min_horizon.max(1)..=settings.search.max_horizon {
        println!("{}", encoder.estimate(horizon));
    }

    let widest = encoder.estimate(settings.search.max_horizon.max(1));
    println!("\nLargest attempt breakdown:\n{}", widest.breakdown);

    Ok(())
}

fn validate_command(problem_path: PathBuf, plan_path: PathBuf, show_states: bool) -> Result<()> {
    println!("{}", ColorOutput::info("Validating plan..."));

    let problem = load_problem_from_file(&problem_path)
        .with_context(|| format!("Failed to load problem from {}", problem_path.display()))?;
    let solution = Solution::load_from_file(&plan_path)
        .with_context(|| format!("Failed to load plan from {}", plan_path.display()))?;

    let result = PlanValidator::new(&problem).validate(&solution.plan);
    println!("{}", result);

    if show_states {
        println!("States:");
        for (i, state) in result.states.iter().enumerate() {
            let names: Vec<&str> = state.true_fluents().map(|f| problem.fluent_name(f)).collect();
            println!("  {:3}: {{{}}}", i, names.join(", "));
        }
    }

    if !result.is_valid {
        println!("{}", ColorOutput::error("Plan is invalid"));
        anyhow::bail!(
            "plan {} does not solve {}: {}",
            plan_path.display(),
            problem.name(),
            result.error_message().unwrap_or_else(|| "goal not reached".to_string())
        );
    }

    println!("{}", ColorOutput::success("Plan is valid"));
    Ok(())
}

fn setup_command(directory: PathBuf, force: bool) -> Result<()> {
    println!("{}", ColorOutput::info("Setting up project structure..."));

    let config_dir = directory.join("config");
    let input_dir = directory.join("input/problems");
    let output_dir = directory.join("output/plans");

    for dir in [&config_dir, &input_dir, &output_dir] {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }

    let config_path = config_dir.join("default.yaml");
    if !config_path.exists() || force {
        Settings::default()
            .to_file(&config_path)
            .context("Failed to create default configuration")?;
        println!("Created: {}", config_path.display());
    } else {
        println!("Skipped: {} (already exists)", config_path.display());
    }

    create_example_problems(&input_dir).context("Failed to create example problems")?;
    println!("Created example problems in: {}", input_dir.display());

    let examples_dir = config_dir.join("examples");
    std::fs::create_dir_all(&examples_dir)?;

    let mut delivery_config = Settings::default();
    delivery_config.search.max_horizon = 10;
    delivery_config.input.problem_file = PathBuf::from("input/problems/delivery.yaml");
    delivery_config.output.show_trace = true;
    delivery_config.to_file(&examples_dir.join("delivery.yaml"))?;

    let mut parallel_config = Settings::default();
    parallel_config.search.parallel_horizons = 4;
    parallel_config.input.problem_file = PathBuf::from("input/problems/blocks.yaml");
    parallel_config.output.save_cnf = true;
    parallel_config.output.format = satplan::config::OutputFormat::Json;
    parallel_config.to_file(&examples_dir.join("parallel.yaml"))?;

    println!("Created example configurations in: {}", examples_dir.display());

    println!("\n{}", ColorOutput::success("Setup complete!"));
    println!("\nNext steps:");
    println!("1. Edit configuration files in {}", config_dir.display());
    println!("2. Add your problems to {}", input_dir.display());
    println!("3. Run: cargo run -- solve --config config/default.yaml");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from([
            "satplan",
            "-vv",
            "solve",
            "--config",
            "test.yaml",
            "--max-horizon",
            "5",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Solve { max_horizon, min_horizon, .. } => {
                assert_eq!(max_horizon, Some(5));
                assert_eq!(min_horizon, None);
            }
            _ => panic!("expected solve command"),
        }
    }

    #[test]
    fn test_encode_requires_horizon() {
        assert!(Cli::try_parse_from(["satplan", "encode", "--problem", "p.yaml"]).is_err());
    }

    #[test]
    fn test_setup_command() {
        let temp_dir = tempdir().unwrap();
        setup_command(temp_dir.path().to_path_buf(), false).unwrap();

        assert!(temp_dir.path().join("config/default.yaml").exists());
        assert!(temp_dir.path().join("config/examples/parallel.yaml").exists());
        assert!(temp_dir.path().join("input/problems/delivery.yaml").exists());
        assert!(temp_dir.path().join("output/plans").exists());
    }

    #[test]
    fn test_encode_command_writes_file() {
        let temp_dir = tempdir().unwrap();
        let problems = temp_dir.path().join("problems");
        create_example_problems(&problems).unwrap();

        let out = temp_dir.path().join("switch.cnf");
        encode_command(problems.join("switch.yaml"), 2, Some(out.clone())).unwrap();

        let text = std::fs::read_to_string(out).unwrap();
        assert!(text.lines().any(|l| l.starts_with("p cnf ")));
        assert!(encode_command(problems.join("switch.yaml"), 0, None).is_err());
    }

    #[test]
    fn test_validate_command_rejects_invalid_plan() {
        let temp_dir = tempdir().unwrap();
        let problems = temp_dir.path().join("problems");
        create_example_problems(&problems).unwrap();
        let problem_path = problems.join("switch.yaml");

        let problem = load_problem_from_file(&problem_path).unwrap();
        let outcome = HorizonSearch::new(&problem, SearchOptions::default()).run().unwrap();
        let mut solution = outcome.solution().unwrap().clone();

        let valid = temp_dir.path().join("valid.json");
        solution.save_to_file(&valid).unwrap();
        validate_command(problem_path.clone(), valid, true).unwrap();

        // Nothing turns the switch on
        solution.plan = Default::default();
        let invalid = temp_dir.path().join("invalid.json");
        solution.save_to_file(&invalid).unwrap();
        let error = validate_command(problem_path, invalid, false).unwrap_err();
        assert!(error.to_string().contains("does not solve"));
    }
}
