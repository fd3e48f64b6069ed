//! Configuration settings for the planner

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub search: SearchConfig,
    pub solver: SolverConfig,
    pub input: InputConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub min_horizon: usize,
    pub max_horizon: usize,
    #[serde(default = "default_parallel_horizons")]
    pub parallel_horizons: usize,
}

fn default_parallel_horizons() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Budget for the whole search
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    pub problem_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
    #[serde(default)]
    pub save_cnf: bool,
    #[serde(default)]
    pub show_trace: bool,
    pub output_directory: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Text,
    Json,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            search: SearchConfig {
                min_horizon: 2,
                max_horizon: 30,
                parallel_horizons: 1,
            },
            solver: SolverConfig { timeout_seconds: 1000 },
            input: InputConfig {
                problem_file: PathBuf::from("input/problems/switch.yaml"),
            },
            output: OutputConfig {
                format: OutputFormat::Text,
                save_cnf: false,
                show_trace: false,
                output_directory: PathBuf::from("output/plans"),
            },
        }
    }
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to a YAML file
    pub fn to_file(&self, path: &PathBuf) -> Result<()> {
        let content = serde_yaml::to_string(self).context("Failed to serialize settings")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if self.search.min_horizon == 0 {
            anyhow::bail!("Minimum horizon must be at least 1");
        }

        if self.search.max_horizon < self.search.min_horizon {
            anyhow::bail!(
                "Maximum horizon {} is below minimum horizon {}",
                self.search.max_horizon,
                self.search.min_horizon
            );
        }

        if self.search.parallel_horizons == 0 {
            anyhow::bail!("Parallel horizons must be positive");
        }

        if self.solver.timeout_seconds == 0 {
            anyhow::bail!("Solver timeout must be positive");
        }

        if !self.input.problem_file.exists() {
            anyhow::bail!("Problem file does not exist: {}", self.input.problem_file.display());
        }

        Ok(())
    }

    /// Merge settings with command line overrides
    pub fn merge_with_cli(&mut self, cli_overrides: &CliOverrides) {
        if let Some(min_horizon) = cli_overrides.min_horizon {
            self.search.min_horizon = min_horizon;
        }
        if let Some(max_horizon) = cli_overrides.max_horizon {
            self.search.max_horizon = max_horizon;
        }
        if let Some(timeout) = cli_overrides.timeout_seconds {
            self.solver.timeout_seconds = timeout;
        }
        if let Some(ref problem_file) = cli_overrides.problem_file {
            self.input.problem_file = problem_file.clone();
        }
        if let Some(ref output_dir) = cli_overrides.output_dir {
            self.output.output_directory = output_dir.clone();
        }
        if cli_overrides.show_trace {
            self.output.show_trace = true;
        }
    }
}

/// Command line overrides for settings
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub min_horizon: Option<usize>,
    pub max_horizon: Option<usize>,
    pub timeout_seconds: Option<u64>,
    pub problem_file: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub show_trace: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn settings_with_problem(dir: &std::path::Path) -> Settings {
        let problem_file = dir.join("switch.yaml");
        std::fs::write(&problem_file, "name: switch\n").unwrap();

        let mut settings = Settings::default();
        settings.input.problem_file = problem_file;
        settings
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempdir().unwrap();
        let mut settings = settings_with_problem(dir.path());
        settings.search.max_horizon = 12;
        settings.output.format = OutputFormat::Json;

        let path = dir.path().join("config").join("default.yaml");
        settings.to_file(&path).unwrap();
        let loaded = Settings::from_file(&path).unwrap();

        assert_eq!(loaded.search.max_horizon, 12);
        assert_eq!(loaded.search.min_horizon, 2);
        assert_eq!(loaded.output.format, OutputFormat::Json);
    }

    #[test]
    fn test_optional_fields_default() {
        let yaml = r#"
search: { min_horizon: 1, max_horizon: 4 }
solver: { timeout_seconds: 10 }
input: { problem_file: p.yaml }
output: { format: text, output_directory: out }
"#;
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.search.parallel_horizons, 1);
        assert!(!settings.output.save_cnf);
        assert!(!settings.output.show_trace);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let dir = tempdir().unwrap();
        let valid = settings_with_problem(dir.path());
        assert!(valid.validate().is_ok());

        let mut s = valid.clone();
        s.search.min_horizon = 0;
        assert!(s.validate().is_err());

        let mut s = valid.clone();
        s.search.max_horizon = 1;
        assert!(s.validate().is_err());

        let mut s = valid.clone();
        s.solver.timeout_seconds = 0;
        assert!(s.validate().is_err());

        let mut s = valid.clone();
        s.search.parallel_horizons = 0;
        assert!(s.validate().is_err());

        let mut s = valid;
        s.input.problem_file = dir.path().join("missing.yaml");
        assert!(s.validate().unwrap_err().to_string().contains("does not exist"));
    }

    #[test]
    fn test_merge_with_cli() {
        let mut settings = Settings::default();
        let overrides = CliOverrides {
            max_horizon: Some(7),
            timeout_seconds: Some(5),
            problem_file: Some(PathBuf::from("other.yaml")),
            show_trace: true,
            ..CliOverrides::default()
        };

        settings.merge_with_cli(&overrides);

        assert_eq!(settings.search.min_horizon, 2);
        assert_eq!(settings.search.max_horizon, 7);
        assert_eq!(settings.solver.timeout_seconds, 5);
        assert_eq!(settings.input.problem_file, PathBuf::from("other.yaml"));
        assert!(settings.output.show_trace);
    }
}
