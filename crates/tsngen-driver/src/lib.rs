//! Settings-file loading and the end-to-end generate-and-emit routine behind the `tsngen` CLI.

use std::path::{Path, PathBuf};

use omnet_frontend::{EmittedArtifacts, OmnetScenario};
use tsngen_core::{Scenario, ScenarioSpec};

/// A complete tool configuration: the generation specification plus output and toggle settings.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Config {
    /// The generation specification (topology, traffic registry, seed).
    #[serde(flatten)]
    pub scenario: ScenarioSpec,
    /// Where to write the artifacts.
    pub output_dir: PathBuf,
    /// NED network name; defaults to "TsnNetwork".
    #[serde(default)]
    pub network_name: Option<String>,
    /// Whether to write the NED/INI artifacts.
    #[serde(default = "default_true")]
    pub emit_artifacts: bool,
    /// Whether to hand the scenario to the topology renderer.
    #[serde(default)]
    pub visualize: bool,
}

fn default_true() -> bool {
    true
}

/// Loads a [`Config`] from a settings file and runs it.
pub fn run_from_file(path: impl AsRef<Path>) -> Result<RunOutput, Error> {
    let config = load_config(path)?;
    run(config)
}

/// Reads a [`Config`] from a settings file. The format is chosen by extension; only JSON is
/// supported.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, Error> {
    let path = path.as_ref();
    let config: Config = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => {
            let contents = std::fs::read_to_string(path)?;
            serde_json::from_str(&contents)?
        }
        _ => return Err(Error::UnknownFileType(path.into())),
    };
    Ok(config)
}

/// Generates the scenario and, if enabled, emits its artifacts.
pub fn run(config: Config) -> Result<RunOutput, Error> {
    let scenario = tsngen_core::run::run(config.scenario)?;
    if config.visualize {
        // The renderer is an external consumer of the read-only scenario; the generator only
        // exposes it.
        log::info!(
            "scenario ready for rendering: {} switches, {} end systems, {} links, {} streams",
            scenario.network().nr_switches(),
            scenario.network().nr_end_systems(),
            scenario.network().nr_links(),
            scenario.streams().len(),
        );
    }
    let artifacts = if config.emit_artifacts {
        let emitter = OmnetScenario::builder()
            .scenario(&scenario)
            .output_dir(&config.output_dir)
            .network_name(config.network_name.as_deref().unwrap_or("TsnNetwork"))
            .build();
        Some(emitter.emit()?)
    } else {
        None
    };
    Ok(RunOutput {
        scenario,
        artifacts,
    })
}

/// What a run produced: the scenario itself and, when emission is enabled, the artifact paths.
#[derive(Debug)]
pub struct RunOutput {
    /// The generated scenario.
    pub scenario: Scenario,
    /// Paths of the written artifacts, if emission was enabled.
    pub artifacts: Option<EmittedArtifacts>,
}

/// Driver error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The settings file has an unsupported extension.
    #[error("unknown file type: {0}")]
    UnknownFileType(PathBuf),

    /// The settings file is not valid JSON.
    #[error("JSON error")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error")]
    Io(#[from] std::io::Error),

    /// The generation pipeline failed.
    #[error("failed to generate scenario")]
    Generate(#[from] tsngen_core::Error),

    /// Artifact emission failed.
    #[error("failed to emit artifacts")]
    Emit(#[from] omnet_frontend::Error),
}
