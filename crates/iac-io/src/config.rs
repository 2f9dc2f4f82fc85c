use anyhow::Context;
use clap::{Args, ValueEnum};
use iac_cluster::KMeansConfig;
use iac_core::{IacError, WeightPolicy, F};
use iac_sampler::TrialSpec;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How edge activation is modelled for a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    /// Live-edge cascade, `1 / indegree` weights.
    #[value(name = "weighted")]
    Weighted,
    /// Live-edge cascade, `1 / max indegree` weights.
    #[value(name = "uniform")]
    Uniform,
    /// Live-edge cascade, random weights.
    #[value(name = "random")]
    Random,
    /// Live-edge cascade, weights from `{0.1, 0.01, 0.001}`.
    #[value(name = "trivalency")]
    Trivalency,
    /// Live-edge cascade on the weights stored in the graph document.
    #[value(name = "preset")]
    Preset,
    /// Linear threshold cascade; edge weights unused.
    #[value(name = "threshold")]
    Threshold,
}

impl PolicyKind {
    /// The weight policy to apply, if any.
    pub fn weight_policy(self) -> Option<WeightPolicy> {
        match self {
            PolicyKind::Weighted => Some(WeightPolicy::Weighted),
            PolicyKind::Uniform => Some(WeightPolicy::Uniform),
            PolicyKind::Random => Some(WeightPolicy::Random),
            PolicyKind::Trivalency => Some(WeightPolicy::Trivalency),
            PolicyKind::Preset | PolicyKind::Threshold => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PolicyKind::Weighted => "weighted",
            PolicyKind::Uniform => "uniform",
            PolicyKind::Random => "random",
            PolicyKind::Trivalency => "trivalency",
            PolicyKind::Preset => "preset",
            PolicyKind::Threshold => "threshold",
        }
    }
}

impl std::fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything one `simulate` or `multiplex` run needs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub dataset: String,
    pub policy: PolicyKind,
    pub trials: usize,
    pub clusters: usize,
    pub workers: usize,
    pub seed: u64,
    /// Layer consensus threshold; multiplex runs only.
    pub threshold: Option<F>,
    /// Directory holding `<dataset>.json` and friends.
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub kmeans: KMeansConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            dataset: String::new(),
            policy: PolicyKind::Weighted,
            trials: 10_000,
            clusters: 2,
            workers: 8,
            seed: 42,
            threshold: None,
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("output"),
            kmeans: KMeansConfig::default(),
        }
    }
}

impl RunConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = serde_json::from_str(&json)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> iac_core::Result<()> {
        if self.dataset.is_empty() {
            return Err(IacError::Configuration("dataset name is empty".into()));
        }
        if self.trials == 0 {
            return Err(IacError::Configuration("trial count must be positive".into()));
        }
        if self.workers == 0 {
            return Err(IacError::Configuration("worker count must be positive".into()));
        }
        if self.clusters == 0 {
            return Err(IacError::Configuration("cluster count must be positive".into()));
        }
        if let Some(t) = self.threshold {
            if !(0.0..=1.0).contains(&t) {
                return Err(IacError::Configuration(format!(
                    "consensus threshold {t} outside [0, 1]"
                )));
            }
        }
        Ok(())
    }

    pub fn trial_spec(&self) -> TrialSpec {
        TrialSpec::new(self.trials, self.workers, self.seed)
    }

    /// Directory for this run's artifacts: `<output_dir>/<dataset>/<policy>`.
    pub fn run_dir(&self) -> PathBuf {
        self.output_dir.join(&self.dataset).join(self.policy.name())
    }
}

/// Run flags shared by `simulate` and `multiplex`. Any flag given overrides
/// the value from `--config`.
#[derive(Args, Clone, Debug, Default)]
pub struct RunArgs {
    /// JSON run configuration
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Dataset name, resolved inside the data directory
    #[arg(long)]
    pub dataset: Option<String>,

    /// Activation model
    #[arg(long, value_enum)]
    pub policy: Option<PolicyKind>,

    /// Number of cascade trials
    #[arg(long)]
    pub trials: Option<usize>,

    /// Number of clusters
    #[arg(long, short = 'k')]
    pub clusters: Option<usize>,

    /// Worker threads
    #[arg(long)]
    pub workers: Option<usize>,

    /// Run seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Layer consensus threshold in [0, 1]
    #[arg(long)]
    pub threshold: Option<F>,

    /// Directory holding dataset files
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Output directory
    #[arg(long)]
    pub out: Option<PathBuf>,
}

impl RunArgs {
    /// Load `--config` (or defaults) and apply the flags on top.
    pub fn resolve(&self) -> anyhow::Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::load(path)?,
            None => RunConfig::default(),
        };
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&self, config: &mut RunConfig) {
        if let Some(dataset) = &self.dataset {
            config.dataset = dataset.clone();
        }
        if let Some(policy) = self.policy {
            config.policy = policy;
        }
        if let Some(trials) = self.trials {
            config.trials = trials;
        }
        if let Some(clusters) = self.clusters {
            config.clusters = clusters;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if self.threshold.is_some() {
            config.threshold = self.threshold;
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(out) = &self.out {
            config.output_dir = out.clone();
        }
    }
}
