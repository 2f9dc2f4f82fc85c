use crate::config::{RunArgs, RunConfig};
use crate::pipeline::{run_multiplex, run_single, save_run, RunArtifacts};
use crate::provider::{load_ground_truth, GraphProvider, JsonGraphProvider};
use crate::report::{read_clusters, Agreement, RunReport};
use crate::{read_ia_parquet, RunManifest};
use anyhow::Context;
use clap::{Parser, Subcommand};
use iac_cluster::{
    best_by_silhouette, elbow_curve, normalize_offdiag, silhouette_curve, KMeans, KMeansConfig,
};
use std::path::PathBuf;
use tracing::warn;

#[derive(Parser)]
#[command(name = "iac")]
#[command(about = "IAC - Information-Access Clustering")]
#[command(long_about = "Monte Carlo information-access matrices under live-edge cascades, clustered with k-means")]
pub struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Simulate one graph, cluster, and write run artifacts
    Simulate {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Simulate a multiplex dataset with layer consensus
    Multiplex {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Agreement between cluster documents or against ground truth
    Compare {
        /// Cluster document (clusters.json)
        #[arg(long)]
        a: PathBuf,

        /// Second cluster document
        #[arg(long, conflicts_with = "truth")]
        b: Option<PathBuf>,

        /// Ground-truth labels, one per line
        #[arg(long)]
        truth: Option<PathBuf>,
    },

    /// Elbow and silhouette scans over k for a saved IA matrix
    ChooseK {
        /// IA matrix (ia.parquet)
        #[arg(long)]
        ia: PathBuf,

        /// Largest k to try
        #[arg(long, default_value = "10")]
        k_max: usize,

        /// k-means seed
        #[arg(long, default_value = "1")]
        seed: u64,
    },
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Simulate { run } => run_simulate_command(&run),
        Commands::Multiplex { run } => run_multiplex_command(&run),
        Commands::Compare { a, b, truth } => run_compare_command(a, b, truth),
        Commands::ChooseK { ia, k_max, seed } => run_choose_k_command(ia, k_max, seed),
    }
}

fn print_header(title: &str, config: &RunConfig) {
    println!("{title}");
    println!("{}", "=".repeat(title.len()));
    println!("Dataset: {}", config.dataset);
    println!("Policy: {}", config.policy);
    println!("Trials: {}", config.trials);
    println!("Workers: {}", config.workers);
    println!("Clusters: {}", config.clusters);
    println!("Seed: {}", config.seed);
    if let Some(t) = config.threshold {
        println!("Threshold: {t}");
    }
    println!("Output: {:?}", config.run_dir());
}

fn print_summary(artifacts: &RunArtifacts, report: &RunReport) {
    println!();
    println!("Summary Statistics:");
    println!("==================");
    println!("Nodes: {}", artifacts.ia.nrows());
    println!("Time per trial: {:.6} s", artifacts.time_per_trial);
    match artifacts.average_edge_weight {
        Some(w) => println!("Average edge weight: {w:.6}"),
        None => println!("Average edge weight: n/a"),
    }
    for (label, size) in &report.cluster_sizes {
        let pct = report.cluster_percentages.get(label).copied().unwrap_or(0.0);
        println!("Cluster {label}: {size} nodes ({pct:.1}%)");
    }
    if let Some(gt) = &report.ground_truth {
        println!("ARI vs ground truth: {:.4}", gt.adjusted_rand_index);
        println!("NMI vs ground truth: {:.4}", gt.normalized_mutual_info);
    }
}

fn finish_run(
    config: &RunConfig,
    provider: &JsonGraphProvider,
    manifest: RunManifest,
    artifacts: RunArtifacts,
) -> anyhow::Result<()> {
    let mut report = RunReport::new(&config.dataset, config.policy.name(), &artifacts);
    if let Some(truth) = provider.ground_truth(&config.dataset)? {
        match report.clone().with_ground_truth(&truth) {
            Ok(scored) => report = scored,
            Err(e) => warn!(error = %e, "ground truth ignored"),
        }
    }

    let files = save_run(&config.run_dir(), &manifest, &artifacts, &report)?;
    print_summary(&artifacts, &report);
    println!("Wrote {}", files.matrix.display());
    println!("Wrote {}", files.report.display());
    println!("✓ Run completed successfully!");
    Ok(())
}

pub fn run_simulate_command(args: &RunArgs) -> anyhow::Result<()> {
    let config = args.resolve()?;
    print_header("IAC Simulation", &config);

    let provider = JsonGraphProvider::new(&config.data_dir, config.seed);
    let graph = provider.load(&config.dataset)?;
    let artifacts = run_single(&config, &graph)?;
    let manifest = RunManifest::new(&config, "single", graph.num_nodes(), 1);
    finish_run(&config, &provider, manifest, artifacts)
}

pub fn run_multiplex_command(args: &RunArgs) -> anyhow::Result<()> {
    let config = args.resolve()?;
    print_header("IAC Multiplex Simulation", &config);

    let provider = JsonGraphProvider::new(&config.data_dir, config.seed);
    let layers = provider.load_layers(&config.dataset)?;
    let artifacts = run_multiplex(&config, &layers)?;
    let n = layers.first().map_or(0, |g| g.num_nodes());
    let manifest = RunManifest::new(&config, "multiplex", n, layers.len());
    finish_run(&config, &provider, manifest, artifacts)
}

pub fn run_compare_command(
    a: PathBuf,
    b: Option<PathBuf>,
    truth: Option<PathBuf>,
) -> anyhow::Result<()> {
    let left = read_clusters(&a)?.to_labels()?;
    let (right, against) = match (b, truth) {
        (Some(b), _) => (read_clusters(&b)?.to_labels()?, b),
        (None, Some(t)) => (load_ground_truth(&t)?, t),
        (None, None) => anyhow::bail!("give --b or --truth to compare against"),
    };

    let agreement = Agreement::between(&left, &right)
        .with_context(|| format!("comparing {} with {}", a.display(), against.display()))?;
    println!("Comparing {} with {}", a.display(), against.display());
    println!("Adjusted Rand index: {:.4}", agreement.adjusted_rand_index);
    println!("Normalized mutual information: {:.4}", agreement.normalized_mutual_info);
    Ok(())
}

pub fn run_choose_k_command(ia: PathBuf, k_max: usize, seed: u64) -> anyhow::Result<()> {
    let matrix = read_ia_parquet(&ia)?;
    let normalized = normalize_offdiag(&matrix)?;
    let kmeans = KMeans::new(KMeansConfig {
        seed,
        ..KMeansConfig::default()
    });

    let k_max = k_max.min(normalized.nrows());
    println!("Elbow (inertia / n):");
    for point in elbow_curve(&normalized, k_max, &kmeans)? {
        println!("  k = {:>3}: {:.6}", point.k, point.score);
    }

    let s_max = k_max.min(normalized.nrows().saturating_sub(1));
    if s_max >= 2 {
        let curve = silhouette_curve(&normalized, s_max, &kmeans)?;
        println!("Silhouette:");
        for point in &curve {
            println!("  k = {:>3}: {:.4}", point.k, point.score);
        }
        if let Some(k) = best_by_silhouette(&curve) {
            println!("Best k by silhouette: {k}");
        }
    }
    Ok(())
}
