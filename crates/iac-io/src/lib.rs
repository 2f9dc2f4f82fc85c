use anyhow::Context;
use arrow::array::{Array, Float64Array, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use iac_core::F;
use iac_sampler::IaMatrix;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub mod cli;
pub mod config;
pub mod pipeline;
pub mod provider;
pub mod report;

pub use config::{PolicyKind, RunArgs, RunConfig};
pub use pipeline::{run_multiplex, run_single, RunArtifacts};
pub use provider::{load_ground_truth, GraphDocument, GraphProvider, JsonGraphProvider, LayerManifest};
pub use report::{read_clusters, write_clusters, RunReport};

/// Run manifest for reproducing a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: String,
    pub timestamp: String,
    pub dataset: String,
    pub mode: String, // "single" | "multiplex"
    pub policy: String,
    pub seed: u64,
    pub trials: usize,
    pub workers: usize,
    pub clusters: usize,
    pub threshold: Option<F>,
    pub num_nodes: usize,
    pub num_layers: usize,
    pub commit_hash: Option<String>,
    pub rust_version: String,
}

impl RunManifest {
    pub fn new(config: &RunConfig, mode: &str, num_nodes: usize, num_layers: usize) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            dataset: config.dataset.clone(),
            mode: mode.to_string(),
            policy: config.policy.name().to_string(),
            seed: config.seed,
            trials: config.trials,
            workers: config.workers,
            clusters: config.clusters,
            threshold: config.threshold,
            num_nodes,
            num_layers,
            commit_hash: get_git_commit(),
            rust_version: get_rust_version(),
        }
    }

    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let manifest = serde_json::from_str(&json)?;
        Ok(manifest)
    }
}

/// Parquet table for an IA matrix: a `row` column with the activated node
/// id, then one `s{j}` column per seed `j`.
pub struct IaParquetWriter {
    writer: ArrowWriter<File>,
    schema: Arc<Schema>,
    n: usize,
}

impl IaParquetWriter {
    pub fn new(file_path: &Path, n: usize) -> anyhow::Result<Self> {
        let file = File::create(file_path)
            .with_context(|| format!("creating {}", file_path.display()))?;

        let mut fields = vec![Field::new("row", DataType::UInt64, false)];
        for j in 0..n {
            fields.push(Field::new(format!("s{j}"), DataType::Float64, false));
        }

        let schema = Arc::new(Schema::new(fields));
        let writer = ArrowWriter::try_new(file, schema.clone(), None)?;

        Ok(Self { writer, schema, n })
    }

    pub fn write_matrix(&mut self, ia: &IaMatrix) -> anyhow::Result<()> {
        anyhow::ensure!(
            ia.shape() == (self.n, self.n),
            "matrix is {:?}, writer expects {n}x{n}",
            ia.shape(),
            n = self.n
        );
        if self.n == 0 {
            return Ok(());
        }

        let rows: Vec<u64> = (0..self.n as u64).collect();
        let mut arrays: Vec<Arc<dyn Array>> = vec![Arc::new(UInt64Array::from(rows))];
        for j in 0..self.n {
            let column: Vec<F> = ia.column(j).iter().copied().collect();
            arrays.push(Arc::new(Float64Array::from(column)));
        }

        let batch = RecordBatch::try_new(self.schema.clone(), arrays)?;
        self.writer.write(&batch)?;
        Ok(())
    }

    pub fn close(self) -> anyhow::Result<()> {
        self.writer.close()?;
        Ok(())
    }
}

pub fn write_ia_parquet(ia: &IaMatrix, path: &Path) -> anyhow::Result<()> {
    let mut writer = IaParquetWriter::new(path, ia.nrows())?;
    writer.write_matrix(ia)?;
    writer.close()?;
    info!(path = %path.display(), nodes = ia.nrows(), "IA matrix written");
    Ok(())
}

/// Read a matrix written by [`write_ia_parquet`].
pub fn read_ia_parquet(path: &Path) -> anyhow::Result<IaMatrix> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let n = builder.schema().fields().len().saturating_sub(1);
    let reader = builder.build()?;

    let mut ia = IaMatrix::zeros(n, n);
    let mut filled = 0;
    for batch in reader {
        let batch = batch?;
        let rows = batch
            .column(0)
            .as_any()
            .downcast_ref::<UInt64Array>()
            .context("column `row` is not UInt64")?;
        for j in 0..n {
            let col = batch
                .column(j + 1)
                .as_any()
                .downcast_ref::<Float64Array>()
                .with_context(|| format!("column s{j} is not Float64"))?;
            for k in 0..batch.num_rows() {
                let i = rows.value(k) as usize;
                anyhow::ensure!(i < n, "row id {i} out of range for {n} seeds");
                ia[(i, j)] = col.value(k);
            }
        }
        filled += batch.num_rows();
    }
    anyhow::ensure!(filled == n, "expected {n} rows, found {filled}");
    Ok(ia)
}

/// Get git commit hash for reproducibility
fn get_git_commit() -> Option<String> {
    std::process::Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                String::from_utf8(output.stdout).ok()
            } else {
                None
            }
        })
        .map(|s| s.trim().to_string())
}

fn get_rust_version() -> String {
    std::process::Command::new("rustc")
        .arg("--version")
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                String::from_utf8(output.stdout).ok()
            } else {
                None
            }
        })
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
