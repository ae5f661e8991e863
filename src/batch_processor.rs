use anyhow::{Context, Result};
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use rayon::prelude::*;
use rdn_calculator::{CalculationRequest, PortfolioResult};
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

pub const SUMMARY_FILE: &str = "batch_summary.csv";

const SUMMARY_HEADER: [&str; 8] = [
    "file",
    "status",
    "total_days",
    "total_cycles",
    "revenue_pln",
    "distribution_cost_pln",
    "profit_pln",
    "error",
];

/// One row of `batch_summary.csv`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchOutcome {
    pub file: String,
    pub status: String,
    pub total_days: Option<usize>,
    pub total_cycles: Option<usize>,
    pub revenue_pln: Option<f64>,
    pub distribution_cost_pln: Option<f64>,
    pub profit_pln: Option<f64>,
    pub error: Option<String>,
}

impl BatchOutcome {
    fn success(file: &Path, result: &PortfolioResult) -> Self {
        Self {
            file: file.display().to_string(),
            status: "ok".to_string(),
            total_days: Some(result.metadata.total_days),
            total_cycles: Some(result.metadata.total_cycles),
            revenue_pln: Some(result.financial.revenue_pln),
            distribution_cost_pln: Some(result.financial.distribution_cost_pln),
            profit_pln: Some(result.financial.profit_pln),
            error: None,
        }
    }

    fn failure(file: &Path, err: &anyhow::Error) -> Self {
        Self {
            file: file.display().to_string(),
            status: "error".to_string(),
            total_days: None,
            total_cycles: None,
            revenue_pln: None,
            distribution_cost_pln: None,
            profit_pln: None,
            error: Some(format!("{err:#}")),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

pub struct BatchProcessor {
    output_dir: PathBuf,
    with_report: bool,
}

impl BatchProcessor {
    pub fn new(output_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&output_dir)
            .with_context(|| format!("Failed to create {}", output_dir.display()))?;
        Ok(Self {
            output_dir,
            with_report: false,
        })
    }

    pub fn with_report(mut self, with_report: bool) -> Self {
        self.with_report = with_report;
        self
    }

    /// Request files matching `pattern`, sorted so the summary is stable.
    pub fn find_requests(pattern: &str) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = glob(pattern)
            .with_context(|| format!("Invalid pattern {pattern}"))?
            .filter_map(|entry| entry.ok())
            .filter(|path| path.is_file())
            .collect();
        files.sort();
        Ok(files)
    }

    /// Calculate every request in parallel. A failing file becomes an error
    /// row and the rest of the batch carries on.
    pub fn process_files(&self, files: &[PathBuf]) -> Result<Vec<BatchOutcome>> {
        info!("Processing {} request files", files.len());
        let base = common_parent(files);

        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?,
        );

        let outcomes: Vec<BatchOutcome> = files
            .par_iter()
            .map(|file| {
                let outcome = match self.process_file(file, &base) {
                    Ok(result) => BatchOutcome::success(file, &result),
                    Err(err) => {
                        warn!("{}: {:#}", file.display(), err);
                        BatchOutcome::failure(file, &err)
                    }
                };
                pb.inc(1);
                outcome
            })
            .collect();

        pb.finish_with_message("done");

        self.write_summary(&outcomes)?;
        let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
        info!(
            "Batch finished: {} ok, {} failed",
            outcomes.len() - failed,
            failed
        );
        Ok(outcomes)
    }

    pub fn process_pattern(&self, pattern: &str) -> Result<Vec<BatchOutcome>> {
        let files = Self::find_requests(pattern)?;
        if files.is_empty() {
            warn!("No request files match {pattern}");
        }
        self.process_files(&files)
    }

    fn process_file(&self, file: &Path, base: &Path) -> Result<PortfolioResult> {
        let request = CalculationRequest::from_path(file)
            .with_context(|| format!("Failed to load {}", file.display()))?;
        let calculator = rdn_calculator::StorageCalculator::new(request.config());
        let series = request.series();
        let result = if self.with_report {
            calculator.calculate_with_report(&series)
        } else {
            calculator.calculate(&series)
        };

        let output_path = self.result_path(file, base);
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let writer = BufWriter::new(
            File::create(&output_path)
                .with_context(|| format!("Failed to create {}", output_path.display()))?,
        );
        serde_json::to_writer_pretty(writer, &result)?;
        Ok(result)
    }

    /// `<output_dir>/<path below base>/<stem>.result.json`, so requests that
    /// share a file name in different folders keep separate results.
    pub fn result_path(&self, file: &Path, base: &Path) -> PathBuf {
        let relative = file.strip_prefix(base).unwrap_or(file);
        let stem = relative
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "request".to_string());
        let dir = relative
            .parent()
            .filter(|parent| !parent.has_root())
            .unwrap_or_else(|| Path::new(""));
        self.output_dir.join(dir).join(format!("{stem}.result.json"))
    }

    fn write_summary(&self, outcomes: &[BatchOutcome]) -> Result<()> {
        let path = self.output_dir.join(SUMMARY_FILE);
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        if outcomes.is_empty() {
            writer.write_record(SUMMARY_HEADER)?;
        }
        for outcome in outcomes {
            writer.serialize(outcome)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Deepest directory containing every file.
fn common_parent(files: &[PathBuf]) -> PathBuf {
    let mut base = files
        .first()
        .and_then(|file| file.parent())
        .map(Path::to_path_buf)
        .unwrap_or_default();
    for file in files.iter().skip(1) {
        while !file.starts_with(&base) {
            if !base.pop() {
                return PathBuf::new();
            }
        }
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn request_json(max_cycles: u32) -> String {
        let prices: Vec<String> = (1..=24)
            .map(|hour| {
                let price = match hour {
                    3 | 4 => 100.0,
                    18 | 19 => 400.0,
                    _ => 250.0,
                };
                format!(r#"{{"date": "2024-05-10", "hour": {hour}, "price_rdn_pln_mwh": {price}}}"#)
            })
            .collect();
        format!(
            r#"{{"params": {{"max_cycles_per_day": {max_cycles}, "capacity_mwh": 2.5, "power_mw": 1.0,
                "soc_min": 0.1, "soc_max": 0.9, "efficiency": 0.9}}, "prices": [{}]}}"#,
            prices.join(",")
        )
    }

    #[test]
    fn test_batch_writes_results_and_summary() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        fs::write(input.path().join("a.json"), request_json(1)).unwrap();
        fs::write(input.path().join("b.json"), request_json(2)).unwrap();

        let processor = BatchProcessor::new(output.path().to_path_buf()).unwrap();
        let pattern = format!("{}/*.json", input.path().display());
        let outcomes = processor.process_pattern(&pattern).unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(BatchOutcome::is_ok));
        assert_eq!(outcomes[0].total_cycles, Some(1));
        assert!(output.path().join("a.result.json").exists());
        assert!(output.path().join("b.result.json").exists());

        let written: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(output.path().join("a.result.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(written["metadata"]["total_days"], 1);

        let summary = fs::read_to_string(output.path().join(SUMMARY_FILE)).unwrap();
        let mut lines = summary.lines();
        assert_eq!(
            lines.next().unwrap(),
            "file,status,total_days,total_cycles,revenue_pln,distribution_cost_pln,profit_pln,error"
        );
        assert_eq!(lines.count(), 2);
    }

    #[test]
    fn test_failing_request_does_not_stop_batch() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        fs::write(input.path().join("good.json"), request_json(1)).unwrap();
        fs::write(input.path().join("no_params.json"), r#"{"prices": []}"#).unwrap();

        let processor = BatchProcessor::new(output.path().to_path_buf()).unwrap();
        let files = BatchProcessor::find_requests(&format!("{}/*.json", input.path().display()))
            .unwrap();
        let outcomes = processor.process_files(&files).unwrap();

        assert_eq!(outcomes.len(), 2);
        let good = outcomes.iter().find(|o| o.file.ends_with("good.json")).unwrap();
        let bad = outcomes.iter().find(|o| o.file.ends_with("no_params.json")).unwrap();
        assert_eq!(good.status, "ok");
        assert_eq!(bad.status, "error");
        assert!(bad.error.as_deref().unwrap().contains("params"));
        assert!(!output.path().join("no_params.result.json").exists());
    }

    #[test]
    fn test_report_is_attached_when_requested() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let file = input.path().join("with_report.json");
        fs::write(&file, request_json(2)).unwrap();

        let processor = BatchProcessor::new(output.path().to_path_buf())
            .unwrap()
            .with_report(true);
        processor.process_files(&[file.clone()]).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(
                &fs::read_to_string(processor.result_path(&file, input.path())).unwrap(),
            )
            .unwrap();
        assert_eq!(written["report"]["monthly"][0]["month"], 5);
    }

    #[test]
    fn test_empty_pattern_still_writes_summary() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let processor = BatchProcessor::new(output.path().to_path_buf()).unwrap();
        let outcomes = processor
            .process_pattern(&format!("{}/*.json", input.path().display()))
            .unwrap();
        assert!(outcomes.is_empty());
        let summary = fs::read_to_string(output.path().join(SUMMARY_FILE)).unwrap();
        assert_eq!(
            summary.lines().collect::<Vec<_>>(),
            vec!["file,status,total_days,total_cycles,revenue_pln,distribution_cost_pln,profit_pln,error"]
        );
    }

    #[test]
    fn test_same_file_name_in_different_folders() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        for (site, max_cycles) in [("north", 1), ("south", 2)] {
            let dir = input.path().join(site);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("site.json"), request_json(max_cycles)).unwrap();
        }

        let processor = BatchProcessor::new(output.path().to_path_buf()).unwrap();
        let outcomes = processor
            .process_pattern(&format!("{}/**/*.json", input.path().display()))
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(BatchOutcome::is_ok));
        for (site, max_cycles) in [("north", 1), ("south", 2)] {
            let path = output.path().join(site).join("site.result.json");
            let written: serde_json::Value =
                serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
            assert_eq!(written["kpi"]["max_cycles"], max_cycles);
        }
    }

    #[test]
    fn test_common_parent() {
        let files = vec![
            PathBuf::from("requests/2024/north/site.json"),
            PathBuf::from("requests/2024/south/site.json"),
            PathBuf::from("requests/2024/other.json"),
        ];
        assert_eq!(common_parent(&files), PathBuf::from("requests/2024"));
        assert_eq!(
            common_parent(&files[..1]),
            PathBuf::from("requests/2024/north")
        );
        assert_eq!(common_parent(&[]), PathBuf::new());
    }
}
