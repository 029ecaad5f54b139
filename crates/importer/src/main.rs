#![forbid(unsafe_code)]

use dh_hub::{AlgorithmTable, Hub, HubConfig, SubmitReceipt};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_STORAGE_DIR: &str = "devicehub-data";

#[derive(Debug)]
struct ImporterConfig {
    input: PathBuf,
    owner: String,
    storage_dir: PathBuf,
    archive_dir: Option<PathBuf>,
    submitted_by: Option<String>,
    algorithms_file: Option<PathBuf>,
}

fn usage() -> &'static str {
    "dh_importer — bulk-load device evidence payloads into a local store\n\n\
USAGE:\n\
  dh_importer --input PATH --owner OWNER\n\
              [--storage-dir DIR] [--archive-dir DIR]\n\
              [--submitted-by EMAIL] [--algorithms FILE]\n\n\
NOTES:\n\
  - PATH may be a single payload or a directory; directories are scanned\n\
    one level deep for *.json files.\n\
  - Environment fallbacks: DH_INPUT, DH_OWNER, DH_STORAGE_DIR,\n\
    DH_ARCHIVE_DIR, DH_SUBMITTED_BY, DH_ALGORITHMS. Flags win.\n\
  - Per-file progress goes to stderr; the final summary is JSON on stdout.\n\
  - Per-file failures do not stop the run; exit code is 1 when any payload\n\
    failed.\n"
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_args() -> Result<ImporterConfig, String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        print!("{}", usage());
        std::process::exit(0);
    }

    let mut input: Option<PathBuf> = env_var("DH_INPUT").map(PathBuf::from);
    let mut owner: Option<String> = env_var("DH_OWNER");
    let mut storage_dir: Option<PathBuf> = env_var("DH_STORAGE_DIR").map(PathBuf::from);
    let mut archive_dir: Option<PathBuf> = env_var("DH_ARCHIVE_DIR").map(PathBuf::from);
    let mut submitted_by: Option<String> = env_var("DH_SUBMITTED_BY");
    let mut algorithms_file: Option<PathBuf> = env_var("DH_ALGORITHMS").map(PathBuf::from);

    let mut i = 0usize;
    while i < args.len() {
        let a = args[i].as_str();
        match a {
            "--input" => {
                i += 1;
                let v = args.get(i).ok_or("--input requires PATH")?;
                input = Some(PathBuf::from(v));
            }
            "--owner" => {
                i += 1;
                let v = args.get(i).ok_or("--owner requires OWNER")?;
                owner = Some(v.to_string());
            }
            "--storage-dir" => {
                i += 1;
                let v = args.get(i).ok_or("--storage-dir requires DIR")?;
                storage_dir = Some(PathBuf::from(v));
            }
            "--archive-dir" => {
                i += 1;
                let v = args.get(i).ok_or("--archive-dir requires DIR")?;
                archive_dir = Some(PathBuf::from(v));
            }
            "--submitted-by" => {
                i += 1;
                let v = args.get(i).ok_or("--submitted-by requires EMAIL")?;
                submitted_by = Some(v.to_string());
            }
            "--algorithms" => {
                i += 1;
                let v = args.get(i).ok_or("--algorithms requires FILE")?;
                algorithms_file = Some(PathBuf::from(v));
            }
            other => return Err(format!("Unknown arg: {other}\n\n{}", usage())),
        }
        i += 1;
    }

    let input = input.ok_or_else(|| format!("--input is required\n\n{}", usage()))?;
    let owner = owner.ok_or_else(|| format!("--owner is required\n\n{}", usage()))?;
    let storage_dir = storage_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR));

    Ok(ImporterConfig {
        input,
        owner,
        storage_dir,
        archive_dir,
        submitted_by,
        algorithms_file,
    })
}

fn load_algorithm_table(path: &Path) -> Result<AlgorithmTable, String> {
    let raw = fs::read_to_string(path)
        .map_err(|err| format!("cannot read {}: {err}", path.display()))?;
    serde_json::from_str(&raw)
        .map_err(|err| format!("invalid algorithm table {}: {err}", path.display()))
}

/// A single payload file is taken as-is; a directory is scanned one level
/// deep for `*.json`, in name order.
fn collect_payload_files(input: &Path) -> Result<Vec<PathBuf>, String> {
    let meta =
        fs::metadata(input).map_err(|err| format!("cannot read {}: {err}", input.display()))?;
    if meta.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !meta.is_dir() {
        return Err(format!(
            "{} is neither a file nor a directory",
            input.display()
        ));
    }

    let entries =
        fs::read_dir(input).map_err(|err| format!("cannot read {}: {err}", input.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| format!("cannot read {}: {err}", input.display()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        files.push(path);
    }
    files.sort();
    Ok(files)
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
struct ImportSummary {
    processed: usize,
    accepted: usize,
    reused: usize,
    failed: usize,
}

enum FileOutcome {
    Accepted(SubmitReceipt),
    Reused(SubmitReceipt),
    Failed(String),
}

fn import_file(
    hub: &mut Hub,
    path: &Path,
    owner: &str,
    submitted_by: Option<&str>,
) -> FileOutcome {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => return FileOutcome::Failed(format!("unreadable: {err}")),
    };
    let payload: Value = match serde_json::from_str(&raw) {
        Ok(payload) => payload,
        Err(err) => return FileOutcome::Failed(format!("not valid JSON: {err}")),
    };
    match hub.submit_evidence(&payload, owner, submitted_by) {
        Ok(receipt) if receipt.inserted => FileOutcome::Accepted(receipt),
        Ok(receipt) => FileOutcome::Reused(receipt),
        Err(err) => FileOutcome::Failed(err.to_string()),
    }
}

fn import_all(
    hub: &mut Hub,
    files: &[PathBuf],
    owner: &str,
    submitted_by: Option<&str>,
) -> ImportSummary {
    let mut summary = ImportSummary::default();
    for path in files {
        summary.processed += 1;
        match import_file(hub, path, owner, submitted_by) {
            FileOutcome::Accepted(receipt) => {
                summary.accepted += 1;
                eprintln!(
                    "{}: accepted {} ({})",
                    path.display(),
                    receipt.short_id,
                    receipt.value
                );
                report_warnings(path, &receipt.warnings);
            }
            FileOutcome::Reused(receipt) => {
                summary.reused += 1;
                eprintln!(
                    "{}: already recorded as {}",
                    path.display(),
                    receipt.short_id
                );
                report_warnings(path, &receipt.warnings);
            }
            FileOutcome::Failed(reason) => {
                summary.failed += 1;
                eprintln!("{}: failed: {reason}", path.display());
            }
        }
    }
    summary
}

fn report_warnings(path: &Path, warnings: &[String]) {
    for warning in warnings {
        eprintln!("{}: warning: {warning}", path.display());
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = parse_args().map_err(|e| {
        eprintln!("{e}");
        std::process::exit(2);
    })?;

    let mut hub_config = HubConfig::new(cfg.storage_dir.clone());
    hub_config.archive_dir = cfg.archive_dir.clone();
    if let Some(path) = &cfg.algorithms_file {
        let table = load_algorithm_table(path).unwrap_or_else(|e| {
            eprintln!("{e}");
            std::process::exit(2);
        });
        hub_config.algorithms = Some(table);
    }

    let mut hub = Hub::open(hub_config).unwrap_or_else(|e| {
        eprintln!("{e}");
        std::process::exit(2);
    });

    let files = collect_payload_files(&cfg.input).unwrap_or_else(|e| {
        eprintln!("{e}");
        std::process::exit(2);
    });

    let summary = import_all(&mut hub, &files, &cfg.owner, cfg.submitted_by.as_deref());
    println!("{}", serde_json::to_string_pretty(&summary)?);
    if summary.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
