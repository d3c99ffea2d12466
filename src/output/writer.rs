// src/output/writer.rs
//! Executes output operations by performing actual I/O.
//!
//! This module is the only place where the build writes files, keeping
//! planning and rendering pure and testable.

use super::types::*;
use crate::error::AppError;
use std::fs;
use std::path::Path;
use std::time::Instant;

/// Delivers the output plan, performing all I/O operations.
///
/// Individual failures are recorded in the report rather than aborting the
/// remaining operations.
pub fn deliver(plan: OutputPlan) -> OutputReport {
    let mut report = OutputReport::new();
    let start_time = Instant::now();

    log::info!(
        "Executing output plan with {} operations",
        plan.operations.len()
    );

    for operation in plan.operations {
        let op_start = Instant::now();
        match execute_operation(&operation) {
            Ok(bytes_written) => {
                let duration_ms = op_start.elapsed().as_millis() as u64;
                report = report.with_completed(CompletedOperation {
                    operation,
                    bytes_written,
                    duration_ms,
                });
            }
            Err(e) => {
                log::error!("Operation failed: {}", e);
                report = report.with_failed(FailedOperation {
                    operation,
                    error: e.to_string(),
                });
            }
        }
    }

    report.stats.total_duration_ms = start_time.elapsed().as_millis() as u64;

    log::info!(
        "Output plan execution complete: {} succeeded, {} failed in {}ms",
        report.stats.operations_completed,
        report.stats.operations_failed,
        report.stats.total_duration_ms
    );

    report
}

/// Executes a single output operation.
fn execute_operation(operation: &DeliveryTarget) -> Result<usize, AppError> {
    match operation {
        DeliveryTarget::WriteFile { path, content } => write_file(path, content),
        DeliveryTarget::CreateDirectory { path } => {
            create_directory(path)?;
            Ok(0)
        }
    }
}

/// Writes content to a file, creating parent directories as needed.
pub fn write_file(path: &Path, content: &str) -> Result<usize, AppError> {
    log::debug!("Writing {} bytes to {}", content.len(), path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(path, content)?;

    log::debug!("Wrote file: {}", path.display());
    Ok(content.len())
}

/// Creates a directory.
fn create_directory(path: &Path) -> Result<(), AppError> {
    log::debug!("Creating directory: {}", path.display());

    if path.exists() {
        if path.is_dir() {
            log::debug!("Directory already exists: {}", path.display());
            return Ok(());
        } else {
            return Err(AppError::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("Path exists but is not a directory: {}", path.display()),
            )));
        }
    }

    fs::create_dir_all(path)?;
    log::info!("Created directory: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deliver_writes_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        let page = dir.path().join("post").join("hello").join("index.html");
        let plan = OutputPlan::new()
            .with_operation(DeliveryTarget::CreateDirectory {
                path: dir.path().join("page"),
            })
            .with_file(page.clone(), "<h1>hello</h1>");

        let report = deliver(plan);

        assert!(report.is_success());
        assert_eq!(report.stats.operations_completed, 2);
        assert_eq!(report.stats.bytes_written, 14);
        assert_eq!(fs::read_to_string(page).unwrap(), "<h1>hello</h1>");
    }

    #[test]
    fn test_failures_are_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("post");
        fs::write(&blocker, "a file, not a directory").unwrap();

        let plan = OutputPlan::new()
            .with_operation(DeliveryTarget::CreateDirectory {
                path: blocker.clone(),
            })
            .with_file(dir.path().join("index.html"), "ok");
        let report = deliver(plan);

        assert!(!report.is_success());
        assert_eq!(report.stats.operations_failed, 1);
        assert_eq!(report.stats.operations_completed, 1);
        assert_eq!(report.failure_messages().len(), 1);
    }
}
