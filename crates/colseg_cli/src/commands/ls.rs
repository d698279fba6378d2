//! Ls command implementation.

use colseg_core::{scan_segment_files, FileType};
use serde::Serialize;
use std::path::Path;

/// One listed segment file.
#[derive(Debug, Serialize)]
pub struct SegmentListing {
    /// Segment id in its string form.
    pub id: String,
    /// Table id.
    pub table_id: u64,
    /// Group id.
    pub group_id: u64,
    /// Tablet name.
    pub tablet_id: String,
    /// Segment number.
    pub segment_id: u64,
    /// `unsorted` or `sorted`.
    pub file_type: String,
    /// File size in bytes.
    pub size: u64,
}

/// Segment files in a directory.
#[derive(Debug, Serialize)]
pub struct LsResult {
    /// Storage directory.
    pub path: String,
    /// Number of unsorted files.
    pub unsorted: usize,
    /// Number of sorted files.
    pub sorted: usize,
    /// Listed files.
    pub files: Vec<SegmentListing>,
}

fn parse_file_type(name: &str) -> Result<FileType, Box<dyn std::error::Error>> {
    match name {
        "unsorted" => Ok(FileType::Unsorted),
        "sorted" => Ok(FileType::Sorted),
        other => Err(format!("Unknown file type: {other} (expected unsorted or sorted)").into()),
    }
}

/// Collects the segment files in `path`, optionally of one type.
pub fn list(path: &Path, file_type: Option<&str>) -> Result<LsResult, Box<dyn std::error::Error>> {
    let only = file_type.map(parse_file_type).transpose()?;
    let entries = scan_segment_files(path)?;

    let files: Vec<SegmentListing> = entries
        .into_iter()
        .filter(|e| only.map_or(true, |t| e.file_type == t))
        .map(|e| SegmentListing {
            id: e.id.to_string(),
            table_id: e.id.table_id(),
            group_id: e.id.group_id(),
            tablet_id: e.id.tablet_id().to_string(),
            segment_id: e.id.segment_id(),
            file_type: e.file_type.to_string(),
            size: e.size,
        })
        .collect();

    let unsorted = files.iter().filter(|f| f.file_type == "unsorted").count();
    Ok(LsResult {
        path: path.display().to_string(),
        unsorted,
        sorted: files.len() - unsorted,
        files,
    })
}

/// Runs the ls command.
pub fn run(path: &Path, file_type: Option<&str>, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = list(path, file_type)?;
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => print_text_output(&result),
    }
    Ok(())
}

fn print_text_output(result: &LsResult) {
    println!("Storage directory: {}", result.path);
    println!(
        "Segment files: {} unsorted, {} sorted",
        result.unsorted, result.sorted
    );
    for file in &result.files {
        println!("  {:<9} {:>12} B  {}", file.file_type, file.size, file.id);
    }
}
