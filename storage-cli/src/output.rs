// SPDX-License-Identifier: GPL-3.0-only

//! Plain-text and JSON rendering of the reports

use std::io::{self, Write};

use serde::Serialize;
use storage_types::{
    AggregationOutcome, CapacityEntry, CapacityState, MountOutcome, MountReport, StatusReport,
    UnmountOutcome, UnmountReport, UnmountResult,
};

pub fn print_json<T: Serialize>(out: &mut impl Write, value: &T) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)
}

fn write_row(out: &mut impl Write, entry: &CapacityEntry) -> io::Result<()> {
    let path = entry.path.display();
    match &entry.state {
        CapacityState::Available(record) => writeln!(
            out,
            "{}\t{}\t{}\t{}",
            path, record.filesystem, record.total, record.free
        ),
        CapacityState::NotFound => writeln!(out, "{path}\tnot found"),
        CapacityState::Unreadable { reason } => writeln!(out, "{path}\tunreadable: {reason}"),
    }
}

pub fn print_status(out: &mut impl Write, report: &StatusReport) -> io::Result<()> {
    writeln!(out, "status:")?;

    if report.raid.is_found() {
        writeln!(out, "\nRaid directory info:")?;
        write_row(out, &report.raid)?;
        for pool in &report.pools {
            write_row(out, pool)?;
        }
    } else {
        writeln!(out, "Raid directory not found")?;
    }

    if !report.parts_found() {
        return writeln!(out, "Parts directory not found");
    }
    if report.members.is_empty() {
        return writeln!(out, "{} is empty", report.parts.path.display());
    }

    writeln!(out, "\nFound parts:")?;
    for member in &report.members {
        write_row(out, member)?;
    }
    Ok(())
}

pub fn print_mount(out: &mut impl Write, report: &MountReport) -> io::Result<()> {
    for summary in report.provider_summaries() {
        write!(
            out,
            "{}: {}/{} mounted",
            summary.provider,
            summary.mounted + summary.already_mounted,
            summary.total
        )?;
        if summary.already_mounted > 0 {
            write!(out, " ({} already)", summary.already_mounted)?;
        }
        writeln!(out)?;
    }

    for result in &report.mounts {
        if let MountOutcome::Failed { reason } = &result.outcome {
            writeln!(out, "failed: {} ({})", result.point.path.display(), reason)?;
            for line in result.diagnostics.lines().filter(|l| !l.trim().is_empty()) {
                writeln!(out, "    {line}")?;
            }
        }
    }

    for aggregation in &report.aggregations {
        match &aggregation.outcome {
            AggregationOutcome::Created { pool } => {
                let members: Vec<_> = pool
                    .members
                    .iter()
                    .map(|m| m.display().to_string())
                    .collect();
                writeln!(out, "pool: {} <- {}", pool.path.display(), members.join(", "))?;
            }
            AggregationOutcome::AlreadyAggregated { path } => {
                writeln!(out, "pool: {} (already mounted)", path.display())?;
            }
            AggregationOutcome::Skipped { reason } => {
                writeln!(out, "skipped {}: {}", aggregation.provider, reason)?;
            }
            AggregationOutcome::Failed { reason } => {
                writeln!(out, "pool failed {}: {}", aggregation.provider, reason)?;
            }
        }
    }
    Ok(())
}

fn write_unmount(out: &mut impl Write, result: &UnmountResult) -> io::Result<()> {
    let path = result.path.display();
    match &result.outcome {
        UnmountOutcome::Unmounted => writeln!(out, "unmounted: {path}"),
        UnmountOutcome::NotMounted => writeln!(out, "not mounted: {path}"),
        UnmountOutcome::Failed { reason } => writeln!(out, "failed: {path} ({reason})"),
    }
}

pub fn print_unmount(out: &mut impl Write, report: &UnmountReport) -> io::Result<()> {
    for result in report.pools.iter().chain(report.mounts.iter()) {
        write_unmount(out, result)?;
    }
    if report.secrets_invalidated {
        writeln!(out, "secrets cleared")
    } else {
        writeln!(out, "secrets NOT cleared")
    }
}
