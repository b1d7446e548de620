use anyhow::Result;
use assert_cmd::{assert::OutputAssertExt, cargo::CommandCargoExt};
use std::process::Command;

#[test]
fn prints_help() -> Result<()> {
    let mut command = Command::cargo_bin("commute-flows")?;

    command.arg("--help").assert().try_success()?;

    Ok(())
}

#[test]
fn rejects_unknown_marker_selection() -> Result<()> {
    let mut command = Command::cargo_bin("commute-flows")?;

    command
        .args(["--markers", "busiest"])
        .assert()
        .try_failure()?;

    Ok(())
}

#[test]
fn rejects_invalid_bind_address() -> Result<()> {
    let mut command = Command::cargo_bin("commute-flows")?;

    command.args(["--bind", "nowhere"]).assert().try_failure()?;

    Ok(())
}

#[test]
fn rejects_zero_cache_capacity() -> Result<()> {
    let mut command = Command::cargo_bin("commute-flows")?;

    command
        .args(["--cache-capacity", "0"])
        .assert()
        .try_failure()?;

    Ok(())
}
