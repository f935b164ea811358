use assert_cmd::Command;
use std::fs;
use tempfile::TempDir;

fn cross(outfile: &std::path::Path, extra: &[&str]) -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("swaln")?;
    cmd.arg("cross")
        .arg("tests/fasta/queries.fa")
        .arg("tests/fasta/targets.fa")
        .arg("--gap-open")
        .arg("10")
        .arg("--gap-extend")
        .arg("1")
        .args(extra)
        .arg("-o")
        .arg(outfile)
        .assert()
        .success();
    Ok(())
}

#[test]
fn command_cross() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let outfile = temp.path().join("res.tsv");

    cross(&outfile, &["--parallel", "2"])?;

    let content = fs::read_to_string(&outfile)?;
    assert_eq!(content.lines().count(), 13);
    assert!(content.starts_with(
        "gene_id\tmatch_gene_id\tscore\tidentical_num\tsimilar_num\tident_percent\tsim_percent\n"
    ));
    assert!(content.contains("q0\tt0\t168\t29\t2\t87.88\t93.94\n"));
    assert!(content.contains("q1\tt1\t18\t4\t0\t40.00\t40.00\n"));
    assert!(content.contains("q2\tt2\t44\t10\t0\t71.43\t71.43\n"));
    assert!(content.contains("q2\tt3\t1\t0\t1\t0.00\t10.00\n"));

    Ok(())
}

#[test]
fn command_cross_batches_append() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let outfile = temp.path().join("res.tsv");

    cross(&outfile, &["--parallel", "3", "--batch", "5"])?;
    cross(&outfile, &["--load", "0.5", "--limit", "1"])?;

    let content = fs::read_to_string(&outfile)?;
    assert_eq!(content.lines().count(), 1 + 12 + 4);
    assert_eq!(content.matches("gene_id\t").count(), 1);
    assert_eq!(content.matches("q0\tt0\t168\t").count(), 2);
    assert_eq!(content.matches("q1\tt1\t18\t").count(), 1);

    Ok(())
}

#[test]
fn command_cross_unknown_residue() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let input = temp.path().join("bad.fa");
    let outfile = temp.path().join("res.tsv");
    fs::write(&input, ">bad\nMKOV\n")?;

    let mut cmd = Command::cargo_bin("swaln")?;
    let output = cmd
        .arg("cross")
        .arg(&input)
        .arg("tests/fasta/targets.fa")
        .arg("--gap-open")
        .arg("10")
        .arg("--gap-extend")
        .arg("1")
        .arg("-o")
        .arg(&outfile)
        .output()?;
    let stderr = String::from_utf8(output.stderr)?;

    assert!(!output.status.success());
    assert!(stderr.contains("position 3 of bad"));

    // only the header, nothing was committed
    let content = fs::read_to_string(&outfile)?;
    assert_eq!(content.lines().count(), 1);

    Ok(())
}
