//! Command-line tests
//!
//! Runs the `crispr-hits` binary against catalog, shard, and report files
//! written to a temporary directory.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const MOTIF: &str = "GGCATCGATCGATCGATCGAAGG";

const CATALOG_JSON: &str = r#"{
    "version": "1.0.0",
    "created_at": "2024-01-01T00:00:00Z",
    "genomes": [
        {"id": "G1", "taxon": "Buchnera aphidicola", "organism": "Buchnera aphidicola BCc", "size": 1000},
        {"id": "G2", "taxon": "Aliivibrio wodanis", "organism": "Aliivibrio wodanis", "size": 5000000}
    ]
}"#;

const REPORT_TSV: &str = "\
GGCATCGATCGATCGATCGAAGG\tG1|geneA\t98.0\t20\t0\t0\t1\t20\t1\t200\t1e-5\t40.1
GGCATCGATCGATCGATCGAAGG\tG2|geneB\t80.0\t20\t4\t0\t1\t20\t100\t119\t0.01\t28.3
";

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("genomes.json"), CATALOG_JSON).unwrap();
        std::fs::write(
            dir.path().join("shard-01.json"),
            r#"{"shard_id": "shard-01", "values": [42, 42]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("shard-02.json"),
            r#"{"shard_id": "shard-02", "values": [29360128], "long_table": {"1": [4999999]}}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("sgRNA_1.blast.tsv"), REPORT_TSV).unwrap();
        std::fs::write(dir.path().join("empty.blast.tsv"), "").unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn resolve(&self, report: &str) -> Command {
        let mut cmd = crispr_hits();
        cmd.arg("resolve")
            .arg(MOTIF)
            .arg("--catalog")
            .arg(self.path("genomes.json"))
            .arg("-s")
            .arg(self.path("shard-01.json"))
            .arg("-s")
            .arg(self.path("shard-02.json"))
            .arg("-r")
            .arg(self.path(report))
            .args(["--min-identity", "95", "--min-length", "18"]);
        cmd
    }
}

fn crispr_hits() -> Command {
    Command::cargo_bin("crispr-hits").unwrap()
}

fn write_fai(path: &Path) {
    std::fs::write(path, "chr1\t4000\t6\t60\t61\nplasmid\t500\t4080\t60\t61\n").unwrap();
}

#[test]
fn test_resolve_text_output() {
    let fixture = Fixture::new();

    fixture
        .resolve("sgRNA_1.blast.tsv")
        .arg("--show-occurrences")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Motif: {MOTIF}")))
        .stdout(predicate::str::contains("geneA"))
        .stdout(predicate::str::contains("G1:42(+)"))
        .stdout(predicate::str::contains("geneB").not());
}

#[test]
fn test_resolve_json_output() {
    let fixture = Fixture::new();

    let output = fixture
        .resolve("sgRNA_1.blast.tsv")
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["motif"], MOTIF);
    assert_eq!(summary["merged_occurrences"], 2);
    assert_eq!(summary["total_occurrences"], 1);
    assert_eq!(summary["genes"][0]["gene_id"], "geneA");
    assert_eq!(summary["genes"][0]["occurrence_count"], 1);
    assert_eq!(summary["partial"], false);
}

#[test]
fn test_resolve_tsv_output() {
    let fixture = Fixture::new();

    fixture
        .resolve("sgRNA_1.blast.tsv")
        .args(["--format", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("motif\tgene_id\toccurrences"))
        .stdout(predicate::str::contains(format!("{MOTIF}\tgeneA\t1\tG1\t")));
}

#[test]
fn test_resolve_empty_report_succeeds_without_hits() {
    let fixture = Fixture::new();

    fixture
        .resolve("empty.blast.tsv")
        .assert()
        .success()
        .stdout(predicate::str::contains("No gene hits"))
        .stderr(predicate::str::contains("No surviving hits"));
}

#[test]
fn test_resolve_rejects_invalid_motif() {
    let fixture = Fixture::new();

    crispr_hits()
        .arg("resolve")
        .arg("GGC-ATC")
        .arg("--catalog")
        .arg(fixture.path("genomes.json"))
        .arg("-s")
        .arg(fixture.path("shard-01.json"))
        .arg("-r")
        .arg(fixture.path("sgRNA_1.blast.tsv"))
        .assert()
        .failure();
}

#[test]
fn test_resolve_fails_when_every_shard_fails() {
    let fixture = Fixture::new();

    crispr_hits()
        .arg("resolve")
        .arg(MOTIF)
        .arg("--catalog")
        .arg(fixture.path("genomes.json"))
        .arg("-s")
        .arg(fixture.path("missing.bin"))
        .arg("-r")
        .arg(fixture.path("sgRNA_1.blast.tsv"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Consistency error"));
}

#[test]
fn test_decode_values() {
    let fixture = Fixture::new();

    crispr_hits()
        .arg("decode")
        .arg("42")
        .arg("0x2a")
        .arg("--catalog")
        .arg(fixture.path("genomes.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("0x2a\tG1:42(+)"));
}

#[test]
fn test_decode_shard_uses_long_table() {
    let fixture = Fixture::new();

    crispr_hits()
        .arg("decode")
        .arg("--catalog")
        .arg(fixture.path("genomes.json"))
        .arg("--shard")
        .arg(fixture.path("shard-02.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("G2:4999999(-)"));
}

#[test]
fn test_decode_reports_missing_long_entry() {
    let fixture = Fixture::new();

    crispr_hits()
        .arg("decode")
        .arg("29360128")
        .arg("--catalog")
        .arg(fixture.path("genomes.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("ERROR"));
}

#[test]
fn test_catalog_list() {
    let fixture = Fixture::new();

    crispr_hits()
        .args(["catalog", "list"])
        .arg(fixture.path("genomes.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Genome Catalog (2 genomes)"))
        .stdout(predicate::str::contains("Aliivibrio wodanis"));
}

#[test]
fn test_catalog_list_taxon_filter() {
    let fixture = Fixture::new();

    crispr_hits()
        .args(["--format", "tsv", "catalog", "list", "--taxon", "buchnera aphidicola"])
        .arg(fixture.path("genomes.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("0\tG1\t"))
        .stdout(predicate::str::contains("G2").not());
}

#[test]
fn test_catalog_show_unknown_genome() {
    let fixture = Fixture::new();

    crispr_hits()
        .args(["catalog", "show", "G9", "--catalog"])
        .arg(fixture.path("genomes.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_catalog_build_appends_from_fai() {
    let fixture = Fixture::new();
    let fai = fixture.path("G3.fna.fai");
    write_fai(&fai);

    crispr_hits()
        .args(["catalog", "build", "--id", "G3", "--taxon", "Escherichia coli", "-i"])
        .arg(&fai)
        .arg("--append-to")
        .arg(fixture.path("genomes.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("at index 2"));

    crispr_hits()
        .args(["catalog", "show", "G3", "--catalog"])
        .arg(fixture.path("genomes.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Size:      4500"))
        .stdout(predicate::str::contains("plasmid"));

    // A second build of the same id needs --force and keeps the index
    crispr_hits()
        .args(["catalog", "build", "--id", "G3", "--taxon", "Escherichia coli", "-i"])
        .arg(&fai)
        .arg("--append-to")
        .arg(fixture.path("genomes.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    crispr_hits()
        .args(["catalog", "build", "--id", "G3", "--taxon", "Escherichia coli", "--force", "-i"])
        .arg(&fai)
        .arg("--append-to")
        .arg(fixture.path("genomes.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("at index 2"));
}
