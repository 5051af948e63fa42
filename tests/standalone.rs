use std::collections::BTreeSet;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use bytes::Bytes;
use mrstream::standalone::{self, Config};
use mrstream::workload::wc::WordCount;
use mrstream::{partition, Emitter, KeyValue, MapReduceJob};
use tempfile::TempDir;

fn write_input(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn config(dir: &Path, inputs: Vec<PathBuf>, partitions: u32, mappers: usize, run_id: u32) -> Config {
    Config {
        mapreduce: true,
        partitions,
        mappers,
        reducers: 2,
        inputs,
        work_dir: dir.to_path_buf(),
        run_id,
        ..Config::default()
    }
}

fn records(path: &Path) -> Vec<(String, String)> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| {
            let (k, v) = line.split_once('\t').unwrap();
            (k.to_string(), v.to_string())
        })
        .collect()
}

fn all_records(outputs: &[PathBuf]) -> Vec<(String, String)> {
    let mut all: Vec<_> = outputs.iter().flat_map(|p| records(p)).collect();
    all.sort();
    all
}

fn pairs(expected: &[(&str, &str)]) -> Vec<(String, String)> {
    let mut pairs: Vec<_> = expected
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    pairs.sort();
    pairs
}

fn file_names(dir: &Path) -> BTreeSet<String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

fn assert_no_temporaries(dir: &Path) {
    let leftovers: Vec<_> = file_names(dir)
        .into_iter()
        .filter(|name| name.starts_with("tmp-"))
        .collect();
    assert!(leftovers.is_empty(), "leftovers: {:?}", leftovers);
}

/// Counts input lines, and records how often finalization ran.
#[derive(Clone, Default)]
struct LineCount;

impl MapReduceJob for LineCount {
    fn map(&mut self, _kv: KeyValue, emitter: &mut dyn Emitter) -> Result<()> {
        emitter.emit(b"lines", b"1")?;
        Ok(())
    }

    fn map_final(&mut self, emitter: &mut dyn Emitter) -> Result<()> {
        emitter.emit(b"finals", b"1")?;
        Ok(())
    }

    fn reduce(&mut self, key: Bytes, values: Vec<Bytes>, emitter: &mut dyn Emitter) -> Result<()> {
        emitter.emit(&key, values.len().to_string().as_bytes())?;
        Ok(())
    }
}

/// Counts lines, but gives up on any input holding the line `bad`.
#[derive(Clone, Default)]
struct RejectBad;

impl MapReduceJob for RejectBad {
    fn map(&mut self, kv: KeyValue, emitter: &mut dyn Emitter) -> Result<()> {
        if kv.value.as_ref() == b"bad" {
            bail!("bad line");
        }
        emitter.emit(&kv.value, b"1")?;
        Ok(())
    }

    fn reduce(&mut self, key: Bytes, values: Vec<Bytes>, emitter: &mut dyn Emitter) -> Result<()> {
        emitter.emit(&key, values.len().to_string().as_bytes())?;
        Ok(())
    }
}

#[tokio::test]
async fn word_count_end_to_end() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), "in.txt", "the cat sat\nthe dog ran\n");

    let summary = standalone::run(&WordCount::default(), &config(dir.path(), vec![input], 1, 4, 1))
        .await
        .unwrap();

    assert_eq!(summary.outputs, vec![dir.path().join("red-out-p1.0000")]);
    assert_eq!(
        summary.to_string(),
        format!("output is in: {}", dir.path().join("red-out-p1.0000").display())
    );
    assert_eq!(
        all_records(&summary.outputs),
        pairs(&[("the", "2"), ("cat", "1"), ("sat", "1"), ("dog", "1"), ("ran", "1")])
    );
    assert_no_temporaries(dir.path());
}

#[tokio::test]
async fn partitions_hold_only_their_own_keys() {
    let dir = TempDir::new().unwrap();
    let inputs = vec![
        write_input(dir.path(), "a.txt", "a b c d\na b\n"),
        write_input(dir.path(), "b.txt", "c d\nd\n"),
    ];

    let summary = standalone::run(&WordCount::default(), &config(dir.path(), inputs, 4, 2, 2))
        .await
        .unwrap();

    assert_eq!(summary.outputs.len(), 4);
    for (p, output) in summary.outputs.iter().enumerate() {
        assert_eq!(*output, dir.path().join(format!("red-out-p2.{:04}", p)));
        for (key, _) in records(output) {
            assert_eq!(partition(key.as_bytes(), 4), p as u32);
        }
    }
    assert_eq!(
        all_records(&summary.outputs),
        pairs(&[("a", "2"), ("b", "2"), ("c", "2"), ("d", "3")])
    );
    assert_no_temporaries(dir.path());
}

#[tokio::test]
async fn mapper_count_does_not_change_results() {
    let dir = TempDir::new().unwrap();
    let inputs = vec![
        write_input(dir.path(), "one.txt", "the quick brown fox\njumps over\n"),
        write_input(dir.path(), "two.txt", "the lazy dog\nthe end\n"),
    ];

    let serial = standalone::run(&WordCount::default(), &config(dir.path(), inputs.clone(), 3, 1, 10))
        .await
        .unwrap();
    let parallel = standalone::run(&WordCount::default(), &config(dir.path(), inputs, 3, 2, 11))
        .await
        .unwrap();

    let serial = all_records(&serial.outputs);
    assert_eq!(serial, all_records(&parallel.outputs));
    assert!(serial.contains(&("the".to_string(), "3".to_string())));
}

#[tokio::test]
async fn repeated_runs_leave_only_outputs() {
    let dir = TempDir::new().unwrap();
    let inputs = vec![
        write_input(dir.path(), "x.txt", "x y z\n"),
        write_input(dir.path(), "y.txt", "y z\n"),
    ];

    for run_id in [20, 21] {
        standalone::run(&WordCount::default(), &config(dir.path(), inputs.clone(), 2, 2, run_id))
            .await
            .unwrap();
        assert_no_temporaries(dir.path());
    }

    let expected: BTreeSet<String> = [
        "x.txt",
        "y.txt",
        "red-out-p20.0000",
        "red-out-p20.0001",
        "red-out-p21.0000",
        "red-out-p21.0001",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    assert_eq!(file_names(dir.path()), expected);
}

#[tokio::test]
async fn unreadable_inputs_are_skipped() {
    let dir = TempDir::new().unwrap();
    let inputs = vec![
        write_input(dir.path(), "good.txt", "cat cat\n"),
        dir.path().join("missing.txt"),
    ];

    let summary = standalone::run(&WordCount::default(), &config(dir.path(), inputs, 1, 2, 30))
        .await
        .unwrap();

    assert_eq!(all_records(&summary.outputs), pairs(&[("cat", "2")]));
    assert_no_temporaries(dir.path());
}

#[tokio::test]
async fn failed_inputs_leave_no_partial_output() {
    let dir = TempDir::new().unwrap();
    let inputs = vec![
        write_input(dir.path(), "failing.txt", "partial\nbad\nnever\n"),
        write_input(dir.path(), "fine.txt", "kept\nkept\n"),
    ];

    let summary = standalone::run(&RejectBad, &config(dir.path(), inputs, 1, 2, 99))
        .await
        .unwrap();

    assert_eq!(all_records(&summary.outputs), pairs(&[("kept", "2")]));
    assert_no_temporaries(dir.path());
}

#[tokio::test]
async fn standard_input_is_mapped_when_no_files_are_given() {
    let dir = TempDir::new().unwrap();
    let stdin = Cursor::new(b"one\ntwo\nthree\n".to_vec());

    let summary = standalone::run_with_stdin(&LineCount, &config(dir.path(), Vec::new(), 1, 4, 40), stdin)
        .await
        .unwrap();

    assert_eq!(all_records(&summary.outputs), pairs(&[("finals", "1"), ("lines", "3")]));
    assert_no_temporaries(dir.path());
}

#[tokio::test]
async fn finalization_runs_once_after_all_files() {
    let dir = TempDir::new().unwrap();
    let inputs = vec![
        write_input(dir.path(), "1.txt", "a\nb\n"),
        write_input(dir.path(), "2.txt", "c\n"),
        write_input(dir.path(), "3.txt", "d\ne\nf\n"),
    ];

    let summary = standalone::run(&LineCount, &config(dir.path(), inputs, 1, 2, 50))
        .await
        .unwrap();

    assert_eq!(all_records(&summary.outputs), pairs(&[("finals", "1"), ("lines", "6")]));
}

#[tokio::test]
async fn empty_partitions_reduce_an_empty_group() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), "in.txt", "x\n");

    let summary = standalone::run(&LineCount, &config(dir.path(), vec![input], 3, 1, 60))
        .await
        .unwrap();

    let lines_partition = partition(b"lines", 3) as usize;
    let finals_partition = partition(b"finals", 3) as usize;
    for (p, output) in summary.outputs.iter().enumerate() {
        let mut expected = Vec::new();
        if p == lines_partition {
            expected.push(("lines".to_string(), "1".to_string()));
        }
        if p == finals_partition {
            expected.push(("finals".to_string(), "1".to_string()));
        }
        if expected.is_empty() {
            expected.push((String::new(), "0".to_string()));
        }
        expected.sort();
        let mut got = records(output);
        got.sort();
        assert_eq!(got, expected, "partition {}", p);
    }
}

#[tokio::test]
async fn failed_sort_does_not_abort_the_run() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), "in.txt", "the cat\n");
    let config = Config {
        sort_program: dir.path().join("no-such-sort").to_string_lossy().into_owned(),
        ..config(dir.path(), vec![input], 2, 1, 70)
    };

    let summary = standalone::run(&WordCount::default(), &config).await.unwrap();

    for output in &summary.outputs {
        assert!(output.exists());
        assert!(records(output).is_empty());
    }
    assert_no_temporaries(dir.path());
}

#[tokio::test]
async fn invalid_configuration_is_rejected_before_running() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), "in.txt", "a\n");
    let config = config(dir.path(), vec![input], 0, 1, 80);

    let err = standalone::run(&WordCount::default(), &config).await.unwrap_err();
    assert!(err.to_string().contains("partition count"));
    assert_eq!(file_names(dir.path()), BTreeSet::from(["in.txt".to_string()]));
}
