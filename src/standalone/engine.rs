use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::process::Command;
use tokio::task::{self, JoinSet};
use tracing::{debug, error, info, warn};

use crate::emitter::{DirectEmitter, PartitionedEmitter};
use crate::reporter;
use crate::runner::{run_map_final, run_map_phase, run_reduce_phase};
use crate::{Emitter, MapReduceJob};

use super::artifacts::{remove_files, ArtifactLayout};
use super::queue::WorkQueue;
use super::Config;

/// Where a finished run left its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// One file per partition, in partition order.
    pub outputs: Vec<PathBuf>,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outputs.as_slice() {
            [] => write!(f, "no output"),
            [only] => write!(f, "output is in: {}", only.display()),
            [first, .., last] => write!(
                f,
                "output is in: {} - {}",
                first.display(),
                last.display()
            ),
        }
    }
}

/// One input file assigned to a map worker.
#[derive(Debug)]
struct MapWork {
    index: usize,
    path: PathBuf,
}

/// Runs the whole pipeline, mapping standard input when `config` names no
/// input files.
pub async fn run<J>(job: &J, config: &Config) -> Result<RunSummary>
where
    J: MapReduceJob + Clone + Send + 'static,
{
    run_with_stdin(job, config, io::stdin()).await
}

/// Like [`run`], with `stdin` standing in for standard input.
pub async fn run_with_stdin<J, R>(job: &J, config: &Config, stdin: R) -> Result<RunSummary>
where
    J: MapReduceJob + Clone + Send + 'static,
    R: Read + Send + 'static,
{
    config.validate()?;
    let layout = Arc::new(ArtifactLayout::new(&config.work_dir, config.run_id));
    info!(
        run_id = config.run_id,
        partitions = config.partitions,
        mappers = config.mappers,
        reducers = config.reducers,
        inputs = config.inputs.len(),
        "starting map/reduce run"
    );

    let result = run_stages(job, config, stdin, &layout).await;

    let swept = layout.remove_leftovers();
    if swept > 0 {
        debug!("removed {} leftover temporary files", swept);
    }

    let summary = result?;
    reporter::status(&summary);
    info!("{}", summary);
    Ok(summary)
}

async fn run_stages<J, R>(
    job: &J,
    config: &Config,
    stdin: R,
    layout: &Arc<ArtifactLayout>,
) -> Result<RunSummary>
where
    J: MapReduceJob + Clone + Send + 'static,
    R: Read + Send + 'static,
{
    map_stage(job, config, stdin, layout).await?;
    reduce_stage(job, config, layout).await;

    Ok(RunSummary {
        outputs: (0..config.partitions)
            .map(|p| layout.reduce_output(p))
            .collect(),
    })
}

/////////////////////////////////////////////////////////////////////////////
// Map stage
/////////////////////////////////////////////////////////////////////////////

async fn map_stage<J, R>(
    job: &J,
    config: &Config,
    stdin: R,
    layout: &Arc<ArtifactLayout>,
) -> Result<()>
where
    J: MapReduceJob + Clone + Send + 'static,
    R: Read + Send + 'static,
{
    let partitions = config.partitions;

    if config.inputs.is_empty() {
        info!("mapping standard input");
        let mut job = job.clone();
        let template = layout.map_output_template(0);
        return task::spawn_blocking(move || -> Result<()> {
            let mut emitter = PartitionedEmitter::new(partitions, template);
            run_map_phase(&mut job, BufReader::new(stdin), &mut emitter)?;
            run_map_final(&mut job, &mut emitter)?;
            emitter.flush()?;
            emitter.close()?;
            Ok(())
        })
        .await?;
    }

    let queue = WorkQueue::new(
        config
            .inputs
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, path)| MapWork { index, path }),
    );
    let mut workers = JoinSet::new();
    for worker in 0..config.mappers.min(config.inputs.len()) {
        workers.spawn(map_worker(
            worker,
            job.clone(),
            queue.clone(),
            layout.clone(),
            partitions,
        ));
    }
    join_workers(&mut workers, "map").await;

    // Finalization gets its own mapper index so it never shares a file with
    // a per-input worker.
    let mut job = job.clone();
    let template = layout.map_output_template(config.inputs.len());
    task::spawn_blocking(move || -> Result<()> {
        let mut emitter = PartitionedEmitter::new(partitions, template);
        run_map_final(&mut job, &mut emitter)?;
        emitter.flush()?;
        emitter.close()?;
        Ok(())
    })
    .await?
}

async fn map_worker<J>(
    worker: usize,
    mut job: J,
    queue: WorkQueue<MapWork>,
    layout: Arc<ArtifactLayout>,
    partitions: u32,
) where
    J: MapReduceJob + Send + 'static,
{
    while let Some(work) = queue.next().await {
        debug!(worker, index = work.index, "mapping {}", work.path.display());
        let template = layout.map_output_template(work.index);
        let joined = task::spawn_blocking(move || {
            let result = map_file(&mut job, &work.path, template, partitions);
            (job, work, result)
        })
        .await;

        match joined {
            Ok((returned, work, result)) => {
                job = returned;
                if let Err(e) = result {
                    warn!(worker, "abandoning {}: {:#}", work.path.display(), e);
                    reporter::status(format!("err mapping {}: {:#}", work.path.display(), e));
                }
            }
            Err(e) => {
                error!(worker, "map worker died: {}", e);
                return;
            }
        }
    }
}

fn map_file<J>(job: &mut J, path: &Path, template: PathBuf, partitions: u32) -> Result<()>
where
    J: MapReduceJob,
{
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut emitter = PartitionedEmitter::new(partitions, template);
    let mapped = run_map_phase(job, BufReader::new(file), &mut emitter)
        .and_then(|()| Ok(emitter.flush()?));
    let closed = emitter.close();

    if mapped.is_err() || closed.is_err() {
        // An abandoned input contributes nothing to the shuffle.
        let partial: Vec<PathBuf> = emitter.file_names().iter().flatten().cloned().collect();
        let removed = remove_files(&partial);
        debug!("discarded {} partial map outputs of {}", removed, path.display());
    }
    mapped?;
    Ok(closed?)
}

/////////////////////////////////////////////////////////////////////////////
// Shuffle and reduce stage
/////////////////////////////////////////////////////////////////////////////

async fn reduce_stage<J>(job: &J, config: &Config, layout: &Arc<ArtifactLayout>)
where
    J: MapReduceJob + Clone + Send + 'static,
{
    let queue = WorkQueue::new(0..config.partitions);
    let sort_program: Arc<str> = Arc::from(config.sort_program.as_str());
    let mut workers = JoinSet::new();
    for worker in 0..config.reducers.min(config.partitions as usize) {
        workers.spawn(reduce_worker(
            worker,
            job.clone(),
            queue.clone(),
            layout.clone(),
            sort_program.clone(),
        ));
    }
    join_workers(&mut workers, "reduce").await;
}

async fn reduce_worker<J>(
    worker: usize,
    mut job: J,
    queue: WorkQueue<u32>,
    layout: Arc<ArtifactLayout>,
    sort_program: Arc<str>,
) where
    J: MapReduceJob + Send + 'static,
{
    while let Some(partition) = queue.next().await {
        let inputs = layout.map_outputs(partition).unwrap_or_else(|e| {
            warn!(worker, partition, "could not list map outputs: {:#}", e);
            Vec::new()
        });
        let sorted = layout.reduce_input(partition);
        let output = layout.reduce_output(partition);
        debug!(worker, partition, files = inputs.len(), "shuffling");

        if let Err(e) = sort_files(&sort_program, &sorted, &inputs).await {
            warn!(worker, partition, "sort failed: {:#}", e);
            reporter::status(format!("err running sort: {:#}", e));
        }

        let joined = task::spawn_blocking(move || {
            let result = reduce_file(&mut job, &sorted, &output);
            remove_files(&inputs);
            remove_files(&[&sorted]);
            (job, result)
        })
        .await;

        match joined {
            Ok((returned, result)) => {
                job = returned;
                if let Err(e) = result {
                    warn!(worker, partition, "reduce failed: {:#}", e);
                    reporter::status(format!("err reducing partition {}: {:#}", partition, e));
                }
            }
            Err(e) => {
                error!(worker, "reduce worker died: {}", e);
                return;
            }
        }
    }
}

/// Merge-sorts `inputs` into `output` with the external sort program.
///
/// Byte order (`LC_ALL=C`) keeps equal keys adjacent whatever the
/// caller's locale.
async fn sort_files(program: &str, output: &Path, inputs: &[PathBuf]) -> Result<()> {
    let status = Command::new(program)
        .env("LC_ALL", "C")
        .arg("-o")
        .arg(output)
        .args(inputs)
        .stdin(Stdio::null())
        .status()
        .await
        .with_context(|| format!("launching {}", program))?;
    if !status.success() {
        bail!("{} exited with {}", program, status);
    }
    Ok(())
}

fn reduce_file<J>(job: &mut J, sorted: &Path, output: &Path) -> Result<()>
where
    J: MapReduceJob,
{
    // A sort that never ran leaves nothing behind; reduce that as empty input.
    let input: Box<dyn BufRead> = match File::open(sorted) {
        Ok(file) => Box::new(BufReader::new(file)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Box::new(io::empty()),
        Err(e) => return Err(e).with_context(|| format!("opening {}", sorted.display())),
    };
    let file = File::create(output).with_context(|| format!("creating {}", output.display()))?;
    let mut emitter = DirectEmitter::new(file);
    run_reduce_phase(job, input, &mut emitter)?;
    emitter.flush()?;
    emitter.into_inner()?;
    Ok(())
}

async fn join_workers(workers: &mut JoinSet<()>, stage: &str) {
    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined {
            error!("{} worker failed: {}", stage, e);
        }
    }
}
