use std::collections::HashMap as StdHashMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use anyhow::anyhow;
use anyhow::bail;
use arrow_hash::DefaultHashBuilder;
use arrow_hash::HashMap;
use clap::Parser;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::info;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt as log_fmt;
use tracing_subscriber::prelude::*;

/// Replays a `GET`/`PUT` trace against the arrow table and checks every
/// `GET` against the expected value on its line.
#[derive(Parser, Debug)]
struct Args {
    /// Trace file to replay. Without it a trace is generated from the seed.
    #[arg(short = 't', long = "trace")]
    trace: Option<PathBuf>,

    /// Seed for the generated trace.
    #[arg(short = 's', long = "seed", default_value_t = 0)]
    seed: u64,

    /// Number of distinct keys in the generated trace.
    #[arg(short = 'u', long = "unique", default_value_t = 100)]
    unique: u64,

    /// Number of operations in the generated trace.
    #[arg(short = 'n', long = "length", default_value_t = 1000)]
    length: usize,

    /// Write the generated trace to this path before replaying it.
    #[arg(short = 'w', long = "write")]
    write: Option<PathBuf>,

    /// Initial cell count of the table.
    #[arg(short = 'c', long = "capacity", default_value_t = 8)]
    capacity: usize,

    /// Print every cell of the table after the replay.
    #[arg(long = "dump")]
    dump: bool,

    /// Log level used when RUST_LOG is unset.
    #[arg(long = "log-level", default_value = "info")]
    log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Get,
    Put,
}

/// One trace line: `OP key value`. For `GET` the value is the expected
/// result, `-1` when the key is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Record {
    op: Op,
    key: i64,
    value: i64,
}

impl FromStr for Record {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> anyhow::Result<Self> {
        let mut fields = line.split_whitespace();
        let (Some(op), Some(key), Some(value), None) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            bail!("expected `OP key value`, found {line:?}");
        };

        let op = match op {
            "GET" => Op::Get,
            "PUT" => Op::Put,
            other => bail!("unknown operation {other:?}"),
        };
        Ok(Record {
            op,
            key: key
                .parse::<i64>()
                .with_context(|| format!("bad key {key:?}"))?,
            value: value
                .parse::<i64>()
                .with_context(|| format!("bad value {value:?}"))?,
        })
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.op {
            Op::Get => "GET",
            Op::Put => "PUT",
        };
        write!(f, "{op} {} {}", self.key, self.value)
    }
}

/// Builds a trace with a fair coin between `GET` and `PUT`, giving every
/// `PUT` a fresh value.
fn generate_trace(seed: u64, unique: u64, length: usize) -> Vec<Record> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut oracle = StdHashMap::new();
    let mut next_value = 0;

    (0..length)
        .map(|_| {
            let put = rng.random_bool(0.5);
            let key = rng.random_range(0..unique) as i64;
            if put {
                oracle.insert(key, next_value);
                next_value += 1;
                Record {
                    op: Op::Put,
                    key,
                    value: next_value - 1,
                }
            } else {
                Record {
                    op: Op::Get,
                    key,
                    value: oracle.get(&key).copied().unwrap_or(-1),
                }
            }
        })
        .collect()
}

fn parse_trace(text: &str) -> anyhow::Result<Vec<Record>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(number, line)| {
            line.parse::<Record>()
                .with_context(|| format!("line {}", number + 1))
        })
        .collect()
}

fn setup_logging(level: &str) -> anyhow::Result<()> {
    let level = level
        .parse::<tracing::Level>()
        .map_err(|e| anyhow!("invalid log level {level:?}: {e}"))?;

    tracing_subscriber::registry()
        .with(log_fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .init();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    setup_logging(&args.log_level)?;

    let trace = match &args.trace {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            parse_trace(&text)?
        }
        None => {
            if args.unique == 0 {
                bail!("--unique must be at least 1");
            }
            let trace = generate_trace(args.seed, args.unique, args.length);
            if let Some(path) = &args.write {
                let text = trace
                    .iter()
                    .map(Record::to_string)
                    .collect::<Vec<_>>()
                    .join("\n");
                fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
                info!(path = %path.display(), records = trace.len(), "trace written");
            }
            trace
        }
    };

    let mut table: HashMap<i64, i64, DefaultHashBuilder> = HashMap::init(args.capacity)?;
    let mut mismatches = 0usize;

    for (number, record) in trace.iter().enumerate() {
        match record.op {
            Op::Put => {
                table.put(record.key, record.value)?;
            }
            Op::Get => {
                let got = table.get(&record.key).copied().unwrap_or(-1);
                if got != record.value {
                    warn!(line = number + 1, %record, got, "unexpected GET result");
                    mismatches += 1;
                }
            }
        }
    }

    info!(
        records = trace.len(),
        len = table.len(),
        capacity = table.capacity(),
        "replay finished"
    );

    table.check_invariants()?;
    table.debug_stats().print();
    table.print_displacement_histogram();

    if args.dump {
        for record in table.dump() {
            match (record.key, record.value) {
                (Some(key), Some(value)) => {
                    println!("{:>6} [{}] {} => {}", record.index, record.arrow, key, value)
                }
                _ => println!("{:>6} [{}]", record.index, record.arrow),
            }
        }
    }

    if mismatches > 0 {
        bail!("{mismatches} GET results did not match the trace");
    }
    println!("All {} records matched.", trace.len());
    Ok(())
}
