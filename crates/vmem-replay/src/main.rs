use clap::{Args as ClapArgs, Parser, Subcommand};
use env_logger::{Builder, Env};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use vmem::{AddressSpaceId, MemoryCapacity, VirtualAddress, VirtualMemory, VmemConfig};

mod trace;

use trace::{TraceRecord, parse_number, read_trace};

#[derive(Parser)]
#[command(name = "vmem-replay")]
#[command(about = "Replays address translation requests through the virtual memory engine")]
struct Args {
    #[command(flatten)]
    config: EngineArgs,

    /// Log every request (equivalent to RUST_LOG=trace)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs)]
struct EngineArgs {
    /// Size of a page-table page in bytes
    #[arg(long, default_value_t = 4096, global = true)]
    pte_page_size: u64,

    /// Number of page-table levels
    #[arg(long, default_value_t = 5, global = true)]
    levels: usize,

    /// Latency charged for every newly created mapping
    #[arg(long, default_value_t = 200, global = true)]
    minor_fault_penalty: u64,

    /// Physical memory size in bytes (decimal or 0x-prefixed hex)
    #[arg(long, default_value = "0x200000000", global = true)]
    memory_size: String,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a trace file of translate/pte requests
    Replay {
        /// Trace file, one request per line
        #[arg(short, long)]
        trace: PathBuf,
    },
    /// Request every entry a full page walk would read, then translate the address
    Walk {
        /// Virtual address to walk (in hexadecimal, e.g., 0xdeadbeef)
        #[arg(short, long)]
        address: String,

        /// Address space issuing the request
        #[arg(short, long, default_value_t = 0)]
        space: u32,
    },
}

/// Running totals over replayed requests.
#[derive(Debug, Default)]
struct Summary {
    requests: u64,
    faults: u64,
    penalty: u64,
}

impl Summary {
    fn record(&mut self, penalty: u64) {
        self.requests += 1;
        if penalty != 0 {
            self.faults += 1;
        }
        self.penalty += penalty;
    }
}

fn build_engine(args: &EngineArgs) -> Result<VirtualMemory, Box<dyn std::error::Error>> {
    let memory_size = parse_number::<u64>(&args.memory_size)
        .map_err(|e| format!("invalid memory size `{}`: {}", args.memory_size, e))?;
    let config = VmemConfig::default()
        .with_pte_page_size(args.pte_page_size)
        .with_levels(args.levels)
        .with_minor_fault_penalty(args.minor_fault_penalty);

    Ok(VirtualMemory::try_new(config, MemoryCapacity::bytes(memory_size))?)
}

fn replay(
    vmem: &mut VirtualMemory,
    trace: impl BufRead,
    out: &mut impl Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let records = read_trace(trace)?;
    let levels = vmem.levels();

    let mut summary = Summary::default();

    for record in records {
        match record {
            TraceRecord::Translate { space, vaddr } => {
                let result = vmem.translate(space, vaddr);
                summary.record(result.penalty);
                writeln!(
                    out,
                    "translate space={} vaddr={:#018x} paddr={:#018x} penalty={}",
                    space, vaddr, result.address, result.penalty
                )?;
            }
            TraceRecord::Pte {
                space,
                vaddr,
                level,
            } => {
                if level > levels {
                    return Err(
                        format!("level {} exceeds the {} configured levels", level, levels).into(),
                    );
                }
                let result = vmem.pte_address(space, vaddr, level);
                summary.record(result.penalty);
                writeln!(
                    out,
                    "pte       space={} vaddr={:#018x} level={} paddr={:#018x} penalty={}",
                    space, vaddr, level, result.address, result.penalty
                )?;
            }
        }
    }

    writeln!(
        out,
        "{} requests, {} minor faults, {} total penalty, {} pages available",
        summary.requests,
        summary.faults,
        summary.penalty,
        vmem.available_pages()
    )?;

    Ok(())
}

fn walk(
    vmem: &mut VirtualMemory,
    address: &str,
    space: u32,
    out: &mut impl Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let vaddr = VirtualAddress::new(
        parse_number::<u64>(address).map_err(|e| format!("invalid address `{}`: {}", address, e))?,
    );
    let space = AddressSpaceId::new(space);

    let mut summary = Summary::default();

    for level in (1..=vmem.levels()).rev() {
        let result = vmem.pte_address(space, vaddr, level);
        summary.record(result.penalty);
        writeln!(
            out,
            "level {} shift={:<2} index={:#05x} entry={:#018x} penalty={}",
            level,
            vmem.shift_amount(level),
            vmem.field_at(vaddr, level),
            result.address,
            result.penalty
        )?;
    }

    let leaf = vmem.translate(space, vaddr);
    summary.record(leaf.penalty);
    writeln!(
        out,
        "leaf    {:#018x} -> {:#018x} penalty={}",
        vaddr, leaf.address, leaf.penalty
    )?;
    writeln!(
        out,
        "{} requests, {} minor faults, {} total penalty",
        summary.requests, summary.faults, summary.penalty
    )?;

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let default_level = if args.verbose { "trace" } else { "warn" };
    Builder::from_env(Env::default().default_filter_or(default_level))
        .format_module_path(false)
        .init();

    let mut vmem = build_engine(&args.config)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match args.command {
        Command::Replay { trace } => {
            let file = File::open(&trace)
                .map_err(|e| format!("failed to open {}: {}", trace.display(), e))?;
            replay(&mut vmem, BufReader::new(file), &mut out)
        }
        Command::Walk { address, space } => walk(&mut vmem, &address, space, &mut out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn args_parse() {
        Args::command().debug_assert();
    }

    #[test]
    fn summary_counts_faults() {
        let mut summary = Summary::default();
        summary.record(200);
        summary.record(0);
        summary.record(200);
        assert_eq!(summary.requests, 3);
        assert_eq!(summary.faults, 2);
        assert_eq!(summary.penalty, 400);
    }

    #[test]
    fn builds_engine_from_flags() {
        let args = Args::parse_from([
            "vmem-replay",
            "--levels",
            "4",
            "--memory-size",
            "0x40000000",
            "walk",
            "--address",
            "0xdeadbeef",
        ]);
        let vmem = build_engine(&args.config).unwrap();
        assert_eq!(vmem.levels(), 4);
        assert_eq!(vmem.shift_amount(4), 48);
    }

    fn default_engine() -> VirtualMemory {
        let args = Args::parse_from(["vmem-replay", "walk", "-a", "0"]);
        build_engine(&args.config).unwrap()
    }

    #[test]
    fn replays_sample_trace() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("traces/walk.trace");
        let file = File::open(path).unwrap();
        let mut vmem = default_engine();
        let mut out = Vec::new();
        replay(&mut vmem, BufReader::new(file), &mut out).unwrap();

        let output = String::from_utf8(out).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 16);
        assert_eq!(
            lines[0],
            "pte       space=0 vaddr=0xffffffffffffffff level=5 paddr=0x0000000000100078 penalty=200"
        );
        assert_eq!(
            lines[5],
            "translate space=0 vaddr=0xffffffffffffffff paddr=0x0000000000101fff penalty=200"
        );

        // The second walk reuses every upper-level entry of the first.
        assert_eq!(
            lines[6],
            "pte       space=0 vaddr=0xffffffffffc00000 level=5 paddr=0x0000000000100078 penalty=0"
        );
        assert_eq!(
            lines[7],
            "pte       space=0 vaddr=0xffffffffffc00000 level=4 paddr=0x0000000000107ff8 penalty=0"
        );
        assert_eq!(
            lines[10],
            "pte       space=0 vaddr=0xffffffffffc00000 level=1 paddr=0x0000000000106000 penalty=200"
        );

        assert_eq!(
            lines[12],
            "translate space=1 vaddr=0x00000000deadbeef paddr=0x0000000000103eef penalty=200"
        );
        assert_eq!(
            lines[14],
            "translate space=0 vaddr=0x00000000deadbeef paddr=0x0000000000104eef penalty=0"
        );
        assert_eq!(
            lines[15],
            format!(
                "15 requests, 10 minor faults, 2000 total penalty, {} pages available",
                (1u64 << 60) - 261
            )
        );
    }

    #[test]
    fn replay_rejects_levels_past_depth() {
        let mut vmem = default_engine();
        let mut out = Vec::new();
        let err = replay(&mut vmem, "t 0 0x1000\np 0 0x1000 9\n".as_bytes(), &mut out).unwrap_err();
        assert_eq!(err.to_string(), "level 9 exceeds the 5 configured levels");
        assert!(String::from_utf8(out).unwrap().starts_with("translate space=0"));
    }

    #[test]
    fn walks_every_level() {
        let mut vmem = default_engine();
        let mut out = Vec::new();
        walk(&mut vmem, "0xdeadbeef", 0, &mut out).unwrap();

        let output = String::from_utf8(out).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 7);
        assert!(lines[0].starts_with("level 5 shift=60 index=0x000 "));
        assert_eq!(
            lines[4],
            "level 1 shift=12 index=0xadb entry=0x00000000001056d8 penalty=200"
        );
        assert_eq!(
            lines[5],
            "leaf    0x00000000deadbeef -> 0x0000000000101eef penalty=200"
        );
        assert_eq!(lines[6], "6 requests, 6 minor faults, 1200 total penalty");
    }

    #[test]
    fn walk_rejects_bad_address() {
        let mut vmem = default_engine();
        assert!(walk(&mut vmem, "0xnope", 0, &mut Vec::<u8>::new()).is_err());
    }

    #[test]
    fn rejects_invalid_engine_flags() {
        let args = Args::parse_from(["vmem-replay", "--pte-page-size", "1024", "walk", "-a", "0"]);
        assert!(build_engine(&args.config).is_err());
    }
}
