use std::fs::OpenOptions;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use compressed_list::util::read_lines;
use compressed_list::{
    write_list_with_config, Codec, CompressedList, I64Codec, ListConfig, StringCodec,
};

#[derive(Parser)]
#[command(name = "compressed-list", version, about = "Compressed list tooling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum CodecKind {
    String,
    I64,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a list from a text file, one element per line.
    Build {
        input: PathBuf,
        output: PathBuf,
        #[arg(long = "threshold")]
        threshold: Option<usize>,
        #[arg(long = "codec", value_enum, default_value_t = CodecKind::String)]
        codec: CodecKind,
        #[arg(long = "config")]
        config: Option<PathBuf>,
        /// Append after existing content instead of truncating.
        #[arg(long = "append")]
        append: bool,
    },
    Stat {
        file: PathBuf,
        #[arg(long = "offset", default_value_t = 0)]
        offset: u64,
    },
    Get {
        file: PathBuf,
        index: usize,
        #[arg(long = "codec", value_enum, default_value_t = CodecKind::String)]
        codec: CodecKind,
        #[arg(long = "offset", default_value_t = 0)]
        offset: u64,
    },
    Dump {
        file: PathBuf,
        #[arg(long = "codec", value_enum, default_value_t = CodecKind::String)]
        codec: CodecKind,
        #[arg(long = "offset", default_value_t = 0)]
        offset: u64,
        #[arg(long = "limit")]
        limit: Option<usize>,
    },
}

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut out = io::BufWriter::new(io::stdout());
    match cli.command {
        Commands::Build {
            input,
            output,
            threshold,
            codec,
            config,
            append,
        } => cmd_build(&input, &output, threshold, codec, config.as_deref(), append, &mut out)?,
        Commands::Stat { file, offset } => cmd_stat(&file, offset, &mut out)?,
        Commands::Get {
            file,
            index,
            codec,
            offset,
        } => match codec {
            CodecKind::String => cmd_get::<String, _>(&file, offset, index, StringCodec, &mut out)?,
            CodecKind::I64 => cmd_get::<i64, _>(&file, offset, index, I64Codec, &mut out)?,
        },
        Commands::Dump {
            file,
            codec,
            offset,
            limit,
        } => match codec {
            CodecKind::String => cmd_dump::<String, _>(&file, offset, limit, StringCodec, &mut out)?,
            CodecKind::I64 => cmd_dump::<i64, _>(&file, offset, limit, I64Codec, &mut out)?,
        },
    }
    out.flush()?;
    Ok(())
}

fn cmd_build(
    input: &Path,
    output: &Path,
    threshold: Option<usize>,
    codec: CodecKind,
    config_path: Option<&Path>,
    append: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => ListConfig::load(path)?,
        None => ListConfig::default(),
    };
    if let Some(threshold) = threshold {
        config.chunk_threshold_bytes = threshold;
    }

    let lines = read_lines(input).with_context(|| format!("read {}", input.display()))?;
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(!append)
        .open(output)
        .with_context(|| format!("open {}", output.display()))?;
    file.seek(SeekFrom::End(0))?;

    let summary = match codec {
        CodecKind::String => write_list_with_config(&mut file, &lines, StringCodec, &config)?,
        CodecKind::I64 => {
            let numbers = lines
                .iter()
                .enumerate()
                .map(|(n, line)| {
                    line.trim()
                        .parse::<i64>()
                        .map_err(|err| anyhow!("line {}: {err}", n + 1))
                })
                .collect::<Result<Vec<_>>>()?;
            write_list_with_config(&mut file, &numbers, I64Codec, &config)?
        }
    };
    file.sync_all()?;

    writeln!(out, "file={}", output.display())?;
    writeln!(
        out,
        "start_offset={} toc_offset={} end_offset={}",
        summary.start_offset, summary.toc_offset, summary.end_offset
    )?;
    writeln!(
        out,
        "elements={} chunks={} bytes={}",
        summary.num_elements,
        summary.num_chunks,
        summary.total_bytes()
    )?;
    Ok(())
}

fn cmd_stat(file: &Path, offset: u64, out: &mut dyn Write) -> Result<()> {
    // Stats never decode elements, so any codec will do.
    let list = CompressedList::<String, StringCodec>::open_path(file, StringCodec, offset)
        .with_context(|| format!("open {}", file.display()))?;
    writeln!(out, "file={}", file.display())?;
    writeln!(
        out,
        "start_offset={} toc_offset={}",
        list.start_offset(),
        list.toc_offset()
    )?;
    writeln!(
        out,
        "elements={} chunks={} toc_bytes={}",
        list.len(),
        list.num_chunks(),
        list.toc_bytes()
    )?;
    for (chunk, (first, last)) in list.chunk_ranges().enumerate() {
        writeln!(out, "chunk={chunk} elements=[{first}, {last})")?;
    }
    Ok(())
}

fn cmd_get<T, C>(file: &Path, offset: u64, index: usize, codec: C, out: &mut dyn Write) -> Result<()>
where
    T: std::fmt::Display,
    C: Codec<T>,
{
    let list = CompressedList::<T, C>::open_path(file, codec, offset)
        .with_context(|| format!("open {}", file.display()))?;
    let value = list.get(index)?;
    writeln!(out, "{value}")?;
    Ok(())
}

fn cmd_dump<T, C>(
    file: &Path,
    offset: u64,
    limit: Option<usize>,
    codec: C,
    out: &mut dyn Write,
) -> Result<()>
where
    T: std::fmt::Display,
    C: Codec<T>,
{
    let list = CompressedList::<T, C>::open_path(file, codec, offset)
        .with_context(|| format!("open {}", file.display()))?;
    let limit = limit.unwrap_or(usize::MAX);
    for (index, value) in list.iter().enumerate().take(limit) {
        writeln!(out, "{index}\t{}", value?)?;
    }
    Ok(())
}
