use clap::Parser;
use diagcat::{
    DecodeMode, DecodeSession, DecodedRecord, DecoderConfig,
    catalog::RegistryError,
    diag::DataType,
    ndjson_writer::NdjsonWriter,
    pcap::{GsmtapPcapError, GsmtapPcapWriter},
    qcat_writer::QcatWriter,
    qmdl::QmdlReader,
    summary::DumpSummary,
};
use futures::TryStreamExt;
use log::{error, info, warn};
use std::{
    future,
    path::{Path, PathBuf},
    pin::pin,
    process::ExitCode,
};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use walkdir::WalkDir;

mod config;

use config::{ConfigError, parse_config};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    #[arg(short = 'p', long, help = "A QMDL file or a directory of them")]
    path: PathBuf,

    #[arg(
        long,
        value_enum,
        help = "Output format, one of text, json or pcap [default: text, or the config file's mode]"
    )]
    format: Option<OutputFormat>,

    #[arg(short, long, help = "TOML decoder config")]
    config: Option<PathBuf>,

    #[arg(long, help = "Radio the capture was taken on")]
    radio_id: Option<u8>,

    #[arg(long, help = "Accept frames with a bad HDLC checksum")]
    disable_crc_check: bool,

    #[arg(long, help = "Skip event reports")]
    no_events: bool,

    #[arg(short, long, help = "Only print warnings/errors")]
    quiet: bool,

    #[arg(short, long, help = "Show debug messages")]
    debug: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Pcap,
}

impl OutputFormat {
    fn from_mode(mode: DecodeMode) -> Self {
        match mode {
            DecodeMode::Text => OutputFormat::Text,
            DecodeMode::Structured => OutputFormat::Json,
            DecodeMode::Network => OutputFormat::Pcap,
        }
    }

    fn mode(&self) -> DecodeMode {
        match self {
            OutputFormat::Text => DecodeMode::Text,
            OutputFormat::Json => DecodeMode::Structured,
            OutputFormat::Pcap => DecodeMode::Network,
        }
    }

    fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Text => "txt",
            OutputFormat::Json => "ndjson",
            OutputFormat::Pcap => "pcapng",
        }
    }
}

#[derive(Debug, Error)]
enum DecodeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Pcap(#[from] GsmtapPcapError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// One writer per output format, borrowing the output file so it can be
/// flushed once the writer is done.
enum Output<'a> {
    Text(QcatWriter<&'a mut File>),
    Json(NdjsonWriter<&'a mut File>),
    Pcap(GsmtapPcapWriter<&'a mut File>),
}

impl<'a> Output<'a> {
    async fn create(
        format: OutputFormat,
        file: &'a mut File,
        log_file_name: &str,
        radio_id: u8,
    ) -> Result<Self, DecodeError> {
        Ok(match format {
            OutputFormat::Text => Output::Text(QcatWriter::new(file, log_file_name).await?),
            OutputFormat::Json => Output::Json(NdjsonWriter::new(file)),
            OutputFormat::Pcap => {
                let mut writer = GsmtapPcapWriter::new(file, radio_id).await?;
                writer.write_iface_header().await?;
                Output::Pcap(writer)
            }
        })
    }

    async fn write(&mut self, record: &DecodedRecord) -> Result<(), DecodeError> {
        match self {
            Output::Text(writer) => {
                writer.write_record(record).await?;
            }
            Output::Json(writer) => writer.write(record).await?,
            Output::Pcap(writer) => {
                writer.write_record(record).await?;
            }
        }
        Ok(())
    }

    /// Structured output ends with the run summary.
    async fn finish(self, summary: &DumpSummary) -> Result<(), DecodeError> {
        match self {
            Output::Text(writer) => {
                writer.close().await?;
            }
            Output::Json(mut writer) => {
                writer.write(summary).await?;
                writer.close().await?;
            }
            Output::Pcap(_) => {}
        }
        Ok(())
    }
}

async fn decode_qmdl(
    qmdl_path: &Path,
    format: OutputFormat,
    config: &DecoderConfig,
) -> Result<DumpSummary, DecodeError> {
    let mut session = DecodeSession::new(config.clone(), Some(qmdl_path.display().to_string()))?;
    let qmdl_file = File::open(qmdl_path).await?;
    let file_size = qmdl_file.metadata().await?.len();
    let mut qmdl_reader = QmdlReader::new(qmdl_file, Some(file_size as usize));
    let mut qmdl_stream = pin!(
        qmdl_reader
            .as_stream()
            .try_filter(|container| future::ready(container.data_type == DataType::UserSpace))
    );

    let output_path = qmdl_path.with_extension(format.extension());
    let log_file_name = output_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut output_file = File::create(&output_path).await?;
    {
        let mut output =
            Output::create(format, &mut output_file, &log_file_name, config.radio_id).await?;
        while let Some(container) = qmdl_stream.try_next().await? {
            for record in session.decode_container(container) {
                output.write(&record).await?;
            }
        }
        output.finish(session.summary()).await?;
    }
    output_file.flush().await?;

    let summary = session.into_summary();
    info!(
        "{}: {} packets decoded ({} events), {} insufficient, {} framing errors",
        qmdl_path.display(),
        summary.decoded(),
        summary.events,
        summary.insufficient,
        summary.framing_errors
    );
    info!("wrote {}", output_path.display());
    Ok(summary)
}

async fn load_config(args: &Args) -> Result<(DecoderConfig, OutputFormat), DecodeError> {
    let mut config = parse_config(args.config.as_deref()).await?;
    let format = args
        .format
        .unwrap_or_else(|| OutputFormat::from_mode(config.mode));
    config.mode = format.mode();
    if let Some(radio_id) = args.radio_id {
        config.radio_id = radio_id;
    }
    if args.disable_crc_check {
        config.validate_crc = false;
    }
    if args.no_events {
        config.decode_events = false;
    }
    Ok((config, format))
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let level = if args.debug {
        log::LevelFilter::Debug
    } else if args.quiet {
        log::LevelFilter::Warn
    } else {
        log::LevelFilter::Info
    };
    if let Err(err) = simple_logger::SimpleLogger::new()
        .with_colors(true)
        .without_timestamps()
        .with_level(level)
        .init()
    {
        eprintln!("failed to initialize logging: {err}");
        return ExitCode::FAILURE;
    }

    let (config, format) = match load_config(&args).await {
        Ok(loaded) => loaded,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let mut total = DumpSummary::new(Some(args.path.display().to_string()));
    let mut failures = 0;
    for maybe_entry in WalkDir::new(&args.path) {
        let entry = match maybe_entry {
            Ok(entry) => entry,
            Err(err) => {
                error!("failed to open dir entry: {err}");
                failures += 1;
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "qmdl") {
            continue;
        }
        info!("**** Decoding {}", path.display());
        match decode_qmdl(path, format, &config).await {
            Ok(summary) => total.merge(&summary),
            Err(err) => {
                error!("{}: {err}", path.display());
                failures += 1;
            }
        }
    }

    if total.packets == 0 && failures == 0 {
        warn!("no packets decoded under {}", args.path.display());
    }
    if failures > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
