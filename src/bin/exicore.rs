//! exicore CLI — XML <-> EXI conversion.

use std::io::{IsTerminal, Read, Write};
use std::path::Path;
use std::process;

use clap::{Args, Parser, Subcommand};
use exicore::diag::{DiagnosticSink, WriteSink};
use exicore::encoder::EncoderConfig;
use exicore::options::{Alignment, ExiOptions, Preserve, SchemaId};
use exicore::{decoder, encoder, xml, xml_serializer};

#[derive(Parser)]
#[command(name = "exicore", about = "XML <-> EXI conversion", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Encode XML to EXI
    Encode(EncodeArgs),
    /// Decode EXI to XML
    Decode(DecodeArgs),
}

#[derive(Args)]
struct EncodeArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Always include options in the EXI header (default: auto)
    #[arg(long, conflicts_with = "no_include_options")]
    include_options: bool,

    /// Never include options in the EXI header
    #[arg(long)]
    no_include_options: bool,

    /// Write the "$EXI" cookie
    #[arg(long)]
    include_cookie: bool,
}

#[derive(Args)]
struct DecodeArgs {
    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args)]
struct CommonArgs {
    /// Input file (- for stdin)
    #[arg(short, long)]
    input: String,

    /// Output file (default: derived from input; - for stdout)
    #[arg(short, long)]
    output: Option<String>,

    // -- Alignment (gegenseitig ausschließend) --
    /// Byte alignment
    #[arg(long, conflicts_with_all = ["pre_compression", "compression"])]
    byte_aligned: bool,

    /// Pre-compression alignment (recognized, body not implemented)
    #[arg(long, conflicts_with_all = ["byte_aligned", "compression"])]
    pre_compression: bool,

    /// DEFLATE compression (recognized, body not implemented)
    #[arg(long, conflicts_with_all = ["byte_aligned", "pre_compression"])]
    compression: bool,

    // -- Modus --
    /// Strict mode
    #[arg(long)]
    strict: bool,

    /// Fragment mode
    #[arg(long)]
    fragment: bool,

    // -- Fidelity --
    /// Preserve comments (CM)
    #[arg(long)]
    preserve_comments: bool,

    /// Preserve processing instructions (PI)
    #[arg(long)]
    preserve_pis: bool,

    /// Preserve DTD information (DT/ER)
    #[arg(long)]
    preserve_dtd: bool,

    /// Preserve namespace prefixes (NS)
    #[arg(long)]
    preserve_prefixes: bool,

    /// Preserve lexical values
    #[arg(long)]
    preserve_lexical: bool,

    /// Preserve insignificant whitespace (default: stripped)
    #[arg(long)]
    preserve_whitespace: bool,

    /// Enable self-contained element productions
    #[arg(long)]
    self_contained: bool,

    // -- Schema-ID im Header --
    /// Schema ID in the EXI header
    #[arg(long, conflicts_with_all = ["schema_id_none", "schema_id_builtin"])]
    schema_id: Option<String>,

    /// Schema ID = nil (explicitly schema-less)
    #[arg(long, conflicts_with_all = ["schema_id", "schema_id_builtin"])]
    schema_id_none: bool,

    /// Schema ID = empty (built-in types only)
    #[arg(long, conflicts_with_all = ["schema_id", "schema_id_none"])]
    schema_id_builtin: bool,

    // -- Limits --
    /// Compression block size
    #[arg(long, default_value_t = 1_000_000)]
    block_size: u32,

    /// String table: maximum value length
    #[arg(long)]
    value_max_length: Option<u32>,

    /// String table: value partition capacity
    #[arg(long)]
    value_capacity: Option<u32>,
}

impl CommonArgs {
    fn to_options(&self) -> ExiOptions {
        let alignment = if self.byte_aligned {
            Alignment::ByteAlignment
        } else if self.pre_compression {
            Alignment::PreCompression
        } else {
            Alignment::BitPacked
        };
        let schema_id = if self.schema_id_none {
            Some(SchemaId::None)
        } else if self.schema_id_builtin {
            Some(SchemaId::BuiltinOnly)
        } else {
            self.schema_id.clone().map(SchemaId::Id)
        };
        ExiOptions {
            alignment,
            compression: self.compression,
            strict: self.strict,
            fragment: self.fragment,
            preserve: Preserve {
                comments: self.preserve_comments,
                pis: self.preserve_pis,
                dtd: self.preserve_dtd,
                prefixes: self.preserve_prefixes,
                lexical_values: self.preserve_lexical,
                whitespace: self.preserve_whitespace,
            },
            self_contained: self.self_contained,
            schema_id,
            datatype_representation_map: Vec::new(),
            block_size: self.block_size,
            value_max_length: self.value_max_length,
            value_partition_capacity: self.value_capacity,
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Fehler: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Encode(args) => run_encode(args),
        Command::Decode(args) => run_decode(args),
    }
}

fn run_encode(args: EncodeArgs) -> Result<(), String> {
    let opts = args.common.to_options();
    opts.validate().map_err(|e| format!("Ungültige Optionen: {e}"))?;

    let include_options = if args.no_include_options {
        Some(false)
    } else if args.include_options {
        Some(true)
    } else {
        None
    };
    let config = EncoderConfig {
        include_cookie: args.include_cookie,
        include_options,
    };

    let input = read_input(&args.common.input)?;
    let xml_text =
        String::from_utf8(input).map_err(|e| format!("Eingabe ist kein UTF-8: {e}"))?;
    let events = xml::parse_xml_events_from_str(&xml_text, &opts)
        .map_err(|e| report("parse", &e))?;

    let mut enc = encoder::Encoder::new(opts, config).map_err(|e| report("encode", &e))?;
    for event in &events {
        enc.encode_event(event).map_err(|e| report("encode", &e))?;
    }
    let bytes = enc.finish().map_err(|e| report("encode", &e))?;

    let output = resolve_output_path(args.common.output.as_deref(), &args.common.input, "exi")?;
    write_output(&output, &bytes)
}

fn run_decode(args: DecodeArgs) -> Result<(), String> {
    let opts = args.common.to_options();
    opts.validate().map_err(|e| format!("Ungültige Optionen: {e}"))?;

    let input = load_decode_input(&args.common.input)?;
    let data: &[u8] = &input;

    let mut decoder = decoder::Decoder::with_options(data, opts);
    let mut collector = exicore::EventCollector::new();
    if let Err(e) = decoder.run(&mut collector) {
        let mut sink = WriteSink::new(std::io::stderr());
        sink.report(&e, Some(decoder.bit_position()));
        return Err(format!("Decode fehlgeschlagen: {e}"));
    }

    let xml_text = xml_serializer::events_to_xml(&collector.into_events())
        .map_err(|e| report("serialize", &e))?;

    let output = resolve_output_path(args.common.output.as_deref(), &args.common.input, "xml")?;
    write_output(&output, xml_text.as_bytes())
}

fn report(stage: &str, e: &exicore::Error) -> String {
    let mut sink = WriteSink::new(std::io::stderr());
    sink.report(e, None);
    format!("{stage} fehlgeschlagen: {e}")
}

fn read_input(path: &str) -> Result<Vec<u8>, String> {
    if path == "-" {
        if std::io::stdin().is_terminal() {
            eprintln!("Lese von stdin (Ctrl+D zum Beenden)...");
        }
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .map_err(|e| format!("Lesefehler (stdin): {e}"))?;
        Ok(buf)
    } else {
        std::fs::read(path).map_err(|e| format!("Lesefehler '{path}': {e}"))
    }
}

/// Besitzer der Decode-Eingabe: Mmap oder Vec, je nach Feature und Quelle.
enum DecodeInput {
    Buf(Vec<u8>),
    #[cfg(feature = "mmap")]
    Mmap(memmap2::Mmap),
}

impl std::ops::Deref for DecodeInput {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        match self {
            DecodeInput::Buf(v) => v,
            #[cfg(feature = "mmap")]
            DecodeInput::Mmap(m) => m,
        }
    }
}

fn load_decode_input(path: &str) -> Result<DecodeInput, String> {
    if path != "-" {
        #[cfg(feature = "mmap")]
        {
            let file = std::fs::File::open(path)
                .map_err(|e| format!("Lesefehler '{path}': {e}"))?;
            let mmap = unsafe { memmap2::Mmap::map(&file) }
                .map_err(|e| format!("Mmap-Fehler '{path}': {e}"))?;
            return Ok(DecodeInput::Mmap(mmap));
        }
        #[cfg(not(feature = "mmap"))]
        {
            return std::fs::read(path)
                .map(DecodeInput::Buf)
                .map_err(|e| format!("Lesefehler '{path}': {e}"));
        }
    }
    read_input("-").map(DecodeInput::Buf)
}

fn write_output(path: &str, bytes: &[u8]) -> Result<(), String> {
    if path == "-" {
        std::io::stdout()
            .write_all(bytes)
            .map_err(|e| format!("Schreibfehler (stdout): {e}"))
    } else {
        // Atomar: erst .tmp, bei Erfolg umbenennen
        let tmp = format!("{path}.tmp");
        std::fs::write(&tmp, bytes).map_err(|e| format!("Schreibfehler '{tmp}': {e}"))?;
        std::fs::rename(&tmp, path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            format!("Rename-Fehler: {e}")
        })
    }
}

/// Leitet den Output-Pfad aus der Eingabe ab (Extension ersetzen).
fn resolve_output_path(explicit: Option<&str>, input: &str, ext: &str) -> Result<String, String> {
    if let Some(path) = explicit {
        return Ok(path.to_string());
    }
    if input == "-" {
        return Err("ohne -o braucht es eine Eingabedatei (nicht stdin)".into());
    }
    let path = Path::new(input);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| "ungültiger Eingabepfad".to_string())?;
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    Ok(parent.join(format!("{stem}.{ext}")).to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse_cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("CLI parse failed")
    }

    #[test]
    fn alignment_flags_conflict() {
        assert!(Cli::try_parse_from([
            "exicore", "encode", "-i", "in.xml", "--byte-aligned", "--compression",
        ])
        .is_err());
    }

    #[test]
    fn schema_id_flags_conflict() {
        assert!(Cli::try_parse_from([
            "exicore", "encode", "-i", "in.xml", "--schema-id", "urn:x", "--schema-id-none",
        ])
        .is_err());
    }

    #[test]
    fn to_options_maps_fidelity_flags() {
        let cli = parse_cli(&[
            "exicore",
            "encode",
            "-i",
            "in.xml",
            "--preserve-comments",
            "--preserve-prefixes",
            "--fragment",
            "--value-capacity",
            "64",
        ]);
        let Command::Encode(args) = cli.command else {
            panic!("expected encode command");
        };
        let opts = args.common.to_options();
        assert!(opts.preserve.comments);
        assert!(opts.preserve.prefixes);
        assert!(opts.fragment);
        assert_eq!(opts.value_partition_capacity, Some(64));
    }

    #[test]
    fn to_options_maps_schema_id() {
        let cli = parse_cli(&[
            "exicore", "encode", "-i", "in.xml", "--schema-id-builtin",
        ]);
        let Command::Encode(args) = cli.command else {
            panic!("expected encode command");
        };
        assert_eq!(
            args.common.to_options().schema_id,
            Some(SchemaId::BuiltinOnly)
        );
    }

    #[test]
    fn output_path_derivation() {
        assert_eq!(
            resolve_output_path(None, "dir/doc.xml", "exi").unwrap(),
            "dir/doc.exi"
        );
        assert_eq!(
            resolve_output_path(Some("-"), "doc.xml", "exi").unwrap(),
            "-"
        );
        assert!(resolve_output_path(None, "-", "exi").is_err());
    }
}
