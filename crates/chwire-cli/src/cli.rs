use std::io::Write;

use anyhow::{Context, Result};
use chwire_types::{parse_signature, registered_types, ClickHouseType, SyntaxTreeNode, TypeCode};
use clap::{Parser, Subcommand};
use log::{debug, info, LevelFilter};
use serde::Serialize;

use crate::json::{from_json, to_json};

#[derive(Debug, Parser)]
#[command(name = "chwire")]
#[command(about = "Inspect ClickHouse type signatures and encode/decode RowBinary values.")]
pub struct Args {
    /// Log at info level, ignoring `RUST_LOG`.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse a type signature and describe the resulting descriptor.
    Parse(ParseArgs),
    /// List every registered type code.
    Types(TypesArgs),
    /// Decode one RowBinary value and print it as JSON.
    Decode(DecodeArgs),
    /// Encode one JSON value as RowBinary and print it as hex.
    Encode(EncodeArgs),
}

#[derive(Debug, Parser)]
struct ParseArgs {
    /// Type signature, e.g. `Array(Nullable(Decimal(18, 4)))`.
    signature: String,

    /// Emit a JSON report instead of text.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Parser)]
struct TypesArgs {
    /// Emit a JSON array instead of one name per line.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Parser)]
struct DecodeArgs {
    /// Column type signature.
    #[arg(long = "type")]
    signature: String,

    /// Encoded value as hex (whitespace and a `0x` prefix are ignored).
    #[arg(long)]
    hex: String,
}

#[derive(Debug, Parser)]
struct EncodeArgs {
    /// Column type signature.
    #[arg(long = "type")]
    signature: String,

    /// Value as JSON (e.g. `[1, null]` for `Array(Nullable(Int32))`).
    #[arg(long)]
    json: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ParseReport<'a> {
    signature: String,
    type_code: TypeCode,
    native_type: String,
    tree: &'a SyntaxTreeNode,
}

pub fn run() -> Result<()> {
    run_with_args(Args::parse())
}

pub fn run_with_args(args: Args) -> Result<()> {
    init_logging(args.verbose);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match args.command {
        Command::Parse(args) => parse(&args, &mut out),
        Command::Types(args) => types(&args, &mut out),
        Command::Decode(args) => decode(&args, &mut out),
        Command::Encode(args) => encode(&args, &mut out),
    }
}

fn init_logging(verbose: bool) {
    let mut builder = env_logger::builder();
    if verbose {
        builder.filter_level(LevelFilter::Info);
    }
    // A second initialization only happens when embedded in tests.
    if builder.try_init().is_ok() {
        if verbose {
            info!("verbose output enabled (ignoring RUST_LOG)");
        } else {
            debug!("logging configured from environment variables");
        }
    }
}

fn parse_type(signature: &str) -> Result<ClickHouseType> {
    chwire_types::parse_clickhouse_type(signature)
        .with_context(|| format!("failed to resolve type {signature:?}"))
}

fn parse(args: &ParseArgs, out: &mut impl Write) -> Result<()> {
    let tree = parse_signature(&args.signature)?;
    let ty = parse_type(&args.signature)?;
    let report = ParseReport {
        signature: ty.to_string(),
        type_code: ty.type_code(),
        native_type: ty.native_type().to_string(),
        tree: &tree,
    };

    if args.json {
        serde_json::to_writer(&mut *out, &report)?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(out, "signature: {}", report.signature)?;
    writeln!(out, "code:      {}", report.type_code)?;
    writeln!(out, "native:    {}", report.native_type)?;
    writeln!(out, "tree:")?;
    write_tree(out, &tree, 1)
}

fn write_tree(out: &mut impl Write, node: &SyntaxTreeNode, depth: usize) -> Result<()> {
    let indent = "  ".repeat(depth);
    match &node.field_name {
        Some(name) => writeln!(out, "{indent}{name}: {}", node.value)?,
        None => writeln!(out, "{indent}{}", node.value)?,
    }
    for child in &node.children {
        write_tree(out, child, depth + 1)?;
    }
    Ok(())
}

fn types(args: &TypesArgs, out: &mut impl Write) -> Result<()> {
    let codes = registered_types();
    if args.json {
        serde_json::to_writer(&mut *out, &codes)?;
        writeln!(out)?;
        return Ok(());
    }
    for code in codes {
        writeln!(out, "{code}")?;
    }
    Ok(())
}

fn decode(args: &DecodeArgs, out: &mut impl Write) -> Result<()> {
    let ty = parse_type(&args.signature)?;
    let bytes = parse_hex(&args.hex)?;
    let value = chwire_binary::read_value(&bytes, &ty)
        .with_context(|| format!("failed to decode {} bytes as {ty}", bytes.len()))?;
    serde_json::to_writer(&mut *out, &to_json(&value))?;
    writeln!(out)?;
    Ok(())
}

fn encode(args: &EncodeArgs, out: &mut impl Write) -> Result<()> {
    let ty = parse_type(&args.signature)?;
    let json: serde_json::Value =
        serde_json::from_str(&args.json).context("--json is not valid JSON")?;
    let value = from_json(&json, &ty)?;
    let bytes = chwire_binary::write_value(&ty, &value)
        .with_context(|| format!("failed to encode {json} as {ty}"))?;
    writeln!(out, "{}", hex::encode(bytes))?;
    Ok(())
}

fn parse_hex(input: &str) -> Result<Vec<u8>> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&digits).with_context(|| format!("invalid hex input {input:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn output(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn hex_input_is_forgiving() {
        assert_eq!(parse_hex("0x00 02\n01").unwrap(), vec![0, 2, 1]);
        assert!(parse_hex("abc").is_err());
    }

    #[test]
    fn parse_prints_a_tree() {
        let args = ParseArgs {
            signature: "Tuple(a Nullable(Int8), b String)".to_string(),
            json: false,
        };
        assert_eq!(
            output(|out| parse(&args, out)),
            "signature: Tuple(a Nullable(Int8), b String)\n\
             code:      Tuple\n\
             native:    (Option<i8>, String)\n\
             tree:\n  Tuple\n    a: Nullable\n      Int8\n    b: String\n"
        );
    }

    #[test]
    fn encode_then_decode() {
        let encoded = output(|out| {
            encode(
                &EncodeArgs {
                    signature: "Nullable(Array(Int32))".to_string(),
                    json: "[1, 2]".to_string(),
                },
                out,
            )
        });
        assert_eq!(encoded, "00020100000002000000\n");

        let decoded = output(|out| {
            decode(
                &DecodeArgs {
                    signature: "Nullable(Array(Int32))".to_string(),
                    hex: encoded.clone(),
                },
                out,
            )
        });
        assert_eq!(decoded, "[1,2]\n");
    }
}
