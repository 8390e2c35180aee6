//! Command line parsing. Subcommands are matched by hand, their options
//! go through getopts: short flags bundle (`-ps`), values attach or follow
//! (`-w512`, `-w 512`), options may sit between positionals and `--` ends
//! them.

use getopts::{Fail, Options};
use thiserror::Error;

use crate::net::tcp::{TcpFlags, DEFAULT_WINDOW};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CliError {
    #[error("no command given, use --help to see usage")]
    MissingCommand,

    #[error("unknown command '{0}', use --help to see usage")]
    UnknownCommand(String),

    #[error("unrecognized option '{0}'")]
    UnknownOption(String),

    #[error("option '{0}' needs a value")]
    MissingValue(String),

    #[error("{0}")]
    Options(String),

    #[error("invalid {what}: '{value}'")]
    InvalidNumber { what: &'static str, value: String },

    #[error("{command} expects {expected} arguments ({usage}), got {found}")]
    WrongArgumentCount {
        command: &'static str,
        usage: &'static str,
        expected: usize,
        found: usize,
    },
}

impl From<Fail> for CliError {
    fn from(fail: Fail) -> Self {
        match fail {
            Fail::UnrecognizedOption(option) => CliError::UnknownOption(option),
            Fail::ArgumentMissing(option) => CliError::MissingValue(option),
            other => CliError::Options(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpOptions {
    pub source_host: String,
    pub destination_host: String,
    pub source_port: u16,
    pub destination_port: u16,
    pub sequence_number: u32,
    pub ack_number: u32,
    pub window: u16,
    pub flags: TcpFlags,
    pub data: String,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpOptions {
    pub source_host: String,
    pub destination_host: String,
    pub source_port: u16,
    pub destination_port: u16,
    pub data: String,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveOptions {
    pub protocol: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Tcp(TcpOptions),
    Udp(UdpOptions),
    Receive(ReceiveOptions),
}

/// Parses an unsigned number the way strtoul(.., 0) does: `0x` prefix for
/// hex, leading `0` for octal, decimal otherwise.
pub fn parse_number<T: TryFrom<u64>>(what: &'static str, value: &str) -> Result<T, CliError> {
    let invalid = || CliError::InvalidNumber {
        what,
        value: value.to_string(),
    };

    let parsed = (if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
    } else if value.len() > 1 && value.starts_with('0') {
        u64::from_str_radix(&value[1..], 8)
    } else {
        value.parse::<u64>()
    })
    .map_err(|_| invalid())?;

    T::try_from(parsed).map_err(|_| invalid())
}

fn expect_positionals(
    command: &'static str,
    usage: &'static str,
    positionals: &[String],
    expected: usize,
) -> Result<(), CliError> {
    if positionals.len() != expected {
        return Err(CliError::WrongArgumentCount {
            command,
            usage,
            expected,
            found: positionals.len(),
        });
    }
    Ok(())
}

fn dry_run_option(options: &mut Options) {
    options.optflag("", "dry-run", "print the datagram instead of sending it");
}

fn parse_tcp(args: &[String]) -> Result<TcpOptions, CliError> {
    const USAGE: &str = "<src-host> <dst-host> <src-port> <dst-port> <seq-num> <data>";
    let mut options = Options::new();
    options
        .optopt("a", "", "acknowledgment number", "NUM")
        .optopt("w", "", "window size", "SIZE")
        .optflag("f", "", "FIN flag")
        .optflag("p", "", "PSH flag")
        .optflag("r", "", "RST flag")
        .optflag("s", "", "SYN flag");
    dry_run_option(&mut options);

    let matches = options.parse(args)?;
    let positionals = &matches.free;
    expect_positionals("tcp", USAGE, positionals, 6)?;

    let ack_number = match matches.opt_str("a") {
        Some(value) => parse_number("acknowledgment number", &value)?,
        None => 0,
    };
    let window = match matches.opt_str("w") {
        Some(value) => parse_number("window size", &value)?,
        None => DEFAULT_WINDOW,
    };

    let mut flags = TcpFlags::empty();
    for (option, flag) in [
        ("f", TcpFlags::FIN),
        ("p", TcpFlags::PSH),
        ("r", TcpFlags::RST),
        ("s", TcpFlags::SYN),
    ] {
        flags.set(flag, matches.opt_present(option));
    }

    Ok(TcpOptions {
        source_host: positionals[0].clone(),
        destination_host: positionals[1].clone(),
        source_port: parse_number("source port", &positionals[2])?,
        destination_port: parse_number("destination port", &positionals[3])?,
        sequence_number: parse_number("sequence number", &positionals[4])?,
        ack_number,
        window,
        flags,
        data: positionals[5].clone(),
        dry_run: matches.opt_present("dry-run"),
    })
}

fn parse_udp(args: &[String]) -> Result<UdpOptions, CliError> {
    const USAGE: &str = "<src-host> <dst-host> <src-port> <dst-port> <data>";
    let mut options = Options::new();
    dry_run_option(&mut options);

    let matches = options.parse(args)?;
    let positionals = &matches.free;
    expect_positionals("udp", USAGE, positionals, 5)?;

    Ok(UdpOptions {
        source_host: positionals[0].clone(),
        destination_host: positionals[1].clone(),
        source_port: parse_number("source port", &positionals[2])?,
        destination_port: parse_number("destination port", &positionals[3])?,
        data: positionals[4].clone(),
        dry_run: matches.opt_present("dry-run"),
    })
}

fn parse_receive(args: &[String]) -> Result<ReceiveOptions, CliError> {
    let matches = Options::new().parse(args)?;
    expect_positionals("recv", "<protocol>", &matches.free, 1)?;

    Ok(ReceiveOptions {
        protocol: parse_number("protocol number", &matches.free[0])?,
    })
}

/// Parses everything after the program name.
pub fn parse_args(args: &[String]) -> Result<Command, CliError> {
    let Some((command, rest)) = args.split_first() else {
        return Err(CliError::MissingCommand);
    };

    match command.as_str() {
        "--help" | "-h" | "help" => Ok(Command::Help),
        "tcp" => parse_tcp(rest).map(Command::Tcp),
        "udp" => parse_udp(rest).map(Command::Udp),
        "recv" => parse_receive(rest).map(Command::Receive),
        other => Err(CliError::UnknownCommand(other.to_string())),
    }
}

pub fn help(program_name: &str) -> String {
    format!(
        "
Build an IPv4 datagram by hand and send it over a raw socket (needs CAP_NET_RAW).

Usage:
    {program_name} tcp [options] <src-host> <dst-host> <src-port> <dst-port> <seq-num> <data>
    {program_name} udp [--dry-run] <src-host> <dst-host> <src-port> <dst-port> <data>
    {program_name} recv <protocol>
    {program_name} --help | -h

TCP options:
    -a <num>     Acknowledgment number (sets ACK when non-zero)
    -f           FIN flag
    -p           PSH flag
    -r           RST flag
    -s           SYN flag
    -w <size>    Window size (default {DEFAULT_WINDOW})
    --dry-run    Print the datagram instead of sending it

Numbers accept decimal, 0x-prefixed hex or 0-prefixed octal.
Set RUST_LOG=rawsend=debug to log hexdumps of every datagram built.

Examples:
    {program_name} tcp -w 512 -p -a 3102459363 localhost localhost 40704 50000 959585323 xxx
    {program_name} udp --dry-run 10.0.0.1 10.0.0.2 40000 53 abc
    {program_name} recv 17
"
    )
}
