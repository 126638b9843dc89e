//! Hand-rolled parsing for the four required startup parameters. No argument
//! parsing crate is pulled in for four flags read once at startup.

use std::fmt;
use std::net::IpAddr;

#[derive(Debug, Clone)]
pub struct Args {
    pub source: IpAddr,
    pub destination: IpAddr,
    pub src_port: u16,
    pub dest_port: u16,
}

#[derive(Debug)]
pub enum ParseError {
    Missing(&'static str),
    Invalid(&'static str, String),
    Unknown(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Missing(flag) => write!(f, "missing required argument --{flag}"),
            ParseError::Invalid(flag, value) => {
                write!(f, "invalid value {value:?} for --{flag}")
            }
            ParseError::Unknown(flag) => write!(f, "unrecognized argument {flag}"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Parses `--source <ip> --destination <ip> --src_port <port> --dest_port <port>`,
/// in any order, `--flag value` or `--flag=value` form.
pub fn parse(mut args: impl Iterator<Item = String>) -> Result<Args, ParseError> {
    let _program = args.next();

    let mut source = None;
    let mut destination = None;
    let mut src_port = None;
    let mut dest_port = None;

    while let Some(flag) = args.next() {
        let (name, inline_value) = match flag.split_once('=') {
            Some((name, value)) => (name.to_string(), Some(value.to_string())),
            None => (flag.clone(), None),
        };

        let mut next_value = || -> Result<String, ParseError> {
            if let Some(value) = &inline_value {
                return Ok(value.clone());
            }
            args.next()
                .ok_or_else(|| ParseError::Missing(leaked_flag_name(&name)))
        };

        match name.as_str() {
            "--source" => {
                let value = next_value()?;
                source = Some(
                    value
                        .parse()
                        .map_err(|_| ParseError::Invalid("source", value))?,
                );
            }
            "--destination" => {
                let value = next_value()?;
                destination = Some(
                    value
                        .parse()
                        .map_err(|_| ParseError::Invalid("destination", value))?,
                );
            }
            "--src_port" => {
                let value = next_value()?;
                src_port = Some(
                    value
                        .parse()
                        .map_err(|_| ParseError::Invalid("src_port", value))?,
                );
            }
            "--dest_port" => {
                let value = next_value()?;
                dest_port = Some(
                    value
                        .parse()
                        .map_err(|_| ParseError::Invalid("dest_port", value))?,
                );
            }
            other => return Err(ParseError::Unknown(other.to_string())),
        }
    }

    Ok(Args {
        source: source.ok_or(ParseError::Missing("source"))?,
        destination: destination.ok_or(ParseError::Missing("destination"))?,
        src_port: src_port.ok_or(ParseError::Missing("src_port"))?,
        dest_port: dest_port.ok_or(ParseError::Missing("dest_port"))?,
    })
}

fn leaked_flag_name(name: &str) -> &'static str {
    match name {
        "--source" => "source",
        "--destination" => "destination",
        "--src_port" => "src_port",
        "--dest_port" => "dest_port",
        _ => "value",
    }
}
