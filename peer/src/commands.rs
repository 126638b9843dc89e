//! Interactive stdin command loop. Translates typed input into
//! `transport::Command`s; `/save` is handled here directly since the save
//! directory is this crate's concern, not the core's.

use std::io::{self, BufRead, Write};

use transport::Command;

use crate::console::SaveDirectory;

pub struct StdinCommands<R> {
    lines: io::Lines<R>,
    save_dir: SaveDirectory,
}

impl<R: BufRead> StdinCommands<R> {
    pub fn new(reader: R, save_dir: SaveDirectory) -> Self {
        Self {
            lines: reader.lines(),
            save_dir,
        }
    }

    fn prompt() {
        print!("> ");
        let _ = io::stdout().flush();
    }
}

impl<R: BufRead> transport::CommandSource for StdinCommands<R> {
    fn next_command(&mut self) -> Option<Command> {
        loop {
            Self::prompt();
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(err)) => {
                    log::error!("stdin read error: {err}");
                    return None;
                }
                None => return None,
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(rest) = line.strip_prefix('/') {
                match parse_directive(rest, &self.save_dir) {
                    Directive::Command(command) => return Some(command),
                    Directive::Handled => continue,
                    Directive::Unknown(name) => {
                        println!("unrecognized command: /{name}");
                        continue;
                    }
                }
            }

            return Some(Command::SendText(line.to_string()));
        }
    }
}

enum Directive {
    Command(Command),
    Handled,
    Unknown(String),
}

fn parse_directive(rest: &str, save_dir: &SaveDirectory) -> Directive {
    let mut parts = rest.splitn(2, ' ');
    let name = parts.next().unwrap_or("");
    let argument = parts.next().map(str::trim).unwrap_or("");

    match name {
        "help" => Directive::Command(Command::Help),
        "file" => {
            if argument.is_empty() {
                println!("usage: /file <path>");
                return Directive::Handled;
            }
            match std::fs::read(argument) {
                Ok(data) => {
                    let name = std::path::Path::new(argument)
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| argument.to_string());
                    Directive::Command(Command::SendFile { name, data })
                }
                Err(err) => {
                    println!("failed to read {argument}: {err}");
                    Directive::Handled
                }
            }
        }
        "max" => match argument.parse::<usize>() {
            Ok(size) => Directive::Command(Command::SetMaxFragmentSize(size)),
            Err(_) => {
                println!("usage: /max <bytes>");
                Directive::Handled
            }
        },
        "save" => {
            if argument.is_empty() {
                println!("usage: /save <dir>");
            } else {
                save_dir.set(std::path::PathBuf::from(argument));
                println!("saving received files to {argument}");
            }
            Directive::Handled
        }
        "error" => Directive::Command(Command::InjectError),
        "end" => {
            if argument == "fr" {
                Directive::Command(Command::EndClean)
            } else {
                Directive::Command(Command::End)
            }
        }
        other => Directive::Unknown(other.to_string()),
    }
}
