//! Interactive front end for a `transport` session: parses the four startup
//! parameters, opens a session, and drives an stdin command loop while
//! printing delivered text and saving delivered files.

mod cli;
mod commands;
mod console;

use std::net::SocketAddr;
use std::process::ExitCode;

use console::{ConsoleSink, SaveDirectory};
use transport::{Config, Session};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match cli::parse(std::env::args()) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("error: {err}");
            eprintln!("usage: peer --source <ip> --destination <ip> --src_port <port> --dest_port <port>");
            return ExitCode::FAILURE;
        }
    };

    let local: SocketAddr = (args.source, args.src_port).into();
    let remote: SocketAddr = (args.destination, args.dest_port).into();

    log::info!("opening session: {local} -> {remote}");
    let session = match Session::connect(local, remote, Config::default()) {
        Ok(session) => session,
        Err(err) => {
            eprintln!("error: failed to open session: {err}");
            return ExitCode::FAILURE;
        }
    };

    let save_dir = SaveDirectory::new(std::env::current_dir().unwrap_or_default());
    let sink = ConsoleSink::new(save_dir.clone());
    let (mut handle, activities) = session.spawn(Box::new(sink));

    println!("session open. type /help for commands.");
    let stdin = std::io::stdin();
    let mut commands = commands::StdinCommands::new(stdin.lock(), save_dir);

    let result = handle.run_command_loop(&mut commands);
    activities.join();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
