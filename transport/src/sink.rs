//! Collaborator traits through which the session talks to the world outside
//! the reliable-delivery core: where delivered data goes, and where outbound
//! commands come from. Implementations (console output, a file-system
//! adapter, an interactive command loop) live in the `peer` binary crate.

/// Receives reassembled application data. Implemented by the console/file
/// adapter in the `peer` crate; the core never touches a terminal or the
/// file system directly.
pub trait ApplicationSink: Send {
    /// Called once per fully reassembled text message.
    fn on_text(&mut self, text: String);

    /// Called once per fully reassembled file.
    fn on_file(&mut self, name: String, data: Vec<u8>);

    /// Called when the session terminates, successfully or not.
    fn on_closed(&mut self, reason: &str);
}

/// One user-issued command, as produced by a `CommandSource`.
#[derive(Debug, Clone)]
pub enum Command {
    /// Send a text message.
    SendText(String),

    /// Send a file: its base name and already-read contents. Reading the
    /// file from disk is the command source's job, not the core's — the
    /// core only fragments and reliably transmits bytes it is handed.
    SendFile { name: String, data: Vec<u8> },

    /// Set the maximum fragment payload size.
    SetMaxFragmentSize(usize),

    /// Corrupt the next outbound fragment's declared length (test hook).
    InjectError,

    /// Abrupt, unacknowledged local teardown.
    End,

    /// Clean three-way close (`FIN` / `FIN-ACK` / `ACK`).
    EndClean,

    /// Display the help screen; has no protocol effect.
    Help,
}

/// Produces the next user command, blocking until one is available.
/// Implemented by the interactive CLI loop in the `peer` crate.
pub trait CommandSource {
    /// Blocks for the next command, or `None` once the input source is exhausted.
    fn next_command(&mut self) -> Option<Command>;
}
