//! The application sink: prints delivered text to stdout and writes
//! delivered files under a configurable save directory. The save directory
//! is changed by the `/save` command without ever crossing into
//! `transport`'s `Command` enum — it is purely a concern of this adapter,
//! shared between the command loop and the receive loop through a mutex.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use transport::ApplicationSink;

/// Shared, mutable save directory. Cloned into the sink at construction time
/// and mutated from the command loop when the user runs `/save <dir>`.
#[derive(Clone)]
pub struct SaveDirectory(Arc<Mutex<PathBuf>>);

impl SaveDirectory {
    pub fn new(initial: PathBuf) -> Self {
        Self(Arc::new(Mutex::new(initial)))
    }

    pub fn set(&self, dir: PathBuf) {
        *self.0.lock().unwrap() = dir;
    }

    fn get(&self) -> PathBuf {
        self.0.lock().unwrap().clone()
    }
}

pub struct ConsoleSink {
    save_dir: SaveDirectory,
}

impl ConsoleSink {
    pub fn new(save_dir: SaveDirectory) -> Self {
        Self { save_dir }
    }
}

impl ApplicationSink for ConsoleSink {
    fn on_text(&mut self, text: String) {
        println!("[text] {text}");
    }

    fn on_file(&mut self, name: String, data: Vec<u8>) {
        let dir = self.save_dir.get();
        let path: PathBuf = Path::new(&dir).join(&name);
        match std::fs::write(&path, &data) {
            Ok(()) => {
                log::info!("saved incoming file {:?} ({} bytes)", path, data.len());
                println!("[file] saved {} to {}", name, path.display());
            }
            Err(err) => {
                log::error!("failed to write incoming file {:?}: {err}", path);
                println!("[file] failed to save {name}: {err}");
            }
        }
    }

    fn on_closed(&mut self, reason: &str) {
        log::info!("session closed: {reason}");
        println!("[session] closed: {reason}");
    }
}
