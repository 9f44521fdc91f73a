use std::io;
use std::path::PathBuf;

use crossbeam_channel::Receiver;

use regroove_core::archive::{JsonArchive, MemoryArchive, PatternArchive};
use regroove_core::config::Config;
use regroove_core::controller::{ControlSender, Controller};
use regroove_core::generation::{GenerationOrchestrator, VariationModel};
use regroove_core::paths::DataPaths;
use regroove_core::sync::SyncEngine;
use regroove_types::OutboundEvent;

/// Command-line options. Flags override the config file.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Options {
    pub verbose: bool,
    pub listen: Option<String>,
    pub host: Option<String>,
    pub data_dir: Option<PathBuf>,
    /// Keep patterns in memory and skip the data directory entirely.
    pub ephemeral: bool,
}

impl Options {
    pub fn from_args(args: &[String]) -> Self {
        let value_of = |flag: &str| {
            args.iter()
                .position(|a| a == flag)
                .and_then(|i| args.get(i + 1).cloned())
        };
        Self {
            verbose: args.iter().any(|a| a == "--verbose" || a == "-v"),
            listen: value_of("--listen"),
            host: value_of("--host"),
            data_dir: value_of("--data-dir").map(PathBuf::from),
            ephemeral: args.iter().any(|a| a == "--ephemeral"),
        }
    }

    pub fn listen_addr(&self, config: &Config) -> String {
        self.listen.clone().unwrap_or_else(|| config.listen_addr())
    }

    pub fn host_addr(&self, config: &Config) -> String {
        self.host.clone().unwrap_or_else(|| config.host_addr())
    }
}

pub struct Components {
    pub controller: Controller,
    pub sender: ControlSender,
    pub events: Receiver<OutboundEvent>,
}

/// Build the engine and its controller. Fails if the data directory cannot
/// be created or the pattern archive cannot be opened.
pub fn build(config: &Config, opts: &Options) -> io::Result<Components> {
    let (archive, state_dir): (Box<dyn PatternArchive>, Option<PathBuf>) = if opts.ephemeral {
        log::info!("ephemeral mode: patterns are kept in memory");
        (Box::new(MemoryArchive::new()), None)
    } else {
        let root = opts
            .data_dir
            .clone()
            .or_else(|| config.data_dir())
            .unwrap_or_else(DataPaths::default_root);
        let paths = DataPaths::new(root);
        paths.ensure()?;
        log::info!("data directory: {}", paths.root().display());
        let archive = JsonArchive::open(paths.user_dir())
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        (Box::new(archive), Some(paths.state_dir()))
    };

    let generator = GenerationOrchestrator::new(Box::new(VariationModel::new()), state_dir);
    let engine = SyncEngine::new(config.engine_settings(), generator, archive);
    let (events_tx, events) = crossbeam_channel::unbounded();
    let (controller, sender) = Controller::new(engine, events_tx);

    Ok(Components {
        controller,
        sender,
        events,
    })
}
