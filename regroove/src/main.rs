mod setup;

use std::fs::File;
use std::io;

use regroove_core::config::Config;
use regroove_core::controller::SendOutcome;
use regroove_osc::OscBridge;

/// Startup level; `/debug` raises or lowers it at runtime.
fn startup_level(verbose: bool) -> log::LevelFilter {
    if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    }
}

/// The logger itself passes everything up to Debug so the runtime level is
/// decided only by `log::max_level`.
fn install_logger(verbose: bool, log_file: File) -> io::Result<()> {
    use simplelog::*;

    WriteLogger::init(LevelFilter::Debug, Config::default(), log_file)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    log::set_max_level(startup_level(verbose));
    Ok(())
}

fn init_logging(verbose: bool) -> io::Result<()> {
    let log_path = dirs::config_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("regroove")
        .join("regroove.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(_) => File::create(std::env::temp_dir().join("regroove.log"))?,
    };

    install_logger(verbose, log_file)?;
    log::info!("regroove starting (log level: {:?})", log::max_level());
    Ok(())
}

fn main() -> io::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let opts = setup::Options::from_args(&args);
    init_logging(opts.verbose)?;

    let config = Config::load();
    let bridge = OscBridge::bind(&opts.listen_addr(&config), &opts.host_addr(&config))?;
    let setup::Components {
        mut controller,
        sender,
        events,
    } = setup::build(&config, &opts)?;

    let _emitter = bridge.spawn_emitter(events)?;
    controller.startup();

    let _receiver = bridge.spawn_receiver(move |action| {
        if let SendOutcome::Disconnected = sender.send(action) {
            return false;
        }
        true
    })?;

    // Runs until the receive thread exits and drops the last sender.
    controller.run();
    log::info!("regroove stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use regroove_types::ControlAction;

    #[test]
    fn debug_toggle_reaches_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regroove.log");
        install_logger(false, File::create(&path).unwrap()).unwrap();

        let opts = setup::Options {
            ephemeral: true,
            ..setup::Options::default()
        };
        let mut components = setup::build(&Config::load_from(None), &opts).unwrap();

        log::debug!("before toggle");
        components.controller.handle(&ControlAction::Debug(1));
        assert_eq!(log::max_level(), log::LevelFilter::Debug);
        log::debug!("after toggle");
        components.controller.handle(&ControlAction::Debug(0));
        assert_eq!(log::max_level(), log::LevelFilter::Info);
        log::debug!("after reset");

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("after toggle"));
        assert!(!contents.contains("before toggle"));
        assert!(!contents.contains("after reset"));
    }

    #[test]
    fn startup_level_follows_verbose() {
        assert_eq!(startup_level(true), log::LevelFilter::Debug);
        assert_eq!(startup_level(false), log::LevelFilter::Info);
    }
}
