use auto_backup::backup::backup_config::BackupConfig;
use auto_backup::backup::coordinator::RunCoordinator;
use auto_backup::backup::report::{ConsoleReporter, Verbosity};
use auto_backup::backup::result_error::error::Error;
use auto_backup::backup::result_error::result::Result;
use auto_backup::backup::result_error::WithMsg;
use clap::Parser;
use std::path::PathBuf;
use std::process::exit;
use tracing::error;
use validator::Validate;

/// Copy the current project into a new timestamped backup directory
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory holding the backups [default: project_backups]
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Note stored in backup_info.txt
    #[arg(short, long, value_parser = parse_message)]
    message: Option<String>,

    /// Only print start and summary lines
    #[arg(short, long)]
    quiet: bool,

    /// Print nothing
    #[arg(short, long)]
    silent: bool,

    /// Location of an optional YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory to back up
    #[arg(long, default_value = ".")]
    source: PathBuf,
}

const MAX_MESSAGE_LEN: usize = 255;

fn parse_message(s: &str) -> std::result::Result<String, String> {
    if s.len() > MAX_MESSAGE_LEN {
        Err(format!("message is longer than {MAX_MESSAGE_LEN} bytes"))
    } else {
        Ok(s.to_string())
    }
}

fn load_config(args: &Args) -> Result<BackupConfig> {
    let mut config = match &args.config {
        Some(path) => BackupConfig::from_yaml_file(path)?,
        None => BackupConfig::default(),
    };
    if let Some(dir) = &args.dir {
        config.set_backup_base_dir(dir.clone());
        config
            .validate()
            .map_err(Error::from)
            .with_msg(format!("Invalid backup directory: {:?}", dir))?;
    }
    Ok(config)
}

fn main() {
    let args = Args::parse();
    let verbosity = Verbosity::from_flags(args.quiet, args.silent);
    tracing_subscriber::fmt()
        .with_max_level(verbosity.log_level())
        .with_writer(std::io::stderr)
        .init();

    let reporter = ConsoleReporter::stdout(verbosity);
    let res = load_config(&args).and_then(|config| {
        RunCoordinator::new(&config, &reporter).run(&args.source, args.message.as_deref())
    });

    if let Err(e) = res {
        error!("{e}");
        exit(1);
    }
}
