use std::{fs::OpenOptions, io::Write, process::ExitCode};

use controller::{
    algorithm::AlgorithmRegistry,
    app::{Controller, USAGE, USAGE_EXIT_CODE, config_path_from_args},
    config::{Settings, StrategyDocument},
    errors::{ControllerError, Result},
};
use env_logger::Env;

fn init_logger(settings: &Settings) -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(Env::default().default_filter_or(settings.log_level.as_str()));
    builder.format(|buf, record| {
        let ts = buf.timestamp();
        writeln!(buf, "{} [{}] - {}", ts, record.level(), record.args())
    });
    if let Some(path) = &settings.log_file {
        let log_file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(log_file)));
    }
    builder.init();
    Ok(())
}

async fn run(path: &str) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ControllerError::config(format!("read {} failed: {}", path, e)))?;
    let settings = Settings::load(&text)?;
    init_logger(&settings)?;
    log::info!(
        "controller starting, config={}, log_file={:?}",
        path,
        settings.log_file
    );

    let document = StrategyDocument::parse(&text, &settings)?;
    let controller = Controller::new(&settings, document, AlgorithmRegistry::with_builtins())?;
    controller.run_until_shutdown().await;
    Ok(())
}

#[tokio::main]
pub async fn main() -> ExitCode {
    let Some(path) = config_path_from_args(std::env::args()) else {
        eprintln!("{}", USAGE);
        return ExitCode::from(USAGE_EXIT_CODE);
    };

    match run(&path).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // 日志可能尚未初始化
            log::error!("{}", e);
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
