use clap::Parser;
use log::{error, info};
use kano_wand::init_logging;
use kano_wand::cli::{run, Cli};
use kano_wand::error::AppRunError;

fn main() -> Result<(), AppRunError> {
    let cli = Cli::parse();
    init_logging(cli.log_level())?;
    info!(concat!("Kano Wand ", env!("CARGO_PKG_VERSION")));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|source| AppRunError::Runtime { source })?;

    match runtime.block_on(run(cli)) {
        Err(err) => {
            error!("{}", err);
            Err(err)
        },
        Ok(_) => Ok(()),
    }
}
