use clap::Parser;
use worldrip_utils::{ok, AnyResult};

fn main() -> AnyResult {
    let cli = worldrip_cli::Cli::parse_from(wild::args());

    let mut logger = pretty_env_logger::formatted_builder();
    logger
        .format_indent(None)
        .format_timestamp(None)
        .filter_level(cli.log_level());
    if let Ok(filters) = std::env::var("RUST_LOG") {
        logger.parse_filters(&filters);
    }
    logger.init();

    worldrip_cli::run(cli)?;
    ok()
}
