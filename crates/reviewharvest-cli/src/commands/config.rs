use color_eyre::eyre::{bail, eyre};
use review_harvest_config::{Config, PathManager};

use crate::output::{Output, OutputFormat};
use crate::ConfigCommands;

pub fn run_config(cmd: ConfigCommands, output: &Output) -> color_eyre::Result<()> {
    let paths = PathManager::default();
    let config_path = paths.config_file();

    match cmd {
        ConfigCommands::Show => {
            if !config_path.exists() {
                output.warn(format!(
                    "no config file at {}; run `reviewharvest config init`",
                    config_path.display()
                ));
                return Ok(());
            }
            let config = Config::load(&config_path).map_err(|e| eyre!("{:#}", e))?;
            match output.format() {
                OutputFormat::Human => {
                    output.info(format!("# {}", config_path.display()));
                    output.info(config.to_toml_string().map_err(|e| eyre!("{:#}", e))?);
                }
                OutputFormat::Json | OutputFormat::JsonPretty => {
                    output.json(&serde_json::to_value(&config)?);
                }
            }
            Ok(())
        }
        ConfigCommands::Init { force } => {
            if config_path.exists() && !force {
                bail!(
                    "config file {} already exists; pass --force to overwrite",
                    config_path.display()
                );
            }
            paths.ensure_directories().map_err(|e| eyre!("{:#}", e))?;
            Config::example()
                .save(&config_path)
                .map_err(|e| eyre!("{:#}", e))?;
            output.success(format!("wrote starter config to {}", config_path.display()));
            output.info("edit the [[subjects]] list before harvesting");
            Ok(())
        }
    }
}
