use config::Commands::*;
use config::*;
use md2site::*;

fn main() -> anyhow::Result<()> {
    let args = RootCommand::read();
    let config = Config::read(&args.config)?;

    match args.command {
        Index => {
            index::update_index(&config)?;
        }
        Build { index: refresh } => {
            if refresh {
                index::update_index(&config)?;
            }
            publish::build_all(&config)?;
        }
        Sitemap => {
            sitemap::update_sitemap(&config)?;
        }
    }

    Ok(())
}
