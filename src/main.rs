use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::builder::RangedU64ValueParser;
use clap::{Parser, Subcommand};
use comfy_table::Table;
use dialoguer::Input;
use restaurant_recs::config::Config;
use restaurant_recs::feature_builder::FeatureSpace;
use restaurant_recs::ranker::Recommendation;
use restaurant_recs::{build_from_csv, find_similar, RecsError};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "restaurant-recs")]
#[command(about = "Find restaurants similar to one you already like")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml (defaults to the per-user config directory)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recommend restaurants similar to NAME; prompts for a name when omitted
    Recommend {
        name: Option<String>,
        /// Dataset to read instead of the configured one
        #[arg(long)]
        data: Option<PathBuf>,
        /// Number of results
        #[arg(long, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
        top_n: Option<usize>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// List restaurants in the cleaned dataset
    List {
        #[arg(long)]
        data: Option<PathBuf>,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Show the feature columns and what cleaning removed
    Features {
        #[arg(long)]
        data: Option<PathBuf>,
    },
    /// Write the default configuration, or print the current one
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config_dir {
        Some(dir) => Config::load(dir),
        None => Config::load_default(),
    }
    .context("Failed to load configuration")?;

    match cli.command {
        Commands::Recommend {
            name,
            data,
            top_n,
            json,
        } => {
            let space = load_space(&config, data)?;
            let top_n = top_n.unwrap_or(config.recommend.top_n);
            match name {
                Some(name) => {
                    let results = find_similar(&space, name.trim(), top_n, &config)?;
                    print_recommendations(&results, top_n, json)?;
                }
                None => prompt_loop(&space, top_n, json, &config)?,
            }
        }
        Commands::List {
            data,
            offset,
            limit,
        } => {
            let space = load_space(&config, data)?;
            print_listing(&space, offset, limit);
        }
        Commands::Features { data } => {
            let space = load_space(&config, data)?;
            print_features(&space)?;
        }
        Commands::Config { show } => {
            if show {
                print!("{}", config.to_toml()?);
                eprintln!("Config file: {}", config.config_file_path().display());
            } else {
                config.save().context("Failed to save configuration")?;
                eprintln!(
                    "Configuration saved to: {}",
                    config.config_file_path().display()
                );
            }
        }
    }

    Ok(())
}

fn load_space(config: &Config, data: Option<PathBuf>) -> Result<FeatureSpace> {
    let path = data.unwrap_or_else(|| config.dataset_path());
    build_from_csv(&path, config)
        .with_context(|| format!("Failed to build features from {}", path.display()))
}

/// Asks for names until one is found or the answer is empty.
fn prompt_loop(space: &FeatureSpace, top_n: usize, json: bool, config: &Config) -> Result<()> {
    loop {
        let query: String = Input::new()
            .with_prompt("Enter a restaurant name")
            .allow_empty(true)
            .interact_text()?;
        let query = query.trim();
        if query.is_empty() {
            return Ok(());
        }

        match find_similar(space, query, top_n, config) {
            Ok(results) => return print_recommendations(&results, top_n, json),
            Err(e @ RecsError::NotFound { .. }) => eprintln!("{e}"),
            Err(e) => return Err(e.into()),
        }
    }
}

fn print_recommendations(results: &[Recommendation], top_n: usize, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(results)?);
        return Ok(());
    }

    println!("\nTop {top_n} similar restaurants:\n");
    println!("{}", recommendation_table(results));
    Ok(())
}

fn recommendation_table(results: &[Recommendation]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        "Restaurant Name",
        "Similarity",
        "Category",
        "Restaurant Price Range",
        "Restaurant Address",
    ]);
    for r in results {
        table.add_row(vec![
            r.display_name().to_string(),
            format!("{:.3}", r.similarity),
            r.category.clone(),
            r.price_range.clone(),
            r.address.clone(),
        ]);
    }
    table
}

fn print_listing(space: &FeatureSpace, offset: usize, limit: usize) {
    let mut table = Table::new();
    table.set_header(vec!["#", "Restaurant Name", "Category", "Price"]);
    let mut shown = 0;
    for (i, r) in space.records().iter().enumerate().skip(offset).take(limit) {
        table.add_row(vec![
            i.to_string(),
            r.display_name().to_string(),
            r.category.clone(),
            r.price_range.clone(),
        ]);
        shown += 1;
    }
    println!("{table}");
    eprintln!("Showing {} of {} restaurants", shown, space.len());
}

fn print_features(space: &FeatureSpace) -> Result<()> {
    println!("Feature columns ({}):", space.matrix().width());
    for (i, column) in space.matrix().column_names().iter().enumerate() {
        println!("  {i:>3}  {column}");
    }
    println!();
    println!("{}", serde_json::to_string_pretty(space.report())?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn recommend_with_name() {
        let cli = Cli::try_parse_from([
            "restaurant-recs",
            "recommend",
            "Pizza Place",
            "--top-n",
            "3",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Recommend { name, top_n, json, .. } = parsed.command {
                assert_eq!(name, Some("Pizza Place".to_string()));
                assert_eq!(top_n, Some(3));
                assert!(!json);
            }
        }
    }

    #[test]
    fn recommend_without_name_prompts() {
        let cli = Cli::try_parse_from(["restaurant-recs", "recommend", "--data", "r.csv"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Recommend { name, data, .. } = parsed.command {
                assert_eq!(name, None);
                assert_eq!(data, Some(PathBuf::from("r.csv")));
            }
        }
    }

    #[test]
    fn list_defaults() {
        let cli = Cli::try_parse_from(["restaurant-recs", "list"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::List { offset, limit, .. } = parsed.command {
                assert_eq!(offset, 0);
                assert_eq!(limit, 50);
            }
        }
    }

    #[test]
    fn global_config_dir() {
        let cli = Cli::try_parse_from([
            "restaurant-recs",
            "config",
            "--show",
            "--config-dir",
            "/tmp/x",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert_eq!(parsed.config_dir, Some(PathBuf::from("/tmp/x")));
            assert!(matches!(parsed.command, Commands::Config { show: true }));
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["restaurant-recs", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn zero_top_n_is_rejected() {
        let cli = Cli::try_parse_from([
            "restaurant-recs",
            "recommend",
            "Cafe Uno",
            "--top-n",
            "0",
        ]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::ValueValidation);
        }
    }

    #[test]
    fn recommendation_table_has_headers_and_rows() {
        let results = vec![Recommendation {
            name: Some("Pizza Palace".to_string()),
            similarity: 0.5774,
            category: "Pizza".to_string(),
            price_range: "$11-30".to_string(),
            address: "12 Queen St W".to_string(),
        }];
        let table = recommendation_table(&results);
        assert_eq!(table.row_iter().count(), 1);

        let rendered = table.to_string();
        assert!(rendered.contains("Restaurant Name"));
        assert!(rendered.contains("Restaurant Address"));
        assert!(rendered.contains("Pizza Palace"));
        assert!(rendered.contains("0.577"));
        assert!(rendered.contains("12 Queen St W"));
    }
}
