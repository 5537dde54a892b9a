use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use trellis_core::{
    BoxError, ExtensionRule, Extensions, Format, FsLoader, LoadResult, Resolver, WalkConfig, WalkSettings, Walker,
};

#[derive(Parser, Debug)]
#[command(name = "trellis", version, about = "Load artifact trees")]
struct Args {
    /// Settings file (defaults to <config dir>/trellis/config.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load every artifact under ROOT, printing one JSON object per line
    Walk {
        root: PathBuf,

        /// Extra extension as NAME or NAME=RULE (static, dynamic, ambiguous)
        #[arg(long = "ext", value_parser = parse_ext)]
        extensions: Vec<ExtArg>,

        /// Only load the top-level directory
        #[arg(long)]
        no_recursive: bool,

        /// Load every eligible file even where an index exists
        #[arg(long)]
        no_stop_at_indexes: bool,

        /// Ambient format, skipping manifest lookup
        #[arg(long)]
        format: Option<Format>,

        /// Only load files whose path contains one of these substrings
        #[arg(long)]
        include: Vec<String>,

        /// Skip files whose path contains one of these substrings
        #[arg(long)]
        exclude: Vec<String>,
    },

    /// Resolve a path stem to the first artifact that loads
    Resolve {
        stem: PathBuf,

        /// Ambient format, skipping manifest lookup
        #[arg(long)]
        format: Option<Format>,

        /// Extra extension as NAME or NAME=RULE (static, dynamic, ambiguous)
        #[arg(long = "ext", value_parser = parse_ext)]
        extensions: Vec<ExtArg>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ExtArg {
    name: String,
    rule: ExtensionRule,
}

fn parse_ext(raw: &str) -> Result<ExtArg, String> {
    let (name, rule) = match raw.split_once('=') {
        Some((name, rule)) => (name, rule.parse()?),
        None => (raw, ExtensionRule::Static),
    };
    let name = name.trim_start_matches('.');
    if name.is_empty() {
        return Err(format!("invalid extension '{}'", raw));
    }
    Ok(ExtArg {
        name: name.to_string(),
        rule,
    })
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("trellis").join("config.json"))
}

fn load_settings(explicit: Option<&Path>) -> anyhow::Result<WalkSettings> {
    if let Some(path) = explicit {
        return WalkSettings::load(path).with_context(|| format!("loading settings from {}", path.display()));
    }
    match default_config_path() {
        Some(path) if path.is_file() => {
            debug!("Using settings file {:?}", path);
            Ok(WalkSettings::load(&path)?)
        }
        _ => Ok(WalkSettings::default()),
    }
}

fn extension_table(settings: &WalkSettings, extra: &[ExtArg]) -> Extensions {
    extra.iter().fold(settings.extension_table(), |table, ext| {
        table.with(ext.name.clone(), ext.rule)
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    let settings = load_settings(args.config.as_deref())?;

    match args.command {
        Command::Walk {
            root,
            extensions,
            no_recursive,
            no_stop_at_indexes,
            format,
            include,
            exclude,
        } => {
            let stdout = Arc::new(Mutex::new(tokio::io::stdout()));
            let out = Arc::clone(&stdout);

            let overrides = WalkSettings {
                recursive: no_recursive.then_some(false),
                stop_at_indexes: no_stop_at_indexes.then_some(false),
                default_format: format,
                include,
                exclude,
                ..WalkSettings::default()
            };

            let config = WalkConfig::<Value>::builder()
                .settings(&settings)
                .settings(&overrides)
                .extensions(extension_table(&settings, &extensions))
                .visit(move |entry: LoadResult<Value>| {
                    let out = Arc::clone(&out);
                    async move {
                        let mut line = serde_json::to_vec(&entry)?;
                        line.push(b'\n');
                        out.lock().await.write_all(&line).await?;
                        Ok::<(), BoxError>(())
                    }
                })
                .build()?;

            info!("Walking {:?}", root);
            Walker::new(FsLoader::default())
                .walk(&root, &config)
                .await
                .with_context(|| format!("walking {}", root.display()))?;
            stdout.lock().await.flush().await?;
        }
        Command::Resolve {
            stem,
            format,
            extensions,
        } => {
            let mut resolver =
                Resolver::new(FsLoader::default()).with_extensions(extension_table(&settings, &extensions));
            if let Some(format) = format.or(settings.default_format) {
                resolver = resolver.with_default_format(format);
            }

            let Some(resolved) = resolver
                .resolve(&stem)
                .await
                .with_context(|| format!("resolving {}", stem.display()))?
            else {
                anyhow::bail!("nothing found for {}", stem.display());
            };

            let mut stdout = tokio::io::stdout();
            let mut line = serde_json::to_vec(&resolved)?;
            line.push(b'\n');
            stdout.write_all(&line).await?;
            stdout.flush().await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ext() {
        assert_eq!(
            parse_ext("cart").unwrap(),
            ExtArg {
                name: "cart".into(),
                rule: ExtensionRule::Static
            }
        );
        assert_eq!(parse_ext(".dart=dynamic").unwrap().name, "dart");
        assert_eq!(parse_ext("part=ambiguous").unwrap().rule, ExtensionRule::Ambiguous);
        assert!(parse_ext("x=weird").is_err());
        assert!(parse_ext("=static").is_err());
    }

    #[test]
    fn test_extra_extensions_extend_the_settings_table() {
        let table = extension_table(
            &WalkSettings::default(),
            &[ExtArg {
                name: "cart".into(),
                rule: ExtensionRule::Static,
            }],
        );
        assert_eq!(table.rule("art"), Some(ExtensionRule::Ambiguous));
        assert_eq!(table.rule("cart"), Some(ExtensionRule::Static));
    }

    #[test]
    fn test_cli_parses_walk_flags() {
        let args = Args::try_parse_from([
            "trellis",
            "walk",
            "tree",
            "--ext",
            "cart",
            "--no-recursive",
            "--format",
            "dynamic",
            "--exclude",
            "/vendor/",
        ])
        .unwrap();
        match args.command {
            Command::Walk {
                root,
                extensions,
                no_recursive,
                format,
                exclude,
                ..
            } => {
                assert_eq!(root, PathBuf::from("tree"));
                assert_eq!(extensions.len(), 1);
                assert!(no_recursive);
                assert_eq!(format, Some(Format::Dynamic));
                assert_eq!(exclude, vec!["/vendor/".to_string()]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
