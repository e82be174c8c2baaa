use crate::cli::{ExpandArgs, ResolveArgs};
use crate::error::CliError;
use anyhow::{Context, Result};
use serde_json::Value;
use std::io::Write;
use swagger_spec::{expand_spec, Config, Document, HttpFileLoader, Ref};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    pub fn parse(raw: &str) -> Result<Self, CliError> {
        match raw {
            "json" => Ok(Format::Json),
            "yaml" | "yml" => Ok(Format::Yaml),
            other => Err(CliError::UnsupportedFormat(other.to_string())),
        }
    }
}

pub fn render(value: &Value, format: Format, compact: bool) -> Result<String, CliError> {
    let mut rendered = match (format, compact) {
        (Format::Json, true) => serde_json::to_string(value).map_err(|e| CliError::Render(e.to_string()))?,
        (Format::Json, false) => {
            serde_json::to_string_pretty(value).map_err(|e| CliError::Render(e.to_string()))?
        }
        (Format::Yaml, _) => serde_yaml::to_string(value).map_err(|e| CliError::Render(e.to_string()))?,
    };
    if !rendered.ends_with('\n') {
        rendered.push('\n');
    }
    Ok(rendered)
}

/// Load, expand and write a specification.
pub fn expand(args: &ExpandArgs, config: &Config, stdout: &mut dyn Write) -> Result<()> {
    let format = Format::parse(&args.format)?;
    let doc = Document::load_with(&args.spec, &config.fetch)
        .with_context(|| format!("Failed to load {}", args.spec))?;
    if doc.spec_version() != Some("2.0") {
        warn!("{} does not declare swagger: \"2.0\"", args.spec);
    }

    let mut options = config.expand.clone();
    options.keep_circular_refs |= args.keep_circular_refs;

    let mut resolver = doc
        .resolver_with(&options)?
        .with_loader(HttpFileLoader::new(&config.fetch));
    let mut expanded = doc.raw().clone();
    expand_spec(&mut expanded, &mut resolver).with_context(|| format!("Failed to expand {}", args.spec))?;
    for reference in resolver.circular_refs() {
        warn!("Circular reference left unexpanded: {}", reference);
    }

    let rendered = render(&expanded, format, args.compact)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, rendered).map_err(|source| CliError::Write {
                path: path.clone(),
                source,
            })?;
            info!("Wrote expanded specification to {:?}", path);
        }
        None => stdout.write_all(rendered.as_bytes())?,
    }
    Ok(())
}

/// Print the target of a single reference.
pub fn resolve(args: &ResolveArgs, config: &Config, stdout: &mut dyn Write) -> Result<()> {
    let format = Format::parse(&args.format)?;
    let doc = Document::load_with(&args.spec, &config.fetch)
        .with_context(|| format!("Failed to load {}", args.spec))?;
    let reference = Ref::parse(&args.reference)?;

    let mut resolver = doc
        .resolver_with(&config.expand)?
        .with_loader(HttpFileLoader::new(&config.fetch));
    let value = resolver
        .resolve(&reference)
        .with_context(|| format!("Failed to resolve {}", args.reference))?;

    stdout.write_all(render(&value, format, false)?.as_bytes())?;
    Ok(())
}
