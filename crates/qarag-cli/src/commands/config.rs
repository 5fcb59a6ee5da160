use crate::cli::ConfigArgs;
use crate::output::OutputWriter;
use crate::output_types::{ConfigEntry, ConfigOutput};
use anyhow::{Context, Result};
use qarag_core::config::LayeredConfig;
use tabled::Tabled;

#[derive(Tabled)]
struct ConfigRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Source")]
    source: String,
}

pub fn execute(args: ConfigArgs, layered: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let resolved = layered.resolve()?;

    let values: Vec<ConfigEntry> = layered
        .to_inspection_map()
        .into_iter()
        .map(|(key, (value, source))| ConfigEntry {
            key,
            value,
            source: format!("{:?}", source).to_lowercase(),
        })
        .collect();

    let full = if args.full {
        Some(toml::to_string_pretty(&resolved).context("Failed to render configuration")?)
    } else {
        None
    };

    if output.is_json() {
        return output.result(ConfigOutput { values, full });
    }

    output.section("Configuration");
    output.table(
        values
            .into_iter()
            .map(|e| ConfigRow { key: e.key, value: e.value, source: e.source })
            .collect(),
    );

    if let Some(full) = full {
        output.section("Resolved");
        println!("{}", full);
    }

    Ok(())
}
