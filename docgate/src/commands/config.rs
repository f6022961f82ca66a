//! `docgate config`: print the effective configuration with sources.

use super::{ConfigArgs, load_config};
use anyhow::Result;
use colored::Colorize;
use serde_json::{Map, Value, json};

pub fn run(args: &ConfigArgs) -> Result<u8> {
    let config = load_config(&args.project, false)?;
    let rows = config.describe();

    if args.json {
        let mut map = Map::new();
        for (key, value, origin) in &rows {
            map.insert(
                (*key).to_string(),
                json!({ "value": value, "source": origin }),
            );
        }
        map.insert("expected".to_string(), serde_json::to_value(&config.expected)?);
        println!("{}", serde_json::to_string_pretty(&Value::Object(map))?);
        return Ok(0);
    }

    match &config.config_file {
        Some(path) => println!("{} {}", "Config file:".bold(), path.display()),
        None => println!("{} {}", "Config file:".bold(), "none".dimmed()),
    }
    let width = rows.iter().map(|(key, _, _)| key.len()).max().unwrap_or(0);
    for (key, value, origin) in rows {
        println!("  {key:<width$}  {value}  {}", format!("({origin})").dimmed());
    }
    Ok(0)
}
