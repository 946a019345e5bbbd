use clap::Args;
use colored::Colorize;
use portico_query::{DataRow, Item, Site};
use std::path::Path;
use tracing::info;

use super::query::open_one;

#[derive(Args)]
pub struct SaveCommand {
    /// Access point name
    pub access_point: String,

    /// Property to set, as name=value; values that parse as JSON are stored as JSON
    #[arg(long = "set", value_parser = parse_assignment, required = true)]
    pub set: Vec<(String, serde_json::Value)>,
}

#[derive(Args)]
pub struct RemoveCommand {
    /// Access point name
    pub access_point: String,

    /// Query that must match exactly one item
    pub query: String,
}

/// Parse `name=value`; `value` is JSON when it parses as JSON, a string otherwise
pub fn parse_assignment(raw: &str) -> Result<(String, serde_json::Value), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))?;

    if name.is_empty() {
        return Err(format!("empty property name in '{}'", raw));
    }

    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));

    Ok((name.to_string(), value))
}

impl SaveCommand {
    pub async fn run(&self, site: &Site) -> anyhow::Result<Item> {
        let properties: DataRow = self.set.iter().cloned().collect();
        let item = site.create_item(&self.access_point, properties)?;
        site.save(&item).await?;

        info!("Saved item in {}", self.access_point);
        Ok(item)
    }

    pub fn execute(self, config: &Path) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(async {
            let site = super::load_site(config).await?;
            self.run(&site).await?;
            println!("{} {}", "Saved in".bright_green(), self.access_point.bold());
            Ok(())
        })
    }
}

impl RemoveCommand {
    pub async fn run(&self, site: &Site) -> anyhow::Result<Item> {
        let item = open_one(site, &self.access_point, &self.query).await?;
        site.remove(&item).await?;

        info!("Removed item from {}", self.access_point);
        Ok(item)
    }

    pub fn execute(self, config: &Path) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(async {
            let site = super::load_site(config).await?;
            self.run(&site).await?;
            println!(
                "{} {}",
                "Removed from".bright_green(),
                self.access_point.bold()
            );
            Ok(())
        })
    }
}
