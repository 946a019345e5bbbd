use anyhow::anyhow;
use clap::Args;
use futures::TryStreamExt;
use portico_query::{DataError, Item, NotOneObjectReturned, Site};
use std::io::Write;
use std::path::Path;
use tracing::debug;

#[derive(Args)]
pub struct SearchCommand {
    /// Access point name
    pub access_point: String,

    /// Query, e.g. "/jazz/artist=Monk/"
    #[arg(default_value = "/")]
    pub query: String,
}

#[derive(Args)]
pub struct OpenCommand {
    /// Access point name
    pub access_point: String,

    /// Query that must match exactly one item
    pub query: String,
}

/// Turn a cardinality failure into a message naming the query
pub fn explain(err: DataError, access_point: &str, query: &str) -> anyhow::Error {
    match err.not_one() {
        Some(NotOneObjectReturned::ObjectDoesNotExist) => {
            anyhow!("No item in '{}' matches {}", access_point, query)
        }
        Some(NotOneObjectReturned::MultipleObjectsReturned) => {
            anyhow!("More than one item in '{}' matches {}", access_point, query)
        }
        None => err.into(),
    }
}

/// Open exactly one item, with a readable error otherwise
pub async fn open_one(site: &Site, access_point: &str, query: &str) -> anyhow::Result<Item> {
    site.open(access_point, query)
        .await
        .map_err(|e| explain(e, access_point, query))
}

impl SearchCommand {
    /// Write matching items as JSON lines, returning how many were written
    pub async fn run(&self, site: &Site, out: &mut impl Write) -> anyhow::Result<usize> {
        let mut items = site.search(&self.access_point, &self.query).await?;
        let mut count = 0;

        while let Some(item) = items.try_next().await? {
            writeln!(out, "{}", serde_json::to_string(&item)?)?;
            count += 1;
        }

        debug!("{} items matched {}", count, self.query);
        Ok(count)
    }

    pub fn execute(self, config: &Path) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(async {
            let site = super::load_site(config).await?;
            self.run(&site, &mut std::io::stdout().lock()).await?;
            Ok(())
        })
    }
}

impl OpenCommand {
    pub async fn run(&self, site: &Site, out: &mut impl Write) -> anyhow::Result<()> {
        let item = open_one(site, &self.access_point, &self.query).await?;
        writeln!(out, "{}", serde_json::to_string_pretty(&item)?)?;
        Ok(())
    }

    pub fn execute(self, config: &Path) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(async {
            let site = super::load_site(config).await?;
            self.run(&site, &mut std::io::stdout().lock()).await
        })
    }
}
