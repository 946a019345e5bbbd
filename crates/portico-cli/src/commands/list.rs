use clap::Args;
use colored::Colorize;
use portico_query::Site;
use std::path::Path;

#[derive(Args)]
pub struct ListCommand {}

/// `(name, kind)` for every access point, in configuration order
pub fn access_points(site: &Site) -> Vec<(String, &'static str)> {
    site.access_points()
        .iter()
        .filter_map(|name| {
            site.access_point(name)
                .ok()
                .map(|source| (name.clone(), source.kind()))
        })
        .collect()
}

impl ListCommand {
    pub fn execute(self, config: &Path) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        let site = rt.block_on(super::load_site(config))?;

        for (name, kind) in access_points(&site) {
            println!("{} {}", name.bright_white().bold(), kind.bright_cyan());
        }

        Ok(())
    }
}
