use crate::Config;
use anyhow::Result;
use std::path::PathBuf;

pub async fn run(path: PathBuf, title: Option<String>) -> Result<()> {
    let site_title = title.unwrap_or_else(|| "My Blog".to_string());

    std::fs::create_dir_all(&path)?;
    std::fs::create_dir_all(path.join("data"))?;

    let config_path = path.join("blog-admin.toml");
    if config_path.exists() {
        anyhow::bail!("{} already exists", config_path.display());
    }
    std::fs::write(&config_path, Config::default_toml(&site_title))?;

    tracing::info!("Created {:?}", config_path);
    tracing::info!("Run 'blog-admin migrate' to set up the database");
    tracing::info!("Run 'blog-admin user add' to create the first admin");

    Ok(())
}
