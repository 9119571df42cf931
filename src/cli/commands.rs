use crate::app::{AppContext, ConfluenceError, Result};
use crate::output;

pub async fn run(ctx: &AppContext, max_items: Option<usize>) -> Result<()> {
    if ctx.config.sources.is_empty() {
        return Err(ConfluenceError::NoSources);
    }

    let max_items = max_items.unwrap_or(ctx.config.output.max_items);
    println!("Merging {} sources...", ctx.config.sources.len());

    let (articles, stats) = ctx.pipeline.run(&ctx.config.sources, max_items).await;

    let (rss_path, json_path) = output::write_documents(&articles, &ctx.config.output)?;
    ctx.cache.flush();

    println!(
        "Run complete: {} sources ok, {} failed, {} articles merged ({} served from cache)",
        stats.sources_ok, stats.sources_failed, stats.articles_out, stats.served_from_cache
    );
    println!("  RSS:  {}", rss_path.display());
    println!("  JSON: {}", json_path.display());

    Ok(())
}

pub fn sources(ctx: &AppContext) -> Result<()> {
    if ctx.config.sources.is_empty() {
        println!("No sources configured");
        return Ok(());
    }

    for url in &ctx.config.sources {
        println!("{url}");
    }

    Ok(())
}

pub fn clear_cache(ctx: &AppContext) -> Result<()> {
    ctx.cache.clear();
    ctx.cache.flush();
    println!("Cache cleared");
    Ok(())
}
