use super::Runtime;

pub async fn images() -> anyhow::Result<()> {
    let runtime = Runtime::load()?;
    let marker = &runtime.config.deploy.marker;
    let marked = runtime.inspector().list_marked(marker).await?;

    if marked.is_empty() {
        println!("No local images tagged :{marker}");
        return Ok(());
    }

    println!("{:<40} {:<20} CREATED", "TAG", "IMAGE ID");
    for (image, tag) in &marked {
        let short_id: String = image.id.trim_start_matches("sha256:").chars().take(12).collect();
        println!("{tag:<40} {short_id:<20} {}", image.created);
    }
    Ok(())
}
