use anyhow::Result;
use entregas_core::api::{AdDraft, PhotoUpload, PostDraft};
use entregas_core::auth::AuthSession;

use super::{money, require_signed, warn_partial};
use crate::cli::AdArgs;

pub async fn feed(session: &AuthSession) -> Result<()> {
    require_signed(session)?;
    let feed = session.api().feed().await;
    warn_partial(&feed.failed);

    println!("Posts ({})", feed.posts.len());
    for post in &feed.posts {
        println!();
        println!("  {} by {}", post.title, post.author);
        if let Some(created) = &post.created_at {
            println!("  {created}  ♥ {}  💬 {}", post.likes, post.comments);
        }
        for line in post.content.lines() {
            println!("    {line}");
        }
    }

    println!();
    println!("Vehicle ads ({})", feed.ads.len());
    for ad in &feed.ads {
        println!(
            "  {} {} · {} km · {} · {}",
            ad.model,
            ad.year,
            ad.mileage,
            money(ad.price),
            ad.location
        );
        if let Some(link) = &ad.external_link {
            println!("    {link}");
        }
    }
    Ok(())
}

pub async fn post(
    session: &AuthSession,
    title: String,
    content: String,
    author: Option<String>,
) -> Result<()> {
    require_signed(session)?;
    let author = author
        .or_else(|| session.user().map(|u| u.display_name().to_string()))
        .unwrap_or_default();
    let post = session
        .api()
        .create_post(PostDraft {
            author,
            title,
            content,
        })
        .await?;
    println!("✓ Submitted \"{}\". It will appear once approved.", post.title);
    Ok(())
}

pub async fn ad(session: &AuthSession, args: AdArgs) -> Result<()> {
    require_signed(session)?;
    let photo = args
        .photo
        .as_deref()
        .map(PhotoUpload::from_path)
        .transpose()?;
    let ad = session
        .api()
        .create_ad(AdDraft {
            model: args.model,
            year: args.year,
            mileage: args.mileage,
            price: args.price,
            location: args.location,
            external_link: args.link,
            photo,
        })
        .await?;
    println!("✓ Submitted ad for {} {}. It will appear once approved.", ad.model, ad.year);
    Ok(())
}
