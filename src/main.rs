use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use stash_tryon::catalog::{self, Catalog};
use stash_tryon::media::{MediaInput, ProductImage};
use stash_tryon::models::{Config, VideoAspect};
use stash_tryon::orchestrator::Orchestrator;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "stash-tryon")]
#[command(about = "AI stylist, virtual try-on and animated clips for the Stash catalog")]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Ask the stylist for outfit advice.
    Advice {
        query: String,
        /// Catalog product id to style around.
        #[arg(long)]
        product: Option<String>,
        /// Style around a user profile instead of a product.
        #[arg(long)]
        profile: Option<String>,
    },
    /// Render a photo wearing a catalog product.
    TryOn {
        /// Path to the user photo.
        #[arg(long)]
        photo: PathBuf,
        /// Catalog product id, image URL or data URI.
        #[arg(long)]
        product: String,
        /// Product description; defaults to the catalog description.
        #[arg(long)]
        description: Option<String>,
    },
    /// Animate an image (usually a try-on result) into a short clip.
    Animate {
        #[arg(long)]
        image: PathBuf,
        #[arg(long, default_value = "tall")]
        aspect: VideoAspect,
    },
    /// List catalog products.
    Catalog {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
}

fn create_output_dir() -> Result<PathBuf> {
    let date = Local::now().format("%Y-%m-%d").to_string();
    let output_dir = PathBuf::from("output").join(format!("{}_{}", date, Uuid::new_v4()));
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    info!("Created output directory: {}", output_dir.display());
    Ok(output_dir)
}

async fn save_image(image: &MediaInput, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(format!("try_on_{}.{}", Uuid::new_v4(), image.extension()));
    tokio::fs::write(&path, image.decode()?).await?;
    Ok(path)
}

fn print_catalog(catalog: &Catalog, search: Option<&str>, category: Option<&str>) {
    let matches = catalog.search(search.unwrap_or_default());
    let products: Vec<_> = match category {
        Some(category) => catalog
            .by_category(category)
            .into_iter()
            .filter(|p| matches.contains(p))
            .collect(),
        None => matches,
    };

    for product in products {
        let discount = product.discount_percent();
        if discount > 0 {
            println!(
                "{:>5}  {:<28} {:<14} ₹{} (-{}%)",
                product.id, product.name, product.brand, product.price, discount
            );
        } else {
            println!(
                "{:>5}  {:<28} {:<14} ₹{}",
                product.id, product.name, product.brand, product.price
            );
        }
    }
}

async fn run(command: Command) -> Result<()> {
    let catalog = Catalog::builtin()?;

    if let Command::Catalog { search, category } = &command {
        print_catalog(&catalog, search.as_deref(), category.as_deref());
        return Ok(());
    }

    let config = Config::from_env()?;
    let orchestrator = Orchestrator::from_config(&config);

    match command {
        Command::Advice {
            query,
            product,
            profile,
        } => {
            let context = match (product, profile) {
                (Some(id), _) => catalog
                    .find(&id)
                    .with_context(|| format!("Unknown product id {}", id))?
                    .styling_context(),
                (None, Some(name)) => catalog::profile_context(&name),
                (None, None) => catalog::browsing_context(),
            };
            println!("{}", orchestrator.get_styling_advice(&query, &context).await);
        }
        Command::TryOn {
            photo,
            product,
            description,
        } => {
            let user_photo = MediaInput::from_file(&photo).await?;
            let (product_image, catalog_description) = match catalog.find(&product) {
                Some(item) => (ProductImage::parse(&item.image), item.description.clone()),
                None => (ProductImage::parse(&product), String::new()),
            };
            let description = description.unwrap_or(catalog_description);

            let composite = orchestrator
                .generate_composite(&user_photo, &product_image, &description)
                .await
                .inspect_err(|e| error!("{}", e.user_message()))?;

            let path = save_image(&composite, &create_output_dir()?).await?;
            println!("{}", path.display());
        }
        Command::Animate { image, aspect } => {
            let source = MediaInput::from_file(&image).await?;

            let cancel = CancellationToken::new();
            let ctrl_c_token = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Interrupt received, cancelling video job");
                    ctrl_c_token.cancel();
                }
            });

            let clip = orchestrator
                .generate_animated_clip(&source, aspect, &cancel)
                .await
                .inspect_err(|e| error!("{}", e.user_message()))?;

            let path = clip.save_to(&create_output_dir()?).await?;
            println!("{}", path.display());
        }
        Command::Catalog { .. } => {}
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stash_tryon=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();

    if let Err(e) = run(args.command).await {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}
