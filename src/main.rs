use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use snap_resize::{AppConfig, OutputFormat, Outcome, SnapResize, StoredSettingRecord};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resize and re-encode an image
    Resize {
        /// Image to process
        input: PathBuf,

        /// Output width in pixels (defaults to the saved setting)
        #[arg(short, long)]
        width: Option<u32>,

        /// Encoder quality in (0, 1] (defaults to the saved setting)
        #[arg(short, long)]
        quality: Option<f32>,

        /// Output format: jpeg, png or webp
        #[arg(short, long)]
        format: Option<OutputFormat>,

        /// Also keep the result in the gallery under this name
        #[arg(long)]
        save: Option<String>,

        /// Directory to write the result to
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Do not write the result to disk
        #[arg(long, default_value_t = false)]
        no_download: bool,
    },
    /// List saved images, newest first
    List,
    /// Show the most recently saved image
    Latest,
    /// Delete a saved image
    Delete { id: i64 },
    /// Write a saved image to disk
    Export {
        id: i64,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Show or change the default resize settings
    Settings {
        #[command(subcommand)]
        action: SettingsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    Show,
    Set {
        #[arg(long)]
        width: u32,

        #[arg(long)]
        quality: f32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("snap_resize=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("Failed to load configuration")?;
    let app = SnapResize::new(config);

    match cli.command {
        Command::Resize {
            input,
            width,
            quality,
            format,
            save,
            out,
            no_download,
        } => {
            let mut parameters = app
                .load_settings()
                .await
                .context("Failed to read saved settings")?;
            if let Some(width) = width {
                parameters.target_width = width;
            }
            if let Some(quality) = quality {
                parameters.quality = quality;
            }
            if let Some(format) = format {
                parameters.format = format;
            }
            parameters.validate()?;
            app.session().set_parameters(parameters).await?;

            let processed = match app
                .open_file(&input)
                .await
                .with_context(|| format!("Failed to process {}", input.display()))?
            {
                Outcome::Applied(processed) => processed,
                other => bail!("Processing did not complete: {:?}", other),
            };

            let quality = if processed.format.is_lossy() {
                format!(", quality {}", parameters.quality)
            } else {
                String::new()
            };
            println!(
                "Resized to {}x{} {} ({} bytes{})",
                processed.width,
                processed.height,
                processed.format,
                processed.size(),
                quality
            );

            if !no_download {
                if let Some(path) = app.download_processed(out.as_deref()).await? {
                    println!("Wrote {}", path.display());
                }
            }

            if let Some(name) = save {
                let id = app
                    .save_to_gallery(Some(&name))
                    .await
                    .context("Failed to save image to gallery")?;
                println!("Saved to gallery as #{}", id);
            }
        }
        Command::List => {
            let mut images = app.library().list_images().await?;
            images.sort_by(|a, b| b.created_at.cmp(&a.created_at));

            println!("Total: {}", images.len());
            for image in images {
                println!(
                    "#{:<5} {:<32} {:<11} saved on {}",
                    image.id,
                    image.name,
                    image.mime_type,
                    image.created_at.format("%b %d, %Y")
                );
            }
        }
        Command::Latest => match app.library().latest_image().await? {
            Some(image) => println!(
                "#{} {} ({}) saved {}",
                image.id,
                image.name,
                image.mime_type,
                image.created_at.to_rfc3339()
            ),
            None => println!("No images saved yet"),
        },
        Command::Delete { id } => {
            app.library().delete_image(id).await?;
            println!("Deleted #{}", id);
        }
        Command::Export { id, out } => {
            let path = app.download_saved(id, out.as_deref()).await?;
            println!("Wrote {}", path.display());
        }
        Command::Settings { action } => match action {
            SettingsCommand::Show => match app.library().get_settings().await? {
                Some(settings) => {
                    let parameters = settings.parameters(app.config().default_format);
                    println!("{}", parameters.to_json()?);
                }
                None => println!("No settings saved"),
            },
            SettingsCommand::Set { width, quality } => {
                let record = StoredSettingRecord::new(width, quality);
                record.parameters(OutputFormat::default()).validate()?;
                app.library().save_settings(record).await?;
                println!("Saved settings: width={}, quality={}", width, quality);
            }
        },
    }

    Ok(())
}
