//! cdnkit CLI: operate a storage driver from the command line.
//!
//! Configuration comes from the environment (and `.env`); see `CdnConfig::from_env`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use cdnkit_cli::{file_name_of, init_tracing, DEFAULT_MIME};
use cdnkit_core::{CdnConfig, SchemeUrls};
use cdnkit_storage::factory::create_url_schemes;
use cdnkit_storage::{create_driver, NewObject, StorageDriver};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cdnkit", about = "Content storage driver CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a bucket (no-op if it exists)
    BucketCreate { bucket: String },
    /// Destroy a bucket, subject to the configured destroy policy
    BucketDestroy { bucket: String },
    /// Store a file as a new object
    Put {
        bucket: String,
        /// Path to the file to upload
        file: PathBuf,
        /// Stored filename (defaults to the file's name)
        #[arg(long)]
        filename: Option<String>,
        /// MIME type of the object
        #[arg(long, default_value = DEFAULT_MIME)]
        mime: String,
        /// Name offered when the object is downloaded
        #[arg(long)]
        name: Option<String>,
    },
    /// Check whether an object exists
    Exists { bucket: String, filename: String },
    /// Delete an object
    Rm { bucket: String, filename: String },
    /// Print a local path holding the object's bytes
    LocalPath { bucket: String, filename: String },
    /// Generate URLs
    Url(UrlArgs),
}

#[derive(Args)]
struct UrlArgs {
    /// Generate for a secure (HTTPS) request
    #[arg(long, global = true)]
    secure: bool,
    /// Print the pattern with placeholders instead of a concrete URL
    #[arg(long, global = true)]
    scheme: bool,
    #[command(subcommand)]
    kind: UrlKind,
}

#[derive(Subcommand)]
enum UrlKind {
    Serve {
        #[arg(default_value = "")]
        bucket: String,
        #[arg(default_value = "")]
        object: String,
        #[arg(long)]
        download: bool,
    },
    ServeRaw {
        #[arg(default_value = "")]
        bucket: String,
        #[arg(default_value = "")]
        object: String,
    },
    Zip {
        /// Comma-separated object ids
        #[arg(default_value = "")]
        ids: String,
        #[arg(default_value = "")]
        hash: String,
        #[arg(default_value = "")]
        filename: String,
    },
    Crop {
        #[arg(default_value = "")]
        bucket: String,
        #[arg(default_value = "")]
        object: String,
        #[arg(long, default_value_t = 100)]
        width: u32,
        #[arg(long, default_value_t = 100)]
        height: u32,
    },
    Scale {
        #[arg(default_value = "")]
        bucket: String,
        #[arg(default_value = "")]
        object: String,
        #[arg(long, default_value_t = 100)]
        width: u32,
        #[arg(long, default_value_t = 100)]
        height: u32,
    },
    Placeholder {
        #[arg(long, default_value_t = 100)]
        width: u32,
        #[arg(long, default_value_t = 100)]
        height: u32,
        #[arg(long, default_value_t = 0)]
        border: u32,
    },
    BlankAvatar {
        #[arg(long, default_value_t = 100)]
        width: u32,
        #[arg(long, default_value_t = 100)]
        height: u32,
        #[arg(long, default_value = "")]
        sex: String,
    },
    Expiring {
        #[arg(default_value = "")]
        bucket: String,
        #[arg(default_value = "")]
        object: String,
        /// Lifetime in seconds
        #[arg(long, default_value_t = 3600)]
        ttl: u64,
        #[arg(long)]
        download: bool,
    },
}

fn render_url(urls: SchemeUrls<'_>, scheme: bool, kind: UrlKind) -> anyhow::Result<String> {
    let url = match kind {
        UrlKind::Serve {
            bucket,
            object,
            download,
        } => {
            if scheme {
                urls.serve_scheme(download)
            } else {
                urls.serve(&object, &bucket, download)
            }
        }
        UrlKind::ServeRaw { bucket, object } => {
            if scheme {
                urls.serve_scheme(false)
            } else {
                urls.serve_raw(&object, &bucket)
            }
        }
        UrlKind::Zip {
            ids,
            hash,
            filename,
        } => {
            if scheme {
                urls.serve_zipped_scheme()
            } else {
                urls.serve_zipped(&ids, &hash, &filename)
            }
        }
        UrlKind::Crop {
            bucket,
            object,
            width,
            height,
        } => {
            if scheme {
                urls.crop_scheme()
            } else {
                urls.crop(&object, &bucket, width, height)
            }
        }
        UrlKind::Scale {
            bucket,
            object,
            width,
            height,
        } => {
            if scheme {
                urls.scale_scheme()
            } else {
                urls.scale(&object, &bucket, width, height)
            }
        }
        UrlKind::Placeholder {
            width,
            height,
            border,
        } => {
            if scheme {
                urls.placeholder_scheme()
            } else {
                urls.placeholder(width, height, border)
            }
        }
        UrlKind::BlankAvatar { width, height, sex } => {
            if scheme {
                urls.blank_avatar_scheme()
            } else {
                urls.blank_avatar(width, height, sex)
            }
        }
        UrlKind::Expiring {
            bucket,
            object,
            ttl,
            download,
        } => {
            if scheme {
                urls.expiring_scheme()
            } else {
                urls.expiring(&object, &bucket, ttl, download)
                    .context("Issue expiring link")?
            }
        }
    };
    Ok(url)
}

async fn connect(config: &CdnConfig) -> anyhow::Result<Arc<dyn StorageDriver>> {
    create_driver(config).await.context("Create storage driver")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = CdnConfig::from_env().context("Load CDN configuration")?;

    match cli.command {
        Commands::Url(args) => {
            let schemes = create_url_schemes(&config).context("Build URL schemes")?;
            let url = render_url(schemes.for_request(args.secure), args.scheme, args.kind)?;
            println!("{}", url);
        }
        Commands::BucketCreate { bucket } => {
            connect(&config)
                .await?
                .bucket_create(&bucket)
                .await
                .with_context(|| format!("Create bucket {}", bucket))?;
            println!("created {}", bucket);
        }
        Commands::BucketDestroy { bucket } => {
            connect(&config)
                .await?
                .bucket_destroy(&bucket)
                .await
                .with_context(|| format!("Destroy bucket {}", bucket))?;
            println!("destroyed {}", bucket);
        }
        Commands::Put {
            bucket,
            file,
            filename,
            mime,
            name,
        } => {
            let filename = match filename {
                Some(filename) => filename,
                None => file_name_of(&file)?,
            };
            let object = NewObject {
                bucket: bucket.clone(),
                source: file,
                filename: filename.clone(),
                mime,
                display_name: name,
            };
            let driver = connect(&config).await?;
            driver
                .object_create(&object)
                .await
                .with_context(|| format!("Store {} in {}", filename, bucket))?;
            println!("{}", driver.urls().for_request(false).serve(&filename, &bucket, false));
        }
        Commands::Exists { bucket, filename } => {
            let driver = connect(&config).await?;
            let exists = driver.object_exists(&filename, &bucket).await;
            if let Some(error) = driver.last_error() {
                tracing::warn!(error = %error, "Existence check reported an error");
            }
            println!("{}", exists);
            if !exists {
                std::process::exit(1);
            }
        }
        Commands::Rm { bucket, filename } => {
            connect(&config)
                .await?
                .object_destroy(&filename, &bucket)
                .await
                .with_context(|| format!("Delete {} from {}", filename, bucket))?;
            println!("deleted {}", filename);
        }
        Commands::LocalPath { bucket, filename } => {
            let path = connect(&config)
                .await?
                .object_local_path(&bucket, &filename)
                .await
                .with_context(|| format!("Fetch {} from {}", filename, bucket))?;
            println!("{}", path.display());
        }
    }

    Ok(())
}
