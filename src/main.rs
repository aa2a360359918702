use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context as _};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use storyboard_studio::error::ServiceError;
use storyboard_studio::mask::{MaskCanvas, PaintMode, Point, Rect};
use storyboard_studio::orchestrator::{AspectRatio, CharacterBrief};
use storyboard_studio::service::{GeminiClient, GeneratedImage, GenerationRequest, ImageService};
use storyboard_studio::state::data::{AssetKind, ImageData};
use storyboard_studio::state::store::{AssetStore, SettingsStore};
use storyboard_studio::state::{Library, MemoryStore};
use storyboard_studio::{Locale, Studio, StudioConfig};

#[derive(Parser, Debug)]
#[command(name = "storyboard-studio", version, about = "AI storyboard editor")]
struct Cli {
    /// Config file (defaults to <config dir>/storyboard-studio/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Keep everything in memory; nothing is read from or written to disk
    #[arg(long, global = true, default_value_t = false)]
    ephemeral: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the assets of one library.
    List { kind: AssetKind },
    /// Import assets from a JSON export file.
    Import { kind: AssetKind, file: PathBuf },
    /// Export a library as JSON into a directory.
    Export {
        kind: AssetKind,
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    /// Rename an asset.
    Rename {
        kind: AssetKind,
        id: String,
        name: String,
    },
    /// Delete an asset.
    Remove { kind: AssetKind, id: String },
    /// Show or change the interface language (vi or en).
    Locale { value: Option<Locale> },
    /// Generate a character portrait.
    GenerateCharacter(CharacterArgs),
    /// Generate a background scene.
    GenerateBackground(BackgroundArgs),
    /// Redraw an existing character image in another style.
    Restyle(RestyleArgs),
    /// Place characters into a background.
    Compose(ComposeArgs),
    /// Edit an image, optionally inside a painted mask.
    Edit(EditArgs),
    /// Generate variations of a character.
    Variations(VariationArgs),
}

/// Where a generated image goes
#[derive(Parser, Debug)]
struct OutputArgs {
    /// Save the result into the library under this name
    #[arg(long)]
    name: Option<String>,

    /// Write the result image to this path
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct CharacterArgs {
    #[arg(long)]
    appearance: String,
    #[arg(long, default_value = "")]
    clothing: String,
    #[arg(long, default_value = "")]
    accessories: String,
    #[arg(long, default_value = "")]
    mood: String,
    #[arg(long, default_value = "3D Pixar")]
    style: String,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Parser, Debug)]
struct BackgroundArgs {
    #[arg(long)]
    description: String,
    #[arg(long, default_value = "3D Pixar")]
    style: String,
    /// 9:16, 16:9 or 1:1
    #[arg(long, default_value = "16:9")]
    aspect: AspectRatio,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Parser, Debug)]
struct RestyleArgs {
    /// Image file to restyle
    #[arg(long = "in")]
    input: PathBuf,
    #[arg(long, default_value = "3D Pixar")]
    style: String,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Parser, Debug)]
struct ComposeArgs {
    /// Character id (repeatable)
    #[arg(long = "character", required = true)]
    characters: Vec<String>,
    #[arg(long)]
    background: String,
    #[arg(long)]
    description: String,
    /// Write the scene to this path
    #[arg(long, default_value = "scene.png")]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct EditArgs {
    /// Image to edit
    #[arg(long = "in")]
    input: PathBuf,
    #[arg(long)]
    instruction: String,
    /// Mask stroke in image pixels, e.g. "10,10 80,40 120,90" (repeatable)
    #[arg(long = "stroke")]
    strokes: Vec<String>,
    /// Eraser stroke, applied after all brush strokes (repeatable)
    #[arg(long = "erase-stroke")]
    erase_strokes: Vec<String>,
    /// Brush width in pixels (5-100)
    #[arg(long, default_value_t = 30)]
    brush: u32,
    /// Write the image with the mask overlay to this path
    #[arg(long)]
    mask_preview: Option<PathBuf>,
    #[arg(long, default_value = "edited.png")]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct VariationArgs {
    /// Character id
    id: String,
    /// Zero-based indices of variations to save, e.g. --accept 0,2
    #[arg(long, value_delimiter = ',')]
    accept: Vec<usize>,
    /// Write every variation into this directory
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

/// Stands in for the image service when no API key is configured
struct MissingKey;

#[async_trait]
impl ImageService for MissingKey {
    async fn generate(&self, _request: GenerationRequest) -> Result<GeneratedImage, ServiceError> {
        Err(ServiceError::MissingApiKey)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = StudioConfig::load(cli.config.as_deref())?;

    let service: Arc<dyn ImageService> = match GeminiClient::from_config(&config) {
        Ok(client) => {
            info!("🤖 Image model: {}", client.model_name());
            Arc::new(client)
        }
        Err(e) => {
            warn!("⚠️  {}; generation commands will fail", e);
            Arc::new(MissingKey)
        }
    };

    if cli.ephemeral {
        info!("🧪 Running with an in-memory store");
        run(cli.cmd, Arc::new(MemoryStore::new()), service, &config).await
    } else {
        let library = Library::open(config.database_path()?)?;
        run(cli.cmd, Arc::new(library), service, &config).await
    }
}

async fn run<S>(
    cmd: Command,
    store: S,
    service: Arc<dyn ImageService>,
    config: &StudioConfig,
) -> anyhow::Result<()>
where
    S: AssetStore + SettingsStore + Clone,
{
    let mut studio = Studio::open(store, service, config).await;

    match cmd {
        Command::List { kind } => {
            let repo = studio.repository(kind);
            println!("{} {}:", repo.len(), kind);
            for asset in repo.assets() {
                println!("  {}  {}  ({})", asset.id, asset.name, asset.mime_type);
            }
        }
        Command::Import { kind, file } => {
            let added = studio.import_file(kind, &file).await?;
            println!("Imported {added} new {kind}");
        }
        Command::Export { kind, dir } => match studio.export_file(kind, &dir).await? {
            Some(path) => println!("Exported to {}", path.display()),
            None => println!("Nothing to export: the {kind} library is empty"),
        },
        Command::Rename { kind, id, name } => match studio.rename(kind, &id, &name).await? {
            Some(asset) => println!("Renamed {} to '{}'", asset.id, asset.name),
            None => println!("No {kind} with id {id}"),
        },
        Command::Remove { kind, id } => {
            if studio.remove(kind, &id).await? {
                println!("Removed {id}");
            } else {
                println!("No {kind} with id {id}");
            }
        }
        Command::Locale { value } => {
            if let Some(locale) = value {
                if let Err(e) = studio.locale.set(locale).await {
                    warn!("⚠️  Language not saved: {}", e);
                }
            }
            println!("{}", studio.locale.get());
        }
        Command::GenerateCharacter(args) => {
            let brief = CharacterBrief {
                appearance: args.appearance,
                clothing: args.clothing,
                accessories: args.accessories,
                mood: args.mood,
            };
            let image = studio
                .orchestrator
                .generate_character(&brief, &args.style)
                .await?;
            deliver(&mut studio, AssetKind::Character, &image, args.output).await?;
        }
        Command::GenerateBackground(args) => {
            let image = studio
                .orchestrator
                .generate_background(&args.description, &args.style, args.aspect)
                .await?;
            deliver(&mut studio, AssetKind::Background, &image, args.output).await?;
        }
        Command::Restyle(args) => {
            let source = read_image(&args.input).await?;
            let image = studio.orchestrator.restyle(&source, &args.style).await?;
            deliver(&mut studio, AssetKind::Character, &image, args.output).await?;
        }
        Command::Compose(args) => {
            for id in &args.characters {
                studio.selection.select_character(id);
            }
            studio.selection.select_background(&args.background);
            let scene = studio.compose_selected(&args.description).await?;
            write_image(&args.out, &scene).await?;
        }
        Command::Edit(args) => edit(&studio, args).await?,
        Command::Variations(args) => {
            let batch = studio.generate_variations(&args.id).await?;
            println!("Generated {} variations", batch.len());
            if let Some(dir) = &args.out_dir {
                for (index, image) in batch.images.iter().enumerate() {
                    let data = image.image_data()?;
                    let path = dir.join(format!("variation-{}.{}", index + 1, data.extension()));
                    write_image(&path, image).await?;
                }
            }
            for asset in studio.accept_variations(&batch, &args.accept).await? {
                println!("Saved {}  {}", asset.id, asset.name);
            }
        }
    }
    Ok(())
}

async fn edit<S>(studio: &Studio<S, Arc<dyn ImageService>>, args: EditArgs) -> anyhow::Result<()>
where
    S: AssetStore + SettingsStore + Clone,
{
    let source = read_image(&args.input).await?;
    let decoded = source.decode()?;
    studio
        .orchestrator
        .set_current(Some(GeneratedImage::from_image(&source)));

    // One image pixel per client unit
    let container = Rect::new(0.0, 0.0, decoded.width() as f32, decoded.height() as f32);
    let mut canvas = MaskCanvas::new(&decoded, container);
    canvas.set_brush_size(args.brush);

    for (mode, strokes) in [
        (PaintMode::Draw, &args.strokes),
        (PaintMode::Erase, &args.erase_strokes),
    ] {
        canvas.set_mode(mode);
        for stroke in strokes {
            canvas.stroke(&parse_points(stroke)?);
        }
    }
    info!("🖌️  Mask covers {} pixels", canvas.painted_pixels());

    if let Some(path) = &args.mask_preview {
        canvas
            .composite_preview()
            .save(path)
            .with_context(|| format!("writing mask preview {}", path.display()))?;
    }

    let edited = studio.edit_scene(&args.instruction, Some(&canvas)).await?;
    write_image(&args.out, &edited).await
}

/// Write the image to `--out` and/or save it to the library under `--name`
async fn deliver<S>(
    studio: &mut Studio<S, Arc<dyn ImageService>>,
    kind: AssetKind,
    image: &GeneratedImage,
    output: OutputArgs,
) -> anyhow::Result<()>
where
    S: AssetStore + SettingsStore + Clone,
{
    if let Some(path) = &output.out {
        write_image(path, image).await?;
    }
    if let Some(name) = &output.name {
        let asset = studio.save_generated(kind, name, image).await?;
        println!("Saved {}  {}", asset.id, asset.name);
    }
    if output.out.is_none() && output.name.is_none() {
        println!("Nothing kept: pass --out and/or --name to keep the result");
    }
    Ok(())
}

async fn read_image(path: &Path) -> anyhow::Result<ImageData> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let mime_type = image::ImageFormat::from_path(path)
        .map(|format| format.to_mime_type())
        .unwrap_or("image/png");
    Ok(ImageData::new(bytes, mime_type))
}

async fn write_image(path: &Path, image: &GeneratedImage) -> anyhow::Result<()> {
    let data = image.image_data()?;
    tokio::fs::write(path, &data.bytes)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

/// "x,y x,y ..." in image pixels
fn parse_points(text: &str) -> anyhow::Result<Vec<Point>> {
    let mut points = Vec::new();
    for pair in text.split_whitespace() {
        let Some((x, y)) = pair.split_once(',') else {
            bail!("expected x,y but got '{pair}'");
        };
        let x: f32 = x.trim().parse().with_context(|| format!("bad x in '{pair}'"))?;
        let y: f32 = y.trim().parse().with_context(|| format!("bad y in '{pair}'"))?;
        points.push(Point::new(x, y));
    }
    if points.len() < 2 {
        bail!("a stroke needs at least two points, got '{text}'");
    }
    Ok(points)
}
