use ai_meme_core::{
    AiMeme,
    caption::{Anchor, Slot},
    compositor::EXPORT_FILE_NAME,
    fonts::{FONTS, font_by_name},
    image_processing::ImageSource,
    init,
    services::{CaptionService, ImageEditService},
    session::Session,
};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ai-meme", author, version, about = "AI meme generator", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Override the caption model defined in .env
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Override the image edit model defined in .env
    #[arg(long, global = true)]
    image_model: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show trending meme templates
    Templates {
        /// Only show templates whose name contains this text
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Suggest captions for an image
    Captions {
        /// Image file, URL or data URL
        source: String,
    },
    /// Edit an image with an instruction and save the result
    Edit {
        /// Image file, URL or data URL
        source: String,
        /// What to change, quoted as one argument, e.g. "add a party hat"
        instruction: String,
        /// Where to write the edited image
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Caption an image and export the meme
    Make(MakeArgs),
    /// List caption fonts and the files they resolve to
    Fonts,
}

#[derive(Args, Debug)]
struct MakeArgs {
    /// Image file, URL or data URL
    source: String,

    /// Top caption
    #[arg(long)]
    top: Option<String>,

    /// Bottom caption
    #[arg(long)]
    bottom: Option<String>,

    /// Top caption position as X,Y fractions of the image
    #[arg(long, value_name = "X,Y")]
    top_pos: Option<Anchor>,

    /// Bottom caption position as X,Y fractions of the image
    #[arg(long, value_name = "X,Y")]
    bottom_pos: Option<Anchor>,

    /// Font name (see `fonts`) or a family list
    #[arg(long)]
    font: Option<String>,

    /// Font size in pixels
    #[arg(long)]
    size: Option<f32>,

    /// Caption colour as #RRGGBB
    #[arg(long)]
    color: Option<String>,

    /// Edit the image with this instruction before captioning
    #[arg(long)]
    edit: Option<String>,

    /// Fill an empty top caption with the first AI suggestion
    #[arg(long, default_value_t = false)]
    suggest: bool,

    /// Output path
    #[arg(short, long, default_value = EXPORT_FILE_NAME)]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup
    init();
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
    tracing::debug!(command = ?cli.command, "Starting");

    // Load config and override models if specified via CLI
    let mut app = AiMeme::new().context("Failed to load configuration")?;
    if let Some(m) = cli.model {
        app.config_mut().model_name = m;
    }
    if let Some(m) = cli.image_model {
        app.config_mut().image_model_name = m;
    }

    let mut session = Session::new();
    match cli.command {
        Command::Templates { search } => run_templates(&app, &mut session, search).await,
        Command::Captions { source } => run_captions(&app, &mut session, &source).await,
        Command::Edit {
            source,
            instruction,
            output,
        } => run_edit(&app, &mut session, &source, &instruction, output).await,
        Command::Make(args) => run_make(&app, &mut session, args).await,
        Command::Fonts => {
            run_fonts(&app);
            Ok(())
        }
    }
}

async fn run_templates(app: &AiMeme, session: &mut Session, search: Option<String>) -> Result<()> {
    let spinner = spinner("Fetching trending templates...")?;
    let fetched = session.fetch_templates(app.templates()).await;
    spinner.finish_and_clear();
    fetched.with_context(|| user_error(session))?;

    if let Some(query) = search {
        session
            .search_templates(&query, app.templates())
            .await
            .with_context(|| user_error(session))?;
    }

    if session.templates().is_empty() {
        println!("No templates found");
    }
    for template in session.templates() {
        println!("{:<40} {}", template.name, template.url);
    }
    Ok(())
}

async fn run_captions(app: &AiMeme, session: &mut Session, source: &str) -> Result<()> {
    load(app, session, source).await?;
    let gemini = app.gemini()?;

    let spinner = spinner(format!("Asking {} for captions...", app.config().model_name))?;
    let result = session.request_caption_suggestions(&gemini).await;
    spinner.finish_and_clear();
    result.with_context(|| user_error(session))?;

    for (i, caption) in session.suggestions().iter().enumerate() {
        println!("{}. {}", i + 1, caption);
    }
    Ok(())
}

async fn run_edit(
    app: &AiMeme,
    session: &mut Session,
    source: &str,
    instruction: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    load(app, session, source).await?;
    let gemini = app.gemini()?;

    let spinner = spinner(format!("Editing with {}...", app.config().image_model_name))?;
    let result = session.request_image_edit(&gemini, instruction).await;
    spinner.finish_and_clear();
    result.with_context(|| user_error(session))?;

    let edited = session.current().context("No edited image")?;
    let output = output.unwrap_or_else(|| PathBuf::from(format!("ai-meme-edit.{}", edited.extension())));
    std::fs::write(&output, edited.bytes())
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Saved edited image to {}", output.display());
    Ok(())
}

async fn run_make(app: &AiMeme, session: &mut Session, args: MakeArgs) -> Result<()> {
    load(app, session, &args.source).await?;

    if args.edit.is_some() || args.suggest {
        let gemini = app.gemini()?;
        let edit_ticket = match &args.edit {
            Some(instruction) => Some(
                session
                    .begin_image_edit(instruction)
                    .with_context(|| user_error(session))?,
            ),
            None => None,
        };
        let caption_ticket = if args.suggest {
            Some(
                session
                    .begin_caption_suggestions()
                    .with_context(|| user_error(session))?,
            )
        } else {
            None
        };

        // Edit and suggestions run side by side; both start from the loaded image.
        let spinner = spinner("Waiting for Gemini...")?;
        let edit_call = async {
            match &edit_ticket {
                Some(t) => Some(
                    gemini
                        .edit_image(
                            t.original().to_base64(),
                            t.original().mime_type().to_string(),
                            t.instruction().to_string(),
                        )
                        .await,
                ),
                None => None,
            }
        };
        let caption_call = async {
            match &caption_ticket {
                Some(t) => Some(
                    gemini
                        .generate_captions(t.image().to_base64(), t.image().mime_type().to_string())
                        .await,
                ),
                None => None,
            }
        };
        let (edit_result, caption_result) = futures::join!(edit_call, caption_call);
        spinner.finish_and_clear();

        if let (Some(ticket), Some(result)) = (edit_ticket, edit_result) {
            session
                .finish_image_edit(ticket, result)
                .with_context(|| user_error(session))?;
        }
        if let (Some(ticket), Some(result)) = (caption_ticket, caption_result) {
            session
                .finish_caption_suggestions(ticket, result)
                .with_context(|| user_error(session))?;
        }
    }

    let top = args.top.or_else(|| {
        args.suggest
            .then(|| session.suggestions().first().cloned())
            .flatten()
    });
    if let Some(text) = top {
        session.set_caption_text(Slot::Top, text);
    }
    if let Some(text) = args.bottom {
        session.set_caption_text(Slot::Bottom, text);
    }

    for slot in Slot::ALL {
        if let Some(font) = &args.font {
            let family = font_by_name(font).map_or(font.as_str(), |f| f.font_family);
            session.set_font_family(slot, family);
        }
        if let Some(size) = args.size {
            session.set_font_size(slot, size).context("Invalid --size")?;
        }
        if let Some(color) = &args.color {
            session.set_color(slot, color.as_str());
        }
    }
    if let Some(anchor) = args.top_pos {
        session.set_anchor(Slot::Top, anchor);
    }
    if let Some(anchor) = args.bottom_pos {
        session.set_anchor(Slot::Bottom, anchor);
    }

    let png = session
        .export(app.compositor())
        .with_context(|| user_error(session))?;
    std::fs::write(&args.output, png)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    println!("Saved meme to {}", args.output.display());
    Ok(())
}

fn run_fonts(app: &AiMeme) {
    let fonts = app.compositor().fonts();
    for font in FONTS {
        let resolved = fonts
            .describe(font.font_family)
            .unwrap_or_else(|| "(not installed, falls back)".to_string());
        println!("{:<12} {}", font.name, resolved);
    }
}

async fn load(app: &AiMeme, session: &mut Session, source: &str) -> Result<()> {
    let source = ImageSource::parse(source).context("Invalid image source")?;
    let spinner = spinner(format!("Loading {}...", source))?;
    let result = session.load_image(source, app.fetcher()).await;
    spinner.finish_and_clear();
    result.with_context(|| user_error(session))
}

fn user_error(session: &Session) -> String {
    session.error().unwrap_or("Request failed").to_string()
}

fn spinner(message: impl Into<String>) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
            .template("{spinner:.green} {msg}")?,
    );
    spinner.set_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}
