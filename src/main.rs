//! # Folio CLI
//!
//! Usage:
//!   folio paginate document.html -o paged.html --page-size letter
//!   cat paged.html | folio strip > document.html
//!   folio pages document.html --config layout.json
//!   folio example-config > layout.json

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use folio::{LayoutConfig, PageSize};

#[derive(Parser)]
#[command(name = "folio", about = "Paged HTML documents from the command line", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Insert page spacers and write the paged markup
    Paginate {
        /// Input HTML file (stdin if omitted)
        input: Option<PathBuf>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        layout: LayoutArgs,
    },

    /// Remove page spacers, leaving the persistable document
    Strip {
        /// Input HTML file (stdin if omitted)
        input: Option<PathBuf>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the page count
    Pages {
        /// Input HTML file (stdin if omitted)
        input: Option<PathBuf>,

        #[command(flatten)]
        layout: LayoutArgs,
    },

    /// Print the default layout config as JSON
    ExampleConfig,
}

#[derive(Args)]
struct LayoutArgs {
    /// Layout config JSON file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Page size preset
    #[arg(long, value_enum)]
    page_size: Option<PageSizeArg>,

    #[arg(long)]
    page_width: Option<f64>,

    #[arg(long)]
    page_height: Option<f64>,

    #[arg(long)]
    margin_top: Option<f64>,

    #[arg(long)]
    margin_bottom: Option<f64>,

    #[arg(long)]
    margin_left: Option<f64>,

    #[arg(long)]
    margin_right: Option<f64>,

    /// Zoom in percent
    #[arg(long)]
    zoom: Option<f64>,

    /// Gap between pages
    #[arg(long)]
    gap: Option<f64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum PageSizeArg {
    A4,
    A5,
    Letter,
    Legal,
}

impl From<PageSizeArg> for PageSize {
    fn from(arg: PageSizeArg) -> Self {
        match arg {
            PageSizeArg::A4 => PageSize::A4,
            PageSizeArg::A5 => PageSize::A5,
            PageSizeArg::Letter => PageSize::Letter,
            PageSizeArg::Legal => PageSize::Legal,
        }
    }
}

impl LayoutArgs {
    /// Config file first, then the preset, then individual overrides.
    fn resolve(&self) -> folio::Result<LayoutConfig> {
        let mut config = match &self.config {
            Some(path) => LayoutConfig::from_json(&fs::read_to_string(path)?)?,
            None => LayoutConfig::default(),
        };
        if let Some(size) = self.page_size {
            config = config.with_page_size(size.into());
        }
        let overrides = [
            (self.page_width, &mut config.page_width),
            (self.page_height, &mut config.page_height),
            (self.margin_top, &mut config.margin_top),
            (self.margin_bottom, &mut config.margin_bottom),
            (self.margin_left, &mut config.margin_left),
            (self.margin_right, &mut config.margin_right),
            (self.zoom, &mut config.zoom_percent),
            (self.gap, &mut config.inter_page_gap),
        ];
        for (value, field) in overrides {
            if let Some(value) = value {
                *field = value;
            }
        }
        Ok(config)
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli.command) {
        eprintln!("✗ {}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> folio::Result<()> {
    match command {
        Commands::Paginate {
            input,
            output,
            layout,
        } => {
            let config = layout.resolve()?;
            let (html, pages) = folio::paginate_html(&read_input(input)?, &config)?;
            write_output(output.as_ref(), &html)?;
            eprintln!("✓ {} page{}", pages, if pages == 1 { "" } else { "s" });
        }
        Commands::Strip { input, output } => {
            let html = folio::strip_spacers(&read_input(input)?);
            write_output(output.as_ref(), &html)?;
        }
        Commands::Pages { input, layout } => {
            let config = layout.resolve()?;
            println!("{}", folio::page_count(&read_input(input)?, &config)?);
        }
        Commands::ExampleConfig => {
            println!("{}", serde_json::to_string_pretty(&LayoutConfig::default())?);
        }
    }
    Ok(())
}

fn read_input(path: Option<PathBuf>) -> io::Result<String> {
    match path {
        Some(path) => fs::read_to_string(path),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&PathBuf>, html: &str) -> io::Result<()> {
    match path {
        Some(path) => {
            fs::write(path, html)?;
            eprintln!("✓ Written {} bytes to {}", html.len(), path.display());
            Ok(())
        }
        None => {
            print!("{}", html);
            Ok(())
        }
    }
}
