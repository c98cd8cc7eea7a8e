use burn::config::Config;
use clap::{Parser, Subcommand};
use digit_draw::{
    export, weights, Bitmap, CpuBackend, DigitDrawConfig, InferenceSession, NormalizeMode,
    PixelLayout, Point, Prediction, RasterCanvas, StrokeNormalizer, WeightFormat,
};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

const DEFAULT_WEIGHTS: &str = "simplecnn_state.pth";

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// JSON settings file, see `DigitDrawConfig`
    #[clap(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Weight artifact, overrides the settings file
    #[clap(short = 'w', long = "weights")]
    weights: Option<String>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify a drawing stored as an image file
    Classify {
        image: PathBuf,
    },
    /// Draw strokes on a blank canvas, classify them and optionally save the drawing
    Draw {
        /// Segments as `x0,y0,x1,y1` in canvas pixels
        #[clap(required = true, num_args(1..), value_parser = parse_stroke)]
        strokes: Vec<Stroke>,

        /// Save the canvas as PNG
        #[clap(long = "png")]
        png: Option<PathBuf>,

        /// Save the normalized 28x28 array as .npy
        #[clap(long = "npy")]
        npy: Option<PathBuf>,
    },
    /// Export the normalized 28x28 array of an image file
    Export {
        image: PathBuf,
        output: PathBuf,

        /// Also save an upscaled preview of the array
        #[clap(long = "preview")]
        preview: Option<PathBuf>,
    },
    /// Convert weights (e.g. a PyTorch state dict) to a native artifact
    Convert {
        input: PathBuf,
        output: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if let Err(err) = run(args) {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn run(args: Args) -> digit_draw::Result<()> {
    let mut config = match &args.config {
        Some(file) => DigitDrawConfig::load(file)?,
        None => DigitDrawConfig::new(DEFAULT_WEIGHTS.to_string()),
    };
    if let Some(weights) = args.weights {
        config.weights = weights;
    }

    match args.command {
        Commands::Classify { image: path } => {
            let session = InferenceSession::<CpuBackend>::open(&config, Default::default())?;
            let bitmap = Bitmap::from_image(&image::open(&path)?)?;

            report(&session.classify(&bitmap)?);
        }
        Commands::Draw { strokes, png, npy } => {
            let size = config.canvas_size;
            let mut canvas = RasterCanvas::new(size, size, PixelLayout::Bgr)?;
            for stroke in strokes {
                canvas.add_stroke(stroke.from, stroke.to, config.pen_width);
            }
            let snapshot = canvas.snapshot();

            if let Some(file) = png {
                export::save_png(&file, &snapshot)?;
            }
            if let Some(file) = npy {
                let tensor = StrokeNormalizer::new(config.polarity.clone())
                    .normalize(&snapshot, NormalizeMode::Export)?;
                export::write_npy(&file, &tensor)?;
            }

            let session = InferenceSession::<CpuBackend>::open(&config, Default::default())?;
            report(&session.classify(&snapshot)?);
        }
        Commands::Export {
            image: path,
            output,
            preview,
        } => {
            let bitmap = Bitmap::from_image(&image::open(&path)?)?;
            let tensor = StrokeNormalizer::new(config.polarity.clone())
                .normalize(&bitmap, NormalizeMode::Export)?;

            export::write_npy(&output, &tensor)?;
            if let Some(file) = preview {
                tensor.preview(config.preview_scale).save(&file)?;
            }
        }
        Commands::Convert { input, output } => {
            let device = Default::default();
            let classifier =
                weights::load_classifier::<CpuBackend>(&input, &WeightFormat::Auto, &device)?;
            let file = weights::save_classifier(classifier, &output)?;

            println!("Saved weights to '{}'", file.display());
        }
    }

    Ok(())
}

#[derive(Clone, Debug)]
struct Stroke {
    from: Point,
    to: Point,
}

fn parse_stroke(stroke: &str) -> Result<Stroke, String> {
    let coords = stroke
        .split(',')
        .map(|v| v.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .ok()
        .filter(|coords| coords.len() == 4)
        .ok_or_else(|| format!("stroke '{stroke}' is not of the form x0,y0,x1,y1"))?;

    Ok(Stroke {
        from: Point::new(coords[0], coords[1]),
        to: Point::new(coords[2], coords[3]),
    })
}

fn report(prediction: &Prediction) {
    println!(
        "Prediction: {} (confidence {:.1}%)",
        prediction.label,
        prediction.confidence() * 100.0
    );
    println!("Scores: {:?}", prediction.scores.as_slice());
}
