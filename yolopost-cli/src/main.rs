use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use yolopost::io::source_size_from_image;
use yolopost::{
    AnchorSet, DecodeConfig, Detection, ImageSize, PostprocessConfig, Postprocessor,
    SortStrategy, StrideOutput, YOLOV5_ANCHORS,
};

mod coco;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "YOLO head postprocessing (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Print one text line per detection instead of JSON.
    #[arg(long)]
    summary: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
struct TensorFile {
    stride: u32,
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct SourceConfig {
    rows: usize,
    cols: usize,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct PostprocessJson {
    num_classes: usize,
    anchors_per_group: usize,
    strides: Vec<u32>,
    anchors: Vec<f32>,
    letterbox_rows: usize,
    letterbox_cols: usize,
    prob_threshold: f32,
    nms_threshold: f32,
    parallel: bool,
}

impl Default for PostprocessJson {
    fn default() -> Self {
        let cfg = PostprocessConfig::default();
        Self {
            num_classes: cfg.decode.num_classes,
            anchors_per_group: cfg.decode.anchors_per_group,
            strides: cfg.decode.strides,
            anchors: YOLOV5_ANCHORS.to_vec(),
            letterbox_rows: cfg.letterbox.rows,
            letterbox_cols: cfg.letterbox.cols,
            prob_threshold: cfg.prob_threshold,
            nms_threshold: cfg.nms_threshold,
            parallel: cfg.parallel,
        }
    }
}

impl PostprocessJson {
    fn to_config(&self) -> PostprocessConfig {
        let sort = if self.parallel {
            SortStrategy::Parallel
        } else {
            SortStrategy::Sequential
        };
        PostprocessConfig {
            decode: DecodeConfig {
                num_classes: self.num_classes,
                anchors_per_group: self.anchors_per_group,
                strides: self.strides.clone(),
            },
            letterbox: ImageSize::new(self.letterbox_rows, self.letterbox_cols),
            prob_threshold: self.prob_threshold,
            nms_threshold: self.nms_threshold,
            sort,
            parallel: self.parallel,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    outputs: Vec<TensorFile>,
    source: Option<SourceConfig>,
    image_path: Option<PathBuf>,
    nms: bool,
    class_names: Option<Vec<String>>,
    output_path: Option<PathBuf>,
    postprocess: PostprocessJson,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            outputs: Vec::new(),
            source: None,
            image_path: None,
            nms: true,
            class_names: None,
            output_path: None,
            postprocess: PostprocessJson::default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DetectionRecord {
    label: usize,
    class_name: Option<String>,
    score: f32,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

#[derive(Debug, Serialize)]
struct Output {
    source_rows: usize,
    source_cols: usize,
    detections: Vec<DetectionRecord>,
}

fn read_f32_le(path: &Path) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
    let bytes = fs::read(path)?;
    if bytes.len() % 4 != 0 {
        return Err(format!(
            "{}: length {} is not a multiple of 4 bytes",
            path.display(),
            bytes.len()
        )
        .into());
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

fn class_name(names: &[String], label: usize) -> Option<String> {
    names.get(label).cloned()
}

fn record(det: &Detection, names: &[String]) -> DetectionRecord {
    DetectionRecord {
        label: det.label,
        class_name: class_name(names, det.label),
        score: det.score,
        x: det.rect.x,
        y: det.rect.y,
        width: det.rect.width,
        height: det.rect.height,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("yolopost=debug".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.outputs.is_empty() {
        return Err("at least one entry in outputs must be set in the config".into());
    }

    let src = match (&config.source, &config.image_path) {
        (Some(source), _) => ImageSize::new(source.rows, source.cols),
        (None, Some(path)) => source_size_from_image(path)?,
        (None, None) => return Err("either source or image_path must be set".into()),
    };

    let anchors = AnchorSet::from_flat(
        &config.postprocess.anchors,
        config.postprocess.anchors_per_group,
    )?;
    let post = Postprocessor::new(config.postprocess.to_config(), anchors)?;

    let mut tensors = Vec::with_capacity(config.outputs.len());
    for entry in &config.outputs {
        let data = read_f32_le(&entry.path)?;
        tracing::debug!(stride = entry.stride, values = data.len(), "loaded tensor");
        tensors.push((entry.stride, data));
    }
    let outputs: Vec<StrideOutput<'_>> = tensors
        .iter()
        .map(|(stride, data)| StrideOutput::new(*stride, data))
        .collect();

    let detections = if config.nms {
        post.run(&outputs, src)?
    } else {
        post.run_unfiltered(&outputs, src)?
    };

    let names = config
        .class_names
        .unwrap_or_else(|| coco::COCO_CLASSES.iter().map(|s| s.to_string()).collect());

    let text = if cli.summary {
        let mut lines = String::new();
        for det in &detections {
            let name = class_name(&names, det.label).unwrap_or_default();
            lines.push_str(&format!("{det}, {name}\n"));
        }
        lines
    } else {
        let output = Output {
            source_rows: src.rows,
            source_cols: src.cols,
            detections: detections.iter().map(|det| record(det, &names)).collect(),
        };
        serde_json::to_string_pretty(&output)?
    };

    match config.output_path {
        Some(path) => fs::write(path, text)?,
        None => println!("{text}"),
    }

    Ok(())
}
