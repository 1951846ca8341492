//! Python bindings for the yolopost detection postprocessing library.
//!
//! This module exposes the stride decoder, NMS and letterbox remapping to
//! Python via PyO3, taking raw head outputs as numpy float32 arrays.

use numpy::PyReadonlyArrayDyn;
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use yolopost::{
    AnchorSet, DecodeConfig, Detection as RustDetection, ImageSize,
    PostprocessConfig as RustPostprocessConfig, Postprocessor as RustPostprocessor,
    SortStrategy, StrideOutput, YoloPostError,
};

/// Convert a YoloPostError to a Python exception.
fn to_py_err(err: YoloPostError) -> PyErr {
    match err {
        YoloPostError::InvalidConfig { .. } => PyValueError::new_err(err.to_string()),
        _ => PyRuntimeError::new_err(err.to_string()),
    }
}

/// Detected object in source image pixels.
#[pyclass]
#[derive(Clone)]
pub struct Detection {
    /// Zero-based class index.
    #[pyo3(get)]
    pub label: usize,
    /// Confidence in [0, 1].
    #[pyo3(get)]
    pub score: f32,
    /// Left edge.
    #[pyo3(get)]
    pub x: f32,
    /// Top edge.
    #[pyo3(get)]
    pub y: f32,
    /// Box width.
    #[pyo3(get)]
    pub width: f32,
    /// Box height.
    #[pyo3(get)]
    pub height: f32,
}

#[pymethods]
impl Detection {
    /// Corners as (x0, y0, x1, y1).
    fn xyxy(&self) -> (f32, f32, f32, f32) {
        (self.x, self.y, self.x + self.width, self.y + self.height)
    }

    fn __repr__(&self) -> String {
        format!(
            "Detection(label={}, score={:.4}, x={:.1}, y={:.1}, width={:.1}, height={:.1})",
            self.label, self.score, self.x, self.y, self.width, self.height
        )
    }
}

impl From<RustDetection> for Detection {
    fn from(d: RustDetection) -> Self {
        Self {
            label: d.label,
            score: d.score,
            x: d.rect.x,
            y: d.rect.y,
            width: d.rect.width,
            height: d.rect.height,
        }
    }
}

/// Configuration for decoding and suppression.
#[pyclass]
#[derive(Clone)]
pub struct PostprocessConfig {
    inner: RustPostprocessConfig,
}

#[pymethods]
impl PostprocessConfig {
    /// Create a new PostprocessConfig.
    ///
    /// Args:
    ///     num_classes: Number of object classes (default: 80)
    ///     anchors_per_group: Anchor slots per grid cell (default: 3)
    ///     strides: Strides in anchor-group order (default: [8, 16, 32])
    ///     letterbox_rows: Network input height (default: 640)
    ///     letterbox_cols: Network input width (default: 640)
    ///     prob_threshold: Minimum objectness * class probability (default: 0.45)
    ///     nms_threshold: IoU above which boxes are suppressed (default: 0.45)
    ///     parallel: Decode strides and sort in parallel (default: False)
    #[new]
    #[pyo3(signature = (
        num_classes = 80,
        anchors_per_group = 3,
        strides = vec![8, 16, 32],
        letterbox_rows = 640,
        letterbox_cols = 640,
        prob_threshold = 0.45,
        nms_threshold = 0.45,
        parallel = false
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        num_classes: usize,
        anchors_per_group: usize,
        strides: Vec<u32>,
        letterbox_rows: usize,
        letterbox_cols: usize,
        prob_threshold: f32,
        nms_threshold: f32,
        parallel: bool,
    ) -> PyResult<Self> {
        let inner = RustPostprocessConfig {
            decode: DecodeConfig {
                num_classes,
                anchors_per_group,
                strides,
            },
            letterbox: ImageSize::new(letterbox_rows, letterbox_cols),
            prob_threshold,
            nms_threshold,
            sort: if parallel {
                SortStrategy::Parallel
            } else {
                SortStrategy::Sequential
            },
            parallel,
        };
        inner.validate().map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Validate the configuration.
    fn validate(&self) -> PyResult<()> {
        self.inner.validate().map_err(to_py_err)
    }

    fn __repr__(&self) -> String {
        format!(
            "PostprocessConfig(num_classes={}, strides={:?}, letterbox={}x{}, prob_threshold={}, nms_threshold={}, parallel={})",
            self.inner.decode.num_classes,
            self.inner.decode.strides,
            self.inner.letterbox.cols,
            self.inner.letterbox.rows,
            self.inner.prob_threshold,
            self.inner.nms_threshold,
            self.inner.parallel
        )
    }
}

/// Reusable postprocessor bound to a config and anchor table.
#[pyclass]
pub struct Postprocessor {
    inner: RustPostprocessor,
}

fn run_outputs(
    post: &RustPostprocessor,
    outputs: Vec<(u32, PyReadonlyArrayDyn<'_, f32>)>,
    src_rows: usize,
    src_cols: usize,
    nms: bool,
) -> PyResult<Vec<Detection>> {
    let mut views = Vec::with_capacity(outputs.len());
    for (stride, array) in outputs.iter() {
        views.push(StrideOutput::new(*stride, array.as_slice()?));
    }
    let src = ImageSize::new(src_rows, src_cols);
    let dets = if nms {
        post.run(&views, src)
    } else {
        post.run_unfiltered(&views, src)
    }
    .map_err(to_py_err)?;
    Ok(dets.into_iter().map(Detection::from).collect())
}

#[pymethods]
impl Postprocessor {
    /// Create a postprocessor.
    ///
    /// Args:
    ///     config: PostprocessConfig (default: PostprocessConfig())
    ///     anchors: Flat [group][anchor][w, h] priors (default: YOLOv5 COCO anchors)
    #[new]
    #[pyo3(signature = (config = None, anchors = None))]
    fn new(config: Option<PostprocessConfig>, anchors: Option<Vec<f32>>) -> PyResult<Self> {
        let cfg = config.map(|c| c.inner).unwrap_or_default();
        let anchors = match anchors {
            Some(flat) => {
                AnchorSet::from_flat(&flat, cfg.decode.anchors_per_group).map_err(to_py_err)?
            }
            None => AnchorSet::yolov5(),
        };
        let inner = RustPostprocessor::new(cfg, anchors).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Decode, suppress and remap one frame.
    ///
    /// Args:
    ///     outputs: List of (stride, float32 array) pairs; arrays must be
    ///         C-contiguous with layout [anchor][row][col][5 + num_classes]
    ///     src_rows: Original image height
    ///     src_cols: Original image width
    ///     nms: Apply sorting and NMS (default: True)
    ///
    /// Returns:
    ///     List of Detection objects in source image pixels
    #[pyo3(signature = (outputs, src_rows, src_cols, nms = true))]
    fn run(
        &self,
        outputs: Vec<(u32, PyReadonlyArrayDyn<'_, f32>)>,
        src_rows: usize,
        src_cols: usize,
        nms: bool,
    ) -> PyResult<Vec<Detection>> {
        run_outputs(&self.inner, outputs, src_rows, src_cols, nms)
    }

    /// Expected number of float32 values for `stride`.
    fn expected_len(&self, stride: u32) -> PyResult<usize> {
        let shape = self
            .inner
            .decoder()
            .feature_shape(stride)
            .map_err(to_py_err)?;
        Ok(shape.anchors * shape.rows * shape.cols * shape.channels)
    }

    fn __repr__(&self) -> String {
        let cfg = self.inner.config();
        format!(
            "Postprocessor(num_classes={}, strides={:?})",
            cfg.decode.num_classes, cfg.decode.strides
        )
    }
}

/// Convenience function running the default YOLOv5 postprocessing.
///
/// For repeated frames, construct a Postprocessor once and call run().
///
/// Args:
///     outputs: List of (stride, float32 array) pairs
///     src_rows: Original image height
///     src_cols: Original image width
///     prob_threshold: Minimum probability (default: 0.45)
///     nms_threshold: NMS IoU threshold (default: 0.45)
///
/// Returns:
///     List of Detection objects in source image pixels
#[pyfunction]
#[pyo3(signature = (outputs, src_rows, src_cols, prob_threshold = 0.45, nms_threshold = 0.45))]
fn postprocess(
    outputs: Vec<(u32, PyReadonlyArrayDyn<'_, f32>)>,
    src_rows: usize,
    src_cols: usize,
    prob_threshold: f32,
    nms_threshold: f32,
) -> PyResult<Vec<Detection>> {
    let cfg = RustPostprocessConfig {
        prob_threshold,
        nms_threshold,
        ..RustPostprocessConfig::default()
    };
    let post = RustPostprocessor::new(cfg, AnchorSet::yolov5()).map_err(to_py_err)?;
    run_outputs(&post, outputs, src_rows, src_cols, true)
}

/// Python module for yolopost.
#[pymodule]
fn _yolopost(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<Detection>()?;
    m.add_class::<PostprocessConfig>()?;
    m.add_class::<Postprocessor>()?;
    m.add_function(wrap_pyfunction!(postprocess, m)?)?;

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
