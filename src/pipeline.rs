//! End-to-end postprocessing: decode, sort, suppress, remap.

use crate::decode::{DecodeConfig, Decoder, StrideOutput};
use crate::detection::Detection;
use crate::geometry::ImageSize;
use crate::grid::anchor::AnchorSet;
use crate::remap::{select_and_remap, LetterboxTransform};
use crate::select::sort::SortStrategy;
use crate::trace::{trace_event, trace_span};
use crate::util::{YoloPostError, YoloPostResult};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Postprocessing parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct PostprocessConfig {
    /// Head layout.
    pub decode: DecodeConfig,
    /// Network input canvas.
    pub letterbox: ImageSize,
    /// Minimum `objectness * class` probability for a candidate.
    pub prob_threshold: f32,
    /// IoU above which a lower-scored box is suppressed.
    pub nms_threshold: f32,
    /// Confidence sort strategy.
    pub sort: SortStrategy,
    /// Decode strides concurrently (requires the `rayon` feature).
    pub parallel: bool,
}

impl Default for PostprocessConfig {
    fn default() -> Self {
        Self {
            decode: DecodeConfig::default(),
            letterbox: ImageSize::new(640, 640),
            prob_threshold: 0.45,
            nms_threshold: 0.45,
            sort: SortStrategy::Sequential,
            parallel: false,
        }
    }
}

impl PostprocessConfig {
    /// Checks thresholds, canvas size and head layout.
    pub fn validate(&self) -> YoloPostResult<()> {
        self.decode.validate()?;
        if self.letterbox.is_empty() {
            return Err(YoloPostError::InvalidDimensions {
                width: self.letterbox.cols,
                height: self.letterbox.rows,
            });
        }
        if !(0.0..=1.0).contains(&self.prob_threshold) {
            return Err(YoloPostError::InvalidConfig {
                reason: "prob_threshold must be within [0, 1]",
            });
        }
        if !(0.0..=1.0).contains(&self.nms_threshold) {
            return Err(YoloPostError::InvalidConfig {
                reason: "nms_threshold must be within [0, 1]",
            });
        }
        Ok(())
    }
}

/// Stateless postprocessor; one instance can serve any number of frames.
#[derive(Clone, Debug)]
pub struct Postprocessor {
    decoder: Decoder,
    cfg: PostprocessConfig,
}

impl Postprocessor {
    /// Builds a postprocessor from a validated configuration.
    pub fn new(cfg: PostprocessConfig, anchors: AnchorSet) -> YoloPostResult<Self> {
        cfg.validate()?;
        let decoder = Decoder::new(cfg.decode.clone(), anchors, cfg.letterbox)?;
        Ok(Self { decoder, cfg })
    }

    /// Active configuration.
    pub fn config(&self) -> &PostprocessConfig {
        &self.cfg
    }

    /// Underlying decoder.
    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    /// Decodes all strides into one candidate list, in `outputs` order.
    pub fn decode(&self, outputs: &[StrideOutput<'_>]) -> YoloPostResult<Vec<Detection>> {
        if self.cfg.parallel {
            self.decode_par(outputs)
        } else {
            self.decode_seq(outputs)
        }
    }

    fn decode_seq(&self, outputs: &[StrideOutput<'_>]) -> YoloPostResult<Vec<Detection>> {
        let mut proposals = Vec::new();
        for output in outputs {
            self.decoder
                .decode_stride_into(*output, self.cfg.prob_threshold, &mut proposals)?;
        }
        Ok(proposals)
    }

    #[cfg(feature = "rayon")]
    fn decode_par(&self, outputs: &[StrideOutput<'_>]) -> YoloPostResult<Vec<Detection>> {
        let per_stride: Vec<YoloPostResult<Vec<Detection>>> = outputs
            .par_iter()
            .map(|output| self.decoder.decode_stride(*output, self.cfg.prob_threshold))
            .collect();

        let mut proposals = Vec::new();
        for dets in per_stride {
            proposals.extend(dets?);
        }
        Ok(proposals)
    }

    #[cfg(not(feature = "rayon"))]
    fn decode_par(&self, outputs: &[StrideOutput<'_>]) -> YoloPostResult<Vec<Detection>> {
        self.decode_seq(outputs)
    }

    /// Full pipeline: decode, sort, NMS and map into `src` image pixels.
    pub fn run(
        &self,
        outputs: &[StrideOutput<'_>],
        src: ImageSize,
    ) -> YoloPostResult<Vec<Detection>> {
        let _span = trace_span!("postprocess", strides = outputs.len()).entered();

        let mut proposals = self.decode(outputs)?;
        let objects = select_and_remap(
            &mut proposals,
            self.cfg.nms_threshold,
            self.cfg.letterbox,
            src,
            self.cfg.sort,
        )?;

        trace_event!(
            "postprocess_done",
            candidates = proposals.len(),
            kept = objects.len()
        );
        Ok(objects)
    }

    /// Decodes and remaps without sorting or suppression.
    pub fn run_unfiltered(
        &self,
        outputs: &[StrideOutput<'_>],
        src: ImageSize,
    ) -> YoloPostResult<Vec<Detection>> {
        let transform = LetterboxTransform::new(self.cfg.letterbox, src)?;
        let mut proposals = self.decode(outputs)?;
        transform.remap_in_place(&mut proposals);
        Ok(proposals)
    }
}
