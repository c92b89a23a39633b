//! Pipeline parameters: defaults, JSON files and `FP_*` environment overrides

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use crate::enhance::{
    BradleyParams, ButterworthParams, FrequencyParams, GaborParams, OrientationParams, RoiParams,
};
use crate::error::{FingerprintError, Result, Stage};
use crate::features::{ClassifierParams, SingularityParams, ThinningParams, WhorlRule};

/// How the enhanced image is turned into a ridge map
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RidgeBinarizer {
    /// Per-pixel oriented Gabor filter, tuned by orientation and frequency
    #[default]
    Gabor,
    /// Bradley adaptive threshold on the inverted enhanced image
    Bradley(BradleyParams),
}

/// Every tunable of the analysis pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineParams {
    /// Band-pass applied after normalization, `None` skips it
    pub butterworth: Option<ButterworthParams>,
    /// Region of interest segmentation
    pub roi: RoiParams,
    /// Orientation field feeding frequency estimation and Gabor filtering
    pub orientation: OrientationParams,
    /// Orientation field feeding singularity detection
    pub singularity_orientation: OrientationParams,
    /// Ridge frequency estimation
    pub frequency: FrequencyParams,
    /// Gabor kernel
    pub gabor: GaborParams,
    /// Ridge binarization method
    pub binarizer: RidgeBinarizer,
    /// Thinning limits
    pub thinning: ThinningParams,
    /// Singularity cleanup
    pub singularity: SingularityParams,
    /// Class rules
    pub classifier: ClassifierParams,
    /// Wall-clock budget for one analysis, in milliseconds
    pub time_budget_ms: Option<u64>,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            butterworth: Some(ButterworthParams::default()),
            roi: RoiParams::default(),
            orientation: OrientationParams::default(),
            singularity_orientation: OrientationParams::for_singularities(),
            frequency: FrequencyParams::default(),
            gabor: GaborParams::default(),
            binarizer: RidgeBinarizer::default(),
            thinning: ThinningParams::default(),
            singularity: SingularityParams::default(),
            classifier: ClassifierParams::default(),
            time_budget_ms: None,
        }
    }
}

impl PipelineParams {
    /// Check every nested parameter group
    ///
    /// A bad value is reported as a failure of the stage that consumes it.
    pub fn validate(&self) -> Result<()> {
        let tag = |stage: Stage| move |err: FingerprintError| err.in_stage(stage);
        if let Some(butterworth) = &self.butterworth {
            butterworth.validate().map_err(tag(Stage::Butterworth))?;
        }
        self.roi.validate().map_err(tag(Stage::RegionOfInterest))?;
        self.orientation.validate().map_err(tag(Stage::Orientation))?;
        self.singularity_orientation
            .validate()
            .map_err(tag(Stage::SingularityOrientation))?;
        self.frequency.validate().map_err(tag(Stage::Frequency))?;
        self.gabor.validate().map_err(tag(Stage::Binarize))?;
        if let RidgeBinarizer::Bradley(bradley) = &self.binarizer {
            bradley.validate().map_err(tag(Stage::Binarize))?;
        }
        self.thinning.validate().map_err(tag(Stage::Thinning))?;
        self.singularity.validate().map_err(tag(Stage::Singularities))?;
        self.classifier.validate().map_err(tag(Stage::Classification))
    }

    /// Parse parameters from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let params: Self = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    /// Load parameters from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Defaults overridden by `FP_*` environment variables
    ///
    /// Unparsable values are ignored. `FP_FREQ_SIGMA=0` disables frequency
    /// blending, `FP_TIME_BUDGET_MS=0` disables the deadline and
    /// `FP_BUTTERWORTH=0` skips the band-pass.
    pub fn from_env() -> Self {
        let mut params = Self::default();

        params.roi.threshold = parse_env_f32("FP_ROI_THRESHOLD", params.roi.threshold);
        params.orientation.blend_sigma =
            parse_env_f32("FP_ORIENT_SIGMA", params.orientation.blend_sigma);
        params.singularity_orientation.blend_sigma =
            parse_env_f32("FP_SING_SIGMA", params.singularity_orientation.blend_sigma);
        params.frequency.blend_sigma = match std::env::var("FP_FREQ_SIGMA") {
            Ok(value) => match value.trim().parse::<f32>() {
                Ok(v) if v == 0.0 => None,
                Ok(v) => Some(v),
                Err(_) => params.frequency.blend_sigma,
            },
            Err(_) => params.frequency.blend_sigma,
        };
        params.frequency.block_size = parse_env_usize("FP_FREQ_BLOCK", params.frequency.block_size);
        params.gabor.block_size = parse_env_usize("FP_GABOR_SIZE", params.gabor.block_size);
        params.singularity.region_size =
            parse_env_usize("FP_REGION_SIZE", params.singularity.region_size);
        params.classifier.loop_slope = parse_env_f32("FP_LOOP_SLOPE", params.classifier.loop_slope);
        if parse_env_bool_u8("FP_WHORL_CORES_ONLY", false) {
            params.classifier.whorl_rule = WhorlRule::CoresOnly;
        }
        if let Some(max) = parse_env_opt_u64("FP_MAX_PASSES") {
            params.thinning.max_passes = max.map(|m| m as usize);
        }
        if let Some(budget) = parse_env_opt_u64("FP_TIME_BUDGET_MS") {
            params.time_budget_ms = budget;
        }
        if !parse_env_bool_u8("FP_BUTTERWORTH", true) {
            params.butterworth = None;
        }
        if std::env::var("FP_BINARIZER").is_ok_and(|v| v.trim().eq_ignore_ascii_case("bradley")) {
            params.binarizer = RidgeBinarizer::Bradley(BradleyParams::default());
        }

        params
    }
}

static ENV_PARAMS: OnceLock<PipelineParams> = OnceLock::new();

/// Parameters from the environment, read once per process
pub fn env_params() -> &'static PipelineParams {
    ENV_PARAMS.get_or_init(PipelineParams::from_env)
}

fn parse_env_f32(name: &str, default: f32) -> f32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<f32>().ok())
        .unwrap_or(default)
}

fn parse_env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn parse_env_bool_u8(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u8>().ok())
        .map(|v| v != 0)
        .unwrap_or(default)
}

/// `None` when unset or unparsable, `Some(None)` for 0, `Some(Some(v))` otherwise
fn parse_env_opt_u64(name: &str) -> Option<Option<u64>> {
    match std::env::var(name) {
        Ok(value) => match value.trim().parse::<u64>() {
            Ok(0) => Some(None),
            Ok(v) => Some(Some(v)),
            Err(_) => None,
        },
        Err(_) => None,
    }
}
