//! Stage composition
//!
//! normalize -> band-pass -> ROI -> orientation -> frequency -> binarize ->
//! thin -> minutiae, and in parallel singularity orientation -> Poincare ->
//! cleanup -> class. Every stage is a pure function; this module only wires
//! them together, tags failures with their stage and checks the deadline
//! between stages.

use rayon::prelude::*;
use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use crate::cache::{ImageId, StageCache, StageKey, chain_hash};
use crate::config::{PipelineParams, RidgeBinarizer};
use crate::enhance::{
    bradley_binarize, butterworth_bandpass, estimate_frequency, estimate_orientation,
    gabor_filter, normalize, segment,
};
use crate::error::{Result, Stage};
use crate::features::{
    classify_maps, cleanup, detect_singularities, extract_minutiae, thin,
};
use crate::models::{
    BitMatrix, FingerprintClass, Matrix, Minutia, MinutiaeExport, MinutiaeMaps, SingularityMaps,
};
use crate::utils::Deadline;
use crate::utils::stats;

/// Every intermediate grid and the final features of one analysis
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Normalized 8-bit image
    pub normalized: Arc<Matrix<u8>>,
    /// Normalized image after the optional band-pass
    pub enhanced: Arc<Matrix<f32>>,
    /// Fingerprint area
    pub roi: Arc<BitMatrix>,
    /// Orientation field used for enhancement
    pub orientation: Arc<Matrix<f32>>,
    /// Ridge frequency field
    pub frequency: Arc<Matrix<f32>>,
    /// Binarized ridges
    pub filtered: Arc<BitMatrix>,
    /// Thinned ridges
    pub skeleton: Arc<BitMatrix>,
    /// Bifurcation and ridge ending maps
    pub minutiae_maps: Arc<MinutiaeMaps>,
    /// Minutiae with angles from the orientation field
    pub minutiae: Vec<Minutia>,
    /// Smoother orientation field used for singularities
    pub singularity_orientation: Arc<Matrix<f32>>,
    /// Cleaned cores and deltas
    pub singularities: Arc<SingularityMaps>,
    /// Fingerprint class
    pub class: FingerprintClass,
}

impl Analysis {
    /// Minutiae in the JSON export layout
    pub fn minutiae_export(&self) -> MinutiaeExport {
        MinutiaeExport::from_minutiae(&self.minutiae)
    }
}

/// Class and the singularities it was derived from
#[derive(Debug, Clone)]
pub struct Classification {
    /// Fingerprint class
    pub class: FingerprintClass,
    /// Cleaned cores and deltas
    pub singularities: Arc<SingularityMaps>,
}

/// Parameter hashes of each stage, chained with their upstream stages
struct StageHashes {
    normalize: u64,
    enhance: u64,
    roi: u64,
    orientation: u64,
    frequency: u64,
    binarize: u64,
    thinning: u64,
    minutiae: u64,
    singularity_orientation: u64,
    singularities: u64,
    classification: u64,
}

impl StageHashes {
    fn new(params: &PipelineParams) -> Result<Self> {
        let normalize = chain_hash(&[], &"normalize")?;
        let enhance = chain_hash(&[normalize], &params.butterworth)?;
        let roi = chain_hash(&[enhance], &params.roi)?;
        let orientation = chain_hash(&[enhance], &params.orientation)?;
        let frequency = chain_hash(&[orientation], &params.frequency)?;
        let binarize = chain_hash(&[frequency, roi], &(&params.binarizer, &params.gabor))?;
        let thinning = chain_hash(&[binarize], &params.thinning)?;
        let minutiae = chain_hash(&[thinning, roi, orientation], &"minutiae")?;
        let singularity_orientation = chain_hash(
            &[enhance, roi],
            &(
                &params.singularity_orientation,
                params.singularity.mask_orientation_input,
            ),
        )?;
        let singularities = chain_hash(&[singularity_orientation, roi], &params.singularity)?;
        let classification = chain_hash(&[singularities], &params.classifier)?;
        Ok(Self {
            normalize,
            enhance,
            roi,
            orientation,
            frequency,
            binarize,
            thinning,
            minutiae,
            singularity_orientation,
            singularities,
            classification,
        })
    }
}

/// One pipeline run over one image
struct Run<'a> {
    image: &'a Matrix<u8>,
    id: ImageId,
    params: &'a PipelineParams,
    hashes: StageHashes,
    deadline: Deadline,
    cache: Option<&'a mut StageCache>,
}

impl<'a> Run<'a> {
    fn new(
        image: &'a Matrix<u8>,
        params: &'a PipelineParams,
        deadline: Deadline,
        cache: Option<&'a mut StageCache>,
    ) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            image,
            id: ImageId::of(image),
            params,
            hashes: StageHashes::new(params)?,
            deadline,
            cache,
        })
    }

    /// Run `compute` unless its output is cached; errors are tagged with `stage`
    fn stage<T: Any + Send + Sync>(
        &mut self,
        stage: Stage,
        params_hash: u64,
        compute: impl FnOnce(&Deadline) -> Result<T>,
    ) -> Result<Arc<T>> {
        self.deadline.check(stage)?;
        let key = StageKey {
            image: self.id,
            stage,
            params: params_hash,
        };
        if let Some(cache) = self.cache.as_deref_mut() {
            if let Some(hit) = cache.get::<T>(&key) {
                log::debug!("{stage}: cached");
                return Ok(hit);
            }
        }

        let started = Instant::now();
        let value = Arc::new(compute(&self.deadline).map_err(|err| err.in_stage(stage))?);
        log::debug!("{stage}: {:.2?}", started.elapsed());

        if let Some(cache) = self.cache.as_deref_mut() {
            cache.insert(key, Arc::clone(&value));
        }
        Ok(value)
    }

    fn normalized(&mut self) -> Result<Arc<Matrix<u8>>> {
        let image = self.image;
        self.stage(Stage::Normalize, self.hashes.normalize, |_| normalize(image))
    }

    fn enhanced(&mut self, normalized: &Matrix<u8>) -> Result<Arc<Matrix<f32>>> {
        let butterworth = self.params.butterworth;
        self.stage(Stage::Butterworth, self.hashes.enhance, |_| {
            let float = normalized.map(|v| v as f32);
            match &butterworth {
                Some(params) => butterworth_bandpass(&float, params),
                None => Ok(float),
            }
        })
    }

    fn roi(&mut self, enhanced: &Matrix<f32>) -> Result<Arc<BitMatrix>> {
        let params = self.params.roi;
        self.stage(Stage::RegionOfInterest, self.hashes.roi, |_| {
            segment(enhanced, &params)
        })
    }

    /// Singularity orientation field, then cores and deltas inside `roi`
    ///
    /// By default the field is estimated on the whole band-passed image and
    /// only the detected points are masked: zeroing the background first puts
    /// a sharp step at the region border, and its orientation jumps read as
    /// deltas. `mask_orientation_input` restores estimation on `enhanced * roi`.
    fn singularities(
        &mut self,
        enhanced: &Matrix<f32>,
        roi: &BitMatrix,
    ) -> Result<(Arc<Matrix<f32>>, Arc<SingularityMaps>)> {
        let params = self.params;
        let orientation = self.stage(
            Stage::SingularityOrientation,
            self.hashes.singularity_orientation,
            |_| {
                if params.singularity.mask_orientation_input {
                    estimate_orientation(&enhanced.masked(roi), &params.singularity_orientation)
                } else {
                    estimate_orientation(enhanced, &params.singularity_orientation)
                }
            },
        )?;
        let field = Arc::clone(&orientation);
        let singularities = self.stage(
            Stage::Singularities,
            self.hashes.singularities,
            |deadline| {
                let detected = detect_singularities(&field, deadline)?.masked(roi);
                let mask = params.singularity.use_mask.then_some(roi);
                cleanup(&detected, mask, &params.singularity)
            },
        )?;
        Ok((orientation, singularities))
    }

    fn class(&mut self, singularities: &SingularityMaps) -> Result<FingerprintClass> {
        let params = self.params.classifier;
        let class = self.stage(
            Stage::Classification,
            self.hashes.classification,
            |_| classify_maps(singularities, &params),
        )?;
        Ok(*class)
    }

    fn analyze(mut self) -> Result<Analysis> {
        let started = Instant::now();
        let params = self.params;

        // Step 1: normalize and enhance
        let normalized = self.normalized()?;
        let enhanced = self.enhanced(&normalized)?;

        // Step 2: region of interest, orientation and frequency
        let roi = self.roi(&enhanced)?;
        let orientation = self.stage(Stage::Orientation, self.hashes.orientation, |_| {
            estimate_orientation(&enhanced, &params.orientation)
        })?;
        let frequency = self.stage(Stage::Frequency, self.hashes.frequency, |_| {
            estimate_frequency(&enhanced, &orientation, &params.frequency)
        })?;

        // Step 3: ridge map (ridges are dark, so flip the sign first)
        let filtered = self.stage(Stage::Binarize, self.hashes.binarize, |deadline| {
            match &params.binarizer {
                RidgeBinarizer::Gabor => {
                    let signal = ridge_signal(&enhanced);
                    gabor_filter(&signal, &orientation, &frequency, &roi, &params.gabor, deadline)
                }
                RidgeBinarizer::Bradley(bradley) => {
                    bradley_binarize(&inverted(&enhanced), &roi, bradley)
                }
            }
        })?;

        // Step 4: skeleton and minutiae
        let skeleton = self.stage(Stage::Thinning, self.hashes.thinning, |deadline| {
            thin(&filtered, &params.thinning, deadline)
        })?;
        let minutiae_maps = self.stage(Stage::Minutiae, self.hashes.minutiae, |_| {
            extract_minutiae(&skeleton, Some(roi.as_ref()))
        })?;
        let minutiae = minutiae_maps.to_minutiae(Some(orientation.as_ref()));

        // Step 5: singularities and class
        let (singularity_orientation, singularities) = self.singularities(&enhanced, &roi)?;
        let class = self.class(&singularities)?;

        log::debug!(
            "analysis: {}x{} -> {class}, {} minutiae, {} cores, {} deltas in {:.2?}",
            self.image.width(),
            self.image.height(),
            minutiae.len(),
            singularities.core_count(),
            singularities.delta_count(),
            started.elapsed()
        );

        Ok(Analysis {
            normalized,
            enhanced,
            roi,
            orientation,
            frequency,
            filtered,
            skeleton,
            minutiae_maps,
            minutiae,
            singularity_orientation,
            singularities,
            class,
        })
    }

    fn classify(mut self) -> Result<Classification> {
        let normalized = self.normalized()?;
        let enhanced = self.enhanced(&normalized)?;
        let roi = self.roi(&enhanced)?;
        let (_, singularities) = self.singularities(&enhanced, &roi)?;
        let class = self.class(&singularities)?;
        Ok(Classification {
            class,
            singularities,
        })
    }
}

/// Ridges as positive values: the enhanced image mirrored about its mean
fn ridge_signal(enhanced: &Matrix<f32>) -> Matrix<f32> {
    let mean = stats::mean(enhanced.as_slice()) as f32;
    enhanced.map(|v| mean - v)
}

/// Ridges as bright non-negative values
fn inverted(enhanced: &Matrix<f32>) -> Matrix<f32> {
    let max = stats::min_max(enhanced.as_slice()).map_or(0.0, |(_, hi)| hi);
    enhanced.map(|v| max - v)
}

pub(crate) fn analyze_with(
    image: &Matrix<u8>,
    params: &PipelineParams,
    deadline: Deadline,
    cache: Option<&mut StageCache>,
) -> Result<Analysis> {
    Run::new(image, params, deadline, cache)?.analyze()
}

pub(crate) fn classify_with(
    image: &Matrix<u8>,
    params: &PipelineParams,
    deadline: Deadline,
    cache: Option<&mut StageCache>,
) -> Result<Classification> {
    Run::new(image, params, deadline, cache)?.classify()
}

/// Run the full pipeline on an 8-bit grayscale image
pub fn analyze_image(image: &Matrix<u8>, params: &PipelineParams) -> Result<Analysis> {
    analyze_with(image, params, Deadline::from_budget_ms(params.time_budget_ms), None)
}

/// Run only the stages needed to classify an image
pub fn classify_image(image: &Matrix<u8>, params: &PipelineParams) -> Result<Classification> {
    classify_with(image, params, Deadline::from_budget_ms(params.time_budget_ms), None)
}

/// Analyze independent images in parallel; results keep the input order
pub fn analyze_batch(images: &[Matrix<u8>], params: &PipelineParams) -> Vec<Result<Analysis>> {
    images
        .par_iter()
        .map(|image| analyze_image(image, params))
        .collect()
}

/// Classify independent images in parallel; results keep the input order
pub fn classify_batch(images: &[Matrix<u8>], params: &PipelineParams) -> Vec<Result<Classification>> {
    images
        .par_iter()
        .map(|image| classify_image(image, params))
        .collect()
}

/// Wrap raw single-channel bytes, rejecting buffers that do not match the shape
pub fn grayscale_from_raw(image: &[u8], width: usize, height: usize) -> Result<Matrix<u8>> {
    Matrix::from_raw(width, height, image.to_vec()).map_err(|err| err.in_stage(Stage::Normalize))
}
