//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::Idx2d;

pub use crate::{BerryError, BerryResult, FitError};
pub use crate::{DecodedImage, ImageSource, ImgWriteVis, IntensityWindow, Mask};

pub use crate::consts::rgb::{GROUND_TRUTH, OVERLAP, PREDICTED};
pub use crate::consts::{DEFAULT_DILATION_RADIUS, DEFAULT_OVERLAY_MARGIN};

pub use crate::contour::{
    bounding_box, rasterize, slice_number_from_filename, BoundingBox, Contour, Point,
};
pub use crate::threshold::{
    fit_mixture, predict_mask, FitCache, Intensities, MixtureModel, MixtureThresholder,
    ThresholdSpec,
};
pub use crate::post_proc::dilate;
pub use crate::overlap::{dice, jaccard};

pub use crate::case::{SegmentationCase, ThresholdOutcome};
