//! 程序运行函数.

use crate::profile::Profile;
use crate::result::AblationResult;
use log::{info, warn};
use mri_berry::case::SegmentationCase;
use mri_berry::consts::DEFAULT_OVERLAY_MARGIN;
use mri_berry::contour::Contour;
use mri_berry::threshold::{FitCache, ThresholdSpec};
use mri_berry::{BerryError, BerryResult, ImageSource, ImgWriteVis};
use std::path::{Path, PathBuf};
use std::thread;
use utils::loader::{self, PngSource};

/// 参与比较的分割参数组合.
fn variants() -> [(&'static str, ThresholdSpec); 4] {
    let base = ThresholdSpec::default();
    [
        ("k2", base),
        ("k2+dilate", base.with_postprocess(true)),
        ("k3", base.with_components(3)),
        ("k3+dilate", base.with_components(3).with_postprocess(true)),
    ]
}

/// 以 `spec` 评估所有切片.
fn evaluate(cases: &[SegmentationCase], spec: &ThresholdSpec, cache: &FitCache) -> Profile {
    let mut profile = Profile::new();
    for case in cases.iter() {
        let mut case = case.clone();
        profile.eval_start();
        let result = case.run_cached(spec, cache).map(|o| o.jaccard);
        profile.eval_elapsed();
        match result {
            Ok(j) => profile.count_jaccard(case.slice_number(), j),
            Err(e) => {
                warn!("slice {:?}: {e}", case.slice_number());
                profile.count_failed();
            }
        }
    }
    profile.finish()
}

/// 在整个数据集上运行消融实验.
pub fn run() -> BerryResult<AblationResult> {
    let data_dir = loader::data_dir_from_env_or_home()
        .filter(|d| d.is_dir())
        .ok_or_else(|| BerryError::InvalidInput("dataset directory not found".into()))?;
    let files = loader::all_case_files(&data_dir)?;

    let source = PngSource::default();
    let cases: Vec<SegmentationCase> = files
        .iter()
        .filter_map(|f| match f.load(&source) {
            Ok(case) => Some(case),
            Err(e) => {
                warn!("{} slice {}: {e}", f.patient_id, f.slice_number);
                None
            }
        })
        .collect();
    info!(
        "Running ablation studies on {} slices ({} cpus)...",
        cases.len(),
        utils::cpus()
    );

    // 膨胀与否不影响拟合, 共享同一缓存.
    let cache = FitCache::new();
    let result = thread::scope(|s| {
        let handles = variants().map(|(name, spec)| {
            let (cases, cache) = (&cases, &cache);
            (name, s.spawn(move || evaluate(cases, &spec, cache)))
        });
        handles
            .into_iter()
            .map(|(name, h)| {
                h.join()
                    .map(|p| (name, p))
                    .map_err(|_| BerryError::InvalidInput(format!("variant `{name}` panicked")))
            })
            .collect::<BerryResult<Vec<_>>>()
    })?;
    info!("{} distinct fits", cache.fit_count());
    Ok(AblationResult::from_iter(result))
}

/// 命令行参数: `<image> <inner.txt> <outer.txt> [k] [--dilate] [--save <dir>]`.
#[derive(Debug, PartialEq)]
pub struct CaseArgs {
    image: PathBuf,
    inner: PathBuf,
    outer: PathBuf,
    spec: ThresholdSpec,
    save: Option<PathBuf>,
}

impl CaseArgs {
    pub fn parse(args: &[String]) -> BerryResult<Self> {
        let usage = || BerryError::InvalidInput(crate::USAGE.into());
        let mut positional = Vec::with_capacity(4);
        let mut spec = ThresholdSpec::default();
        let mut save = None;

        let mut it = args.iter();
        while let Some(arg) = it.next() {
            match arg.as_str() {
                "--dilate" => spec = spec.with_postprocess(true),
                "--save" => save = Some(PathBuf::from(it.next().ok_or_else(usage)?)),
                _ => positional.push(arg.as_str()),
            }
        }
        let (image, inner, outer, k) = match positional[..] {
            [image, inner, outer] => (image, inner, outer, None),
            [image, inner, outer, k] => (image, inner, outer, Some(k)),
            _ => return Err(usage()),
        };
        if let Some(k) = k {
            let k = k
                .parse()
                .map_err(|_| BerryError::InvalidInput(format!("invalid component count `{k}`")))?;
            spec = spec.with_components(k);
        }
        Ok(Self {
            image: image.into(),
            inner: inner.into(),
            outer: outer.into(),
            spec,
            save,
        })
    }
}

/// 评估单张切片, 打印结果. 给定 `--save` 时保存图像, 预测掩膜和叠加图.
pub fn run_case(args: &[String]) -> BerryResult<()> {
    let args = CaseArgs::parse(args)?;
    let image = PngSource::default().decode(&args.image)?;
    let inner = Contour::open(&args.inner)?;
    let outer = Contour::open(&args.outer)?;
    let mut case = SegmentationCase::new(image, inner, Some(outer))?;
    if let Some(n) = args
        .inner
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(mri_berry::contour::slice_number_from_filename)
    {
        case = case.with_slice_number(n);
    }

    let outcome = case.run(&args.spec)?;
    println!("means: {:?}", outcome.model.means());
    println!("threshold: {:.4}", outcome.threshold);
    println!("jaccard: {:.6}", outcome.jaccard);
    println!("inner area: {:.2} mm^2", case.inner_area_mm2());
    if let Some(rai) = case.roi_avg_relative_intensity()? {
        println!("relative intensity: {rai:.2}%");
    }

    if let Some(dir) = args.save.as_deref() {
        save_case(&case, dir)?;
    }
    Ok(())
}

fn save_case(case: &SegmentationCase, dir: &Path) -> BerryResult<()> {
    let io = |e: image::ImageError| BerryError::Io(e.to_string());
    std::fs::create_dir_all(dir)?;
    case.image().save(dir.join("image.png")).map_err(io)?;
    case.inner_mask().save(dir.join("inner.png")).map_err(io)?;
    if let Some(outcome) = case.outcome() {
        outcome.predicted.save(dir.join("predicted.png")).map_err(io)?;
    }
    case.overlay(DEFAULT_OVERLAY_MARGIN)?
        .save(dir.join("overlay.png"))
        .map_err(io)?;
    info!("saved to {}", dir.display());
    Ok(())
}
