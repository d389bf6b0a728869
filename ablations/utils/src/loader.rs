//! 数据集加载. 负责数据集定位, 病例与文件的对应关系, 以及 PNG 切片解码.
//!
//! 数据集目录结构:
//!
//! ```text
//! <data_dir>/
//!     link.csv                                 (表头, 之后每行 `patient_id,original_id`)
//!     dicoms/<patient_id>/<slice>.png          (已导出的 16/8-bit 灰度切片)
//!     contourfiles/<original_id>/i-contours/IM-0001-<slice>-icontour-manual.txt
//!     contourfiles/<original_id>/o-contours/IM-0001-<slice>-ocontour-manual.txt
//! ```

use log::{debug, warn};
use mri_berry::contour::{slice_number_from_filename, Contour};
use mri_berry::case::SegmentationCase;
use mri_berry::{BerryError, BerryResult, DecodedImage, ImageSource};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// 病例对应文件名.
pub const LINK_FILE: &str = "link.csv";

/// 获取数据集基本路径.
///
/// 1. 若环境变量 `$MRI_BERRY_DATA_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/scd`.
pub fn data_dir_from_env_or_home() -> Option<PathBuf> {
    match env::var("MRI_BERRY_DATA_DIR") {
        Ok(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => home_dataset_dir_with(["scd"]),
    }
}

/// 获得 `$HOME/dataset/{it}` 路径. 无法获得用户目录时返回 `None`.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    ans.extend(it);
    Some(ans)
}

/// 像素间距 `(dx, dy)`, 单位毫米.
///
/// 若环境变量 `$MRI_BERRY_SPACING` 形如 `1.25,1.25` 则使用其值, 否则为 `(1.0, 1.0)`.
pub fn spacing_from_env() -> (f64, f64) {
    let parsed = env::var("MRI_BERRY_SPACING").ok().and_then(|s| {
        let (dx, dy) = s.split_once(',')?;
        Some((dx.trim().parse().ok()?, dy.trim().parse().ok()?))
    });
    parsed.unwrap_or((1.0, 1.0))
}

/// 借助 `image` crate 解码灰度 PNG 切片, 使用统一的像素间距.
#[derive(Copy, Clone, Debug)]
pub struct PngSource {
    spacing: (f64, f64),
}

impl PngSource {
    /// 以像素间距 `(dx, dy)` 初始化.
    #[inline]
    pub fn new(spacing: (f64, f64)) -> Self {
        Self { spacing }
    }
}

impl Default for PngSource {
    fn default() -> Self {
        Self::new(spacing_from_env())
    }
}

impl ImageSource for PngSource {
    fn decode(&self, path: &Path) -> BerryResult<DecodedImage> {
        let img = image::open(path)
            .map_err(|e| BerryError::Io(format!("{}: {e}", path.display())))?
            .into_luma16();
        let (width, height) = img.dimensions();
        DecodedImage::from_raw(width as usize, height as usize, img.as_raw(), self.spacing)
    }
}

/// 一张切片对应的所有文件.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaseFiles {
    /// 病例编号 (如 `SCD0000101`).
    pub patient_id: String,
    /// 切片编号.
    pub slice_number: u32,
    /// 切片图像.
    pub image: PathBuf,
    /// 内轮廓文件.
    pub inner: PathBuf,
    /// 外轮廓文件 (可能不存在).
    pub outer: Option<PathBuf>,
}

impl CaseFiles {
    /// 解码图像, 读取轮廓, 组装为 [`SegmentationCase`].
    pub fn load<S: ImageSource>(&self, source: &S) -> BerryResult<SegmentationCase> {
        let image = source.decode(&self.image)?;
        let inner = Contour::open(&self.inner)?;
        let outer = self.outer.as_ref().map(Contour::open).transpose()?;
        Ok(SegmentationCase::new(image, inner, outer)?.with_slice_number(self.slice_number))
    }
}

/// 解析病例对应表: 第一行为表头, 之后每行 `patient_id,original_id`. 空行被跳过.
pub fn parse_link(text: &str) -> BerryResult<Vec<(String, String)>> {
    text.lines()
        .enumerate()
        .skip(1)
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            let mut fields = line.split(',').map(str::trim);
            match (fields.next(), fields.next()) {
                (Some(p), Some(o)) if !p.is_empty() && !o.is_empty() => {
                    Ok((p.to_string(), o.to_string()))
                }
                _ => Err(BerryError::InvalidInput(format!(
                    "{LINK_FILE} line {}: `{line}`",
                    index + 1
                ))),
            }
        })
        .collect()
}

/// 内轮廓文件名对应的外轮廓文件名.
#[inline]
pub fn outer_contour_name(inner_name: &str) -> String {
    inner_name.replace("icontour", "ocontour")
}

/// 列出单个病例的所有切片, 按切片编号升序.
///
/// 文件名不符合切片编号约定的内轮廓文件会被跳过.
pub fn study_files(data_dir: &Path, patient_id: &str, original_id: &str) -> BerryResult<Vec<CaseFiles>> {
    let contour_dir = data_dir.join("contourfiles").join(original_id);
    let (i_dir, o_dir) = (contour_dir.join("i-contours"), contour_dir.join("o-contours"));

    let mut ans = Vec::with_capacity(32);
    for entry in fs::read_dir(&i_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(slice_number) = slice_number_from_filename(&name) else {
            warn!("skipping unrecognized contour file {name}");
            continue;
        };
        let outer = o_dir.join(outer_contour_name(&name));
        ans.push(CaseFiles {
            patient_id: patient_id.to_string(),
            slice_number,
            image: data_dir
                .join("dicoms")
                .join(patient_id)
                .join(format!("{slice_number}.png")),
            inner: entry.path(),
            outer: outer.is_file().then_some(outer),
        });
    }
    ans.sort_by_key(|c| c.slice_number);
    debug!("study {patient_id}: {} slices", ans.len());
    Ok(ans)
}

/// 列出数据集中所有病例的所有切片.
pub fn all_case_files(data_dir: &Path) -> BerryResult<Vec<CaseFiles>> {
    let link = parse_link(&fs::read_to_string(data_dir.join(LINK_FILE))?)?;
    let mut ans = Vec::new();
    for (patient_id, original_id) in link.iter() {
        ans.extend(study_files(data_dir, patient_id, original_id)?);
    }
    Ok(ans)
}
