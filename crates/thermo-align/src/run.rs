//! End-to-end helpers for a single thermal/optical pair on disk.

use std::path::{Path, PathBuf};

use crate::coarse::SearchPrior;
use crate::core::{warp_rgb, GrayImage, GrayImageView, RgbImage};
use crate::session::{
    blend_edge_emphasis, hconcat, AlignmentResult, AlignmentSession, ConfirmationProvider,
    PipelineConfig, PointPairSource, SessionError, SessionIoError, TransformRecord,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors produced by the high-level facade helpers.
#[derive(thiserror::Error, Debug)]
pub enum AlignError {
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        source: ::image::ImageError,
    },
    #[error("failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        source: ::image::ImageError,
    },
    /// Accepted transform cannot be inverted for warping; this indicates a
    /// collapsed fit and the pair should be treated as unresolved.
    #[error("accepted transform is not invertible")]
    SingularTransform,
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Record(#[from] SessionIoError),
}

/// Convert an `image::GrayImage` into the lightweight workspace view type.
pub fn gray_view(img: &::image::GrayImage) -> GrayImageView<'_> {
    GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Copy an `image::RgbImage` into the interleaved workspace buffer.
pub fn rgb_from_image(img: &::image::RgbImage) -> RgbImage {
    RgbImage {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw().clone(),
    }
}

/// Build an `image::RgbImage` from the workspace buffer.
pub fn to_image_rgb(img: &RgbImage) -> ::image::RgbImage {
    ::image::RgbImage::from_fn(img.width as u32, img.height as u32, |x, y| {
        ::image::Rgb(img.get(x as usize, y as usize))
    })
}

/// Build an `image::GrayImage` from the workspace buffer.
pub fn to_image_gray(img: &GrayImage) -> ::image::GrayImage {
    ::image::GrayImage::from_fn(img.width as u32, img.height as u32, |x, y| {
        ::image::Luma([img.get(x as usize, y as usize)])
    })
}

/// Artifact paths for one pair, `<base>_aligned.<ext>` style.
#[derive(Clone, Debug)]
pub struct PairOutputs {
    pub aligned: PathBuf,
    pub blended: PathBuf,
    pub sidebyside: PathBuf,
    pub transform: PathBuf,
}

impl PairOutputs {
    pub fn for_base(dir: &Path, base: &str, ext: &str) -> Self {
        Self {
            aligned: dir.join(format!("{base}_aligned.{ext}")),
            blended: dir.join(format!("{base}_blended.{ext}")),
            sidebyside: dir.join(format!("{base}_sidebyside.{ext}")),
            transform: dir.join(format!("{base}_transform.json")),
        }
    }

    /// All four artifacts already exist, so the pair can be skipped.
    pub fn all_exist(&self) -> bool {
        [&self.aligned, &self.blended, &self.sidebyside, &self.transform]
            .iter()
            .all(|p| p.is_file())
    }
}

fn load(path: &Path) -> Result<::image::DynamicImage, AlignError> {
    ::image::open(path).map_err(|source| AlignError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

fn save_rgb(img: &RgbImage, path: &Path) -> Result<(), AlignError> {
    to_image_rgb(img).save(path).map_err(|source| AlignError::Encode {
        path: path.to_path_buf(),
        source,
    })
}

/// Align one pair end to end and write the artifacts.
///
/// Decodes both frames, runs the session (coarse, refine, confirm), then
/// warps the optical frame into the thermal geometry and writes the aligned
/// frame, the two composites and the transform record. Nothing is written
/// unless the session accepts.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip_all, fields(thermal = %thermal_path.display()))
)]
pub fn align_pair(
    thermal_path: &Path,
    optical_path: &Path,
    config: &PipelineConfig,
    prior: Option<&SearchPrior>,
    pairs: Option<&mut dyn PointPairSource>,
    confirm: &mut dyn ConfirmationProvider,
    outputs: &PairOutputs,
) -> Result<AlignmentResult, AlignError> {
    let thermal = load(thermal_path)?;
    let optical = load(optical_path)?;
    let thermal_gray = thermal.to_luma8();
    let optical_gray = optical.to_luma8();

    let mut session = AlignmentSession::new(config.clone());
    let result = session.run(
        &gray_view(&thermal_gray),
        &gray_view(&optical_gray),
        prior,
        pairs,
        confirm,
    )?;

    write_artifacts(&thermal.to_rgb8(), &optical.to_rgb8(), &result, config, outputs)?;
    Ok(result)
}

fn write_artifacts(
    thermal_rgb: &::image::RgbImage,
    optical_rgb: &::image::RgbImage,
    result: &AlignmentResult,
    config: &PipelineConfig,
    outputs: &PairOutputs,
) -> Result<(), AlignError> {
    let Some(inv) = result.transform.inverse() else {
        return Err(AlignError::SingularTransform);
    };
    let thermal = rgb_from_image(thermal_rgb);
    let optical = rgb_from_image(optical_rgb);

    let aligned = warp_rgb(&optical, &inv, thermal.width, thermal.height);
    let blended = blend_edge_emphasis(&thermal, &aligned, config.blend_alpha, &config.target_edges);
    let side = hconcat(&thermal, &aligned);

    save_rgb(&aligned, &outputs.aligned)?;
    save_rgb(&blended, &outputs.blended)?;
    save_rgb(&side, &outputs.sidebyside)?;
    TransformRecord::new(&result.transform, result.quality).write_json(&outputs.transform)?;
    log::info!("wrote artifacts for {}", outputs.transform.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gray_view_borrows_the_image_buffer() {
        let mut img = ::image::GrayImage::new(6, 4);
        img.put_pixel(2, 1, ::image::Luma([200]));
        let view = gray_view(&img);
        assert_eq!(view.width, 6);
        assert_eq!(view.height, 4);
        assert_eq!(view.data[6 + 2], 200);
    }

    #[test]
    fn rgb_round_trips_between_representations() {
        let mut img = ::image::RgbImage::new(3, 2);
        img.put_pixel(1, 0, ::image::Rgb([9, 8, 7]));
        let ours = rgb_from_image(&img);
        assert_eq!(ours.get(1, 0), [9, 8, 7]);
        let back = to_image_rgb(&ours);
        assert_eq!(back.get_pixel(1, 0).0, [9, 8, 7]);
    }

    #[test]
    fn outputs_follow_the_artifact_naming_scheme() {
        let out = PairOutputs::for_base(Path::new("/tmp/out"), "scene7", "png");
        assert_eq!(out.aligned, Path::new("/tmp/out/scene7_aligned.png"));
        assert_eq!(out.blended, Path::new("/tmp/out/scene7_blended.png"));
        assert_eq!(out.sidebyside, Path::new("/tmp/out/scene7_sidebyside.png"));
        assert_eq!(out.transform, Path::new("/tmp/out/scene7_transform.json"));
    }

    #[test]
    fn all_exist_requires_every_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let out = PairOutputs::for_base(dir.path(), "pair", "png");
        assert!(!out.all_exist());
        for p in [&out.aligned, &out.blended, &out.sidebyside] {
            std::fs::write(p, b"x").unwrap();
        }
        assert!(!out.all_exist());
        std::fs::write(&out.transform, b"{}").unwrap();
        assert!(out.all_exist());
    }
}
