/// Errors from the coarse localization stage.
#[derive(thiserror::Error, Debug)]
pub enum CoarseMatchError {
    /// The template edge map has no variance, so every correlation window
    /// would score identically. Typically a uniform-temperature frame.
    #[error("template edge map has zero variance")]
    DegenerateTemplate,
    /// Every step of the scale ladder left the resized target smaller than
    /// the template.
    #[error("no scale fits: template {template_w}x{template_h} never fits target {target_w}x{target_h}")]
    NoScaleFits {
        template_w: usize,
        template_h: usize,
        target_w: usize,
        target_h: usize,
    },
    /// Template or target had a zero dimension.
    #[error("empty input: {0}")]
    EmptyInput(&'static str),
}
