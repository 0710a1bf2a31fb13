//! Output size, aspect ratio and padding, rendered as `scale`/`pad` filters.

use crate::core::error::FfmpegError;
use crate::core::filter::FilterSpec;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeSpec {
    /// `N%` of the input size.
    Percent(f64),
    /// `WxH`
    Fixed(u32, u32),
    /// `Wx?`
    Width(u32),
    /// `?xH`
    Height(u32),
}

impl SizeSpec {
    pub fn parse(size: &str) -> Result<Self, FfmpegError> {
        let invalid = || FfmpegError::invalid(format!("invalid size specified: {size}"));
        let trimmed = size.trim();

        if let Some(percent) = trimmed.strip_suffix('%') {
            let value: f64 = percent.parse().map_err(|_| invalid())?;
            if value <= 0.0 || !value.is_finite() {
                return Err(invalid());
            }
            return Ok(SizeSpec::Percent(value));
        }

        let (width, height) = trimmed.split_once('x').ok_or_else(invalid)?;
        let dimension = |value: &str| -> Result<Option<u32>, FfmpegError> {
            if value == "?" {
                return Ok(None);
            }
            match value.parse::<u32>() {
                Ok(parsed) if parsed > 0 => Ok(Some(parsed)),
                _ => Err(invalid()),
            }
        };

        match (dimension(width)?, dimension(height)?) {
            (Some(w), Some(h)) => Ok(SizeSpec::Fixed(w, h)),
            (Some(w), None) => Ok(SizeSpec::Width(w)),
            (None, Some(h)) => Ok(SizeSpec::Height(h)),
            (None, None) => Err(invalid()),
        }
    }
}

/// Accepts `W:H` or a decimal ratio.
pub fn parse_aspect(aspect: &str) -> Result<f64, FfmpegError> {
    let invalid = || FfmpegError::invalid(format!("invalid aspect ratio: {aspect}"));
    let ratio = match aspect.trim().split_once(':') {
        Some((w, h)) => {
            let w: f64 = w.parse().map_err(|_| invalid())?;
            let h: f64 = h.parse().map_err(|_| invalid())?;
            if h == 0.0 {
                return Err(invalid());
            }
            w / h
        }
        None => aspect.trim().parse().map_err(|_| invalid())?,
    };
    if ratio > 0.0 && ratio.is_finite() {
        Ok(ratio)
    } else {
        Err(invalid())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SizeSettings {
    pub size: Option<SizeSpec>,
    pub aspect: Option<f64>,
    /// Padding colour; set by `autopad`.
    pub pad: Option<String>,
}

impl SizeSettings {
    /// Filters for the current settings; empty until a size is given.
    pub fn filters(&self) -> Vec<FilterSpec> {
        let Some(size) = self.size else {
            if self.aspect.is_some() || self.pad.is_some() {
                log::debug!("aspect/padding ignored until a size is set");
            }
            return Vec::new();
        };

        match size {
            SizeSpec::Percent(percent) => {
                let ratio = percent / 100.0;
                vec![FilterSpec::new("scale").named([
                    ("w", format!("trunc(iw*{ratio}/2)*2")),
                    ("h", format!("trunc(ih*{ratio}/2)*2")),
                ])]
            }
            SizeSpec::Width(width) => match self.aspect {
                Some(aspect) => self.scale_then_pad(width, even(width as f64 / aspect)),
                None => vec![FilterSpec::new("scale")
                    .named([("w", width.to_string()), ("h", "trunc(ow/a/2)*2".to_string())])],
            },
            SizeSpec::Height(height) => match self.aspect {
                Some(aspect) => self.scale_then_pad(even(height as f64 * aspect), height),
                None => vec![FilterSpec::new("scale")
                    .named([("w", "trunc(oh*a/2)*2".to_string()), ("h", height.to_string())])],
            },
            SizeSpec::Fixed(width, height) => self.scale_then_pad(width, height),
        }
    }

    fn scale_then_pad(&self, width: u32, height: u32) -> Vec<FilterSpec> {
        let Some(color) = &self.pad else {
            return vec![FilterSpec::new("scale")
                .named([("w", width.to_string()), ("h", height.to_string())])];
        };

        let ratio = width as f64 / height as f64;
        vec![
            FilterSpec::new("scale").named([
                (
                    "w",
                    format!("'if(gt(a,{ratio}),{width},trunc({height}*a/2)*2)'"),
                ),
                (
                    "h",
                    format!("'if(lt(a,{ratio}),{height},trunc({width}/a/2)*2)'"),
                ),
            ]),
            FilterSpec::new("pad").named([
                ("w", width.to_string()),
                ("h", height.to_string()),
                ("x", "'(ow-iw)/2'".to_string()),
                ("y", "'(oh-ih)/2'".to_string()),
                ("color", color.clone()),
            ]),
        ]
    }
}

fn even(value: f64) -> u32 {
    ((value / 2.0).round() as u32).max(1) * 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::filter::render_chain;

    fn rendered(settings: &SizeSettings) -> String {
        render_chain(&settings.filters())
    }

    #[test]
    fn parses_size_forms() {
        assert_eq!(SizeSpec::parse("640x480").unwrap(), SizeSpec::Fixed(640, 480));
        assert_eq!(SizeSpec::parse("640x?").unwrap(), SizeSpec::Width(640));
        assert_eq!(SizeSpec::parse("?x480").unwrap(), SizeSpec::Height(480));
        assert_eq!(SizeSpec::parse("50%").unwrap(), SizeSpec::Percent(50.0));
    }

    #[test]
    fn rejects_malformed_sizes() {
        for bad in ["", "640", "?x?", "0x480", "axb", "-5%", "640x480x3"] {
            assert!(SizeSpec::parse(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn parses_aspect() {
        assert!((parse_aspect("4:3").unwrap() - 4.0 / 3.0).abs() < 1e-12);
        assert_eq!(parse_aspect("1.5").unwrap(), 1.5);
        assert!(parse_aspect("4:0").is_err());
        assert!(parse_aspect("wide").is_err());
    }

    #[test]
    fn percent_scales_both_sides() {
        let settings = SizeSettings {
            size: Some(SizeSpec::Percent(50.0)),
            ..SizeSettings::default()
        };
        assert_eq!(rendered(&settings), "scale=w=trunc(iw*0.5/2)*2:h=trunc(ih*0.5/2)*2");
    }

    #[test]
    fn width_only_keeps_input_aspect() {
        let settings = SizeSettings {
            size: Some(SizeSpec::Width(640)),
            ..SizeSettings::default()
        };
        assert_eq!(rendered(&settings), "scale=w=640:h=trunc(ow/a/2)*2");
    }

    #[test]
    fn width_with_aspect_computes_height() {
        let settings = SizeSettings {
            size: Some(SizeSpec::Width(640)),
            aspect: Some(4.0 / 3.0),
            pad: None,
        };
        assert_eq!(rendered(&settings), "scale=w=640:h=480");
    }

    #[test]
    fn autopad_adds_pad_filter() {
        let settings = SizeSettings {
            size: Some(SizeSpec::Fixed(640, 480)),
            aspect: None,
            pad: Some("black".to_string()),
        };
        let filters = settings.filters();
        assert_eq!(filters.len(), 2);
        assert_eq!(
            filters[1].render(),
            "pad=w=640:h=480:x='(ow-iw)/2':y='(oh-ih)/2':color=black"
        );
    }

    #[test]
    fn no_size_no_filters() {
        let settings = SizeSettings {
            aspect: Some(1.0),
            ..SizeSettings::default()
        };
        assert!(settings.filters().is_empty());
    }
}
