//! Tween file handling

use anyhow::{Context, Result};
use microtween::{EasingInput, TweenSpec, ValueMap};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A tween described in TOML
///
/// ```toml
/// duration_ms = 1000
/// easing = "elastic"          # or [0.25, 0.1, 0.25, 1.0]
///
/// [from]
/// x = 0.0
///
/// [to]
/// x = 100.0
/// ```
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct TweenFile {
    #[serde(default)]
    pub from: Option<ValueMap>,
    #[serde(default)]
    pub to: Option<ValueMap>,
    #[serde(default)]
    pub duration_ms: Option<f64>,
    #[serde(default)]
    pub easing: Option<EasingConfig>,
    /// Frame rate of the frame thread
    #[serde(default)]
    pub fps: Option<u32>,
}

/// Easing as written in a tween file or on the command line
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum EasingConfig {
    Name(String),
    Points([f64; 4]),
}

impl EasingConfig {
    /// Parse `name` or `x1,y1,x2,y2`
    pub fn parse(s: &str) -> Result<Self, String> {
        if !s.contains(',') {
            return Ok(EasingConfig::Name(s.trim().to_string()));
        }

        let values = s
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| format!("invalid control point in '{}': {}", s, err))?;
        let points: [f64; 4] = values
            .try_into()
            .map_err(|_| format!("expected four control points, got '{}'", s))?;
        Ok(EasingConfig::Points(points))
    }
}

impl From<EasingConfig> for EasingInput {
    fn from(config: EasingConfig) -> Self {
        match config {
            EasingConfig::Name(name) => EasingInput::Named(name),
            EasingConfig::Points(points) => EasingInput::ControlPoints(points),
        }
    }
}

/// Parse a `key=value` property assignment
pub fn parse_assignment(s: &str) -> Result<(String, f64), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing property name in '{}'", s));
    }
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|err| format!("invalid value for '{}': {}", key, err))?;
    Ok((key.to_string(), value))
}

/// Command line values that take precedence over the file
#[derive(Debug, Default)]
pub struct Overrides {
    pub from: Vec<(String, f64)>,
    pub to: Vec<(String, f64)>,
    pub duration_ms: Option<f64>,
    pub easing: Option<EasingConfig>,
    pub fps: Option<u32>,
}

impl TweenFile {
    /// Load a tween file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize tween")
    }

    /// Apply command line overrides. Property assignments are merged into
    /// the file's maps key by key.
    pub fn apply(&mut self, overrides: Overrides) {
        merge(&mut self.from, overrides.from);
        merge(&mut self.to, overrides.to);
        if overrides.duration_ms.is_some() {
            self.duration_ms = overrides.duration_ms;
        }
        if overrides.easing.is_some() {
            self.easing = overrides.easing;
        }
        if overrides.fps.is_some() {
            self.fps = overrides.fps;
        }
    }

    /// Build a tween spec; missing fields are reported when it starts
    pub fn to_spec(&self) -> TweenSpec {
        let mut spec = TweenSpec::new();
        if let Some(from) = &self.from {
            spec = spec.from(from.clone());
        }
        if let Some(to) = &self.to {
            spec = spec.to(to.clone());
        }
        if let Some(duration_ms) = self.duration_ms {
            spec = spec.duration_ms(duration_ms);
        }
        if let Some(easing) = &self.easing {
            spec = spec.easing(easing.clone());
        }
        spec
    }
}

fn merge(target: &mut Option<ValueMap>, values: Vec<(String, f64)>) {
    if values.is_empty() {
        return;
    }
    target.get_or_insert_with(ValueMap::new).extend(values);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_named_easing() {
        let file = TweenFile::parse(
            r#"
            duration_ms = 1000
            easing = "elastic"

            [from]
            x = 0.0
            y = 5

            [to]
            x = 100.0
            y = -5
            "#,
        )
        .unwrap();

        assert_eq!(file.duration_ms, Some(1000.0));
        assert_eq!(file.easing, Some(EasingConfig::Name("elastic".into())));
        let from = file.from.unwrap();
        assert_eq!(from.keys().collect::<Vec<_>>(), ["x", "y"]);
        assert_eq!(from["y"], 5.0);
        assert_eq!(file.to.unwrap()["y"], -5.0);
    }

    #[test]
    fn test_parse_control_point_easing() {
        let file = TweenFile::parse("easing = [0.25, 0.1, 0.25, 1.0]").unwrap();
        assert_eq!(file.easing, Some(EasingConfig::Points([0.25, 0.1, 0.25, 1.0])));
        assert!(file.from.is_none());
    }

    #[test]
    fn test_easing_argument() {
        assert_eq!(
            EasingConfig::parse("expo"),
            Ok(EasingConfig::Name("expo".into()))
        );
        assert_eq!(
            EasingConfig::parse("0, 0, 0.58, 1"),
            Ok(EasingConfig::Points([0.0, 0.0, 0.58, 1.0]))
        );
        assert!(EasingConfig::parse("0,0,1").is_err());
        assert!(EasingConfig::parse("0,a,1,1").is_err());
    }

    #[test]
    fn test_assignment_argument() {
        assert_eq!(parse_assignment("x=1.5"), Ok(("x".to_string(), 1.5)));
        assert_eq!(parse_assignment(" y = -2 "), Ok(("y".to_string(), -2.0)));
        assert!(parse_assignment("x").is_err());
        assert!(parse_assignment("=1").is_err());
        assert!(parse_assignment("x=abc").is_err());
    }

    #[test]
    fn test_overrides_merge_into_file() {
        let mut file = TweenFile::parse(
            r#"
            duration_ms = 500
            [from]
            x = 0.0
            [to]
            x = 1.0
            "#,
        )
        .unwrap();

        file.apply(Overrides {
            to: vec![("x".into(), 2.0)],
            duration_ms: Some(250.0),
            easing: Some(EasingConfig::Name("linear".into())),
            ..Default::default()
        });

        assert_eq!(file.from.as_ref().unwrap()["x"], 0.0);
        assert_eq!(file.to.as_ref().unwrap()["x"], 2.0);
        assert_eq!(file.duration_ms, Some(250.0));
        assert_eq!(file.easing, Some(EasingConfig::Name("linear".into())));
        assert_eq!(file.fps, None);
    }

    #[test]
    fn test_round_trip_through_toml() {
        let mut file = TweenFile::default();
        file.apply(Overrides {
            from: vec![("x".into(), 1.0)],
            to: vec![("x".into(), 2.0)],
            duration_ms: Some(100.0),
            ..Default::default()
        });

        let reparsed = TweenFile::parse(&file.to_toml().unwrap()).unwrap();
        assert_eq!(reparsed.to.unwrap()["x"], 2.0);
        assert_eq!(reparsed.duration_ms, Some(100.0));
    }

    #[test]
    fn test_missing_file() {
        let err = TweenFile::load(Path::new("/nonexistent/tween.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
