use std::fmt;

use serde::Serialize;

use crate::error::OperationError;

/// Parameters merged into an operation only when it runs on a multi-channel
/// image and does not require grayscale input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorParameters {
    /// Axis holding the channels; -1 means "last axis", i.e. filter each
    /// channel on its own.
    pub channel_axis: i32,
}

impl ColorParameters {
    pub const PER_CHANNEL: ColorParameters = ColorParameters { channel_axis: -1 };

    /// Images are stored row, column, channel; only the last axis can hold
    /// channels.
    pub fn is_per_channel(&self) -> bool {
        matches!(self.channel_axis, -1 | 2)
    }
}

/// Keypoints found by a feature detector
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionResult {
    /// (row, col) positions in the detector's input image
    coordinates: Vec<(f32, f32)>,
    responses: Vec<f32>,
}

impl DetectionResult {
    pub fn new(coordinates: Vec<(f32, f32)>, responses: Vec<f32>) -> Result<Self, OperationError> {
        if coordinates.len() != responses.len() {
            return Err(OperationError::InvalidDetection {
                coordinates: coordinates.len(),
                responses: responses.len(),
            });
        }
        Ok(Self { coordinates, responses })
    }

    /// The zero-keypoint result
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn coordinates(&self) -> &[(f32, f32)] {
        &self.coordinates
    }

    pub fn responses(&self) -> &[f32] {
        &self.responses
    }

    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    /// Arithmetic mean of the responses, `None` when nothing was detected
    pub fn mean_response(&self) -> Option<f64> {
        if self.responses.is_empty() {
            return None;
        }
        let sum: f64 = self.responses.iter().map(|&r| r as f64).sum();
        Some(sum / self.responses.len() as f64)
    }
}

/// Scalar stored in a log record
#[derive(Debug, Clone, PartialEq)]
pub enum LogValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Explicitly unavailable (written as an empty CSV cell)
    Null,
}

impl LogValue {
    /// Flatten a JSON value produced by serializing a parameter struct.
    pub fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => LogValue::Null,
            Value::Bool(b) => LogValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => LogValue::Int(i),
                None => LogValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => LogValue::Str(s.clone()),
            other => LogValue::Str(other.to_string()),
        }
    }
}

impl fmt::Display for LogValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogValue::Str(s) => f.write_str(s),
            LogValue::Int(i) => write!(f, "{}", i),
            // keep a trailing ".0" so float columns read back as floats
            LogValue::Float(v) if v.fract() == 0.0 && v.is_finite() => write!(f, "{:.1}", v),
            LogValue::Float(v) => write!(f, "{}", v),
            LogValue::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            LogValue::Null => Ok(()),
        }
    }
}

impl From<&str> for LogValue {
    fn from(v: &str) -> Self {
        LogValue::Str(v.to_string())
    }
}

impl From<String> for LogValue {
    fn from(v: String) -> Self {
        LogValue::Str(v)
    }
}

impl From<i64> for LogValue {
    fn from(v: i64) -> Self {
        LogValue::Int(v)
    }
}

impl From<usize> for LogValue {
    fn from(v: usize) -> Self {
        LogValue::Int(v as i64)
    }
}

impl From<f64> for LogValue {
    fn from(v: f64) -> Self {
        LogValue::Float(v)
    }
}

impl From<bool> for LogValue {
    fn from(v: bool) -> Self {
        LogValue::Bool(v)
    }
}

impl From<Option<f64>> for LogValue {
    fn from(v: Option<f64>) -> Self {
        v.map_or(LogValue::Null, LogValue::Float)
    }
}

/// One row of the parameter log: an ordered, flat key → value mapping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogRecord {
    fields: Vec<(String, LogValue)>,
}

impl LogRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<LogValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a field, keeping the position of an existing key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<LogValue>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn extend<I>(&mut self, fields: I)
    where
        I: IntoIterator<Item = (String, LogValue)>,
    {
        for (key, value) in fields {
            self.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&LogValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(LogValue::Str(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.get(key) {
            Some(LogValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_float(&self, key: &str) -> Option<f64> {
        match self.get(key) {
            Some(LogValue::Float(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Flatten any serializable parameter struct into log fields.
///
/// Non-object values (unit structs, `()`) yield no fields.
pub fn parameter_fields<T: Serialize>(params: &T) -> Vec<(String, LogValue)> {
    match serde_json::to_value(params) {
        Ok(serde_json::Value::Object(map)) => map
            .iter()
            .map(|(key, value)| (key.clone(), LogValue::from_json(value)))
            .collect(),
        _ => Vec::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {
    Projective,
    Affine,
}

impl TransformKind {
    /// Number of point correspondences the estimate is defined for
    pub fn required_points(self) -> usize {
        match self {
            TransformKind::Projective => 4,
            TransformKind::Affine => 3,
        }
    }

    pub fn type_name(self) -> &'static str {
        match self {
            TransformKind::Projective => "ProjectiveTransform",
            TransformKind::Affine => "AffineTransform",
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformKind::Projective => f.write_str("projective"),
            TransformKind::Affine => f.write_str("affine"),
        }
    }
}

/// A named set of (x, y) correspondences to estimate a transform from
#[derive(Debug, Clone, PartialEq)]
pub struct TransformSpec {
    pub name: String,
    pub kind: TransformKind,
    pub src_points: Vec<[f64; 2]>,
    pub dst_points: Vec<[f64; 2]>,
    pub notes: String,
}

impl TransformSpec {
    pub fn new(
        name: impl Into<String>,
        kind: TransformKind,
        src_points: Vec<[f64; 2]>,
        dst_points: Vec<[f64; 2]>,
        notes: impl Into<String>,
    ) -> Result<Self, OperationError> {
        let spec = Self {
            name: name.into(),
            kind,
            src_points,
            dst_points,
            notes: notes.into(),
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Reject correspondence sets of the wrong size for `kind`.
    pub fn validate(&self) -> Result<(), OperationError> {
        check_correspondences(self.kind, &self.src_points, &self.dst_points)
    }
}

pub fn check_correspondences(
    kind: TransformKind,
    src: &[[f64; 2]],
    dst: &[[f64; 2]],
) -> Result<(), OperationError> {
    let expected = kind.required_points();
    for actual in [src.len(), dst.len()] {
        if actual != expected {
            return Err(OperationError::Correspondence {
                kind,
                expected,
                actual,
            });
        }
    }
    Ok(())
}

/// Render points the way the parameter log stores them: `[[x, y], ...]`
pub fn format_points(points: &[[f64; 2]]) -> String {
    let inner: Vec<String> = points
        .iter()
        .map(|[x, y]| format!("[{}, {}]", LogValue::Float(*x), LogValue::Float(*y)))
        .collect();
    format!("[{}]", inner.join(", "))
}
