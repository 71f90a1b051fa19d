use std::fmt;
use thiserror::Error;

use crate::locale::{Language, Localized};

/// Smallest value the measurement inputs accept.
pub const MEASUREMENT_MIN: f64 = 1.0;

/// Input granularity hint for measurement inputs.
pub const MEASUREMENT_STEP: f64 = 0.1;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeasurementError {
    #[error("Measurement '{0}' is required")]
    Missing(MeasurementField),

    #[error("Measurement '{field}' must be a number, got '{value}'")]
    NotNumeric { field: MeasurementField, value: String },

    #[error("Measurement '{field}' must be at least {min}, got {value}")]
    BelowMinimum {
        field: MeasurementField,
        value: f64,
        min: f64,
    },

    #[error("Style preference is required")]
    MissingStyle,
}

/// A body measurement collected by the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeasurementField {
    Height,
    Weight,
    Bust,
    Waist,
    Hips,
}

impl MeasurementField {
    pub const ALL: [MeasurementField; 5] = [
        MeasurementField::Height,
        MeasurementField::Weight,
        MeasurementField::Bust,
        MeasurementField::Waist,
        MeasurementField::Hips,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MeasurementField::Height => "height",
            MeasurementField::Weight => "weight",
            MeasurementField::Bust => "bust",
            MeasurementField::Waist => "waist",
            MeasurementField::Hips => "hips",
        }
    }

    pub fn label(&self) -> Localized {
        match self {
            MeasurementField::Height => Localized::new("Height (cm)", "身高 (cm)"),
            MeasurementField::Weight => Localized::new("Weight (kg)", "体重 (kg)"),
            MeasurementField::Bust => Localized::new("Bust (cm)", "胸围 (cm)"),
            MeasurementField::Waist => Localized::new("Waist (cm)", "腰围 (cm)"),
            MeasurementField::Hips => Localized::new("Hips (cm)", "臀围 (cm)"),
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(name.trim()))
    }

    fn index(&self) -> usize {
        match self {
            MeasurementField::Height => 0,
            MeasurementField::Weight => 1,
            MeasurementField::Bust => 2,
            MeasurementField::Waist => 3,
            MeasurementField::Hips => 4,
        }
    }
}

impl fmt::Display for MeasurementField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered list of selectable style preferences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleCatalog {
    styles: Vec<Localized>,
}

impl Default for StyleCatalog {
    fn default() -> Self {
        Self::new(vec![
            Localized::new("Casual", "休闲"),
            Localized::new("Fashion", "时尚"),
            Localized::new("Vintage", "复古"),
            Localized::new("Minimalist", "简约"),
            Localized::new("Sweet", "甜美"),
        ])
    }
}

impl StyleCatalog {
    pub fn new(styles: Vec<Localized>) -> Self {
        Self { styles }
    }

    pub fn styles(&self) -> &[Localized] {
        &self.styles
    }

    /// The wire value used when nothing has been chosen yet.
    pub fn default_value(&self) -> &str {
        self.styles.first().map(|s| s.zh.as_str()).unwrap_or("")
    }

    /// Map user input in either language to the canonical (Chinese) wire value.
    pub fn resolve(&self, input: &str) -> Option<&str> {
        self.styles
            .iter()
            .find(|s| s.matches(input))
            .map(|s| s.zh.as_str())
    }

    /// Display name for a wire value, falling back to the value itself.
    pub fn display<'a>(&'a self, value: &'a str, lang: Language) -> &'a str {
        self.styles
            .iter()
            .find(|s| s.zh == value)
            .map(|s| s.get(lang))
            .unwrap_or(value)
    }
}

/// The measurement form: string-encoded numbers plus a style preference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasurementForm {
    values: [String; 5],
    pub style_preference: String,
}

impl MeasurementForm {
    /// An empty form with the catalog's first style selected.
    pub fn new(catalog: &StyleCatalog) -> Self {
        Self {
            values: Default::default(),
            style_preference: catalog.default_value().to_string(),
        }
    }

    pub fn set(&mut self, field: MeasurementField, value: impl Into<String>) {
        self.values[field.index()] = value.into();
    }

    pub fn get(&self, field: MeasurementField) -> &str {
        &self.values[field.index()]
    }

    pub fn set_style(&mut self, style: impl Into<String>) {
        self.style_preference = style.into();
    }

    /// Check every field in declaration order and report the first problem.
    pub fn validate(&self) -> Result<(), MeasurementError> {
        for field in MeasurementField::ALL {
            let raw = self.get(field).trim();
            if raw.is_empty() {
                return Err(MeasurementError::Missing(field));
            }
            let value: f64 = raw.parse().map_err(|_| MeasurementError::NotNumeric {
                field,
                value: raw.to_string(),
            })?;
            if !value.is_finite() {
                return Err(MeasurementError::NotNumeric {
                    field,
                    value: raw.to_string(),
                });
            }
            if value < MEASUREMENT_MIN {
                return Err(MeasurementError::BelowMinimum {
                    field,
                    value,
                    min: MEASUREMENT_MIN,
                });
            }
        }
        if self.style_preference.trim().is_empty() {
            return Err(MeasurementError::MissingStyle);
        }
        Ok(())
    }

    /// Flatten to ordered `(name, value)` pairs for the multipart body.
    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields: Vec<(&'static str, String)> = MeasurementField::ALL
            .into_iter()
            .map(|f| (f.name(), self.get(f).trim().to_string()))
            .collect();
        fields.push(("style_preference", self.style_preference.clone()));
        fields
    }
}

impl Default for MeasurementForm {
    fn default() -> Self {
        Self::new(&StyleCatalog::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> MeasurementForm {
        let mut form = MeasurementForm::default();
        form.set(MeasurementField::Height, "165");
        form.set(MeasurementField::Weight, "50");
        form.set(MeasurementField::Bust, "84");
        form.set(MeasurementField::Waist, "64");
        form.set(MeasurementField::Hips, "90");
        form
    }

    #[test]
    fn test_default_style_is_first_catalog_entry() {
        let form = MeasurementForm::default();
        assert_eq!(form.style_preference, "休闲");
    }

    #[test]
    fn test_validate_complete_form() {
        assert!(filled().validate().is_ok());
    }

    #[test]
    fn test_validate_reports_first_missing_field() {
        let mut form = filled();
        form.set(MeasurementField::Waist, "  ");
        form.set(MeasurementField::Hips, "");
        assert_eq!(
            form.validate(),
            Err(MeasurementError::Missing(MeasurementField::Waist))
        );
    }

    #[test]
    fn test_validate_rejects_non_numeric_and_small_values() {
        let mut form = filled();
        form.set(MeasurementField::Height, "tall");
        assert!(matches!(form.validate(), Err(MeasurementError::NotNumeric { .. })));

        let mut form = filled();
        form.set(MeasurementField::Weight, "0.5");
        assert!(matches!(form.validate(), Err(MeasurementError::BelowMinimum { .. })));
    }

    #[test]
    fn test_validate_requires_style() {
        let mut form = filled();
        form.set_style("");
        assert_eq!(form.validate(), Err(MeasurementError::MissingStyle));
    }

    #[test]
    fn test_to_fields_order() {
        let fields = filled().to_fields();
        let names: Vec<_> = fields.iter().map(|(n, _)| *n).collect();
        assert_eq!(
            names,
            vec!["height", "weight", "bust", "waist", "hips", "style_preference"]
        );
        assert_eq!(fields[0].1, "165");
        assert_eq!(fields[5].1, "休闲");
    }

    #[test]
    fn test_style_catalog_resolve() {
        let catalog = StyleCatalog::default();
        assert_eq!(catalog.resolve("vintage"), Some("复古"));
        assert_eq!(catalog.resolve("甜美"), Some("甜美"));
        assert_eq!(catalog.resolve("goth"), None);
        assert_eq!(catalog.display("简约", Language::En), "Minimalist");
        assert_eq!(catalog.display("unknown", Language::En), "unknown");
    }

    #[test]
    fn test_field_parse() {
        assert_eq!(MeasurementField::parse("Bust"), Some(MeasurementField::Bust));
        assert_eq!(MeasurementField::parse("shoulders"), None);
    }
}
