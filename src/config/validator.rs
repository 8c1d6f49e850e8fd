use crate::config::Settings;
use crate::error::{Result, TaggerError, ValidationError};
use crate::logging::parse_level;
use crate::manifest::ManifestLocation;

/// Settings validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the settings, reporting every problem at once
    pub fn validate(settings: &Settings) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_required(settings, &mut errors);
        Self::validate_manifest_location(settings, &mut errors);
        Self::validate_logging(settings, &mut errors);
        Self::validate_storage(settings, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(TaggerError::ConfigValidation { errors })
        }
    }

    fn validate_required(settings: &Settings, errors: &mut Vec<ValidationError>) {
        let required = [
            ("csv_location", &settings.csv_location),
            ("bucket", &settings.bucket),
            ("s3_prefix", &settings.s3_prefix),
        ];

        for (name, value) in required {
            if value.trim().is_empty() {
                errors.push(ValidationError::new(name, "required argument is missing"));
            }
        }
    }

    fn validate_manifest_location(settings: &Settings, errors: &mut Vec<ValidationError>) {
        // Absence is already reported as missing
        if settings.csv_location.trim().is_empty() {
            return;
        }

        if let Err(e) = ManifestLocation::parse(&settings.csv_location) {
            errors.push(ValidationError::new("csv_location", e.to_string()));
        }
    }

    fn validate_logging(settings: &Settings, errors: &mut Vec<ValidationError>) {
        if parse_level(&settings.log_level).is_none() {
            errors.push(ValidationError::new(
                "log_level",
                format!("Unknown log level: {}", settings.log_level),
            ));
        }
    }

    fn validate_storage(settings: &Settings, errors: &mut Vec<ValidationError>) {
        if settings.max_attempts == 0 {
            errors.push(ValidationError::new(
                "max_attempts",
                "Max attempts must be greater than 0",
            ));
        }

        if let Some(url) = &settings.endpoint_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                errors.push(ValidationError::new(
                    "endpoint_url",
                    format!("Endpoint must be an http(s) URL, got '{}'", url),
                ));
            }
        }
    }
}
