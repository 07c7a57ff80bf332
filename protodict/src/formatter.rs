use colored::*;
use protodict_core::{DecodeError, EncodeError, FieldsMissing};

/// A wrapper struct for a formatted, colored string.
///
/// Implements `Display` so it can be printed directly.
pub struct FormattedString(pub String);

/// A message name whose body passed validation.
pub struct Valid(pub String);

impl std::fmt::Display for FormattedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        writeln!(f, "{}", self.0)?;
        Ok(())
    }
}

impl From<serde_json::Value> for FormattedString {
    fn from(value: serde_json::Value) -> Self {
        FormattedString(serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()))
    }
}

impl From<Valid> for FormattedString {
    fn from(Valid(message): Valid) -> Self {
        FormattedString(format!(
            "{} {} has every required field",
            "Valid:".green().bold(),
            message.yellow()
        ))
    }
}

impl From<FieldsMissing> for FormattedString {
    fn from(missing: FieldsMissing) -> Self {
        let mut out = String::new();
        out.push_str(&format!("{}\n", "Validation Failed:".red().bold()));
        for field in missing.fields() {
            out.push_str(&format!("  - {}\n", field.yellow()));
        }
        FormattedString(out.trim_end().to_string())
    }
}

impl From<anyhow::Error> for FormattedString {
    fn from(err: anyhow::Error) -> Self {
        if let Some(missing) = err.downcast_ref::<FieldsMissing>() {
            return FormattedString::from(missing.clone());
        }

        let label = if err.is::<DecodeError>() {
            "Conversion from JSON Failed:"
        } else if err.is::<EncodeError>() {
            "Conversion to JSON Failed:"
        } else {
            "Error:"
        };
        FormattedString(format!("{}\n\n'{:#}'", label.red().bold(), err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_are_listed() {
        colored::control::set_override(false);
        let registration = sample_schema::message(sample_schema::REGISTRATION);
        let missing = protodict_core::validate::validate(&registration, &Default::default())
            .expect_err("Both fields are missing");

        let formatted = FormattedString::from(anyhow::Error::from(missing));

        assert_eq!(formatted.0, "Validation Failed:\n  - a\n  - b");
    }

    #[test]
    fn test_errors_keep_their_context() {
        colored::control::set_override(false);
        let err = anyhow::anyhow!("root cause").context("Failed to read descriptor set 'x.bin'");

        let formatted = FormattedString::from(err);

        assert_eq!(
            formatted.0,
            "Error:\n\n'Failed to read descriptor set 'x.bin': root cause'"
        );
    }
}
