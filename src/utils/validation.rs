use crate::utils::error::{EtlError, Result};

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

pub fn validate_file_extension(field_name: &str, file: &str, allowed_extensions: &[&str]) -> Result<()> {
    let extension = std::path::Path::new(file)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension {
        Some(ext) if allowed_extensions.contains(&ext.as_str()) => Ok(()),
        Some(ext) => Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: file.to_string(),
            reason: format!(
                "Unsupported file extension: {}. Allowed extensions: {}",
                ext,
                allowed_extensions.join(", ")
            ),
        }),
        None => Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: file.to_string(),
            reason: "File has no extension or invalid filename".to_string(),
        }),
    }
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| EtlError::MissingConfigError {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}
