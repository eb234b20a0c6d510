//! Generic parameters functions
//!
//! Parameter files are TOML documents stored in the `params` directory of the
//! software root. Loading is strict with [`load`], or forgiving with
//! [`load_or_default`], which never stops an executable from starting: any
//! failure is logged and the documented defaults are used instead.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::warn;
use serde::de::DeserializeOwned;
use std::fs::read_to_string;
use std::path::PathBuf;
use thiserror::Error;
use toml;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// An error that occurs during loading of a parameter file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("The software root environment variable ({}) is not set", crate::host::SW_ROOT_ENV_VAR)]
    SwRootNotSet,

    #[error("Cannot load the parmeter file: {0}")]
    FileLoadError(std::io::Error),

    #[error("Cannot read the parameter file: {0}")]
    DeserialiseError(toml::de::Error)
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Parameters which can check their own values.
pub trait Validate {
    /// Replace any out-of-range values with their defaults.
    ///
    /// Returns the names of the fields which were reset.
    fn validate(&mut self) -> Vec<&'static str>;
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the full path to a parameter file.
///
/// The file path is relative to the "<sw_root>/params" directory
pub fn param_file_path(param_file_path: &str) -> Result<PathBuf, LoadError> {
    let mut path = crate::host::get_sw_root()
        .map_err(|_| LoadError::SwRootNotSet)?;
    path.push("params");
    path.push(param_file_path);

    Ok(path)
}

/// Load a parameter file
///
/// The file path is relative to the "<sw_root>/params" directory
pub fn load<P>(param_file_path: &str) -> Result<P, LoadError>
where
    P: DeserializeOwned
{
    let path = self::param_file_path(param_file_path)?;

    // Load the file into a string
    let params_str = read_to_string(path)
        .map_err(LoadError::FileLoadError)?;

    from_toml_str(&params_str)
}

/// Parse parameters from a TOML string.
pub fn from_toml_str<P>(params_str: &str) -> Result<P, LoadError>
where
    P: DeserializeOwned
{
    toml::from_str(params_str).map_err(LoadError::DeserialiseError)
}

/// Load a parameter file, falling back to the default parameters on error.
///
/// Invalid values inside an otherwise readable file are reset individually
/// through [`Validate`]. Every fallback is reported with a warning.
pub fn load_or_default<P>(param_file_path: &str) -> P
where
    P: DeserializeOwned + Default + Validate
{
    let params = match load::<P>(param_file_path) {
        Ok(p) => p,
        Err(e) => {
            warn!(
                "Could not load \"{}\" ({}), using default parameters",
                param_file_path, e
            );
            P::default()
        }
    };

    validated(params, param_file_path)
}

/// Validate the given parameters, warning about each field that was reset.
pub fn validated<P>(mut params: P, source: &str) -> P
where
    P: Validate
{
    for field in params.validate() {
        warn!(
            "Parameter \"{}\" in \"{}\" is invalid, reset to its default",
            field, source
        );
    }

    params
}

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(default)]
    struct TestParams {
        rate_hz: f64,
        name: String,
    }

    impl Default for TestParams {
        fn default() -> Self {
            Self {
                rate_hz: 30.0,
                name: String::from("default"),
            }
        }
    }

    impl Validate for TestParams {
        fn validate(&mut self) -> Vec<&'static str> {
            let mut reset = vec![];
            if !(self.rate_hz > 0.0) {
                self.rate_hz = Self::default().rate_hz;
                reset.push("rate_hz");
            }
            reset
        }
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let p: TestParams = from_toml_str("name = \"quad\"").unwrap();
        assert_eq!(p.rate_hz, 30.0);
        assert_eq!(p.name, "quad");
    }

    #[test]
    fn test_bad_toml_is_error() {
        let p: Result<TestParams, _> = from_toml_str("rate_hz = [");
        assert!(matches!(p, Err(LoadError::DeserialiseError(_))));
    }

    #[test]
    fn test_validated_resets_invalid_fields() {
        let p: TestParams = from_toml_str("rate_hz = -4.0").unwrap();
        let p = validated(p, "test.toml");
        assert_eq!(p.rate_hz, 30.0);
    }
}
