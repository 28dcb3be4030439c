use super::{flag_value, print_json, read_text};
use crate::XtaskError;
use remora::text::{Calibration, CalibrationSample};

pub(crate) fn calibrate_text(args: Vec<String>) -> Result<(), XtaskError> {
    let mut samples_path: Option<String> = None;
    let mut base_path: Option<String> = None;
    let mut version: Option<String> = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--base" => base_path = Some(flag_value(&args, &mut i)?),
            "--version" => version = Some(flag_value(&args, &mut i)?),
            "--help" | "-h" => return Err(XtaskError::Usage),
            arg if arg.starts_with("--") => {
                return Err(XtaskError::UnknownCommand(arg.to_string()));
            }
            value if samples_path.is_none() => samples_path = Some(value.to_string()),
            _ => return Err(XtaskError::Usage),
        }
        i += 1;
    }

    let Some(samples_path) = samples_path else {
        return Err(XtaskError::Usage);
    };
    let base = match base_path {
        Some(path) => Some(read_text(&path)?),
        None => None,
    };
    let fitted = fit_calibration(&read_text(&samples_path)?, base.as_deref(), version)?;
    print_json(&fitted)
}

/// Refits the scales of `base` (defaults when absent) against a JSON array of samples.
fn fit_calibration(
    samples_json: &str,
    base_json: Option<&str>,
    version: Option<String>,
) -> Result<Calibration, XtaskError> {
    let samples: Vec<CalibrationSample> = serde_json::from_str(samples_json)?;
    let base: Calibration = match base_json {
        Some(json) => serde_json::from_str(json)?,
        None => Calibration::default(),
    };
    tracing::info!(samples = samples.len(), base = %base.version, "fitting text calibration");
    let mut fitted = Calibration::fit(&base, &samples);
    if let Some(version) = version {
        fitted.version = version;
    }
    Ok(fitted)
}
