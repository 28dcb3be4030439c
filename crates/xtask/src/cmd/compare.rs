use super::{flag_value, print_json, read_text};
use crate::XtaskError;
use remora::fidelity::CompareOptions;
use remora::text::MeasureProfile;

pub(crate) fn compare_svgs(args: Vec<String>) -> Result<(), XtaskError> {
    let mut paths: Vec<String> = Vec::new();
    let mut options = CompareOptions {
        simple: false,
        ..Default::default()
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--simple" => options.simple = true,
            "--threshold" => {
                options.simple_threshold = flag_value(&args, &mut i)?;
                options.simple = true;
            }
            "--help" | "-h" => return Err(XtaskError::Usage),
            arg if arg.starts_with("--") => {
                return Err(XtaskError::UnknownCommand(arg.to_string()));
            }
            path => paths.push(path.to_string()),
        }
        i += 1;
    }

    let [candidate, reference] = paths.as_slice() else {
        return Err(XtaskError::Usage);
    };
    let candidate_svg = read_text(candidate)?;
    let reference_svg = read_text(reference)?;

    let report = remora::fidelity::compare_svgs(&candidate_svg, &reference_svg, &options)
        .map_err(remora::Error::from)?;
    if !report.is_comparable() {
        tracing::warn!(candidate, reference, "no common node identifiers");
    }
    print_json(&report)
}

pub(crate) fn compare_profiles(args: Vec<String>) -> Result<(), XtaskError> {
    let [reference, candidate] = args.as_slice() else {
        return Err(XtaskError::Usage);
    };

    let reference = MeasureProfile::from_json(&read_text(reference)?).map_err(remora::Error::from)?;
    let candidate = MeasureProfile::from_json(&read_text(candidate)?).map_err(remora::Error::from)?;
    let comparison = remora::text::compare_profiles(&reference, &candidate);
    tracing::info!(
        mismatches = comparison.summary.total_mismatches,
        high = comparison.summary.high_severity_mismatches,
        "profiles compared"
    );
    print_json(&comparison)
}
