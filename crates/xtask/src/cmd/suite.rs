use super::{flag_value, print_json};
use crate::XtaskError;
use remora::Settings;
use remora::fidelity::{
    CancelToken, CandidateRenderer, CommandRenderer, ReferenceRenderer, SvgDirRenderer,
    list_samples, run_suite,
};
use std::path::PathBuf;

enum Source {
    Dir(PathBuf),
    Command(String),
}

pub(crate) fn deviation_suite(args: Vec<String>) -> Result<(), XtaskError> {
    let mut config = Settings::from_env().suite;
    let mut candidate: Option<Source> = None;
    let mut reference = Source::Command("mmdc".to_string());
    let mut check = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--samples" => config.sample_dir = flag_value(&args, &mut i)?,
            "--candidate-dir" => candidate = Some(Source::Dir(flag_value(&args, &mut i)?)),
            "--candidate-cmd" => candidate = Some(Source::Command(flag_value(&args, &mut i)?)),
            "--reference-dir" => reference = Source::Dir(flag_value(&args, &mut i)?),
            "--reference-cmd" => reference = Source::Command(flag_value(&args, &mut i)?),
            "--max-samples" => {
                let n: usize = flag_value(&args, &mut i)?;
                config.max_samples = (n > 0).then_some(n);
            }
            "--items" => config.include_items = true,
            "--check" => check = true,
            "--help" | "-h" => return Err(XtaskError::Usage),
            other => return Err(XtaskError::UnknownCommand(other.to_string())),
        }
        i += 1;
    }

    let Some(candidate) = candidate else {
        return Err(XtaskError::Usage);
    };
    let timeout = config.reference_timeout();
    let candidate: Box<dyn CandidateRenderer> = match candidate {
        Source::Dir(dir) => Box::new(SvgDirRenderer::new(dir)),
        Source::Command(program) => Box::new(
            CommandRenderer::new(program)
                .with_browser_args(None)
                .with_timeout(timeout),
        ),
    };
    let reference: Box<dyn ReferenceRenderer> = match reference {
        Source::Dir(dir) => Box::new(SvgDirRenderer::new(dir)),
        Source::Command(program) => {
            let renderer = CommandRenderer::new(program).with_timeout(timeout);
            if !renderer.is_available() {
                return Err(XtaskError::ReferenceUnavailable(renderer.program().to_string()));
            }
            Box::new(renderer)
        }
    };

    let samples =
        list_samples(&config.sample_dir, config.max_samples).map_err(remora::Error::from)?;
    tracing::info!(count = samples.len(), dir = %config.sample_dir.display(), "found samples");

    let report = run_suite(
        &samples,
        candidate.as_ref(),
        reference.as_ref(),
        &config,
        &CancelToken::new(),
    )
    .map_err(remora::Error::from)?;
    print_json(&report)?;

    for (file, violation) in report.violations() {
        tracing::warn!(%file, %violation, "sample over threshold");
    }
    if check {
        report.check_thresholds()?;
    }
    Ok(())
}
