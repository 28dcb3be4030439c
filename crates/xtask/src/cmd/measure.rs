use super::{flag_value, read_text};
use crate::XtaskError;
use remora::{Calibration, DeterministicFonts, Element, Measure, Remora, Settings};
use std::sync::Arc;

pub(crate) fn measure_text(args: Vec<String>) -> Result<(), XtaskError> {
    let mut text: Option<String> = None;
    let mut font_size: Option<f64> = None;
    let mut font_family: Option<String> = None;
    let mut font_weight: Option<String> = None;
    let mut calibration: Option<String> = None;
    let mut deterministic = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--font-size" => font_size = Some(flag_value(&args, &mut i)?),
            "--font-family" => font_family = Some(flag_value(&args, &mut i)?),
            "--font-weight" => font_weight = Some(flag_value(&args, &mut i)?),
            "--calibration" => calibration = Some(flag_value(&args, &mut i)?),
            "--deterministic" => deterministic = true,
            "--help" | "-h" => return Err(XtaskError::Usage),
            arg if arg.starts_with("--") => {
                return Err(XtaskError::UnknownCommand(arg.to_string()));
            }
            value if text.is_none() => text = Some(value.to_string()),
            _ => return Err(XtaskError::Usage),
        }
        i += 1;
    }

    let Some(text) = text else {
        return Err(XtaskError::Usage);
    };

    let mut settings = Settings::from_env();
    if let Some(path) = calibration {
        let calibration: Calibration = serde_json::from_str(&read_text(&path)?)?;
        settings = settings.with_calibration(calibration);
    }
    let remora = if deterministic {
        Remora::with_backend(Arc::new(DeterministicFonts::default()), &settings)
    } else {
        Remora::init(&settings)?
    };

    let mut el = Element::new("text").with_text(text.clone());
    if let Some(size) = font_size {
        el = el.with_attr("font-size", size.to_string());
    }
    if let Some(family) = font_family {
        el = el.with_attr("font-family", family);
    }
    if let Some(weight) = font_weight {
        el = el.with_attr("font-weight", weight);
    }

    let measurer = remora.measurer();
    let out = serde_json::json!({
        "text": text,
        "font": remora.text().font_for(&el),
        "measurement": remora.text().measure_block(&el),
        "textLength": measurer.measure_text_length(&el),
        "bbox": measurer.measure_bounding_box(&el),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
