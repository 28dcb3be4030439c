use super::{flag_value, read_text};
use crate::XtaskError;
use remora::PostProcessOptions;

pub(crate) fn post_process(args: Vec<String>) -> Result<(), XtaskError> {
    let mut input: Option<String> = None;
    let mut options = PostProcessOptions::default();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--margin" => options.viewbox_margin = flag_value(&args, &mut i)?,
            "--no-viewbox" => options.normalize_viewbox = false,
            "--normalize-origin" => options.normalize_origin = true,
            "--width" => options.size.width = Some(flag_value(&args, &mut i)?),
            "--height" => options.size.height = Some(flag_value(&args, &mut i)?),
            "--max-width" => options.size.max_width = Some(flag_value(&args, &mut i)?),
            "--max-height" => options.size.max_height = Some(flag_value(&args, &mut i)?),
            "--auto-size" => options.size.auto_size = true,
            "--help" | "-h" => return Err(XtaskError::Usage),
            arg if arg.starts_with("--") => {
                return Err(XtaskError::UnknownCommand(arg.to_string()));
            }
            path if input.is_none() => input = Some(path.to_string()),
            _ => return Err(XtaskError::Usage),
        }
        i += 1;
    }

    let Some(input) = input else {
        return Err(XtaskError::Usage);
    };
    let svg = read_text(&input)?;
    let out = remora::post_process(&svg, &options).map_err(remora::Error::from)?;
    println!("{out}");
    Ok(())
}
